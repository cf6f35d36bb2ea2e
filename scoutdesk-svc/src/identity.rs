//! Identity & Role
//!
//! Resolves the acting user and their access level. The resulting `Actor`
//! travels with every service call; authorisation is decided inside the
//! services (via `visibility`), never by the Store.
//!
//! Access levels:
//! - 1 = scout (sees own artifacts)
//! - 2 = analyst (sees all reports; no user administration, no shortlist creation)
//! - 3 = manager/admin (full)

use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::info;

use scoutdesk_common::db::Store;
use scoutdesk_common::{Error, Result};

/// User access level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum AccessLevel {
    Scout = 1,
    Analyst = 2,
    Manager = 3,
}

impl TryFrom<i64> for AccessLevel {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            1 => Ok(AccessLevel::Scout),
            2 => Ok(AccessLevel::Analyst),
            3 => Ok(AccessLevel::Manager),
            other => Err(Error::Validation(format!(
                "access level must be 1, 2 or 3 (got {})",
                other
            ))),
        }
    }
}

impl From<AccessLevel> for i64 {
    fn from(level: AccessLevel) -> Self {
        level as i64
    }
}

/// Stored user record
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub role: String,
    pub level: AccessLevel,
    pub active: bool,
}

/// The identity carried on every service call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: i64,
    pub name: String,
    pub level: AccessLevel,
}

impl Actor {
    pub fn new(user_id: i64, name: impl Into<String>, level: AccessLevel) -> Self {
        Self {
            user_id,
            name: name.into(),
            level,
        }
    }

    /// Fail with `Auth` unless the actor has at least `min`
    pub fn require_level(&self, min: AccessLevel, action: &str) -> Result<()> {
        if self.level >= min {
            Ok(())
        } else {
            Err(Error::Auth(format!(
                "{} requires access level {} (user {} has {})",
                action, min as i64, self.user_id, self.level as i64
            )))
        }
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Actor::new(user.id, user.name.clone(), user.level)
    }
}

/// Input for `create_user`
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default = "default_role")]
    pub role: String,
    pub level: AccessLevel,
}

fn default_role() -> String {
    "scout".to_string()
}

/// Hash a password as `<salt hex>$<sha256(salt || password) hex>`
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    format!("{}${}", hex::encode(salt), digest_with_salt(&salt, password))
}

/// Check a password against a stored `salt$hash` value
pub fn verify_password(stored: &str, password: &str) -> bool {
    let Some((salt_hex, expected)) = stored.split_once('$') else {
        return false;
    };
    match hex::decode(salt_hex) {
        Ok(salt) => digest_with_salt(&salt, password) == expected,
        Err(_) => false,
    }
}

fn digest_with_salt(salt: &[u8], password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Normalised form used for every email comparison
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

const USER_COLUMNS: &str = "id, naam, email, wachtwoord, rol, toegangsniveau, actief";

fn user_from_row(row: &SqliteRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("naam")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("wachtwoord")?,
        role: row.try_get("rol")?,
        level: AccessLevel::try_from(row.try_get::<i64, _>("toegangsniveau")?)?,
        active: row.try_get("actief")?,
    })
}

/// User lookup, authentication and administration
#[derive(Clone)]
pub struct IdentityService {
    store: Store,
}

impl IdentityService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Returns the user iff active and the password matches
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE lower(trim(email)) = ?",
            USER_COLUMNS
        ))
        .bind(normalize_email(email))
        .fetch_optional(self.store.pool())
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let user = user_from_row(&row)?;

        if !user.active || !verify_password(&user.password_hash, password) {
            return Ok(None);
        }
        Ok(Some(user))
    }

    pub async fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
            .bind(user_id)
            .fetch_optional(self.store.pool())
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    /// Resolve a user id from an email address (lowercased, trimmed)
    pub async fn find_user_id_by_email(&self, email: &str) -> Result<Option<i64>> {
        let id = sqlx::query_scalar("SELECT id FROM users WHERE lower(trim(email)) = ?")
            .bind(normalize_email(email))
            .fetch_optional(self.store.pool())
            .await?;
        Ok(id)
    }

    /// Active user or an error suitable for ownership checks
    pub async fn require_active_user(&self, user_id: i64) -> Result<User> {
        let user = self
            .get_user(user_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("user {}", user_id)))?;
        if !user.active {
            return Err(Error::Validation(format!("user {} is not active", user_id)));
        }
        Ok(user)
    }

    /// Create a user (level 3 only)
    pub async fn create_user(&self, actor: &Actor, new_user: NewUser) -> Result<User> {
        actor.require_level(AccessLevel::Manager, "user administration")?;
        self.insert_user(new_user).await
    }

    async fn insert_user(&self, new_user: NewUser) -> Result<User> {
        let name = new_user.name.trim();
        let email = normalize_email(&new_user.email);
        if name.is_empty() {
            return Err(Error::Validation("user name must not be empty".to_string()));
        }
        if !email.contains('@') {
            return Err(Error::Validation(format!("invalid email address: {}", email)));
        }
        if new_user.password.is_empty() {
            return Err(Error::Validation("password must not be empty".to_string()));
        }

        let result = sqlx::query(
            "INSERT INTO users (naam, email, wachtwoord, rol, toegangsniveau, actief) VALUES (?, ?, ?, ?, ?, 1)",
        )
        .bind(name)
        .bind(&email)
        .bind(hash_password(&new_user.password))
        .bind(new_user.role.trim())
        .bind(i64::from(new_user.level))
        .execute(self.store.pool())
        .await
        .map_err(|e| Error::from_write(e, &format!("user with email {}", email)))?;

        let id = result.last_insert_rowid();
        info!(user_id = id, level = new_user.level as i64, "User created");

        self.get_user(id)
            .await?
            .ok_or_else(|| Error::Internal(format!("user {} vanished after insert", id)))
    }

    /// Activate or deactivate a user (level 3 only)
    pub async fn set_user_active(&self, actor: &Actor, user_id: i64, active: bool) -> Result<()> {
        actor.require_level(AccessLevel::Manager, "user administration")?;
        if actor.user_id == user_id && !active {
            return Err(Error::Validation("cannot deactivate your own account".to_string()));
        }

        let affected = sqlx::query("UPDATE users SET actief = ? WHERE id = ?")
            .bind(active)
            .bind(user_id)
            .execute(self.store.pool())
            .await?
            .rows_affected();

        if affected == 0 {
            return Err(Error::NotFound(format!("user {}", user_id)));
        }
        info!(actor = actor.user_id, user_id, active, "User activation changed");
        Ok(())
    }

    /// All users (level 3 only)
    pub async fn list_users(&self, actor: &Actor) -> Result<Vec<User>> {
        actor.require_level(AccessLevel::Manager, "user administration")?;
        let rows = sqlx::query(&format!("SELECT {} FROM users ORDER BY naam", USER_COLUMNS))
            .fetch_all(self.store.pool())
            .await?;
        rows.iter().map(user_from_row).collect()
    }

    /// Create the first manager account when the users table is empty
    pub async fn ensure_bootstrap_admin(&self, email: &str, password: &str) -> Result<Option<User>> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(self.store.pool())
            .await?;
        if count > 0 {
            return Ok(None);
        }

        let user = self
            .insert_user(NewUser {
                name: "Administrator".to_string(),
                email: email.to_string(),
                password: password.to_string(),
                role: "admin".to_string(),
                level: AccessLevel::Manager,
            })
            .await?;
        info!(user_id = user.id, "Bootstrap administrator created");
        Ok(Some(user))
    }
}
