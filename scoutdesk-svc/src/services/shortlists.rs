//! Shortlists and their entries
//!
//! Only level-3 users create shortlists. Entries dedupe on
//! `(shortlist_id, player_id)`; custom-name entries are never deduped.
//! Entry edits and deletes are allowed for level 3 and the list owner.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use scoutdesk_common::db::Store;
use scoutdesk_common::{time, Error, PlayerRef, Result};

use crate::cache::{Family, ReadCache};
use crate::identity::{AccessLevel, Actor, IdentityService};
use crate::visibility::{can_manage_entries, scope_for, Artifact};

macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => stringify!($variant)),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| Error::Validation(format!(
                        "{} must be one of {:?} (got '{}')",
                        stringify!($name),
                        $name::ALL.iter().map(|v| v.as_str()).collect::<Vec<_>>(),
                        s
                    )))
            }
        }
    };
}

text_enum!(
    /// Shortlist slot
    #[allow(clippy::upper_case_acronyms)]
    Position { GK, CB, RB, LB, DM, CM, ACM, RW, LW, FW }
);

text_enum!(
    Priority { High, Medium, Low }
);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shortlist {
    pub id: i64,
    pub name: String,
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortlistEntry {
    pub id: i64,
    pub shortlist_id: i64,
    pub player: PlayerRef,
    pub position: Position,
    pub priority: Priority,
    pub notes: String,
    pub added_by_name: String,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewEntry {
    pub player_id: Option<String>,
    pub custom_naam: Option<String>,
    pub position: Position,
    pub priority: Priority,
    #[serde(default)]
    pub notes: String,
}

/// Editable entry fields; absent fields stay as stored
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntryChanges {
    pub position: Option<Position>,
    pub priority: Option<Priority>,
    pub notes: Option<String>,
}

fn shortlist_from_row(row: &SqliteRow) -> Result<Shortlist> {
    Ok(Shortlist {
        id: row.try_get("id")?,
        name: row.try_get("naam")?,
        owner_id: row.try_get("eigenaar_id")?,
        created_at: time::from_db(&row.try_get::<String, _>("aangemaakt_op")?)?,
    })
}

fn entry_from_row(row: &SqliteRow) -> Result<ShortlistEntry> {
    Ok(ShortlistEntry {
        id: row.try_get("id")?,
        shortlist_id: row.try_get("shortlist_id")?,
        player: PlayerRef::from_columns(row.try_get("player_id")?, row.try_get("custom_naam")?)?,
        position: row.try_get::<String, _>("position")?.parse()?,
        priority: row.try_get::<String, _>("priority")?.parse()?,
        notes: row.try_get("notities")?,
        added_by_name: row.try_get("added_by")?,
        added_at: time::from_db(&row.try_get::<String, _>("added_at")?)?,
    })
}

const ENTRY_COLUMNS: &str =
    "id, shortlist_id, player_id, custom_naam, position, priority, notities, added_by, added_at";

#[derive(Clone)]
pub struct ShortlistService {
    store: Store,
    identity: IdentityService,
    cache: Arc<ReadCache>,
}

impl ShortlistService {
    pub fn new(store: Store, identity: IdentityService, cache: Arc<ReadCache>) -> Self {
        Self {
            store,
            identity,
            cache,
        }
    }

    /// Create a shortlist (level 3 only) owned by an active user
    pub async fn create_shortlist(&self, actor: &Actor, name: &str, owner_id: i64) -> Result<Shortlist> {
        actor.require_level(AccessLevel::Manager, "creating a shortlist")?;
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Validation("shortlist name must not be empty".to_string()));
        }
        self.identity.require_active_user(owner_id).await?;

        let now = time::now();
        let id = sqlx::query("INSERT INTO shortlists (naam, eigenaar_id, aangemaakt_op) VALUES (?, ?, ?)")
            .bind(name)
            .bind(owner_id)
            .bind(time::to_db(now))
            .execute(self.store.pool())
            .await?
            .last_insert_rowid();

        self.cache.invalidate(Family::Shortlists).await;
        info!(actor = actor.user_id, shortlist_id = id, owner_id, "Shortlist created");

        Ok(Shortlist {
            id,
            name: name.to_string(),
            owner_id,
            created_at: now,
        })
    }

    /// Shortlists the actor may see, by name
    pub async fn list_visible_shortlists(&self, actor: &Actor) -> Result<Vec<Shortlist>> {
        let owner = scope_for(actor, Artifact::Shortlist).owner_filter();
        let rows = sqlx::query(
            r#"
            SELECT id, naam, eigenaar_id, aangemaakt_op FROM shortlists
            WHERE (? IS NULL OR eigenaar_id = ?)
            ORDER BY naam, id
            "#,
        )
        .bind(owner)
        .bind(owner)
        .fetch_all(self.store.pool())
        .await?;
        rows.iter().map(shortlist_from_row).collect()
    }

    /// A single shortlist; invisible lists read as `NotFound`
    pub async fn get_shortlist(&self, actor: &Actor, shortlist_id: i64) -> Result<Shortlist> {
        let row = sqlx::query("SELECT id, naam, eigenaar_id, aangemaakt_op FROM shortlists WHERE id = ?")
            .bind(shortlist_id)
            .fetch_optional(self.store.pool())
            .await?;
        let shortlist = row
            .as_ref()
            .map(shortlist_from_row)
            .transpose()?
            .filter(|s| scope_for(actor, Artifact::Shortlist).admits(s.owner_id))
            .ok_or_else(|| Error::NotFound(format!("shortlist {}", shortlist_id)))?;
        Ok(shortlist)
    }

    /// Add a player to a visible shortlist
    ///
    /// **Algorithm:**
    /// 1. Resolve the shortlist through the visibility scope
    /// 2. Validate the player reference (exactly one of id / custom name)
    /// 3. For upstream ids, reject duplicates with `Conflict`
    /// 4. Insert with `added_by = actor.name`
    pub async fn add_entry(&self, actor: &Actor, shortlist_id: i64, entry: NewEntry) -> Result<ShortlistEntry> {
        self.get_shortlist(actor, shortlist_id).await?;
        let player = PlayerRef::from_columns(entry.player_id, entry.custom_naam)?;

        if let PlayerRef::Known(player_id) = &player {
            let existing: Option<i64> = sqlx::query_scalar(
                "SELECT id FROM shortlist_entries WHERE shortlist_id = ? AND player_id = ?",
            )
            .bind(shortlist_id)
            .bind(player_id)
            .fetch_optional(self.store.pool())
            .await?;
            if let Some(existing) = existing {
                return Err(Error::Conflict(format!(
                    "player {} is already on shortlist {} (entry {})",
                    player_id, shortlist_id, existing
                )));
            }
        }

        let id = sqlx::query(
            r#"
            INSERT INTO shortlist_entries
                (shortlist_id, player_id, custom_naam, position, priority, notities, added_by, added_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(shortlist_id)
        .bind(player.id())
        .bind(player.custom_name())
        .bind(entry.position.as_str())
        .bind(entry.priority.as_str())
        .bind(&entry.notes)
        .bind(&actor.name)
        .bind(time::now_db())
        .execute(self.store.pool())
        .await
        .map_err(|e| Error::from_write(e, &format!("entry for {} on shortlist {}", player.key(), shortlist_id)))?
        .last_insert_rowid();

        self.cache.invalidate(Family::Shortlists).await;
        info!(
            actor = actor.user_id,
            shortlist_id,
            entry_id = id,
            player = player.key(),
            "Shortlist entry added"
        );

        self.fetch_entry(id)
            .await?
            .ok_or_else(|| Error::Internal(format!("entry {} vanished after insert", id)))
    }

    /// Change position, priority or notes of an entry
    pub async fn update_entry(&self, actor: &Actor, entry_id: i64, changes: EntryChanges) -> Result<ShortlistEntry> {
        let entry = self.require_manageable_entry(actor, entry_id).await?;

        let position = changes.position.unwrap_or(entry.position);
        let priority = changes.priority.unwrap_or(entry.priority);
        let notes = changes.notes.unwrap_or(entry.notes);

        sqlx::query("UPDATE shortlist_entries SET position = ?, priority = ?, notities = ? WHERE id = ?")
            .bind(position.as_str())
            .bind(priority.as_str())
            .bind(&notes)
            .bind(entry_id)
            .execute(self.store.pool())
            .await?;

        self.cache.invalidate(Family::Shortlists).await;
        info!(actor = actor.user_id, entry_id, %position, %priority, "Shortlist entry updated");

        self.fetch_entry(entry_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("entry {}", entry_id)))
    }

    /// Hard delete
    pub async fn delete_entry(&self, actor: &Actor, entry_id: i64) -> Result<()> {
        self.require_manageable_entry(actor, entry_id).await?;

        sqlx::query("DELETE FROM shortlist_entries WHERE id = ?")
            .bind(entry_id)
            .execute(self.store.pool())
            .await?;

        self.cache.invalidate(Family::Shortlists).await;
        info!(actor = actor.user_id, entry_id, "Shortlist entry deleted");
        Ok(())
    }

    /// Entries of a visible shortlist: High, Medium, Low, then newest first
    pub async fn list_entries(&self, actor: &Actor, shortlist_id: i64) -> Result<Vec<ShortlistEntry>> {
        self.get_shortlist(actor, shortlist_id).await?;

        let cache_key = shortlist_id.to_string();
        if let Some(entries) = self
            .cache
            .get::<Vec<ShortlistEntry>>(Family::Shortlists, &cache_key)
            .await
        {
            return Ok(entries);
        }

        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM shortlist_entries
            WHERE shortlist_id = ?
            ORDER BY CASE priority WHEN 'High' THEN 0 WHEN 'Medium' THEN 1 ELSE 2 END,
                     added_at DESC, id DESC
            "#,
            ENTRY_COLUMNS
        ))
        .bind(shortlist_id)
        .fetch_all(self.store.pool())
        .await?;
        let entries = rows.iter().map(entry_from_row).collect::<Result<Vec<_>>>()?;

        self.cache.put(Family::Shortlists, &cache_key, &entries).await;
        Ok(entries)
    }

    async fn fetch_entry(&self, entry_id: i64) -> Result<Option<ShortlistEntry>> {
        let row = sqlx::query(&format!("SELECT {} FROM shortlist_entries WHERE id = ?", ENTRY_COLUMNS))
            .bind(entry_id)
            .fetch_optional(self.store.pool())
            .await?;
        row.as_ref().map(entry_from_row).transpose()
    }

    async fn require_manageable_entry(&self, actor: &Actor, entry_id: i64) -> Result<ShortlistEntry> {
        let entry = self
            .fetch_entry(entry_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("entry {}", entry_id)))?;

        let owner_id: i64 = sqlx::query_scalar("SELECT eigenaar_id FROM shortlists WHERE id = ?")
            .bind(entry.shortlist_id)
            .fetch_one(self.store.pool())
            .await?;

        if !can_manage_entries(actor, owner_id) {
            return Err(Error::Auth(format!(
                "entry {} belongs to shortlist {} owned by user {}",
                entry_id, entry.shortlist_id, owner_id
            )));
        }
        Ok(entry)
    }
}
