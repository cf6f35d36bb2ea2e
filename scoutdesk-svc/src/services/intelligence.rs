//! Player intelligence dossiers
//!
//! One row per key: the upstream `speler_id`, or `('MANUAL', custom_naam)`
//! for players absent from the catalog. Any save replaces the content and
//! stamps author and time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::sync::Arc;
use tracing::info;

use scoutdesk_common::db::Store;
use scoutdesk_common::{time, Error, PlayerRef, Result};

use crate::cache::{Family, ReadCache};
use crate::identity::Actor;

/// Stored `speler_id` for dossiers on manually named players
pub const MANUAL_PLAYER_ID: &str = "MANUAL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dossier {
    pub id: i64,
    pub player: PlayerRef,
    #[serde(flatten)]
    pub content: DossierPayload,
    pub author_name: String,
    pub last_updated: DateTime<Utc>,
}

/// Free-text dossier content; absent fields save as empty text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DossierPayload {
    pub club_info: String,
    pub family_background: String,
    pub personality: String,
    pub agent_details: String,
    pub instagram_url: String,
    pub twitter_url: String,
    pub transfermarkt_url: String,
    pub other_url: String,
}

/// Stored key columns for a player reference
fn key_columns(player: &PlayerRef) -> (&str, Option<&str>) {
    match player {
        PlayerRef::Known(id) => (id.as_str(), None),
        PlayerRef::Custom(name) => (MANUAL_PLAYER_ID, Some(name.as_str())),
    }
}

fn dossier_from_row(row: &SqliteRow) -> Result<Dossier> {
    let speler_id: String = row.try_get("speler_id")?;
    let custom: Option<String> = row.try_get("custom_naam")?;
    let player = match custom.filter(|c| !c.trim().is_empty()) {
        Some(name) if speler_id == MANUAL_PLAYER_ID => PlayerRef::Custom(name),
        _ => PlayerRef::Known(speler_id),
    };

    Ok(Dossier {
        id: row.try_get("id")?,
        player,
        content: DossierPayload {
            club_info: row.try_get("club_informatie")?,
            family_background: row.try_get("familie_achtergrond")?,
            personality: row.try_get("persoonlijkheid")?,
            agent_details: row.try_get("makelaar_details")?,
            instagram_url: row.try_get("instagram_url")?,
            twitter_url: row.try_get("twitter_url")?,
            transfermarkt_url: row.try_get("transfermarkt_url")?,
            other_url: row.try_get("overige_url")?,
        },
        author_name: row.try_get("toegevoegd_door")?,
        last_updated: time::from_db(&row.try_get::<String, _>("laatst_bijgewerkt")?)?,
    })
}

const DOSSIER_COLUMNS: &str = r#"
    id, speler_id, custom_naam, club_informatie, familie_achtergrond, persoonlijkheid,
    makelaar_details, instagram_url, twitter_url, transfermarkt_url, overige_url,
    toegevoegd_door, laatst_bijgewerkt
"#;

#[derive(Clone)]
pub struct IntelligenceService {
    store: Store,
    cache: Arc<ReadCache>,
}

impl IntelligenceService {
    pub fn new(store: Store, cache: Arc<ReadCache>) -> Self {
        Self { store, cache }
    }

    /// Create or replace the dossier for `player`
    ///
    /// **Algorithm:**
    /// 1. Derive the key columns (`speler_id` or `MANUAL` + custom name)
    /// 2. In one transaction: look the key up, UPDATE or INSERT
    /// 3. Stamp `author = actor.name`, `last_updated = now`
    /// 4. Invalidate cached dossier reads
    pub async fn upsert_dossier(
        &self,
        actor: &Actor,
        player: &PlayerRef,
        payload: DossierPayload,
    ) -> Result<Dossier> {
        let (speler_id, custom_naam) = key_columns(player);
        let now = time::now_db();

        let mut tx = self.store.begin().await?;

        let existing: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM speler_intelligence WHERE speler_id = ? AND COALESCE(custom_naam, '') = ?",
        )
        .bind(speler_id)
        .bind(custom_naam.unwrap_or(""))
        .fetch_optional(&mut *tx)
        .await?;

        let id = match existing {
            Some(id) => {
                sqlx::query(
                    r#"
                    UPDATE speler_intelligence SET
                        club_informatie = ?, familie_achtergrond = ?, persoonlijkheid = ?,
                        makelaar_details = ?, instagram_url = ?, twitter_url = ?,
                        transfermarkt_url = ?, overige_url = ?,
                        toegevoegd_door = ?, laatst_bijgewerkt = ?
                    WHERE id = ?
                    "#,
                )
                .bind(&payload.club_info)
                .bind(&payload.family_background)
                .bind(&payload.personality)
                .bind(&payload.agent_details)
                .bind(&payload.instagram_url)
                .bind(&payload.twitter_url)
                .bind(&payload.transfermarkt_url)
                .bind(&payload.other_url)
                .bind(&actor.name)
                .bind(&now)
                .bind(id)
                .execute(&mut *tx)
                .await?;
                id
            }
            None => sqlx::query(
                r#"
                INSERT INTO speler_intelligence (
                    speler_id, custom_naam, club_informatie, familie_achtergrond, persoonlijkheid,
                    makelaar_details, instagram_url, twitter_url, transfermarkt_url, overige_url,
                    toegevoegd_door, laatst_bijgewerkt
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(speler_id)
            .bind(custom_naam)
            .bind(&payload.club_info)
            .bind(&payload.family_background)
            .bind(&payload.personality)
            .bind(&payload.agent_details)
            .bind(&payload.instagram_url)
            .bind(&payload.twitter_url)
            .bind(&payload.transfermarkt_url)
            .bind(&payload.other_url)
            .bind(&actor.name)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::from_write(e, "dossier for this player"))?
            .last_insert_rowid(),
        };

        let row = sqlx::query(&format!(
            "SELECT {} FROM speler_intelligence WHERE id = ?",
            DOSSIER_COLUMNS
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        let dossier = dossier_from_row(&row)?;
        tx.commit().await?;

        self.cache.invalidate(Family::Intelligence).await;
        info!(
            actor = actor.user_id,
            dossier_id = id,
            player = player.key(),
            created = existing.is_none(),
            "Dossier saved"
        );
        Ok(dossier)
    }

    /// The dossier for `player`, if any
    pub async fn get_dossier(&self, player: &PlayerRef) -> Result<Option<Dossier>> {
        let cache_key = serde_json::to_string(player).unwrap_or_default();
        if let Some(dossier) = self.cache.get::<Option<Dossier>>(Family::Intelligence, &cache_key).await {
            return Ok(dossier);
        }

        let (speler_id, custom_naam) = key_columns(player);
        let row = sqlx::query(&format!(
            "SELECT {} FROM speler_intelligence WHERE speler_id = ? AND COALESCE(custom_naam, '') = ?",
            DOSSIER_COLUMNS
        ))
        .bind(speler_id)
        .bind(custom_naam.unwrap_or(""))
        .fetch_optional(self.store.pool())
        .await?;
        let dossier = row.as_ref().map(dossier_from_row).transpose()?;

        self.cache.put(Family::Intelligence, &cache_key, &dossier).await;
        Ok(dossier)
    }

    /// All dossiers, most recently updated first
    pub async fn list_dossiers(&self) -> Result<Vec<Dossier>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM speler_intelligence ORDER BY laatst_bijgewerkt DESC, id DESC",
            DOSSIER_COLUMNS
        ))
        .fetch_all(self.store.pool())
        .await?;
        rows.iter().map(dossier_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::AccessLevel;
    use scoutdesk_common::db::init_memory_database;
    use std::time::Duration;

    async fn service() -> IntelligenceService {
        let store = Store::new(init_memory_database().await.unwrap());
        IntelligenceService::new(store, Arc::new(ReadCache::new(Duration::from_secs(30))))
    }

    fn actor(name: &str) -> Actor {
        Actor::new(3, name, AccessLevel::Scout)
    }

    #[tokio::test]
    async fn test_second_save_replaces_content() {
        let svc = service().await;
        let player = PlayerRef::Known("123".into());

        let first = svc
            .upsert_dossier(
                &actor("Anna"),
                &player,
                DossierPayload {
                    personality: "Rustig".into(),
                    ..DossierPayload::default()
                },
            )
            .await
            .unwrap();

        // Prime the cache, then check the write invalidates it
        assert!(svc.get_dossier(&player).await.unwrap().is_some());

        let second = svc
            .upsert_dossier(
                &actor("Bram"),
                &player,
                DossierPayload {
                    club_info: "Contract tot 2026".into(),
                    ..DossierPayload::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.author_name, "Bram");
        assert_eq!(second.content.personality, "");
        assert!(second.last_updated >= first.last_updated);

        let read = svc.get_dossier(&player).await.unwrap().unwrap();
        assert_eq!(read.content.club_info, "Contract tot 2026");
        assert_eq!(svc.list_dossiers().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_manual_dossiers_keyed_by_name() {
        let svc = service().await;
        let kid = PlayerRef::Custom("Unknown Kid".into());
        let other = PlayerRef::Custom("Other Kid".into());

        svc.upsert_dossier(&actor("Anna"), &kid, DossierPayload::default()).await.unwrap();
        svc.upsert_dossier(&actor("Anna"), &other, DossierPayload::default()).await.unwrap();
        svc.upsert_dossier(&actor("Anna"), &kid, DossierPayload::default()).await.unwrap();

        assert_eq!(svc.list_dossiers().await.unwrap().len(), 2);
        let read = svc.get_dossier(&kid).await.unwrap().unwrap();
        assert_eq!(read.player, kid);
    }

    #[tokio::test]
    async fn test_absent_dossier_is_none() {
        let svc = service().await;
        assert!(svc
            .get_dossier(&PlayerRef::Known("999".into()))
            .await
            .unwrap()
            .is_none());
    }
}
