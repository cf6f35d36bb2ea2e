//! Learned legacy name → player id mapping
//!
//! Append-with-overwrite: saving a name that is already mapped replaces the
//! player id (last writer wins).

use sqlx::{Executor, Row, Sqlite};
use std::collections::HashMap;

use scoutdesk_common::db::Store;
use scoutdesk_common::Result;

/// Full mapping as stored
pub async fn load_name_memory(store: &Store) -> Result<HashMap<String, String>> {
    let rows = sqlx::query("SELECT legacy_name, speler_id FROM legacy_names_map")
        .fetch_all(store.pool())
        .await?;

    rows.iter()
        .map(|row| Ok((row.try_get("legacy_name")?, row.try_get("speler_id")?)))
        .collect()
}

/// Upsert one mapping on any executor (pool or open transaction)
pub async fn upsert_mapping<'e, E>(executor: E, legacy_name: &str, player_id: &str) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO legacy_names_map (legacy_name, speler_id) VALUES (?, ?)
        ON CONFLICT(legacy_name) DO UPDATE SET speler_id = excluded.speler_id
        "#,
    )
    .bind(legacy_name)
    .bind(player_id)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn save_new_mapping(store: &Store, legacy_name: &str, player_id: &str) -> Result<()> {
    upsert_mapping(store.pool(), legacy_name, player_id).await
}
