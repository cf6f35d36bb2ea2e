//! Offered players
//!
//! Every offer is a new row; history is never rewritten. The newest row per
//! player (by `aangeboden_datum`, then id) is the current offer state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use scoutdesk_common::db::Store;
use scoutdesk_common::{time, Error, Result};

use crate::cache::{Family, ReadCache};
use crate::identity::Actor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OfferStatus {
    Nieuw,
    Interessant,
    Afgekeurd,
}

impl OfferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OfferStatus::Nieuw => "Nieuw",
            OfferStatus::Interessant => "Interessant",
            OfferStatus::Afgekeurd => "Afgekeurd",
        }
    }

    /// Display colour of the status badge
    pub fn colour(&self) -> &'static str {
        match self {
            OfferStatus::Nieuw => "amber",
            OfferStatus::Interessant => "green",
            OfferStatus::Afgekeurd => "red",
        }
    }
}

impl fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OfferStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Nieuw" => Ok(OfferStatus::Nieuw),
            "Interessant" => Ok(OfferStatus::Interessant),
            "Afgekeurd" => Ok(OfferStatus::Afgekeurd),
            other => Err(Error::Validation(format!("unknown offer status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub id: i64,
    pub player_id: String,
    pub agent: String,
    pub asking_price: Option<f64>,
    pub status: OfferStatus,
    pub colour: String,
    pub remarks: String,
    pub offered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OfferPayload {
    pub player_id: String,
    pub agent: String,
    #[serde(default)]
    pub asking_price: Option<f64>,
    pub status: OfferStatus,
    #[serde(default)]
    pub remarks: String,
    /// Defaults to now
    #[serde(default)]
    pub offered_at: Option<DateTime<Utc>>,
}

const OFFER_COLUMNS: &str =
    "id, player_id, makelaar, vraagprijs, status, opmerkingen, aangeboden_datum";

fn offer_from_row(row: &SqliteRow) -> Result<Offer> {
    let status: OfferStatus = row.try_get::<String, _>("status")?.parse()?;
    Ok(Offer {
        id: row.try_get("id")?,
        player_id: row.try_get("player_id")?,
        agent: row.try_get("makelaar")?,
        asking_price: row.try_get("vraagprijs")?,
        colour: status.colour().to_string(),
        status,
        remarks: row.try_get("opmerkingen")?,
        offered_at: time::from_db(&row.try_get::<String, _>("aangeboden_datum")?)?,
    })
}

#[derive(Clone)]
pub struct OffersService {
    store: Store,
    cache: Arc<ReadCache>,
}

impl OffersService {
    pub fn new(store: Store, cache: Arc<ReadCache>) -> Self {
        Self { store, cache }
    }

    /// Append a new offer row
    pub async fn record_offer(&self, actor: &Actor, payload: OfferPayload) -> Result<Offer> {
        let player_id = payload.player_id.trim();
        if player_id.is_empty() {
            return Err(Error::Validation("player_id is required".to_string()));
        }
        let agent = payload.agent.trim();
        if agent.is_empty() {
            return Err(Error::Validation("agent must not be empty".to_string()));
        }
        if let Some(price) = payload.asking_price {
            if !price.is_finite() || price < 0.0 {
                return Err(Error::Validation(format!(
                    "asking_price must be a non-negative amount (got {})",
                    price
                )));
            }
        }
        let offered_at = payload.offered_at.unwrap_or_else(time::now);

        let id = sqlx::query(
            r#"
            INSERT INTO offered_players (player_id, makelaar, vraagprijs, status, opmerkingen, aangeboden_datum)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(player_id)
        .bind(agent)
        .bind(payload.asking_price)
        .bind(payload.status.as_str())
        .bind(&payload.remarks)
        .bind(time::to_db(offered_at))
        .execute(self.store.pool())
        .await?
        .last_insert_rowid();

        self.cache.invalidate(Family::Offers).await;
        info!(
            actor = actor.user_id,
            offer_id = id,
            player_id,
            status = %payload.status,
            "Offer recorded"
        );

        let row = sqlx::query(&format!("SELECT {} FROM offered_players WHERE id = ?", OFFER_COLUMNS))
            .bind(id)
            .fetch_one(self.store.pool())
            .await?;
        offer_from_row(&row)
    }

    /// Most recent offer for a player
    pub async fn current_offer(&self, player_id: &str) -> Result<Option<Offer>> {
        if let Some(offer) = self.cache.get::<Option<Offer>>(Family::Offers, player_id).await {
            return Ok(offer);
        }

        let row = sqlx::query(&format!(
            r#"
            SELECT {} FROM offered_players
            WHERE player_id = ?
            ORDER BY aangeboden_datum DESC, id DESC
            LIMIT 1
            "#,
            OFFER_COLUMNS
        ))
        .bind(player_id)
        .fetch_optional(self.store.pool())
        .await?;
        let offer = row.as_ref().map(offer_from_row).transpose()?;

        self.cache.put(Family::Offers, player_id, &offer).await;
        Ok(offer)
    }

    /// Full history for a player, newest first
    pub async fn offer_history(&self, player_id: &str) -> Result<Vec<Offer>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM offered_players WHERE player_id = ? ORDER BY aangeboden_datum DESC, id DESC",
            OFFER_COLUMNS
        ))
        .bind(player_id)
        .fetch_all(self.store.pool())
        .await?;
        rows.iter().map(offer_from_row).collect()
    }

    /// Latest row per player, newest first
    pub async fn list_current_offers(&self) -> Result<Vec<Offer>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM offered_players o
            WHERE o.id = (
                SELECT i.id FROM offered_players i
                WHERE i.player_id = o.player_id
                ORDER BY i.aangeboden_datum DESC, i.id DESC
                LIMIT 1
            )
            ORDER BY o.aangeboden_datum DESC, o.id DESC
            "#,
            OFFER_COLUMNS
        ))
        .fetch_all(self.store.pool())
        .await?;
        rows.iter().map(offer_from_row).collect()
    }
}
