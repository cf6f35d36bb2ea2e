//! Match reports
//!
//! A report is keyed by `(scout_id, player_ref, match_ref)`. Saving the same
//! key again overwrites the editable fields in place, so per key the
//! lifecycle is: absent → draft (UI only) → stored → stored.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::info;

use scoutdesk_common::db::Store;
use scoutdesk_common::{time, Error, MatchRef, PlayerRef, Result};

use crate::cache::{Family, ReadCache};
use crate::catalog::{Catalog, TeamSide};
use crate::identity::Actor;
use crate::options::{OptionService, OptionSets};
use crate::visibility::{scope_for, Artifact};

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 10;

/// Stored match report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
    pub id: i64,
    pub scout_id: i64,
    pub player: PlayerRef,
    pub match_ref: MatchRef,
    pub competition_id: Option<String>,
    pub position_played: String,
    pub profile_code: Option<String>,
    pub verdict: String,
    pub rating: i64,
    pub text: String,
    pub golden_buzzer: bool,
    pub shortlist_id: Option<i64>,
    pub player_height_cm: Option<i64>,
    pub contract_end: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Editable fields plus the references that form the natural key
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportPayload {
    /// Edit a specific stored report instead of resolving by natural key
    #[serde(default)]
    pub report_id: Option<i64>,
    pub player_id: Option<String>,
    pub custom_player_name: Option<String>,
    pub match_id: Option<String>,
    pub custom_match_name: Option<String>,
    pub competition_id: Option<String>,
    pub position_played: String,
    pub profile_code: Option<String>,
    pub verdict: String,
    pub rating: i64,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub golden_buzzer: bool,
    pub shortlist_id: Option<i64>,
    pub player_height_cm: Option<i64>,
    pub contract_end: Option<NaiveDate>,
}

/// Result of `upsert_report`
#[derive(Debug, Clone, Serialize)]
pub struct UpsertOutcome {
    pub report: MatchReport,
    pub created: bool,
}

/// Existing report or an empty draft for the editor
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ReportDraft {
    Stored { report: MatchReport },
    Blank { player: PlayerRef, match_ref: MatchRef },
}

/// Listing filter; all parts optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportFilter {
    pub player: Option<PlayerRef>,
    pub match_ref: Option<MatchRef>,
    pub scout_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerSource {
    /// From the provider's match roster
    Official,
    /// Only known from stored reports on this match
    Reported,
}

/// One line of the "who played in this match" list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchPlayer {
    pub player: PlayerRef,
    pub name: String,
    pub source: PlayerSource,
    pub side: Option<TeamSide>,
    pub shirt_number: Option<i64>,
    pub starter: bool,
    pub position: Option<String>,
    pub report_count: i64,
}

/// Validated, normalised form of a payload
#[derive(Debug, Clone)]
pub(crate) struct ValidReport {
    pub player: PlayerRef,
    pub match_ref: MatchRef,
    pub competition_id: Option<String>,
    pub position_played: String,
    pub profile_code: Option<String>,
    pub verdict: String,
    pub rating: i64,
    pub text: String,
    pub golden_buzzer: bool,
    pub shortlist_id: Option<i64>,
    pub player_height_cm: Option<i64>,
    pub contract_end: Option<NaiveDate>,
}

pub(crate) fn validate_rating(rating: i64) -> Result<i64> {
    if (MIN_RATING..=MAX_RATING).contains(&rating) {
        Ok(rating)
    } else {
        Err(Error::Validation(format!(
            "rating must be between {} and {} (got {})",
            MIN_RATING, MAX_RATING, rating
        )))
    }
}

pub(crate) fn validate_payload(payload: &ReportPayload, options: &OptionSets) -> Result<ValidReport> {
    let player = PlayerRef::from_columns(payload.player_id.clone(), payload.custom_player_name.clone())?;
    let match_ref = MatchRef::from_columns(payload.match_id.clone(), payload.custom_match_name.clone())?;
    let rating = validate_rating(payload.rating)?;

    let verdict = payload.verdict.trim().to_string();
    if !options.verdicts.contains(&verdict) {
        return Err(Error::Validation(format!(
            "verdict '{}' is not one of {:?}",
            verdict,
            options.verdicts.values()
        )));
    }

    let position_played = payload.position_played.trim().to_string();
    if !options.positions.contains(&position_played) {
        return Err(Error::Validation(format!(
            "position_played '{}' is not one of {:?}",
            position_played,
            options.positions.values()
        )));
    }

    if let Some(height) = payload.player_height_cm {
        if !(100..=230).contains(&height) {
            return Err(Error::Validation(format!("implausible player height: {} cm", height)));
        }
    }

    Ok(ValidReport {
        player,
        match_ref,
        competition_id: non_blank(payload.competition_id.as_deref()),
        position_played,
        profile_code: non_blank(payload.profile_code.as_deref()),
        verdict,
        rating,
        text: payload.text.clone(),
        golden_buzzer: payload.golden_buzzer,
        shortlist_id: payload.shortlist_id,
        player_height_cm: payload.player_height_cm,
        contract_end: payload.contract_end,
    })
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

const REPORT_COLUMNS: &str = r#"
    id, scout_id, speler_id, custom_speler_naam, wedstrijd_id, custom_wedstrijd_naam,
    competitie_id, positie_gespeeld, profiel_code, advies, beoordeling, rapport_tekst,
    gouden_buzzer, shortlist_id, speler_lengte, contract_einde, aangemaakt_op, bijgewerkt_op
"#;

fn report_from_row(row: &SqliteRow) -> Result<MatchReport> {
    Ok(MatchReport {
        id: row.try_get("id")?,
        scout_id: row.try_get("scout_id")?,
        player: PlayerRef::from_columns(row.try_get("speler_id")?, row.try_get("custom_speler_naam")?)?,
        match_ref: MatchRef::from_columns(
            row.try_get("wedstrijd_id")?,
            row.try_get("custom_wedstrijd_naam")?,
        )?,
        competition_id: row.try_get("competitie_id")?,
        position_played: row.try_get("positie_gespeeld")?,
        profile_code: row.try_get("profiel_code")?,
        verdict: row.try_get("advies")?,
        rating: row.try_get("beoordeling")?,
        text: row.try_get("rapport_tekst")?,
        golden_buzzer: row.try_get("gouden_buzzer")?,
        shortlist_id: row.try_get("shortlist_id")?,
        player_height_cm: row.try_get("speler_lengte")?,
        contract_end: row
            .try_get::<Option<String>, _>("contract_einde")?
            .map(|d| {
                NaiveDate::parse_from_str(&d, "%Y-%m-%d")
                    .map_err(|e| Error::Internal(format!("Invalid contract_einde '{}': {}", d, e)))
            })
            .transpose()?,
        created_at: time::from_db(&row.try_get::<String, _>("aangemaakt_op")?)?,
        updated_at: time::from_db_opt(row.try_get("bijgewerkt_op")?)?,
    })
}

pub(crate) async fn fetch_report<'e, E>(executor: E, report_id: i64) -> Result<Option<MatchReport>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(&format!("SELECT {} FROM rapporten WHERE id = ?", REPORT_COLUMNS))
        .bind(report_id)
        .fetch_optional(executor)
        .await?;
    row.as_ref().map(report_from_row).transpose()
}

/// Natural-key lookup: `(scout_id, coalesce(player), coalesce(match))`
async fn find_by_key<'e, E>(
    executor: E,
    scout_id: i64,
    player: &PlayerRef,
    match_ref: &MatchRef,
) -> Result<Option<i64>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let id = sqlx::query_scalar(
        r#"
        SELECT id FROM rapporten
        WHERE scout_id = ?
          AND COALESCE(speler_id, custom_speler_naam) = ?
          AND COALESCE(wedstrijd_id, custom_wedstrijd_naam) = ?
        ORDER BY id
        LIMIT 1
        "#,
    )
    .bind(scout_id)
    .bind(player.key())
    .bind(match_ref.key())
    .fetch_optional(executor)
    .await?;
    Ok(id)
}

/// Insert a validated report for `scout_id` and return its id.
///
/// Shared with the legacy ingest, which writes on behalf of the mapped scout.
pub(crate) async fn insert_report<'e, E>(
    executor: E,
    scout_id: i64,
    report: &ValidReport,
    created_at: DateTime<Utc>,
) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO rapporten (
            scout_id, speler_id, custom_speler_naam, wedstrijd_id, custom_wedstrijd_naam,
            competitie_id, positie_gespeeld, profiel_code, advies, beoordeling, rapport_tekst,
            gouden_buzzer, shortlist_id, speler_lengte, contract_einde, aangemaakt_op, bijgewerkt_op
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL)
        "#,
    )
    .bind(scout_id)
    .bind(report.player.id())
    .bind(report.player.custom_name())
    .bind(report.match_ref.id())
    .bind(report.match_ref.custom_name())
    .bind(&report.competition_id)
    .bind(&report.position_played)
    .bind(&report.profile_code)
    .bind(&report.verdict)
    .bind(report.rating)
    .bind(&report.text)
    .bind(report.golden_buzzer)
    .bind(report.shortlist_id)
    .bind(report.player_height_cm)
    .bind(report.contract_end.map(|d| d.format("%Y-%m-%d").to_string()))
    .bind(time::to_db(created_at))
    .execute(executor)
    .await
    .map_err(|e| Error::from_write(e, "report for this scout, player and match"))?;

    Ok(result.last_insert_rowid())
}

async fn update_report<'e, E>(executor: E, report_id: i64, scout_id: i64, report: &ValidReport) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        UPDATE rapporten SET
            speler_id = ?, custom_speler_naam = ?, wedstrijd_id = ?, custom_wedstrijd_naam = ?,
            competitie_id = ?, positie_gespeeld = ?, profiel_code = ?, advies = ?,
            beoordeling = ?, rapport_tekst = ?, gouden_buzzer = ?, shortlist_id = ?,
            speler_lengte = ?, contract_einde = ?, bijgewerkt_op = ?
        WHERE id = ? AND scout_id = ?
        "#,
    )
    .bind(report.player.id())
    .bind(report.player.custom_name())
    .bind(report.match_ref.id())
    .bind(report.match_ref.custom_name())
    .bind(&report.competition_id)
    .bind(&report.position_played)
    .bind(&report.profile_code)
    .bind(&report.verdict)
    .bind(report.rating)
    .bind(&report.text)
    .bind(report.golden_buzzer)
    .bind(report.shortlist_id)
    .bind(report.player_height_cm)
    .bind(report.contract_end.map(|d| d.format("%Y-%m-%d").to_string()))
    .bind(time::now_db())
    .bind(report_id)
    .bind(scout_id)
    .execute(executor)
    .await
    .map_err(|e| Error::from_write(e, "report for this scout, player and match"))?;

    Ok(())
}

#[derive(Clone)]
pub struct ReportService {
    store: Store,
    options: OptionService,
    catalog: Catalog,
    cache: Arc<ReadCache>,
}

impl ReportService {
    pub fn new(store: Store, options: OptionService, catalog: Catalog, cache: Arc<ReadCache>) -> Self {
        Self {
            store,
            options,
            catalog,
            cache,
        }
    }

    /// Create or overwrite the actor's report for `(player, match)`
    ///
    /// **Algorithm:**
    /// 1. Validate references, rating and enumerations
    /// 2. In one transaction: resolve the target row (explicit `report_id`
    ///    or natural key), enforce ownership, then UPDATE or INSERT
    /// 3. Invalidate cached report reads
    ///
    /// **Errors:** `Validation`, `Auth` (foreign report id), `NotFound`,
    /// `Conflict` (re-keying onto another stored report), `Storage`
    pub async fn upsert_report(&self, actor: &Actor, payload: ReportPayload) -> Result<UpsertOutcome> {
        let options = self.options.load_all().await;
        let report = validate_payload(&payload, &options)?;

        let mut tx = self.store.begin().await?;

        if let Some(shortlist_id) = report.shortlist_id {
            let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM shortlists WHERE id = ?")
                .bind(shortlist_id)
                .fetch_optional(&mut *tx)
                .await?;
            if exists.is_none() {
                return Err(Error::NotFound(format!("shortlist {}", shortlist_id)));
            }
        }

        let by_key = find_by_key(&mut *tx, actor.user_id, &report.player, &report.match_ref).await?;

        let target = match payload.report_id {
            Some(report_id) => {
                let owner: Option<i64> = sqlx::query_scalar("SELECT scout_id FROM rapporten WHERE id = ?")
                    .bind(report_id)
                    .fetch_optional(&mut *tx)
                    .await?;
                match owner {
                    None => return Err(Error::NotFound(format!("report {}", report_id))),
                    Some(owner) if owner != actor.user_id => {
                        return Err(Error::Auth(format!(
                            "report {} belongs to scout {}; only the owning scout may overwrite it",
                            report_id, owner
                        )))
                    }
                    Some(_) => {}
                }
                if let Some(other) = by_key.filter(|id| *id != report_id) {
                    return Err(Error::Conflict(format!(
                        "report {} already covers this player and match",
                        other
                    )));
                }
                Some(report_id)
            }
            None => by_key,
        };

        let (report_id, created) = match target {
            Some(report_id) => {
                update_report(&mut *tx, report_id, actor.user_id, &report).await?;
                (report_id, false)
            }
            None => (insert_report(&mut *tx, actor.user_id, &report, time::now()).await?, true),
        };

        let stored = fetch_report(&mut *tx, report_id)
            .await?
            .ok_or_else(|| Error::Internal(format!("report {} vanished inside transaction", report_id)))?;
        tx.commit().await?;

        self.cache.invalidate(Family::Reports).await;

        info!(
            actor = actor.user_id,
            report_id,
            created,
            player = stored.player.key(),
            match_ref = stored.match_ref.key(),
            "Report saved"
        );

        Ok(UpsertOutcome {
            report: stored,
            created,
        })
    }

    /// Read a single report inside the actor's visibility scope
    ///
    /// A report outside the scope reads as absent.
    pub async fn get_report(&self, actor: &Actor, report_id: i64) -> Result<Option<MatchReport>> {
        let scope = scope_for(actor, Artifact::MatchReport);
        Ok(fetch_report(self.store.pool(), report_id)
            .await?
            .filter(|report| scope.admits(report.scout_id)))
    }

    /// Reports visible to the actor, newest first
    pub async fn list_reports(&self, actor: &Actor, filter: &ReportFilter) -> Result<Vec<MatchReport>> {
        let owner = scope_for(actor, Artifact::MatchReport).owner_filter();
        let player_key = filter.player.as_ref().map(|p| p.key().to_string());
        let match_key = filter.match_ref.as_ref().map(|m| m.key().to_string());

        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM rapporten
            WHERE (? IS NULL OR scout_id = ?)
              AND (? IS NULL OR scout_id = ?)
              AND (? IS NULL OR COALESCE(speler_id, custom_speler_naam) = ?)
              AND (? IS NULL OR COALESCE(wedstrijd_id, custom_wedstrijd_naam) = ?)
            ORDER BY aangemaakt_op DESC, id DESC
            "#,
            REPORT_COLUMNS
        ))
        .bind(owner)
        .bind(owner)
        .bind(filter.scout_id)
        .bind(filter.scout_id)
        .bind(&player_key)
        .bind(&player_key)
        .bind(&match_key)
        .bind(&match_key)
        .fetch_all(self.store.pool())
        .await?;

        rows.iter().map(report_from_row).collect()
    }

    /// The stored report for `(actor, player, match)` or a blank draft.
    /// Drafts are never persisted here.
    pub async fn draft_for(&self, actor: &Actor, player: PlayerRef, match_ref: MatchRef) -> Result<ReportDraft> {
        match find_by_key(self.store.pool(), actor.user_id, &player, &match_ref).await? {
            Some(report_id) => {
                let report = fetch_report(self.store.pool(), report_id)
                    .await?
                    .ok_or_else(|| Error::NotFound(format!("report {}", report_id)))?;
                Ok(ReportDraft::Stored { report })
            }
            None => Ok(ReportDraft::Blank { player, match_ref }),
        }
    }

    /// Players to pick from when reporting on a match
    ///
    /// **Algorithm:**
    /// 1. Official roster from the match document (home then away; starters,
    ///    then bench, by shirt number), labelled `official`
    /// 2. Every player already reported on this match that is not on the
    ///    roster (manual names included), labelled `reported`, by name
    /// 3. Report counts attached to both groups
    pub async fn list_players_for_match(&self, match_ref: &MatchRef) -> Result<Vec<MatchPlayer>> {
        let cache_key = format!("match-players:{}", serde_json::to_string(match_ref).unwrap_or_default());
        if let Some(players) = self.cache.get::<Vec<MatchPlayer>>(Family::Reports, &cache_key).await {
            return Ok(players);
        }

        let roster = match match_ref {
            MatchRef::Known(match_id) => self.catalog.match_roster(match_id).await,
            MatchRef::Custom(_) => Vec::new(),
        };

        let reported_rows = sqlx::query(
            r#"
            SELECT speler_id, custom_speler_naam, COUNT(*) AS n
            FROM rapporten
            WHERE wedstrijd_id IS ? AND custom_wedstrijd_naam IS ?
            GROUP BY speler_id, custom_speler_naam
            "#,
        )
        .bind(match_ref.id())
        .bind(match_ref.custom_name())
        .fetch_all(self.store.pool())
        .await?;

        let mut report_counts: HashMap<PlayerRef, i64> = HashMap::new();
        for row in &reported_rows {
            let player = PlayerRef::from_columns(row.try_get("speler_id")?, row.try_get("custom_speler_naam")?)?;
            report_counts.insert(player, row.try_get("n")?);
        }

        let mut known_ids: Vec<String> = roster.iter().map(|e| e.player_id.clone()).collect();
        known_ids.extend(report_counts.keys().filter_map(|p| p.id().map(str::to_string)));
        known_ids.sort();
        known_ids.dedup();
        let names = self.catalog.player_names(&known_ids).await;

        let mut seen: HashSet<PlayerRef> = HashSet::new();
        let mut players: Vec<MatchPlayer> = Vec::new();

        for entry in roster {
            let player = PlayerRef::Known(entry.player_id.clone());
            if !seen.insert(player.clone()) {
                continue;
            }
            players.push(MatchPlayer {
                name: names.get(&entry.player_id).cloned().unwrap_or_else(|| entry.player_id.clone()),
                report_count: report_counts.get(&player).copied().unwrap_or(0),
                player,
                source: PlayerSource::Official,
                side: Some(entry.side),
                shirt_number: entry.shirt_number,
                starter: entry.starter,
                position: entry.position,
            });
        }

        let mut reported: Vec<MatchPlayer> = report_counts
            .into_iter()
            .filter(|(player, _)| !seen.contains(player))
            .map(|(player, count)| MatchPlayer {
                name: match &player {
                    PlayerRef::Known(id) => names.get(id).cloned().unwrap_or_else(|| id.clone()),
                    PlayerRef::Custom(name) => name.clone(),
                },
                player,
                source: PlayerSource::Reported,
                side: None,
                shirt_number: None,
                starter: false,
                position: None,
                report_count: count,
            })
            .collect();
        reported.sort_by(|a, b| a.name.cmp(&b.name));
        players.extend(reported);

        self.cache.put(Family::Reports, &cache_key, &players).await;
        Ok(players)
    }
}
