//! Report endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use serde::Deserialize;

use scoutdesk_common::{Error, MatchRef, PlayerRef};

use crate::identity::Actor;
use crate::services::{MatchPlayer, MatchReport, ReportDraft, ReportFilter, ReportPayload, UpsertOutcome};
use crate::{ApiResult, AppState};

/// Flat query form of a player/match reference pair
#[derive(Debug, Default, Deserialize)]
pub struct RefQuery {
    pub player_id: Option<String>,
    pub custom_player_name: Option<String>,
    pub match_id: Option<String>,
    pub custom_match_name: Option<String>,
    pub scout_id: Option<i64>,
}

fn optional_player(q: &RefQuery) -> Result<Option<PlayerRef>, Error> {
    if q.player_id.is_none() && q.custom_player_name.is_none() {
        return Ok(None);
    }
    PlayerRef::from_columns(q.player_id.clone(), q.custom_player_name.clone()).map(Some)
}

fn optional_match(q: &RefQuery) -> Result<Option<MatchRef>, Error> {
    if q.match_id.is_none() && q.custom_match_name.is_none() {
        return Ok(None);
    }
    MatchRef::from_columns(q.match_id.clone(), q.custom_match_name.clone()).map(Some)
}

/// GET /api/reports
pub async fn list_reports(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<RefQuery>,
) -> ApiResult<Json<Vec<MatchReport>>> {
    let filter = ReportFilter {
        player: optional_player(&query)?,
        match_ref: optional_match(&query)?,
        scout_id: query.scout_id,
    };
    Ok(Json(state.reports.list_reports(&actor, &filter).await?))
}

/// POST /api/reports (201 on insert, 200 on overwrite)
pub async fn upsert_report(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<ReportPayload>,
) -> ApiResult<(StatusCode, Json<UpsertOutcome>)> {
    let outcome = state.reports.upsert_report(&actor, payload).await?;
    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome)))
}

/// GET /api/reports/:id
pub async fn get_report(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(report_id): Path<i64>,
) -> ApiResult<Json<MatchReport>> {
    let report = state
        .reports
        .get_report(&actor, report_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("report {}", report_id)))?;
    Ok(Json(report))
}

/// GET /api/reports/draft
pub async fn draft_report(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<RefQuery>,
) -> ApiResult<Json<ReportDraft>> {
    let player = PlayerRef::from_columns(query.player_id, query.custom_player_name)?;
    let match_ref = MatchRef::from_columns(query.match_id, query.custom_match_name)?;
    Ok(Json(state.reports.draft_for(&actor, player, match_ref).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct MatchPlayersQuery {
    /// Treat the path segment as a manual match name
    #[serde(default)]
    pub manual: bool,
}

/// GET /api/matches/:id/players
pub async fn match_players(
    State(state): State<AppState>,
    Path(match_key): Path<String>,
    Query(query): Query<MatchPlayersQuery>,
) -> ApiResult<Json<Vec<MatchPlayer>>> {
    let match_ref = if query.manual {
        MatchRef::from_columns(None, Some(match_key))?
    } else {
        MatchRef::from_columns(Some(match_key), None)?
    };
    Ok(Json(state.reports.list_players_for_match(&match_ref).await?))
}

pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/api/reports", get(list_reports).post(upsert_report))
        .route("/api/reports/draft", get(draft_report))
        .route("/api/reports/:id", get(get_report))
        .route("/api/matches/:id/players", get(match_players))
}
