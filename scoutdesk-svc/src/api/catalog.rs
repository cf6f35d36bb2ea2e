//! Catalog lookups and option sets

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use scoutdesk_common::Error;

use crate::catalog::{MatchInfo, PlayerHit};
use crate::options::OptionSets;
use crate::{ApiResult, AppState};

const DEFAULT_SEARCH_LIMIT: usize = 25;
const MAX_SEARCH_LIMIT: usize = 200;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<i64>,
}

/// GET /api/players/search?q=
pub async fn search_players(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Json<Vec<PlayerHit>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_SEARCH_LIMIT)
        .clamp(1, MAX_SEARCH_LIMIT);
    Json(state.catalog.search_players(&query.q, limit).await)
}

/// GET /api/matches
pub async fn recent_matches(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> Json<Vec<MatchInfo>> {
    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    Json(state.catalog.recent_matches(limit).await)
}

/// GET /api/matches/:id
pub async fn get_match(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
) -> ApiResult<Json<MatchInfo>> {
    let info = state
        .catalog
        .get_match(&match_id)
        .await
        .ok_or_else(|| Error::NotFound(format!("match {}", match_id)))?;
    Ok(Json(info))
}

/// GET /api/options
pub async fn get_options(State(state): State<AppState>) -> Json<OptionSets> {
    Json(state.options.load_all().await)
}

pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/api/players/search", get(search_players))
        .route("/api/matches", get(recent_matches))
        .route("/api/matches/:id", get(get_match))
        .route("/api/options", get(get_options))
}
