//! Legacy ingest endpoints
//!
//! Runs live in memory, keyed by UUID, and may only be driven by the user
//! who started them. A run left untouched past the idle limit is dropped.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use scoutdesk_common::Error;

use crate::catalog::PlayerHit;
use crate::identity::Actor;
use crate::legacy::{read_legacy_str, Decision, LegacyRun, PendingRow, Resolution, RunSummary};
use crate::{ApiResult, AppState};

#[derive(Debug, Serialize)]
pub struct RunStarted {
    pub run_id: Uuid,
    pub summary: RunSummary,
}

#[derive(Debug, Serialize)]
pub struct RunState {
    pub run_id: Uuid,
    pub summary: RunSummary,
    pub current: Option<PendingRow>,
}

#[derive(Debug, Serialize)]
pub struct RunStep {
    pub resolution: Resolution,
    pub summary: RunSummary,
    pub next: Option<PendingRow>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

async fn owned_run(state: &AppState, actor: &Actor, run_id: Uuid) -> ApiResult<Arc<Mutex<LegacyRun>>> {
    let run = state
        .legacy_runs
        .get(&run_id)
        .await
        .ok_or_else(|| Error::NotFound(format!("legacy run {}", run_id)))?;

    let started_by = run.lock().await.started_by();
    if started_by != actor.user_id {
        return Err(Error::Auth(format!("legacy run {} belongs to user {}", run_id, started_by)).into());
    }
    Ok(run)
}

/// POST /api/legacy/runs (body: CSV text)
pub async fn start_run(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    body: String,
) -> ApiResult<(StatusCode, Json<RunStarted>)> {
    let rows = read_legacy_str(&body)?;
    let run = state.legacy.start(&actor, rows).await?;
    let summary = run.summary();

    let run_id = Uuid::new_v4();
    state
        .legacy_runs
        .insert(run_id, Arc::new(Mutex::new(run)))
        .await;
    info!(%run_id, actor = actor.user_id, "Legacy run registered");

    Ok((StatusCode::CREATED, Json(RunStarted { run_id, summary })))
}

/// GET /api/legacy/runs/:id
pub async fn get_run(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(run_id): Path<Uuid>,
) -> ApiResult<Json<RunState>> {
    let run = owned_run(&state, &actor, run_id).await?;
    let mut run = run.lock().await;
    let current = run.current().await?;
    Ok(Json(RunState {
        run_id,
        summary: run.summary(),
        current,
    }))
}

/// DELETE /api/legacy/runs/:id
pub async fn drop_run(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(run_id): Path<Uuid>,
) -> ApiResult<Json<RunSummary>> {
    let run = owned_run(&state, &actor, run_id).await?;
    state.legacy_runs.remove(&run_id).await;
    let summary = run.lock().await.summary();
    Ok(Json(summary))
}

/// GET /api/legacy/runs/:id/search?q=
pub async fn search_run(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(run_id): Path<Uuid>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<PlayerHit>>> {
    let run = owned_run(&state, &actor, run_id).await?;
    let hits = run.lock().await.search(&query.q).await;
    Ok(Json(hits))
}

/// POST /api/legacy/runs/:id/resolve
pub async fn resolve_row(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(run_id): Path<Uuid>,
    Json(decision): Json<Decision>,
) -> ApiResult<Json<RunStep>> {
    let run = owned_run(&state, &actor, run_id).await?;
    let mut run = run.lock().await;
    let resolution = run.resolve(decision).await?;
    let next = run.current().await?;
    Ok(Json(RunStep {
        resolution,
        summary: run.summary(),
        next,
    }))
}

pub fn legacy_routes() -> Router<AppState> {
    Router::new()
        .route("/api/legacy/runs", post(start_run))
        .route("/api/legacy/runs/:id", get(get_run).delete(drop_run))
        .route("/api/legacy/runs/:id/search", get(search_run))
        .route("/api/legacy/runs/:id/resolve", post(resolve_row))
}
