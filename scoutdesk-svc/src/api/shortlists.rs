//! Shortlist endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch},
    Extension, Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::identity::Actor;
use crate::services::{EntryChanges, NewEntry, Shortlist, ShortlistEntry};
use crate::{ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct CreateShortlist {
    pub name: String,
    pub owner_id: i64,
}

/// GET /api/shortlists
pub async fn list_shortlists(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<Json<Vec<Shortlist>>> {
    Ok(Json(state.shortlists.list_visible_shortlists(&actor).await?))
}

/// POST /api/shortlists
pub async fn create_shortlist(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(body): Json<CreateShortlist>,
) -> ApiResult<(StatusCode, Json<Shortlist>)> {
    let shortlist = state
        .shortlists
        .create_shortlist(&actor, &body.name, body.owner_id)
        .await?;
    Ok((StatusCode::CREATED, Json(shortlist)))
}

/// GET /api/shortlists/:id/entries
pub async fn list_entries(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(shortlist_id): Path<i64>,
) -> ApiResult<Json<Vec<ShortlistEntry>>> {
    Ok(Json(state.shortlists.list_entries(&actor, shortlist_id).await?))
}

/// POST /api/shortlists/:id/entries
pub async fn add_entry(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(shortlist_id): Path<i64>,
    Json(entry): Json<NewEntry>,
) -> ApiResult<(StatusCode, Json<ShortlistEntry>)> {
    let entry = state.shortlists.add_entry(&actor, shortlist_id, entry).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// PATCH /api/entries/:id
pub async fn update_entry(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(entry_id): Path<i64>,
    Json(changes): Json<EntryChanges>,
) -> ApiResult<Json<ShortlistEntry>> {
    Ok(Json(state.shortlists.update_entry(&actor, entry_id, changes).await?))
}

/// DELETE /api/entries/:id
pub async fn delete_entry(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(entry_id): Path<i64>,
) -> ApiResult<Json<Value>> {
    state.shortlists.delete_entry(&actor, entry_id).await?;
    Ok(Json(json!({ "deleted": entry_id })))
}

pub fn shortlist_routes() -> Router<AppState> {
    Router::new()
        .route("/api/shortlists", get(list_shortlists).post(create_shortlist))
        .route("/api/shortlists/:id/entries", get(list_entries).post(add_entry))
        .route("/api/entries/:id", patch(update_entry).delete(delete_entry))
}
