//! Intelligence dossier endpoints

use axum::{
    extract::{Query, State},
    routing::get,
    Extension, Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use scoutdesk_common::PlayerRef;

use crate::identity::Actor;
use crate::services::{Dossier, DossierPayload};
use crate::{ApiResult, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct DossierQuery {
    pub player_id: Option<String>,
    pub custom_naam: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DossierRequest {
    pub player_id: Option<String>,
    pub custom_naam: Option<String>,
    #[serde(flatten)]
    pub content: DossierPayload,
}

/// GET /api/intelligence
///
/// With `player_id` or `custom_naam`: `{"dossier": ... | null}`.
/// Without: every dossier, most recently updated first.
pub async fn get_intelligence(
    State(state): State<AppState>,
    Query(query): Query<DossierQuery>,
) -> ApiResult<Json<Value>> {
    if query.player_id.is_none() && query.custom_naam.is_none() {
        let dossiers = state.intelligence.list_dossiers().await?;
        return Ok(Json(json!({ "dossiers": dossiers })));
    }
    let player = PlayerRef::from_columns(query.player_id, query.custom_naam)?;
    let dossier = state.intelligence.get_dossier(&player).await?;
    Ok(Json(json!({ "dossier": dossier })))
}

/// PUT /api/intelligence
pub async fn put_intelligence(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(body): Json<DossierRequest>,
) -> ApiResult<Json<Dossier>> {
    let player = PlayerRef::from_columns(body.player_id, body.custom_naam)?;
    Ok(Json(
        state
            .intelligence
            .upsert_dossier(&actor, &player, body.content)
            .await?,
    ))
}

pub fn intelligence_routes() -> Router<AppState> {
    Router::new().route("/api/intelligence", get(get_intelligence).put(put_intelligence))
}
