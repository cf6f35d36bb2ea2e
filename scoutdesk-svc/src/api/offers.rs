//! Offered player endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use serde::Serialize;

use crate::identity::Actor;
use crate::services::{Offer, OfferPayload};
use crate::{ApiResult, AppState};

#[derive(Debug, Serialize)]
pub struct PlayerOffers {
    pub current: Option<Offer>,
    pub history: Vec<Offer>,
}

/// GET /api/offers (latest offer per player)
pub async fn list_offers(State(state): State<AppState>) -> ApiResult<Json<Vec<Offer>>> {
    Ok(Json(state.offers.list_current_offers().await?))
}

/// POST /api/offers
pub async fn record_offer(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<OfferPayload>,
) -> ApiResult<(StatusCode, Json<Offer>)> {
    let offer = state.offers.record_offer(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(offer)))
}

/// GET /api/offers/:player_id
pub async fn player_offers(
    State(state): State<AppState>,
    Path(player_id): Path<String>,
) -> ApiResult<Json<PlayerOffers>> {
    Ok(Json(PlayerOffers {
        current: state.offers.current_offer(&player_id).await?,
        history: state.offers.offer_history(&player_id).await?,
    }))
}

pub fn offer_routes() -> Router<AppState> {
    Router::new()
        .route("/api/offers", get(list_offers).post(record_offer))
        .route("/api/offers/:player_id", get(player_offers))
}
