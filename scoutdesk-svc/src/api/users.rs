//! User administration endpoints (level 3)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch},
    Extension, Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::identity::{Actor, NewUser, User};
use crate::{ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct SetActive {
    pub active: bool,
}

/// GET /api/users
pub async fn list_users(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(state.identity.list_users(&actor).await?))
}

/// POST /api/users
pub async fn create_user(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(body): Json<NewUser>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user = state.identity.create_user(&actor, body).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// PATCH /api/users/:id
pub async fn set_user_active(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(user_id): Path<i64>,
    Json(body): Json<SetActive>,
) -> ApiResult<Json<Value>> {
    state
        .identity
        .set_user_active(&actor, user_id, body.active)
        .await?;
    Ok(Json(json!({ "id": user_id, "active": body.active })))
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list_users).post(create_user))
        .route("/api/users/:id", patch(set_user_active))
}
