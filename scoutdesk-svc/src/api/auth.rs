//! Sessions: login, logout and the bearer-token middleware
//!
//! A login issues an opaque token held in memory until logout or until it
//! sits unused past the idle limit. Every protected request re-reads the
//! user so that deactivation takes effect immediately.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
    routing::post,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::identity::{Actor, User};
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

fn bearer_token(request: &Request) -> Option<String> {
    let value = request.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Authentication middleware
///
/// Resolves the bearer token to an `Actor` and stores it in the request
/// extensions. Unknown tokens and inactive users get 401.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&request)
        .ok_or_else(|| ApiError::Unauthenticated("missing bearer token".to_string()))?;

    let actor = state
        .sessions
        .get(&token)
        .await
        .ok_or_else(|| ApiError::Unauthenticated("unknown or expired session".to_string()))?;

    let active = state
        .identity
        .get_user(actor.user_id)
        .await?
        .map(|u| u.active)
        .unwrap_or(false);
    if !active {
        state.sessions.remove(&token).await;
        warn!(user_id = actor.user_id, "Session dropped for inactive user");
        return Err(ApiError::Unauthenticated("user is not active".to_string()));
    }

    request.extensions_mut().insert(SessionToken(token));
    request.extensions_mut().insert(actor);
    Ok(next.run(request).await)
}

#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

/// POST /api/login
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let user = state
        .identity
        .authenticate(&body.email, &body.password)
        .await?
        .ok_or_else(|| ApiError::Unauthenticated("invalid email or password".to_string()))?;

    let token = Uuid::new_v4().simple().to_string();
    state
        .sessions
        .insert(token.clone(), Actor::from(&user))
        .await;

    info!(user_id = user.id, level = user.level as i64, "User logged in");
    Ok(Json(LoginResponse { token, user }))
}

/// POST /api/logout
pub async fn logout(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(SessionToken(token)): Extension<SessionToken>,
) -> Json<serde_json::Value> {
    state.sessions.remove(&token).await;
    info!(user_id = actor.user_id, "User logged out");
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /api/me
pub async fn whoami(Extension(actor): Extension<Actor>) -> Json<Actor> {
    Json(actor)
}

pub fn login_routes() -> Router<AppState> {
    Router::new().route("/api/login", post(login))
}

pub fn session_routes() -> Router<AppState> {
    use axum::routing::get;

    Router::new()
        .route("/api/logout", post(logout))
        .route("/api/me", get(whoami))
}
