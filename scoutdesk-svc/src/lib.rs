//! scoutdesk-svc library - scouting domain services and HTTP surface
//!
//! Exposes the services for integration testing and the router used by the
//! `scoutdesk` binary.

pub mod api;
pub mod cache;
pub mod catalog;
pub mod error;
pub mod identity;
pub mod legacy;
pub mod options;
pub mod services;
pub mod sessions;
pub mod visibility;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use scoutdesk_common::config::ServiceConfig;
use scoutdesk_common::db::Store;

use crate::cache::ReadCache;
use crate::catalog::Catalog;
use crate::identity::{Actor, IdentityService};
use crate::legacy::{LegacyIngest, LegacyRun};
use crate::options::OptionService;
use crate::services::{IntelligenceService, OffersService, ReportService, ShortlistService};
use crate::sessions::IdleMap;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub identity: IdentityService,
    pub catalog: Catalog,
    pub options: OptionService,
    pub reports: ReportService,
    pub intelligence: IntelligenceService,
    pub offers: OffersService,
    pub shortlists: ShortlistService,
    pub legacy: LegacyIngest,
    /// Bearer token → acting user
    pub sessions: Arc<IdleMap<String, Actor>>,
    /// Legacy ingest runs in progress
    pub legacy_runs: Arc<IdleMap<Uuid, Arc<Mutex<LegacyRun>>>>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(store: Store, config: &ServiceConfig) -> Self {
        let cache = Arc::new(ReadCache::with_capacity(
            Duration::from_secs(config.cache_ttl_secs),
            config.cache_capacity,
        ));
        let identity = IdentityService::new(store.clone());
        let catalog = Catalog::new(store.clone());
        let options = OptionService::new(store.clone(), cache.clone());

        Self {
            reports: ReportService::new(store.clone(), options.clone(), catalog.clone(), cache.clone()),
            intelligence: IntelligenceService::new(store.clone(), cache.clone()),
            offers: OffersService::new(store.clone(), cache.clone()),
            shortlists: ShortlistService::new(store.clone(), identity.clone(), cache.clone()),
            legacy: LegacyIngest::new(
                store.clone(),
                catalog.clone(),
                identity.clone(),
                options.clone(),
                cache,
                config.fallback_scout_id,
            ),
            store,
            identity,
            catalog,
            options,
            sessions: Arc::new(IdleMap::new(
                "sessions",
                Duration::from_secs(config.session_idle_secs),
            )),
            legacy_runs: Arc::new(IdleMap::new(
                "legacy_runs",
                Duration::from_secs(config.legacy_run_idle_secs),
            )),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
///
/// `/health` and `/api/login` are public; everything else requires a
/// bearer session.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;

    let protected = Router::new()
        .merge(api::report_routes())
        .merge(api::intelligence_routes())
        .merge(api::offer_routes())
        .merge(api::shortlist_routes())
        .merge(api::user_routes())
        .merge(api::catalog_routes())
        .merge(api::legacy_routes())
        .merge(api::session_routes())
        .layer(middleware::from_fn_with_state(state.clone(), api::auth_middleware));

    let public = Router::new()
        .merge(api::health_routes())
        .merge(api::login_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
