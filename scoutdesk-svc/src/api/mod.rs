//! HTTP API handlers for scoutdesk

pub mod auth;
pub mod catalog;
pub mod health;
pub mod intelligence;
pub mod legacy;
pub mod offers;
pub mod reports;
pub mod shortlists;
pub mod users;

pub use auth::{auth_middleware, login_routes, session_routes};
pub use catalog::catalog_routes;
pub use health::health_routes;
pub use intelligence::intelligence_routes;
pub use legacy::legacy_routes;
pub use offers::offer_routes;
pub use reports::report_routes;
pub use shortlists::shortlist_routes;
pub use users::user_routes;
