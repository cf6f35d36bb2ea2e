//! Database bootstrap and the Store gateway

pub mod init;
pub mod schema;
pub mod store;

pub use init::*;
pub use schema::LEGACY_MATCH_NAME;
pub use store::{Param, Store, Table};
