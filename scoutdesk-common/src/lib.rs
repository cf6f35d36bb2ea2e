//! # scoutdesk common library
//!
//! Shared code for the scouting workbench back end:
//! - Error type with the stable error kinds surfaced to callers
//! - Configuration resolution (CLI → ENV → TOML → defaults)
//! - Database bootstrap and the Store query/command gateway
//! - Dual-identity references (`PlayerRef`, `MatchRef`)
//! - Timestamp helpers

pub mod config;
pub mod db;
pub mod error;
pub mod refs;
pub mod time;

pub use error::{Error, Result};
pub use refs::{MatchRef, PlayerRef};
