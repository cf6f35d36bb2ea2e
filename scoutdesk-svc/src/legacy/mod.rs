//! Legacy ingest
//!
//! Turns historical report files into `rapporten` rows through an
//! interactive run, learning `legacy spelling → player id` as it goes.

pub mod fingerprint;
pub mod mapping;
pub mod name_map;
pub mod run;
pub mod source;

pub use name_map::{load_name_memory, save_new_mapping};
pub use run::{
    Decision, LegacyIngest, LegacyRun, PendingRow, PlayerChoice, Resolution, RunSummary,
};
pub use source::{read_legacy_rows, read_legacy_str, LegacyRow};
