//! Configuration loading
//!
//! Every setting resolves with the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing or malformed TOML file never aborts startup; it is logged and
//! the remaining tiers apply.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::{Error, Result};

pub const ENV_DATABASE: &str = "SCOUTDESK_DATABASE";
pub const ENV_BIND: &str = "SCOUTDESK_BIND";
pub const ENV_FALLBACK_SCOUT: &str = "SCOUTDESK_FALLBACK_SCOUT_ID";
pub const ENV_CACHE_TTL: &str = "SCOUTDESK_CACHE_TTL_SECS";
pub const ENV_CACHE_CAPACITY: &str = "SCOUTDESK_CACHE_CAPACITY";
pub const ENV_SESSION_IDLE: &str = "SCOUTDESK_SESSION_IDLE_SECS";
pub const ENV_LEGACY_RUN_IDLE: &str = "SCOUTDESK_LEGACY_RUN_IDLE_SECS";
pub const ENV_LOG_LEVEL: &str = "SCOUTDESK_LOG_LEVEL";
pub const ENV_ADMIN_EMAIL: &str = "SCOUTDESK_ADMIN_EMAIL";
pub const ENV_ADMIN_PASSWORD: &str = "SCOUTDESK_ADMIN_PASSWORD";

pub const DEFAULT_BIND: &str = "127.0.0.1:5740";
pub const DEFAULT_FALLBACK_SCOUT_ID: i64 = 1;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 30;
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;
/// Eight hours without a request
pub const DEFAULT_SESSION_IDLE_SECS: u64 = 8 * 60 * 60;
pub const DEFAULT_LEGACY_RUN_IDLE_SECS: u64 = 2 * 60 * 60;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Contents of `config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TomlConfig {
    pub database_path: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub fallback_scout_id: Option<i64>,
    pub cache_ttl_secs: Option<u64>,
    pub cache_capacity: Option<usize>,
    pub session_idle_secs: Option<u64>,
    pub legacy_run_idle_secs: Option<u64>,
    pub log_level: Option<String>,
}

impl TomlConfig {
    /// Parse TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))
    }

    /// Load from a file, degrading to an empty config when the file is
    /// missing or unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match Self::from_toml_str(&content) {
                Ok(config) => {
                    info!("Loaded configuration from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!("Ignoring config file {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Config file {} not readable ({}), using defaults", path.display(), e);
                Self::default()
            }
        }
    }
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_file: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub fallback_scout_id: Option<i64>,
}

/// Credentials for the first level-3 account, created only on an empty
/// users table.
#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

/// Fully resolved service configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub database_path: PathBuf,
    pub bind_address: String,
    /// Scout id credited with legacy reports whose author email is unknown
    pub fallback_scout_id: i64,
    pub cache_ttl_secs: u64,
    /// Upper bound on cached reads
    pub cache_capacity: usize,
    /// Bearer tokens unused this long are forgotten
    pub session_idle_secs: u64,
    /// Legacy ingest runs untouched this long are dropped
    pub legacy_run_idle_secs: u64,
    pub log_level: String,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            bind_address: DEFAULT_BIND.to_string(),
            fallback_scout_id: DEFAULT_FALLBACK_SCOUT_ID,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            session_idle_secs: DEFAULT_SESSION_IDLE_SECS,
            legacy_run_idle_secs: DEFAULT_LEGACY_RUN_IDLE_SECS,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            bootstrap_admin: None,
        }
    }
}

impl ServiceConfig {
    /// Resolve configuration from CLI, environment and the TOML file
    pub fn resolve(cli: &CliOverrides) -> Self {
        let toml_config = match cli.config_file.clone().or_else(find_config_file) {
            Some(path) => TomlConfig::load_or_default(&path),
            None => {
                info!("No config file found, using environment and defaults");
                TomlConfig::default()
            }
        };
        Self::resolve_with(cli, &toml_config)
    }

    /// Resolve against an already-loaded TOML config
    pub fn resolve_with(cli: &CliOverrides, toml_config: &TomlConfig) -> Self {
        let defaults = Self::default();

        let database_path = cli
            .database_path
            .clone()
            .or_else(|| env_string(ENV_DATABASE).map(PathBuf::from))
            .or_else(|| toml_config.database_path.clone())
            .unwrap_or(defaults.database_path);

        let bind_address = cli
            .bind_address
            .clone()
            .or_else(|| env_string(ENV_BIND))
            .or_else(|| toml_config.bind_address.clone())
            .unwrap_or(defaults.bind_address);

        let fallback_scout_id = cli
            .fallback_scout_id
            .or_else(|| env_parsed(ENV_FALLBACK_SCOUT))
            .or(toml_config.fallback_scout_id)
            .unwrap_or(defaults.fallback_scout_id);

        let cache_ttl_secs = env_parsed(ENV_CACHE_TTL)
            .or(toml_config.cache_ttl_secs)
            .unwrap_or(defaults.cache_ttl_secs);

        let cache_capacity = env_parsed(ENV_CACHE_CAPACITY)
            .or(toml_config.cache_capacity)
            .unwrap_or(defaults.cache_capacity);

        let session_idle_secs = env_parsed(ENV_SESSION_IDLE)
            .or(toml_config.session_idle_secs)
            .unwrap_or(defaults.session_idle_secs);

        let legacy_run_idle_secs = env_parsed(ENV_LEGACY_RUN_IDLE)
            .or(toml_config.legacy_run_idle_secs)
            .unwrap_or(defaults.legacy_run_idle_secs);

        let log_level = env_string(ENV_LOG_LEVEL)
            .or_else(|| toml_config.log_level.clone())
            .unwrap_or(defaults.log_level);

        let bootstrap_admin = match (env_string(ENV_ADMIN_EMAIL), env_string(ENV_ADMIN_PASSWORD)) {
            (Some(email), Some(password)) => Some(BootstrapAdmin { email, password }),
            _ => None,
        };

        Self {
            database_path,
            bind_address,
            fallback_scout_id,
            cache_ttl_secs,
            cache_capacity,
            session_idle_secs,
            legacy_run_idle_secs,
            log_level,
            bootstrap_admin,
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = env_string(name)?;
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring {}={:?}: not a valid value", name, raw);
            None
        }
    }
}

/// Locate `config.toml`: user config dir first, then `/etc/scoutdesk`
pub fn find_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("scoutdesk").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    let system_config = PathBuf::from("/etc/scoutdesk/config.toml");
    if cfg!(unix) && system_config.exists() {
        return Some(system_config);
    }

    None
}

/// OS-dependent default database location
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("scoutdesk"))
        .unwrap_or_else(|| PathBuf::from("./scoutdesk_data"))
        .join("scoutdesk.db")
}
