//! scoutdesk - scouting workbench back end
//!
//! Resolves configuration, opens the database, makes sure an administrator
//! exists and serves the HTTP API.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scoutdesk_common::config::{CliOverrides, ServiceConfig};
use scoutdesk_common::db::{init_database, Store};
use scoutdesk_svc::identity::IdentityService;
use scoutdesk_svc::{build_router, AppState};

/// Command-line arguments for scoutdesk
#[derive(Parser, Debug)]
#[command(name = "scoutdesk")]
#[command(about = "Scouting workbench back end")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Listen address (host:port)
    #[arg(short, long)]
    bind: Option<String>,

    /// User id that receives legacy reports with an unknown SCOUT email
    #[arg(long)]
    fallback_scout: Option<i64>,
}

impl From<Args> for CliOverrides {
    fn from(args: Args) -> Self {
        CliOverrides {
            config_file: args.config,
            database_path: args.database,
            bind_address: args.bind,
            fallback_scout_id: args.fallback_scout,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = ServiceConfig::resolve(&CliOverrides::from(args));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{},tower_http=info", config.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting scoutdesk v{}", env!("CARGO_PKG_VERSION"));
    info!("Database path: {}", config.database_path.display());

    let pool = init_database(&config.database_path)
        .await
        .context("Failed to open database")?;
    let store = Store::new(pool);

    match &config.bootstrap_admin {
        Some(admin) => {
            let identity = IdentityService::new(store.clone());
            if let Some(user) = identity
                .ensure_bootstrap_admin(&admin.email, &admin.password)
                .await
                .context("Failed to create bootstrap administrator")?
            {
                info!(user_id = user.id, email = %user.email, "Bootstrap administrator ready");
            }
        }
        None => {
            let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
                .fetch_one(store.pool())
                .await?;
            if users == 0 {
                warn!("No users exist; set SCOUTDESK_ADMIN_EMAIL and SCOUTDESK_ADMIN_PASSWORD to create one");
            }
        }
    }

    let state = AppState::new(store, &config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;
    info!("scoutdesk listening on http://{}", config.bind_address);
    info!("Health check: http://{}/health", config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
