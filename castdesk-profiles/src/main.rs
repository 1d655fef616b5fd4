//! castdesk-profiles - profile reconciliation service
//!
//! Zero-config startup: root folder from CLI, environment, config file or
//! platform default; database created on first run.

use anyhow::{Context, Result};
use castdesk_common::config::{database_path, load_default_toml_config, resolve_root_folder};
use castdesk_common::db::{init_database, SqliteProfileStore};
use castdesk_profiles::fieldsets::{FieldRegistry, DEFAULT_NAMESPACE};
use castdesk_profiles::observe::CountingObserver;
use castdesk_profiles::reconciler::ProfileReconciler;
use castdesk_profiles::{build_router, AppState};
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 5740;

#[derive(Debug, Parser)]
#[command(name = "castdesk-profiles", version, about = "Profile reconciliation service")]
struct Args {
    /// Root folder holding castdesk.db
    #[arg(long)]
    root_folder: Option<String>,

    /// Address to bind the HTTP server to
    #[arg(long, env = "CASTDESK_BIND_ADDRESS")]
    bind_address: Option<String>,

    /// Port to listen on
    #[arg(long, env = "CASTDESK_PORT")]
    port: Option<u16>,

    /// Namespace for questionnaire fields when a profile names no known domain
    #[arg(long, env = "CASTDESK_DEFAULT_NAMESPACE")]
    default_namespace: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Log build identification immediately after tracing init
    info!(
        "Starting Castdesk Profiles (castdesk-profiles) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();
    let toml_config = load_default_toml_config();

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), &toml_config);
    let db_path = database_path(&root_folder);
    info!("Database path: {}", db_path.display());

    let pool = match init_database(&db_path).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e.into());
        }
    };

    let default_namespace = args
        .default_namespace
        .or(toml_config.default_namespace)
        .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
    let registry = FieldRegistry::builtin(&default_namespace)
        .context("Invalid questionnaire field configuration")?;
    info!("Default questionnaire namespace: {}", registry.default_namespace());

    let store = Arc::new(SqliteProfileStore::new(pool));
    let reconciler = ProfileReconciler::new(store, Arc::new(registry));
    let state = AppState::new(reconciler, Arc::new(CountingObserver::new()));
    let app = build_router(state);

    let bind_address = args
        .bind_address
        .or(toml_config.bind_address)
        .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());
    let port = args.port.or(toml_config.port).unwrap_or(DEFAULT_PORT);
    let addr = format!("{}:{}", bind_address, port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("castdesk-profiles listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
