use anyhow::Result;
use axum::Router;
use std::{fs, io::ErrorKind, path::Path};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use repovault::{
    config::AppConfig,
    db,
    routes::routes::routes,
    services::{blob_store::BlobStore, registry::RepoRegistry, reviewer::CodeReviewer},
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + migrate flag ---
    let (cfg, migrate) = AppConfig::from_env_and_args()?;

    tracing::info!("Starting repovault with config: {:?}", cfg);

    // --- Ensure storage directory exists ---
    if !Path::new(&cfg.storage_dir).exists() {
        fs::create_dir_all(&cfg.storage_dir)?;
        tracing::info!("Created storage directory at {}", cfg.storage_dir);
    }

    // --- Initialize SQLite connection ---
    let pool = db::connect(&cfg.database_url, 5).await?;

    // --- Handle migration mode ---
    if migrate {
        db::run_migrations(&pool, "migrations/0001_init.sql").await?;
        tracing::info!("Database migration complete.");
        return Ok(());
    }

    // --- Initialize core services ---
    let store = BlobStore::new(pool.clone(), cfg.storage_dir.clone());
    let registry = RepoRegistry::new(pool.clone(), store.clone(), cfg.repo_name_scope);
    let reviewer = CodeReviewer::new(
        cfg.ai_base_url.clone(),
        cfg.ai_model.clone(),
        cfg.ai_api_key.clone(),
    );
    let state = AppState {
        db: pool,
        store,
        registry,
        reviewer,
    };

    // --- Build router ---
    let app: Router = routes(state.clone()).with_state(state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
