//! Quill API Server
//!
//! REST API server for the Quill blog backend.

use anyhow::Context;
use quill_api::{create_router, state::AppState};
use quill_core::{AppConfig, MemoryStore, PgStore, PostStore, UserStore};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = AppConfig::from_env().context("failed to load configuration")?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    if config.logging.json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    if config.auth.uses_default_secret() {
        warn!("JWT_SECRET is not set; using the development secret");
    }

    // Storage
    let (users, posts): (Arc<dyn UserStore>, Arc<dyn PostStore>) = match &config.database.url {
        Some(url) => {
            let store = PgStore::connect(url, config.database.pool_size)
                .await
                .context("failed to connect to database")?;
            store
                .init_schema()
                .await
                .context("failed to initialize schema")?;
            info!("Using PostgreSQL store");
            let store = Arc::new(store);
            (store.clone(), store)
        }
        None => {
            warn!("DATABASE_URL is not set; using the in-memory store");
            let store = Arc::new(MemoryStore::new());
            (store.clone(), store)
        }
    };

    let addr = format!("{}:{}", config.server.host, config.server.port);

    // Create application state
    let state = Arc::new(AppState::new(config, users, posts).context("invalid hashing parameters")?);

    // Create router
    let app = create_router(state.clone());

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Quill API Server starting on http://{}", addr);
    info!("Swagger UI available at http://{}/swagger-ui/", addr);
    info!("OpenAPI document at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM, then report not-ready while draining
async fn shutdown_signal(state: Arc<AppState>) {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }

    state.set_ready(false);
}
