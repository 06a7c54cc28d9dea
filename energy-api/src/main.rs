use anyhow::Context;
use axum::{http::StatusCode, routing::get, Router};
use energy_api::config::{Config, StoreKind};
use energy_api::directory::Directory;
use energy_api::store::{MemoryReadingStore, ReadingStore};
use energy_api::{db, metrics, rest, seed};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("energy_api=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env().context("invalid configuration")?;

    info!("Starting building energy API");
    info!("HTTP server: {}", config.http_addr);
    info!("Forecast threshold: {}", config.forecast_threshold);

    metrics::init_metrics().context("failed to register metrics")?;

    let (readings, directory): (Arc<dyn ReadingStore>, Arc<dyn Directory>) = match config.store {
        StoreKind::Postgres => {
            info!(
                "Database: {}",
                config.database_url.split('@').last().unwrap_or("***")
            );
            let pool = db::make_pool(&config.database_url, config.db_max_connections)
                .await
                .context("failed to connect to database")?;
            if config.seed_defaults {
                seed::seed_postgres(&pool)
                    .await
                    .context("failed to seed default data")?;
            }
            (
                Arc::new(db::PgReadingStore::new(pool.clone())) as Arc<dyn ReadingStore>,
                Arc::new(db::PgDirectory::new(pool)) as Arc<dyn Directory>,
            )
        }
        StoreKind::Memory => {
            warn!("Using in-memory store; readings are lost on shutdown");
            (
                Arc::new(MemoryReadingStore::new()) as Arc<dyn ReadingStore>,
                Arc::new(seed::default_directory()) as Arc<dyn Directory>,
            )
        }
    };

    let state = rest::AppState::new(readings, directory, config.forecast_threshold);
    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .merge(rest::create_router(state));

    let listener = tokio::net::TcpListener::bind(&config.http_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.http_addr))?;

    info!("HTTP server listening on {}", config.http_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Shutting down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}

async fn metrics_handler() -> Result<String, StatusCode> {
    metrics::gather_metrics().map_err(|e| {
        error!("Failed to encode metrics: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}
