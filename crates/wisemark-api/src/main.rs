//! wisemark API server.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use wisemark_api::config::LogConfig;
use wisemark_api::{build_router, logging, ApiConfig, AppState, RouterConfig};
use wisemark_db::{log_pool_metrics, Database, PoolConfig, S3PdfStorage, StorageLocation};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Logging first so configuration warnings are not dropped.
    let _log_guard = logging::init(&LogConfig::from_env());
    let config = ApiConfig::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        pdf_storage = %config.pdf_storage,
        rate_limit_enabled = config.rate_limit.enabled,
        "Starting wisemark-api"
    );

    let db = Database::connect_with_config(&config.database_url, PoolConfig::from_env()).await?;
    db.migrate().await?;
    info!("Database migrations applied");
    log_pool_metrics(db.pool());

    let db = match config.pdf_storage {
        StorageLocation::Postgres => db,
        StorageLocation::S3 => {
            db.with_pdf_storage(Arc::new(S3PdfStorage::new(config.s3_bucket.clone())))
        }
    };

    let state = AppState::new(db).with_rate_limit(&config.rate_limit);
    let app = build_router(
        state,
        RouterConfig {
            allowed_origins: config.allowed_origins.clone(),
            max_upload_bytes: config.max_upload_bytes,
        },
    );

    let addr: SocketAddr = config.bind_address().parse()?;
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error_msg = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
