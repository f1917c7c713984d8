use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use review_pipeline::api::build_router;
use review_pipeline::config::Config;
use review_pipeline::db::Database;
use review_pipeline::handlers::AppState;

/// Read-only reporting API over the imported review hierarchy.
///
/// Loads configuration, connects to Postgres, applies pending migrations and
/// serves the router until the process is stopped.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "review_pipeline=debug,review_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    let db = Database::connect_and_migrate(&config.database_url, config.max_connections).await?;
    tracing::info!("Database connection pool established");

    let app_state = Arc::new(AppState {
        db: db.pool.clone(),
    });

    let app = build_router(app_state)?;

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // SmartIpKeyExtractor falls back to the peer address.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
