//! Tally API server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tally_api::config::AppConfig;
use tally_api::error::AppError;
use tally_api::routes;
use tally_api::state::AppState;
use tally_api::subscription::ConfiguredSubscriptionManager;
use tally_core::clock::SystemClock;
use tally_event_store::pg_event_repository::PgEventRepository;
use tally_event_store::pg_metric_repository::PgMetricRepository;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Tally API server");

    let config = AppConfig::from_env()?;
    tracing::info!(
        environment = %config.environment,
        signature_verification = config.signature_policy.is_enforced(),
        "configuration loaded"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    tally_event_store::MIGRATOR.run(&pool).await?;

    let subscription_manager = ConfiguredSubscriptionManager::new(
        &config.hub,
        config.signature_policy.is_enforced(),
    );
    let app_state = AppState::new(
        Arc::new(SystemClock),
        Arc::new(PgEventRepository::new(pool.clone())),
        Arc::new(PgMetricRepository::new(pool)),
        Arc::new(subscription_manager),
        config.signature_policy,
    );

    // TODO: Replace CorsLayer::permissive() with the hub's origin once it is fixed per deployment.
    let app = routes::router()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
