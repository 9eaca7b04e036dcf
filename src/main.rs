//! Car-share ledger
//!
//! A chat-driven record keeper for a shared car: participants log trips and
//! fuel purchases, and each purchase is split across whoever drove since
//! the previous one.

mod allocation;
mod api;
mod config;
mod ledger;
mod report;
mod runtime;
mod state_machine;

use api::{create_router, AppState};
use config::Config;
use ledger::Database;
use std::net::SocketAddr;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "carshare_ledger=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = Config::from_env()?;

    // Ensure database directory exists
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Initialize database
    tracing::info!(path = %config.db_path.display(), "Opening ledger");
    let db = Database::open(&config.db_path)?;

    tracing::info!(
        roster = ?config.roster,
        odometer_floor = config.odometer_floor,
        idle_secs = config.session_idle_timeout.as_secs(),
        "Session settings"
    );

    // Create application state
    let state = AppState::new(db, config.session_settings());

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new().gzip(true).br(true);

    let app = create_router(state)
        .layer(cors)
        .layer(compression)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Car-share ledger listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
