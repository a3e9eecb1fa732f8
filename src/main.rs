//! Bayes Coach - guided Bayesian belief updating
//!
//! A Rust backend implementing a conversation state machine that walks
//! each user through a prior and two likelihoods, then reports the posterior.

mod api;
mod bayes;
mod config;
mod db;
mod feedback;
mod runtime;
mod state_machine;

use api::{create_router, AppState};
use config::AppConfig;
use db::Database;
use runtime::{ConversationManager, DatabaseStorage};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{
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
                .unwrap_or_else(|_| "bayes_coach=info,tower_http=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = AppConfig::from_env();
    tracing::info!(flow = ?config.flow, "Loaded configuration");

    // Initialize database
    let db = if config.is_in_memory() {
        tracing::warn!("Using in-memory database; sessions and history are lost on exit");
        Database::open_in_memory()?
    } else {
        // Ensure database directory exists
        if let Some(parent) = PathBuf::from(&config.db_path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        tracing::info!(path = %config.db_path, "Opening database");
        Database::open(&config.db_path)?
    };

    // Create application state
    let history_window = config.flow.history_window;
    let manager = ConversationManager::new(DatabaseStorage::new(db), config.flow)
        .with_idle_timeout(config.idle_timeout);
    let state = AppState::new(Arc::new(manager), history_window);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Bayes Coach server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
