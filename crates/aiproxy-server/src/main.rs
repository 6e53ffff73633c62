mod configuration;
mod error;
mod routes;
mod sse;
mod state;

use aiproxy::history::ConversationStore;
use aiproxy::providers::openai::OpenAiProvider;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::configuration::Settings;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let settings = Settings::new()?;
    let addr = settings.server.socket_addr()?;
    let provider = OpenAiProvider::new(settings.provider.into_config()?)?;
    info!(
        "Relaying to {} with model {}",
        provider.config().host,
        provider.config().model
    );

    let history = ConversationStore::with_max_sessions(settings.history.max_sessions);
    let state = AppState::new(Arc::new(provider), settings.prompts).with_history(history);

    // Browser pages call us from other origins
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::configure(state).layer(cors);

    let listener = TcpListener::bind(addr).await?;
    info!("AI Proxy listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
