//! symptom-server: questionnaire analysis HTTP server binary entrypoint.

use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use symptom_server::{AppState, config::Config};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    // Load configuration
    let config = Config::from_env();

    // Wire services
    let state = AppState::from_config(&config)
        .await
        .expect("Failed to initialise services");

    // Log startup info
    if state.store.is_some() {
        tracing::info!("Database configured, authenticated submissions are persisted");
    } else {
        tracing::warn!("DATABASE_URL not set, all analyses run anonymously");
    }
    if state.dispatcher.is_some() {
        tracing::info!("Anthropic API key configured, analysis enabled");
    } else {
        tracing::warn!("ANTHROPIC_API_KEY not set, submissions will be rejected");
    }
    tracing::info!(
        attempts = config.analysis.max_attempts,
        timeout_secs = config.analysis.attempt_timeout.as_secs(),
        poll_interval_ms = config.poll.interval.as_millis() as u64,
        poll_ceiling_secs = config.poll.ceiling.as_secs(),
        "Analysis settings"
    );
    tracing::info!("Rate limiting: {} submissions/second", config.rate_limit_rps);

    let pruner = symptom_server::spawn_run_pruner(state.registry.clone(), config.run_retention);

    // Build application
    let app = symptom_server::build_app(state, &config);

    // Start server
    let addr: SocketAddr = config.bind_address.parse().expect("Invalid bind address");
    tracing::info!("Starting symptom analysis server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    pruner.abort();
    tracing::info!("Server shutdown complete");
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
