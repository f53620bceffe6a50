//! Webhook relay server.
//!
//! This binary runs a thin HTTP middleware that:
//! - Answers Meta's subscription verification handshake
//! - Receives webhook event payloads
//! - Forwards them unmodified to a Retool workflow endpoint

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use relay::web::router;
use relay::{AppState, Config, Forwarder};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("relay_starting");

    // Load configuration
    let config = Config::from_env();
    info!(
        port = config.port,
        environment = %config.environment,
        verify_token_configured = config.verify_token.is_some(),
        retool_webhook_configured = config.retool_webhook_url.is_some(),
        retool_api_key_configured = config.retool_api_key.is_some(),
        forward_timeout_ms = config.forward_timeout_ms,
        "config_loaded"
    );

    // Build the downstream HTTP client once, with the configured timeout
    let forwarder = Forwarder::new(Duration::from_millis(config.forward_timeout_ms))
        .context("Failed to build downstream HTTP client")?;

    let state = AppState::new(config.clone(), forwarder);
    let app = router(state);

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, webhook_path = "/api/webhook", "relay_listening");

    // Run server with graceful shutdown
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("relay_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
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
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("relay_shutting_down");
}
