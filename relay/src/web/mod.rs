//! Web server module for the relay endpoints.
//!
//! This module provides a thin web server that:
//! - Answers Meta's verification handshake on GET /api/webhook
//! - Receives events on POST /api/webhook and forwards them to Retool
//! - Serves a status page on GET /
//!
//! Every request passes through the logging middleware, which records the
//! full request and the outgoing response without altering either.

pub mod handlers;
pub mod logging;

use axum::{extract::DefaultBodyLimit, middleware, routing::get, Router};
use tower_http::trace::TraceLayer;

pub use handlers::{receive_event, status_page, verify_subscription, AppState};

/// Maximum accepted inbound body size (10 MB).
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Build the relay router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(status_page))
        .route(
            "/api/webhook",
            get(verify_subscription).post(receive_event),
        )
        .layer(middleware::from_fn(logging::log_requests))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
