//! Request/response logging middleware.
//!
//! Buffers each request body, logs the full request, runs the handler, then
//! logs the response status and body before sending it. The middleware never
//! changes what the handler receives or what the caller gets back; the only
//! mutation is re-wrapping the buffered bytes.
//!
//! The verification token is redacted wherever it appears in the query
//! string.

use std::net::SocketAddr;

use axum::{
    body::{Body, Bytes},
    extract::{ConnectInfo, Request},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use rand::{distributions::Alphanumeric, Rng};
use tracing::{info, warn};

use crate::web::MAX_BODY_BYTES;

/// Log every request and its response.
pub async fn log_requests(
    addr: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let request_id: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect();

    let client = addr
        .map(|ConnectInfo(a)| a.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let (parts, body) = request.into_parts();

    let bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(
                request_id = %request_id,
                method = %parts.method,
                path = parts.uri.path(),
                client = %client,
                error = %e,
                "request_body_too_large"
            );
            return StatusCode::PAYLOAD_TOO_LARGE.into_response();
        }
    };

    info!(
        request_id = %request_id,
        method = %parts.method,
        path = parts.uri.path(),
        query = parts.uri.query().map(redact_query).as_deref(),
        client = %client,
        headers = ?parts.headers,
        body = %String::from_utf8_lossy(&bytes),
        "request_received"
    );

    let request = Request::from_parts(parts, Body::from(bytes));
    let response = next.run(request).await;

    let (parts, body) = response.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .unwrap_or_else(|_| Bytes::new());

    info!(
        request_id = %request_id,
        status = parts.status.as_u16(),
        body = %String::from_utf8_lossy(&bytes),
        "response_sent"
    );

    Response::from_parts(parts, Body::from(bytes))
}

/// Redact the verification token from a query string.
fn redact_query(query: &str) -> String {
    query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) if key == "hub.verify_token" => {
                format!("{key}=**redacted**")
            }
            _ => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&")
}
