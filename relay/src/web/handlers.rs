//! Relay endpoint handlers.
//!
//! The POST handler deliberately acknowledges almost everything with 200:
//! Meta retries webhook deliveries that fail, and a retried event would be
//! forwarded to Retool twice. Only an empty body (400) and missing server
//! configuration (500) are surfaced as failures.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::forward::Forwarder;
use crate::Config;

/// Event accepted and delivered downstream.
pub const EVENT_RECEIVED: &str = "EVENT_RECEIVED";
/// Event accepted, but downstream delivery failed. Still a 200.
pub const EVENT_RECEIVED_BUT_PROCESSING_FAILED: &str = "EVENT_RECEIVED_BUT_PROCESSING_FAILED";
/// Payload had no recognizable event discriminator. Still a 200.
pub const INVALID_EVENT_BUT_ACKNOWLEDGED: &str = "INVALID_EVENT_BUT_ACKNOWLEDGED";
/// Empty request body.
pub const INVALID_REQUEST_BODY: &str = "INVALID_REQUEST_BODY";
/// Downstream URL or API key not configured.
pub const SERVER_CONFIGURATION_ERROR: &str = "SERVER_CONFIGURATION_ERROR";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub forwarder: Forwarder,
}

impl AppState {
    pub fn new(config: Config, forwarder: Forwarder) -> Self {
        Self {
            config: Arc::new(config),
            forwarder,
        }
    }
}

// =============================================================================
// Verification Handshake
// =============================================================================

/// Query parameters of Meta's verification request.
#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// Subscription verification endpoint.
///
/// Echoes the challenge back as raw text when the mode is "subscribe" and the
/// presented token matches the configured one. A token mismatch (or no token
/// configured on our side) is a 403; absent parameters are a 404.
pub async fn verify_subscription(
    State(state): State<AppState>,
    Query(params): Query<VerifyParams>,
) -> Response {
    match (params.mode.as_deref(), params.verify_token.as_deref()) {
        (Some(mode), Some(token)) => {
            if mode == "subscribe" && state.config.verify_token.as_deref() == Some(token) {
                info!("webhook_verified");
                let challenge = params.challenge.unwrap_or_default();
                (StatusCode::OK, challenge).into_response()
            } else {
                warn!(
                    mode = mode,
                    token_configured = state.config.verify_token.is_some(),
                    "webhook_verification_failed"
                );
                (StatusCode::FORBIDDEN, "Verification failed").into_response()
            }
        }
        _ => {
            warn!(
                has_mode = params.mode.is_some(),
                has_token = params.verify_token.is_some(),
                "webhook_verification_missing_params"
            );
            (StatusCode::NOT_FOUND, "Missing verification parameters").into_response()
        }
    }
}

// =============================================================================
// Event Forwarding
// =============================================================================

/// Webhook event endpoint.
///
/// This endpoint:
/// 1. Rejects empty bodies (400)
/// 2. Acknowledges unrecognized payloads (200, no downstream call)
/// 3. Forwards recognized payloads verbatim to Retool, exactly once
pub async fn receive_event(State(state): State<AppState>, body: Bytes) -> Response {
    if body.is_empty() {
        error!("event_body_empty");
        return (StatusCode::BAD_REQUEST, INVALID_REQUEST_BODY).into_response();
    }

    let payload: Option<Value> = serde_json::from_slice(&body).ok();

    if let Some(payload) = &payload {
        log_payload_summary(payload);
    }

    // Existence check only; the payload is otherwise opaque to the relay
    let object = payload
        .as_ref()
        .and_then(|p| p.get("object"))
        .filter(|v| !v.is_null())
        .map(|v| v.as_str().map(str::to_owned).unwrap_or_else(|| v.to_string()));

    let Some(object) = object else {
        // Acknowledge anyway so Meta does not retry the delivery
        warn!(
            is_json = payload.is_some(),
            "event_missing_object_field"
        );
        return (StatusCode::OK, INVALID_EVENT_BUT_ACKNOWLEDGED).into_response();
    };

    info!(object = %object, body_bytes = body.len(), "event_recognized");

    let (Some(url), Some(api_key)) = (
        state.config.retool_webhook_url.as_deref(),
        state.config.retool_api_key.as_deref(),
    ) else {
        error!(
            url_configured = state.config.retool_webhook_url.is_some(),
            api_key_configured = state.config.retool_api_key.is_some(),
            "event_forwarding_unconfigured"
        );
        return (StatusCode::INTERNAL_SERVER_ERROR, SERVER_CONFIGURATION_ERROR).into_response();
    };

    match state.forwarder.forward(url, api_key, &body).await {
        Ok(()) => {
            info!(object = %object, "event_forwarded");
            (StatusCode::OK, EVENT_RECEIVED).into_response()
        }
        Err(e) => {
            // Still 200: a failure response here would make Meta retry and
            // cause duplicate events downstream.
            error!(object = %object, error = %e, "event_forwarding_failed");
            (StatusCode::OK, EVENT_RECEIVED_BUT_PROCESSING_FAILED).into_response()
        }
    }
}

/// Log a diagnostic summary of the nested entry/change/message structure.
///
/// WhatsApp deliveries carry messages under entry[].changes[].value; the
/// summary makes those visible in logs without touching the payload itself.
fn log_payload_summary(payload: &Value) {
    let Some(entries) = payload.get("entry").and_then(Value::as_array) else {
        return;
    };

    info!(entry_count = entries.len(), "event_entries");

    for (index, entry) in entries.iter().enumerate() {
        let changes = entry.get("changes").and_then(Value::as_array);

        info!(
            index = index,
            id = entry.get("id").and_then(serde_json::Value::as_str).unwrap_or_default(),
            change_count = changes.map(|c| c.len()).unwrap_or(0),
            "event_entry"
        );

        for change in changes.into_iter().flatten() {
            let value = change.get("value");
            let is_whatsapp = value
                .and_then(|v| v.get("messaging_product"))
                .and_then(Value::as_str)
                == Some("whatsapp");
            let message_types: Vec<&str> = value
                .and_then(|v| v.get("messages"))
                .and_then(Value::as_array)
                .map(|messages| {
                    messages
                        .iter()
                        .filter_map(|m| m.get("type").and_then(Value::as_str))
                        .collect()
                })
                .unwrap_or_default();

            info!(
                field = change.get("field").and_then(serde_json::Value::as_str).unwrap_or_default(),
                is_whatsapp = is_whatsapp,
                message_count = message_types.len(),
                message_types = ?message_types,
                "event_change"
            );
        }
    }
}

// =============================================================================
// Status Page
// =============================================================================

/// Status/info endpoint.
///
/// Reports whether each configuration value is present, never the values.
pub async fn status_page(State(state): State<AppState>) -> Html<String> {
    let config = &state.config;

    info!("status_page_accessed");

    Html(format!(
        "<h1>Meta to Retool Webhook Relay</h1>\n\
         <p>Status: running</p>\n\
         <p>Timestamp: {}</p>\n\
         <p>Environment: {}</p>\n\
         <h2>Configuration:</h2>\n\
         <ul>\n\
         <li>Verify Token: {}</li>\n\
         <li>Retool Webhook: {}</li>\n\
         <li>Retool API Key: {}</li>\n\
         </ul>",
        Utc::now().to_rfc3339(),
        config.environment,
        presence(&config.verify_token),
        presence(&config.retool_webhook_url),
        presence(&config.retool_api_key),
    ))
}

fn presence(value: &Option<String>) -> &'static str {
    if value.is_some() {
        "configured"
    } else {
        "missing"
    }
}
