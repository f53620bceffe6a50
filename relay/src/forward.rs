//! Downstream forwarding - delivering webhook payloads to Retool.
//!
//! The relay makes at most one outbound call per inbound event and never
//! retries; retry pressure belongs to the upstream webhook source, and a
//! failed delivery must not be surfaced to it (see `web::handlers`).

use std::time::Duration;

use reqwest::{header, Client};
use thiserror::Error;
use tracing::info;
use url::Url;

/// Header carrying the Retool workflow API key.
pub const API_KEY_HEADER: &str = "X-Workflow-Api-Key";

/// Errors from a downstream forwarding attempt.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("downstream request timed out")]
    Timeout,

    #[error("downstream request failed: {0}")]
    Network(reqwest::Error),

    #[error("downstream returned status {status}")]
    Status { status: u16, body: String },
}

/// Forwards inbound payloads to the configured Retool workflow endpoint.
///
/// Wraps a single `reqwest::Client` built once at startup with the configured
/// request timeout.
#[derive(Clone)]
pub struct Forwarder {
    client: Client,
}

impl Forwarder {
    /// Build a forwarder whose requests are bounded by `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// POST the original payload bytes to the downstream endpoint.
    ///
    /// The payload is forwarded verbatim with `Content-Type: application/json`
    /// and the API key header. Any 2xx response counts as delivered; timeouts,
    /// network errors, and non-2xx statuses are reported as `ForwardError`.
    pub async fn forward(
        &self,
        url: &str,
        api_key: &str,
        payload: &[u8],
    ) -> Result<(), ForwardError> {
        info!(
            url = %redact_url(url),
            payload_bytes = payload.len(),
            "forward_starting"
        );

        let response = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "application/json")
            .header(API_KEY_HEADER, api_key)
            .body(payload.to_vec())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ForwardError::Timeout
                } else {
                    ForwardError::Network(e)
                }
            })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await.unwrap_or_default();

        if status.is_success() {
            info!(
                status = status.as_u16(),
                headers = ?headers,
                body = %body,
                "forward_complete"
            );
            Ok(())
        } else {
            Err(ForwardError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}

/// Mask the last path segment of a URL for logging.
///
/// Retool workflow URLs end in the workflow identifier, which should not
/// appear in logs.
pub fn redact_url(raw: &str) -> String {
    let Ok(mut url) = Url::parse(raw) else {
        return "<invalid-url>".to_string();
    };

    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop();
        segments.push("***");
    }

    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_bytes, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_redact_url_masks_last_segment() {
        assert_eq!(
            redact_url("https://api.retool.com/v1/workflows/wf-abc123"),
            "https://api.retool.com/v1/workflows/***"
        );
    }

    #[test]
    fn test_redact_url_invalid() {
        assert_eq!(redact_url("not a url"), "<invalid-url>");
    }

    #[tokio::test]
    async fn test_forward_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hooks/wf"))
            .and(header(API_KEY_HEADER, "key-123"))
            .and(header("content-type", "application/json"))
            .and(body_bytes(br#"{"object":"page","entry":[]}"#.to_vec()))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let forwarder = Forwarder::new(Duration::from_secs(2)).unwrap();
        let result = forwarder
            .forward(
                &format!("{}/hooks/wf", server.uri()),
                "key-123",
                br#"{"object":"page","entry":[]}"#,
            )
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_forward_non_2xx_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .expect(1)
            .mount(&server)
            .await;

        let forwarder = Forwarder::new(Duration::from_secs(2)).unwrap();
        let result = forwarder
            .forward(&server.uri(), "key-123", b"{}")
            .await;

        match result {
            Err(ForwardError::Status { status, body }) => {
                assert_eq!(status, 502);
                assert_eq!(body, "bad gateway");
            }
            other => panic!("Expected Status error, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn test_forward_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let forwarder = Forwarder::new(Duration::from_millis(50)).unwrap();
        let result = forwarder
            .forward(&server.uri(), "key-123", b"{}")
            .await;

        assert!(matches!(result, Err(ForwardError::Timeout)));
    }

    #[tokio::test]
    async fn test_forward_network_error() {
        // Nothing listens on this port
        let forwarder = Forwarder::new(Duration::from_secs(1)).unwrap();
        let result = forwarder
            .forward("http://127.0.0.1:9", "key-123", b"{}")
            .await;

        assert!(matches!(result, Err(ForwardError::Network(_))));
    }
}
