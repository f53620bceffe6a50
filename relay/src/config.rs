//! Configuration module for environment variable parsing.
//!
//! Reads all configuration from environment variables, keeping the variable
//! names of the original Node deployment so the relay is a drop-in
//! replacement.

use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Token Meta must present during the subscription verification handshake
    pub verify_token: Option<String>,

    /// Retool workflow endpoint URL to forward events to
    pub retool_webhook_url: Option<String>,

    /// API key sent to Retool in the X-Workflow-Api-Key header
    pub retool_api_key: Option<String>,

    /// Port for the web server to listen on
    pub port: u16,

    /// Environment label shown on the status page (never affects behavior)
    pub environment: String,

    /// Timeout in milliseconds for the downstream forwarding request
    pub forward_timeout_ms: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Config {
            verify_token: secret("VERIFY_TOKEN"),

            retool_webhook_url: secret("RETOOL_WEBHOOK_URL"),

            retool_api_key: secret("RETOOL_API_KEY"),

            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),

            environment: env::var("NODE_ENV")
                .unwrap_or_else(|_| "development".to_string()),

            forward_timeout_ms: env::var("FORWARD_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10_000),
        }
    }
}

/// Read an optional secret, treating an empty value the same as unset.
fn secret(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test so environment mutation cannot race with a parallel test
    // reading the same variables.
    #[test]
    fn test_from_env() {
        for name in [
            "VERIFY_TOKEN",
            "RETOOL_WEBHOOK_URL",
            "RETOOL_API_KEY",
            "PORT",
            "NODE_ENV",
            "FORWARD_TIMEOUT_MS",
        ] {
            env::remove_var(name);
        }

        let config = Config::from_env();
        assert_eq!(config.verify_token, None);
        assert_eq!(config.retool_webhook_url, None);
        assert_eq!(config.retool_api_key, None);
        assert_eq!(config.port, 3000);
        assert_eq!(config.environment, "development");
        assert_eq!(config.forward_timeout_ms, 10_000);

        env::set_var("VERIFY_TOKEN", "tok-123");
        env::set_var("RETOOL_WEBHOOK_URL", "https://example.com/hooks/wf");
        env::set_var("RETOOL_API_KEY", "");
        env::set_var("PORT", "8081");
        env::set_var("NODE_ENV", "production");
        env::set_var("FORWARD_TIMEOUT_MS", "2500");

        let config = Config::from_env();
        assert_eq!(config.verify_token.as_deref(), Some("tok-123"));
        assert_eq!(
            config.retool_webhook_url.as_deref(),
            Some("https://example.com/hooks/wf")
        );
        // Empty string counts as unset
        assert_eq!(config.retool_api_key, None);
        assert_eq!(config.port, 8081);
        assert_eq!(config.environment, "production");
        assert_eq!(config.forward_timeout_ms, 2500);

        for name in [
            "VERIFY_TOKEN",
            "RETOOL_WEBHOOK_URL",
            "RETOOL_API_KEY",
            "PORT",
            "NODE_ENV",
            "FORWARD_TIMEOUT_MS",
        ] {
            env::remove_var(name);
        }
    }
}
