//! Webhook relay for Meta platform events.
//!
//! This library backs the `webhook-relay` binary, a thin middleware that:
//! - Answers Meta's subscription verification handshake
//! - Receives webhook event payloads
//! - Forwards them unmodified to a Retool workflow endpoint
//!
//! ## Architecture
//!
//! ```text
//! Meta webhooks → Relay (verify / acknowledge) → Retool workflow
//! ```
//!
//! The relay always acknowledges recognized events with 200, even when
//! forwarding fails, so that Meta does not retry and trigger duplicate
//! downstream side effects.

pub mod config;
pub mod forward;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use forward::{ForwardError, Forwarder};
pub use web::AppState;
