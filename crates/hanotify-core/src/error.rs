// ── Core error types ──
//
// Errors surfaced by hanotify-core. Transport details from hanotify-api
// are translated by the `From<hanotify_api::Error>` impl; dispatch-level
// failures (images, templates) are handled inside the dispatcher and only
// show up here when a collaborator reports them.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to hub at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Invalid hub address '{value}': {reason}")]
    InvalidEndpoint { value: String, reason: String },

    // ── Payload errors ───────────────────────────────────────────────
    #[error("Invalid event payload: {message}")]
    InvalidPayload { message: String },

    // ── Collaborator errors ──────────────────────────────────────────
    #[error("Template store error: {message}")]
    TemplateStore { message: String },

    #[error("Notification surface error: {message}")]
    Presentation { message: String },

    #[error("Action failed: {message}")]
    ActionFailed { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<hanotify_api::Error> for CoreError {
    fn from(err: hanotify_api::Error) -> Self {
        match err {
            hanotify_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            hanotify_api::Error::Transport(ref e) => CoreError::ConnectionFailed {
                url: e.url().map(ToString::to_string).unwrap_or_else(|| "<unknown>".into()),
                reason: e.to_string(),
            },
            hanotify_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            hanotify_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            hanotify_api::Error::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("WebSocket connection failed: {reason}"),
            },
            hanotify_api::Error::WebSocketClosed { code, reason } => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("WebSocket closed (code {code}): {reason}"),
            },
            hanotify_api::Error::Protocol(message) => CoreError::Internal(format!("Protocol error: {message}")),
            hanotify_api::Error::Service { status, message } => CoreError::ActionFailed {
                message: format!("hub returned HTTP {status}: {message}"),
            },
        }
    }
}
