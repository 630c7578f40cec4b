use thiserror::Error;

/// Top-level error type for the `hanotify-api` crate.
///
/// Covers the WebSocket event connection, the hub REST API and the
/// shared HTTP transport. `hanotify-core` maps these into its own
/// `CoreError` where they cross the crate boundary.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The hub rejected the access token (`auth_invalid` frame or HTTP 401).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── WebSocket ───────────────────────────────────────────────────
    /// WebSocket connection failed or broke mid-stream.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// WebSocket closed by the hub with a close frame.
    #[error("WebSocket closed (code {code}): {reason}")]
    WebSocketClosed { code: u16, reason: String },

    /// The hub answered the handshake with something we cannot continue from.
    #[error("Protocol error: {0}")]
    Protocol(String),

    // ── REST services ───────────────────────────────────────────────
    /// Non-success response from a hub service call.
    #[error("Hub service call failed (HTTP {status}): {message}")]
    Service { status: u16, message: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::WebSocketConnect(_) | Self::WebSocketClosed { .. } => true,
            Self::Service { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if the hub rejected our credentials.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn websocket_failures_are_transient() {
        assert!(Error::WebSocketConnect("refused".into()).is_transient());
        assert!(
            Error::WebSocketClosed {
                code: 1011,
                reason: "restart".into()
            }
            .is_transient()
        );
        assert!(!Error::Protocol("bad frame".into()).is_transient());
    }

    #[test]
    fn service_errors_transient_only_on_server_side() {
        let server = Error::Service {
            status: 502,
            message: "bad gateway".into(),
        };
        let client = Error::Service {
            status: 400,
            message: "bad request".into(),
        };
        assert!(server.is_transient());
        assert!(!client.is_transient());
    }

    #[test]
    fn auth_detection() {
        let err = Error::Authentication {
            message: "Invalid access token".into(),
        };
        assert!(err.is_auth());
        assert!(!err.is_transient());
    }
}
