// Error types for the printwatch-api crate.

use thiserror::Error;

/// Errors from the printer API clients.
///
/// The monitoring layer only cares about one distinction, exposed by
/// [`is_unreachable`](Error::is_unreachable): did the device fail to
/// answer at all, or did it answer in a shape we could not use.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport errors ────────────────────────────────────────────────

    /// HTTP transport error (connection refused, DNS failure, timeout)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx HTTP response
    #[error("HTTP status {status}")]
    Status { status: u16 },

    /// URL parsing error
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The whole exchange exceeded its deadline
    #[error("request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS or HTTP client construction error
    #[error("TLS error: {0}")]
    Tls(String),

    /// Credential material that cannot be placed in a request header
    #[error("invalid API key: {0}")]
    InvalidApiKey(String),

    // ── WebSocket errors ────────────────────────────────────────────────

    /// WebSocket connection failed
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// WebSocket failed mid-session (read error, premature close)
    #[error("WebSocket protocol error: {0}")]
    WebSocket(String),

    // ── Data errors ─────────────────────────────────────────────────────

    /// JSON deserialization failed, with the raw body for debugging
    #[error("deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// `true` when the device should be treated as offline rather than
    /// misbehaving: connection failures, timeouts, and non-2xx responses.
    /// Everything else means the device answered, just not in a shape we
    /// understand.
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_)
                | Self::Status { .. }
                | Self::InvalidUrl(_)
                | Self::Timeout { .. }
                | Self::Tls(_)
                | Self::WebSocketConnect(_)
        )
    }
}
