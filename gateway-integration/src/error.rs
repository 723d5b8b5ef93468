use thiserror::Error;

/// Errors raised by the transport-agnostic plumbing in this crate.
///
/// Venue-specific errors (signing failures, bad order params) live in
/// `gateway-execution::error`; this enum only covers the generic
/// connectivity/rate-limit layer.
#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("rate limited: bucket '{key}' exhausted and timeout of {timeout_ms}ms elapsed")]
    RateLimited { key: String, timeout_ms: u64 },

    #[error("request timed out after {0}ms")]
    RequestTimeout(u64),

    #[error("websocket transport error: {0}")]
    Transport(String),

    #[error("websocket is disconnected")]
    Disconnected,

    #[error("http error {status}: {body}")]
    Http { status: u16, body: String },

    #[error("failed to (de)serialise payload: {0}")]
    Codec(String),

    #[error("validation failed: {0}")]
    Validation(String),
}

impl From<serde_json::Error> for IntegrationError {
    fn from(value: serde_json::Error) -> Self {
        Self::Codec(value.to_string())
    }
}
