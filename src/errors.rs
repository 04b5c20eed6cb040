use thiserror::Error;

/// Top-level client error.
/// All variants carry a human-readable message for display/logging.
#[derive(Debug, Error)]
pub enum ChatError {
    // ── Connection errors ────────────────────────────────────────────────────
    #[error("Failed to connect to chat server at {url}: {message}")]
    Connect { url: String, message: String },

    #[error("Connection to chat server is closed")]
    ConnectionClosed,

    // ── Protocol errors ──────────────────────────────────────────────────────
    #[error("Malformed frame: {0}")]
    MalformedFrame(#[source] serde_json::Error),

    // ── Configuration errors ─────────────────────────────────────────────────
    #[error("Invalid configuration for '{key}': {message}")]
    Config { key: String, message: String },
}

impl ChatError {
    pub fn connect(url: impl Into<String>, message: impl ToString) -> Self {
        ChatError::Connect { url: url.into(), message: message.to_string() }
    }

    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        ChatError::Config { key: key.into(), message: message.into() }
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, ChatError::Connect { .. } | ChatError::ConnectionClosed)
    }

    pub fn is_protocol(&self) -> bool {
        matches!(self, ChatError::MalformedFrame(_))
    }
}
