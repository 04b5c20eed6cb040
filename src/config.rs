use tracing::info;

use crate::errors::ChatError;

pub const DEFAULT_WS_URL: &str = "ws://localhost:8080/ws";
pub const DEFAULT_LOG_FILTER: &str = "gollama_chat=info";

/// Runtime settings for the terminal client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub ws_url: String,
}

impl ClientConfig {
    /// Reads `WS_URL` from the environment (call `dotenvy::dotenv()` first to
    /// pick up a `.env` file).
    pub fn from_env() -> Result<Self, ChatError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ChatError> {
        let ws_url = match lookup("WS_URL").filter(|v| !v.trim().is_empty()) {
            Some(url) => url.trim().to_string(),
            None => {
                info!("No WS_URL environment variable found, using default {DEFAULT_WS_URL}");
                DEFAULT_WS_URL.to_string()
            }
        };

        if !(ws_url.starts_with("ws://") || ws_url.starts_with("wss://")) {
            return Err(ChatError::config(
                "WS_URL",
                format!("expected a ws:// or wss:// URL, got '{ws_url}'"),
            ));
        }

        Ok(Self { ws_url })
    }
}
