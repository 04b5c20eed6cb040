use serde::{Deserialize, Serialize};

/// One entry in the displayed conversation.
///
/// An entry is a user message (`content`), an assistant reply (`response`
/// and/or `error`), or the processing placeholder of the turn in flight.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub content: Option<String>,
    pub response: Option<String>,
    pub error: Option<String>,
    pub session_id: Option<String>,
    pub is_processing: bool,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self { content: Some(content.into()), ..Self::default() }
    }

    pub fn placeholder() -> Self {
        Self { is_processing: true, ..Self::default() }
    }

    pub fn is_user(&self) -> bool {
        !self.is_processing && self.content.is_some()
    }
}

impl From<InboundFrame> for Message {
    fn from(frame: InboundFrame) -> Self {
        Self {
            content: non_empty(frame.content),
            response: non_empty(frame.response),
            error: non_empty(frame.error),
            session_id: non_empty(frame.session_id),
            is_processing: frame.is_processing.unwrap_or(false),
        }
    }
}

/// Frame sent by the client for every user message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundFrame {
    pub content: String,
    /// Empty until the server has assigned a session.
    pub session_id: String,
}

/// Frame received from the chat server. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InboundFrame {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub is_processing: Option<bool>,
}

impl InboundFrame {
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

// The server always serializes `content`, as "" on assistant frames.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}
