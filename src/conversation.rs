//! Reconciles the user's messages and the server's streamed frames into the
//! ordered list the view renders.

use tracing::{debug, warn};

use crate::errors::ChatError;
use crate::models::{InboundFrame, Message, OutboundFrame};

/// Outbound half of a chat connection, as seen by the reducer.
pub trait FrameSink {
    /// Whether the connection is open and accepting frames.
    fn is_ready(&self) -> bool;

    /// Queue one text frame. Returns `false` if the frame was not accepted.
    fn send_text(&self, text: String) -> bool;
}

/// Displayed conversation plus the bookkeeping needed to merge streamed frames.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationState {
    messages: Vec<Message>,
    session_id: Option<String>,
    processing_index: Option<usize>,
}

impl ConversationState {
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn processing_index(&self) -> Option<usize> {
        self.processing_index
    }

    /// True while an assistant turn is still being generated.
    pub fn is_awaiting_reply(&self) -> bool {
        self.processing_index.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConversationStreamReducer {
    state: ConversationState,
}

impl ConversationStreamReducer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn messages(&self) -> &[Message] {
        &self.state.messages
    }

    /// Sends `text` as a new user turn and opens a processing placeholder for
    /// the reply.
    ///
    /// Blank input or a connection that is not ready is a no-op and returns
    /// `false`. A placeholder left over from an unfinished turn is dropped, so
    /// the list never holds more than one.
    pub fn submit_user_message(&mut self, text: &str, sink: &impl FrameSink) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        if !sink.is_ready() {
            debug!("Dropping user message: connection not ready");
            return false;
        }

        let frame = OutboundFrame {
            content: text.to_string(),
            session_id: self.state.session_id.clone().unwrap_or_default(),
        };
        let Ok(payload) = serde_json::to_string(&frame) else {
            warn!("Failed to encode outbound frame");
            return false;
        };
        if !sink.send_text(payload) {
            debug!("Dropping user message: connection refused the frame");
            return false;
        }

        self.remove_placeholders();
        self.state.messages.push(Message::user(text));
        self.state.messages.push(Message::placeholder());
        self.state.processing_index = Some(self.state.messages.len() - 1);
        true
    }

    /// Merges one raw inbound frame into the conversation.
    ///
    /// Malformed frames are logged and leave the state untouched.
    pub fn receive_frame(&mut self, raw: &str) -> Result<(), ChatError> {
        let frame = match InboundFrame::parse(raw) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Dropping malformed frame: {e}");
                return Err(ChatError::MalformedFrame(e));
            }
        };

        let message = Message::from(frame);
        if let Some(session_id) = &message.session_id {
            self.state.session_id = Some(session_id.clone());
        }

        if message.is_processing {
            match self.state.processing_index {
                Some(index) if index < self.state.messages.len() => {
                    self.state.messages[index] = message;
                }
                _ => {
                    self.remove_placeholders();
                    self.state.messages.push(message);
                    self.state.processing_index = Some(self.state.messages.len() - 1);
                }
            }
        } else {
            self.remove_placeholders();
            self.state.messages.push(message);
        }
        Ok(())
    }

    fn remove_placeholders(&mut self) {
        self.state.messages.retain(|m| !m.is_processing);
        self.state.processing_index = None;
    }
}
