use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::conversation::{ConversationState, ConversationStreamReducer};
use crate::socket::SocketConnectionManager;

/// Drives one conversation: the only consumer of both user input and inbound
/// frames, so every reducer update runs to completion before the next.
pub struct ChatService {
    connection: SocketConnectionManager,
    reducer: ConversationStreamReducer,
}

impl ChatService {
    pub fn new(connection: SocketConnectionManager) -> Self {
        Self { connection, reducer: ConversationStreamReducer::new() }
    }

    pub fn state(&self) -> &ConversationState {
        self.reducer.state()
    }

    /// Submits one user message. Returns `false` when nothing was sent.
    pub fn submit(&mut self, text: &str) -> bool {
        self.reducer.submit_user_message(text, &self.connection)
    }

    /// Applies one raw inbound frame. Returns `false` for dropped frames.
    pub fn apply_frame(&mut self, raw: &str) -> bool {
        self.reducer.receive_frame(raw).is_ok()
    }

    /// Runs until the server closes the connection, or until `input` is
    /// exhausted and no reply is pending. `on_change` sees every new state.
    pub async fn run<F>(
        mut self,
        mut input: mpsc::Receiver<String>,
        mut on_change: F,
    ) -> ConversationState
    where
        F: FnMut(&ConversationState),
    {
        let mut input_open = true;

        loop {
            tokio::select! {
                line = input.recv(), if input_open => match line {
                    Some(text) => {
                        if self.submit(&text) {
                            on_change(self.reducer.state());
                        } else if !text.trim().is_empty() {
                            warn!("Not connected to chat server; message not sent");
                        }
                    }
                    None => {
                        input_open = false;
                        if !self.reducer.state().is_awaiting_reply() {
                            break;
                        }
                    }
                },
                frame = self.connection.next_frame() => match frame {
                    Some(raw) => {
                        if self.apply_frame(&raw) {
                            on_change(self.reducer.state());
                        }
                        if !input_open && !self.reducer.state().is_awaiting_reply() {
                            break;
                        }
                    }
                    None => {
                        info!("Chat server closed the connection");
                        break;
                    }
                },
            }
        }

        let state = self.reducer.state().clone();
        self.connection.close().await;
        state
    }
}
