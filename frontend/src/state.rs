use gollama_chat::ConversationStreamReducer;
use leptos::prelude::*;

use crate::ws::{self, BrowserSocket};

/// Shared chat state, provided via Leptos context.
#[derive(Clone, Copy)]
pub struct AppState {
    // --- Read signals (for components to subscribe to) ---
    pub conversation: ReadSignal<ConversationStreamReducer>,
    pub connected: ReadSignal<bool>,

    // --- Write signals (for mutating state) ---
    set_conversation: WriteSignal<ConversationStreamReducer>,

    socket: StoredValue<Option<BrowserSocket>, LocalStorage>,
}

impl AppState {
    /// Create the state, open the chat socket, and provide the state in the
    /// current Leptos context. The socket closes when the owner is cleaned up.
    pub fn provide() -> Self {
        let (conversation, set_conversation) = signal(ConversationStreamReducer::new());
        let (connected, set_connected) = signal(false);

        // Each frame is merged inside a single update, so frames never interleave.
        let on_frame = move |raw: String| {
            set_conversation.update(|reducer| merge_frame(reducer, &raw));
        };
        let on_connectivity = move |ready: bool| set_connected.set(ready);

        let socket = match BrowserSocket::open(ws::ws_url(), on_frame, on_connectivity) {
            Ok(socket) => Some(socket),
            Err(e) => {
                log::error!("{e}");
                None
            }
        };
        let socket = StoredValue::new_local(socket);
        on_cleanup(move || socket.set_value(None));

        let state = Self { conversation, connected, set_conversation, socket };
        provide_context(state);
        state
    }

    /// Send a user message. Blank input or a closed socket is a no-op.
    pub fn send_message(&self, text: &str) -> bool {
        let set_conversation = self.set_conversation;
        self.socket.with_value(|socket| {
            let Some(socket) = socket else {
                return false;
            };
            let mut sent = false;
            set_conversation.update(|reducer| {
                sent = reducer.submit_user_message(text, socket);
            });
            sent
        })
    }
}

/// Merges one inbound frame, logging the ones the reducer drops. The reducer
/// logs through `tracing`, which has no subscriber in the browser.
fn merge_frame(reducer: &mut ConversationStreamReducer, raw: &str) {
    if let Err(e) = reducer.receive_frame(raw) {
        log::warn!("{e}");
    }
}
