use gollama_chat::MessageView;
use leptos::ev;
use leptos::prelude::*;

use crate::state::AppState;

/// Chat page: message history, streaming placeholder, and input.
#[component]
pub fn ChatArea() -> impl IntoView {
    let state = expect_context::<AppState>();
    let messages_ref = NodeRef::<leptos::html::Div>::new();

    // Keep the newest entry (or streaming update) in view.
    Effect::new(move || {
        state.conversation.track();
        if let Some(el) = messages_ref.get() {
            el.set_scroll_top(el.scroll_height());
        }
    });

    view! {
        <main class="chat-area">
            // Connection banner
            {move || {
                (!state.connected.get()).then(|| {
                    view! {
                        <div class="error-banner">"Not connected to chat server"</div>
                    }
                })
            }}

            // Messages
            <div class="messages-container" node_ref=messages_ref>
                {move || {
                    let views: Vec<MessageView> = state
                        .conversation
                        .with(|c| c.messages().iter().map(MessageView::from).collect());
                    if views.is_empty() {
                        view! {
                            <div class="empty-state">
                                <h2>"Gollama Chat"</h2>
                                <p>
                                    "Start a conversation with Gollama. "
                                    "Ask a question or describe what you need help with."
                                </p>
                            </div>
                        }.into_any()
                    } else {
                        views
                            .into_iter()
                            .map(|entry| view! { <MessageBubble entry=entry /> })
                            .collect_view()
                            .into_any()
                    }
                }}
            </div>

            // Input area
            <ChatInput />
        </main>
    }
}

/// A single conversation entry.
#[component]
fn MessageBubble(entry: MessageView) -> impl IntoView {
    match entry {
        MessageView::User { text } => view! {
            <div class="message user">
                <div class="literal">{text}</div>
            </div>
        }
        .into_any(),
        MessageView::Reply { html, .. } => view! {
            <div class="message assistant">
                <div class="markdown" inner_html=html></div>
            </div>
        }
        .into_any(),
        MessageView::Failure { text } => view! {
            <div class="message assistant">
                <div class="error">{text}</div>
            </div>
        }
        .into_any(),
        MessageView::Processing { html, .. } => view! {
            <div class="message assistant">
                {html.map(|html| view! { <div class="markdown" inner_html=html></div> })}
                <div class="thinking">
                    <span class="spinner"></span>
                    <span>"Thinking..."</span>
                </div>
            </div>
        }
        .into_any(),
    }
}

/// Chat input with textarea and send button.
#[component]
fn ChatInput() -> impl IntoView {
    let state = expect_context::<AppState>();
    let (input, set_input) = signal(String::new());
    let input_ref = NodeRef::<leptos::html::Textarea>::new();

    // Focus the input once it is mounted.
    Effect::new(move || {
        if let Some(input_el) = input_ref.get() {
            let _ = input_el.focus();
        }
    });

    let disconnected = move || !state.connected.get();

    let send = move || {
        let text = input.get_untracked();
        if state.send_message(&text) {
            set_input.set(String::new());
        }
    };

    let on_keydown = move |ev: ev::KeyboardEvent| {
        if ev.key() == "Enter" && !ev.shift_key() {
            ev.prevent_default();
            send();
        }
    };

    let on_submit = move |_| {
        send();
    };

    view! {
        <div class="input-area">
            <div class="input-row">
                <textarea
                    node_ref=input_ref
                    rows="1"
                    placeholder="Message Gollama... (Enter to send, Shift+Enter for newline)"
                    prop:value=input
                    on:input=move |ev| {
                        set_input.set(event_target_value(&ev));
                    }
                    on:keydown=on_keydown
                    disabled=disconnected
                />
                <button
                    class="send-btn"
                    on:click=on_submit
                    disabled=move || disconnected() || input.get().trim().is_empty()
                >
                    "Send"
                </button>
            </div>
            <div class="disclaimer">"Gollama can make mistakes."</div>
        </div>
    }
}
