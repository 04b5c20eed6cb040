use std::cell::Cell;
use std::rc::Rc;

use gollama_chat::FrameSink;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CloseEvent, Event, MessageEvent, WebSocket};

/// Chat endpoint, overridable at build time with `GOLLAMA_WS_URL`.
pub fn ws_url() -> &'static str {
    option_env!("GOLLAMA_WS_URL").unwrap_or("ws://localhost:8080/ws")
}

/// One browser WebSocket for the lifetime of the chat view.
/// Dropping it detaches the handlers and closes the socket.
pub struct BrowserSocket {
    ws: WebSocket,
    ready: Rc<Cell<bool>>,
    _onopen: Closure<dyn Fn()>,
    _onclose: Closure<dyn Fn(CloseEvent)>,
    _onerror: Closure<dyn Fn(Event)>,
    _onmessage: Closure<dyn Fn(MessageEvent)>,
}

impl BrowserSocket {
    /// Opens the socket. `on_frame` receives every text frame,
    /// `on_connectivity` every open/close transition. No reconnect.
    pub fn open(
        url: &str,
        on_frame: impl Fn(String) + 'static,
        on_connectivity: impl Fn(bool) + 'static,
    ) -> Result<Self, String> {
        let ws = WebSocket::new(url).map_err(|e| format!("Failed to connect: {e:?}"))?;
        let ready = Rc::new(Cell::new(false));
        let on_connectivity = Rc::new(on_connectivity);

        // --- onopen ---
        let onopen = {
            let ready = ready.clone();
            let notify = on_connectivity.clone();
            Closure::<dyn Fn()>::new(move || {
                log::info!("Connected to chat server");
                ready.set(true);
                notify(true);
            })
        };
        ws.set_onopen(Some(onopen.as_ref().unchecked_ref()));

        // --- onclose ---
        let onclose = {
            let ready = ready.clone();
            let notify = on_connectivity.clone();
            Closure::<dyn Fn(CloseEvent)>::new(move |_ev: CloseEvent| {
                log::info!("Disconnected from chat server");
                ready.set(false);
                notify(false);
            })
        };
        ws.set_onclose(Some(onclose.as_ref().unchecked_ref()));

        // --- onerror ---
        let onerror = {
            let ready = ready.clone();
            let notify = on_connectivity;
            Closure::<dyn Fn(Event)>::new(move |_ev: Event| {
                log::error!("WebSocket connection error");
                ready.set(false);
                notify(false);
            })
        };
        ws.set_onerror(Some(onerror.as_ref().unchecked_ref()));

        // --- onmessage ---
        let onmessage = Closure::<dyn Fn(MessageEvent)>::new(move |ev: MessageEvent| {
            match ev.data().as_string() {
                Some(text) => on_frame(text),
                None => log::warn!("Ignoring non-text frame"),
            }
        });
        ws.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));

        Ok(Self {
            ws,
            ready,
            _onopen: onopen,
            _onclose: onclose,
            _onerror: onerror,
            _onmessage: onmessage,
        })
    }
}

impl FrameSink for BrowserSocket {
    fn is_ready(&self) -> bool {
        self.ready.get() && self.ws.ready_state() == WebSocket::OPEN
    }

    fn send_text(&self, text: String) -> bool {
        match self.ws.send_with_str(&text) {
            Ok(()) => true,
            Err(e) => {
                log::error!("WebSocket send failed: {e:?}");
                false
            }
        }
    }
}

impl Drop for BrowserSocket {
    fn drop(&mut self) {
        self.ws.set_onopen(None);
        self.ws.set_onclose(None);
        self.ws.set_onerror(None);
        self.ws.set_onmessage(None);
        let _ = self.ws.close();
    }
}
