//! Native WebSocket connection to the chat server.
//!
//! The socket itself lives on a background task; the rest of the client talks
//! to it through channels:
//! - outbound frames go through an unbounded `mpsc` queue,
//! - inbound text frames come back on a bounded `mpsc` channel,
//! - connectivity is published on a `watch` channel.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use crate::conversation::FrameSink;
use crate::errors::ChatError;

const INBOUND_BUFFER: usize = 64;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Cloneable outbound handle. Sends are rejected once the connection is down.
#[derive(Debug, Clone)]
pub struct SocketSender {
    outbound: mpsc::UnboundedSender<String>,
    ready: watch::Receiver<bool>,
}

impl SocketSender {
    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    pub fn send(&self, text: impl Into<String>) -> Result<(), ChatError> {
        if !self.is_ready() {
            return Err(ChatError::ConnectionClosed);
        }
        self.outbound
            .send(text.into())
            .map_err(|_| ChatError::ConnectionClosed)
    }
}

impl FrameSink for SocketSender {
    fn is_ready(&self) -> bool {
        SocketSender::is_ready(self)
    }

    fn send_text(&self, text: String) -> bool {
        match self.send(text) {
            Ok(()) => true,
            Err(e) => {
                debug!("Outbound frame rejected: {e}");
                false
            }
        }
    }
}

/// Owns one live connection for the lifetime of the client.
///
/// Dropping the manager closes the connection.
pub struct SocketConnectionManager {
    url: String,
    sender: SocketSender,
    inbound: mpsc::Receiver<String>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SocketConnectionManager {
    /// Opens the connection. There is no retry: a failed handshake is returned
    /// to the caller.
    pub async fn connect(url: &str) -> Result<Self, ChatError> {
        let (stream, _) = connect_async(url)
            .await
            .map_err(|e| ChatError::connect(url, e))?;
        info!("Connected to chat server at {url}");

        let (ready_tx, ready_rx) = watch::channel(true);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_BUFFER);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(run_connection(
            stream,
            outbound_rx,
            inbound_tx,
            ready_tx,
            shutdown_rx,
        ));

        Ok(Self {
            url: url.to_string(),
            sender: SocketSender { outbound: outbound_tx, ready: ready_rx },
            inbound: inbound_rx,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn sender(&self) -> SocketSender {
        self.sender.clone()
    }

    pub fn is_ready(&self) -> bool {
        self.sender.is_ready()
    }

    /// Connectivity signal; flips to `false` once on close or transport error.
    pub fn connectivity(&self) -> watch::Receiver<bool> {
        self.sender.ready.clone()
    }

    /// Next inbound text frame, or `None` once the connection is gone and all
    /// buffered frames have been delivered.
    pub async fn next_frame(&mut self) -> Option<String> {
        self.inbound.recv().await
    }

    /// Closes the connection and waits for the I/O task to finish.
    pub async fn close(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Connection task failed: {e}");
            }
        }
    }
}

impl FrameSink for SocketConnectionManager {
    fn is_ready(&self) -> bool {
        self.sender.is_ready()
    }

    fn send_text(&self, text: String) -> bool {
        self.sender.send_text(text)
    }
}

impl Drop for SocketConnectionManager {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

async fn run_connection(
    mut stream: WsStream,
    mut outbound: mpsc::UnboundedReceiver<String>,
    inbound: mpsc::Sender<String>,
    ready: watch::Sender<bool>,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                if let Err(e) = stream.close(None).await {
                    debug!("Close handshake failed: {e}");
                }
                break;
            }
            Some(text) = outbound.recv() => {
                if let Err(e) = stream.send(WsMessage::Text(text.into())).await {
                    warn!("WebSocket send error: {e}");
                    break;
                }
            }
            msg = stream.next() => match msg {
                Some(Ok(WsMessage::Text(text))) => {
                    if inbound.send(text.to_string()).await.is_err() {
                        break;
                    }
                }
                Some(Ok(WsMessage::Close(_))) | None => break,
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    warn!("WebSocket receive error: {e}");
                    break;
                }
            },
        }
    }

    ready.send_replace(false);
    info!("Disconnected from chat server");
}
