use std::io::BufRead;

use tokio::sync::mpsc;
use tracing::{info, warn};

use gollama_chat::config::{ClientConfig, DEFAULT_LOG_FILTER};
use gollama_chat::render::Transcript;
use gollama_chat::service::chat_service::ChatService;
use gollama_chat::socket::SocketConnectionManager;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (development convenience)
    dotenvy::dotenv().ok();

    // Initialise tracing on stderr so it stays out of the transcript
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig::from_env()?;
    let connection = SocketConnectionManager::connect(&config.ws_url).await?;

    // ── User input ────────────────────────────────────────────────────────────
    // A plain thread: a blocking stdin read can't hold up runtime shutdown.
    let (input_tx, input_rx) = mpsc::channel::<String>(16);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if input_tx.blocking_send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Failed to read stdin: {e}");
                    break;
                }
            }
        }
    });

    // ── Conversation loop ─────────────────────────────────────────────────────
    let mut transcript = Transcript::new();
    let state = ChatService::new(connection)
        .run(input_rx, |state| {
            for line in transcript.update(state.messages()) {
                println!("{line}");
            }
        })
        .await;

    info!("Conversation ended after {} messages", state.messages().len());
    Ok(())
}
