//! Client for the Gollama chat server: merges streamed assistant frames into a
//! displayed conversation.
//!
//! The core (`conversation`, `models`, `render`) has no tokio/native
//! dependencies and is shared with the browser frontend. The `native` feature
//! adds the tokio WebSocket connection and the terminal client loop.

pub mod config;
pub mod conversation;
pub mod errors;
pub mod models;
pub mod render;
#[cfg(feature = "native")]
pub mod service;
#[cfg(feature = "native")]
pub mod socket;

pub use conversation::{ConversationState, ConversationStreamReducer, FrameSink};
pub use errors::ChatError;
pub use models::{InboundFrame, Message, OutboundFrame};
pub use render::{MessageView, Transcript};
