//! chatline - terminal client for a local chat-completion backend
//!
//! This library keeps a local set of conversations, streams assistant
//! replies from the backend, and applies them to the conversations in
//! order, with cancellation when the user stops or switches away.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `conversation`: Conversation and message model, and the store that owns them
//! - `storage`: Durable key-value storage behind the store
//! - `backend`: HTTP transport, wire types, and the model catalog
//! - `streaming`: Event decoding and the cancellable streaming client
//! - `session`: Coordination of streamed turns with the store
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli` / `commands`: Command-line interface and its handlers
//!
//! # Example
//!
//! ```no_run
//! use chatline::backend::HttpTransport;
//! use chatline::conversation::ConversationStore;
//! use chatline::session::ChatSession;
//! use chatline::storage::SqliteStorage;
//! use chatline::streaming::StreamingChatClient;
//! use chatline::Config;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let store = ConversationStore::load(SqliteStorage::new()?);
//!     let transport = Arc::new(HttpTransport::new(&config.backend)?);
//!     let mut session = ChatSession::new(store, StreamingChatClient::new(transport));
//!
//!     let id = session.store_mut().create().id;
//!     let ticket = session.send(&id, "Hello", "tinyllama")?;
//!     session.run_turn_to_end(&ticket, |t| print!("{}", t)).await;
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod cli;
pub mod commands;
pub mod config;
pub mod conversation;
pub mod error;
pub mod session;
pub mod storage;
pub mod streaming;

// Re-export commonly used types
pub use config::Config;
pub use conversation::{Conversation, ConversationStore, Message, Role};
pub use error::{ChatlineError, Result};
pub use session::ChatSession;
pub use streaming::{StreamHandle, StreamObserver, StreamingChatClient};

#[cfg(test)]
pub mod test_utils;
