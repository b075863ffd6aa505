//! Backend access
//!
//! The streaming client only sees the [`Transport`] trait: send one chat
//! request, get back the response body as a stream of byte chunks.
//! [`HttpTransport`] implements it over reqwest, and [`ModelCatalog`] covers
//! the model endpoints used by the CLI.

use crate::error::ChatlineError;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

pub mod catalog;
pub mod http;
pub mod types;

pub use catalog::ModelCatalog;
pub use http::HttpTransport;
pub use types::{ChatRequest, ErrorBody, ErrorResponse, ModelCategory, ModelEntry, ModelsResponse};

/// Response body as it arrives from the network
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ChatlineError>> + Send>>;

/// Path of the chat endpoint, relative to the API prefix
pub const CHAT_PATH: &str = "/chat";

/// Path of the model catalog, relative to the API prefix
pub const MODELS_PATH: &str = "/models";

/// Opens streamed chat responses
///
/// Implementations resolve once response headers are in. A connection
/// failure is a [`ChatlineError::Transport`]; a non-success status is a
/// [`ChatlineError::HttpStatus`]. Dropping the returned stream aborts the
/// underlying read.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request` and returns its body stream
    async fn open_chat_stream(&self, request: &ChatRequest) -> Result<ByteStream, ChatlineError>;
}
