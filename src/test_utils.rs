//! Test utilities for chatline
//!
//! Temporary directories, a scripted transport that replays or hand-feeds
//! response bodies, and an observer that records what it was told.

use crate::backend::{ByteStream, ChatRequest, Transport};
use crate::config::Config;
use crate::error::ChatlineError;
use crate::streaming::{StreamErrorKind, StreamObserver};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::Mutex;
use tempfile::TempDir;
use tokio::sync::mpsc;

/// Create a temporary directory for testing
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// Assert that an error contains the expected message
///
/// # Panics
///
/// Panics if the result is Ok or if the error doesn't contain the expected message
pub fn assert_error_contains<T>(result: Result<T, ChatlineError>, expected: &str) {
    match result {
        Ok(_) => panic!("Expected error containing '{}', got Ok", expected),
        Err(e) => {
            let message = e.to_string();
            assert!(
                message.contains(expected),
                "Error message '{}' does not contain '{}'",
                message,
                expected
            );
        }
    }
}

/// Default configuration for tests
pub fn test_config() -> Config {
    Config::default()
}

/// A complete configuration file
pub fn test_config_yaml() -> String {
    r#"
backend:
  base_url: http://127.0.0.1:9999
  api_prefix: /api/v1
  timeout_seconds: 5
  connect_timeout_seconds: 2
chat:
  default_model: tinyllama
  temperature: 0.7
  max_tokens: 512
  title_max_chars: 50
storage:
  flush_interval_ms: 250
"#
    .to_string()
}

type Chunk = Result<Bytes, ChatlineError>;

enum Script {
    Body(mpsc::UnboundedReceiver<Chunk>),
    Fail(ChatlineError),
}

/// Transport whose responses are queued by the test
///
/// Each call to `open_chat_stream` consumes the next queued script.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a body made of fixed chunks followed by EOF
    pub fn push_chunks(&self, chunks: Vec<&str>) {
        let feed = self.push_feed();
        for chunk in chunks {
            feed.chunk(chunk);
        }
        feed.close();
    }

    /// Queues a body the test feeds by hand
    pub fn push_feed(&self) -> ChunkFeed {
        let (tx, rx) = mpsc::unbounded_channel();
        self.scripts.lock().unwrap().push_back(Script::Body(rx));
        ChunkFeed { tx }
    }

    /// Queues a failure to open the stream
    pub fn push_failure(&self, error: ChatlineError) {
        self.scripts.lock().unwrap().push_back(Script::Fail(error));
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn open_chat_stream(&self, request: &ChatRequest) -> Result<ByteStream, ChatlineError> {
        self.requests.lock().unwrap().push(request.clone());
        let script = self.scripts.lock().unwrap().pop_front();
        match script {
            Some(Script::Body(rx)) => {
                let stream = futures::stream::unfold(rx, |mut rx| async move {
                    rx.recv().await.map(|chunk| (chunk, rx))
                });
                Ok(Box::pin(stream))
            }
            Some(Script::Fail(error)) => Err(error),
            None => Err(ChatlineError::Transport("no scripted response".to_string())),
        }
    }
}

/// Sender side of a hand-fed body
pub struct ChunkFeed {
    tx: mpsc::UnboundedSender<Chunk>,
}

impl ChunkFeed {
    pub fn chunk(&self, text: &str) {
        let _ = self.tx.send(Ok(Bytes::copy_from_slice(text.as_bytes())));
    }

    pub fn fail(&self, error: ChatlineError) {
        let _ = self.tx.send(Err(error));
    }

    /// Ends the body
    pub fn close(self) {}
}

/// One observer callback
#[derive(Debug, Clone, PartialEq)]
pub enum Observed {
    Token(String),
    Complete,
    Error(StreamErrorKind, String),
}

/// Observer forwarding every callback into a channel
pub struct RecordingObserver {
    tx: mpsc::UnboundedSender<Observed>,
}

impl StreamObserver for RecordingObserver {
    fn on_token(&mut self, fragment: &str) {
        let _ = self.tx.send(Observed::Token(fragment.to_string()));
    }

    fn on_complete(&mut self) {
        let _ = self.tx.send(Observed::Complete);
    }

    fn on_error(&mut self, kind: StreamErrorKind, detail: &str) {
        let _ = self.tx.send(Observed::Error(kind, detail.to_string()));
    }
}

pub fn recording_observer() -> (RecordingObserver, mpsc::UnboundedReceiver<Observed>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (RecordingObserver { tx }, rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_dir_creation() {
        let dir = temp_dir();
        assert!(dir.path().exists());
    }

    #[test]
    fn test_assert_error_contains_success() {
        let result: Result<(), ChatlineError> =
            Err(ChatlineError::Config("test error message".to_string()));
        assert_error_contains(result, "test error");
    }

    #[test]
    #[should_panic(expected = "Expected error containing")]
    fn test_assert_error_contains_ok() {
        let result: Result<(), ChatlineError> = Ok(());
        assert_error_contains(result, "error");
    }

    #[test]
    fn test_test_config_yaml_parses_and_validates() {
        let config: Config = serde_yaml::from_str(&test_config_yaml()).unwrap();
        assert_eq!(config.chat.default_model.as_deref(), Some("tinyllama"));
        assert_eq!(config.storage.flush_interval_ms, 250);
        assert!(config.validate().is_ok());
        assert!(test_config().validate().is_ok());
    }

    #[tokio::test]
    async fn test_scripted_transport_without_script_fails() {
        let transport = ScriptedTransport::new();
        let request = ChatRequest::streaming("m", vec![]);
        assert!(transport.open_chat_stream(&request).await.is_err());
        assert_eq!(transport.requests().len(), 1);
    }
}
