use chatline::config::BackendConfig;
use chatline::storage::SqliteStorage;
use chatline::streaming::{StreamErrorKind, StreamObserver};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use tokio::sync::mpsc;

#[allow(dead_code)]
pub fn create_temp_storage() -> (SqliteStorage, TempDir) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let db_path = tmp.path().join("state.db");
    let storage =
        SqliteStorage::new_with_path(db_path).expect("failed to create sqlite storage with path");
    (storage, tmp)
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Backend settings pointing at a mock server
#[allow(dead_code)]
pub fn backend_config(base_url: &str) -> BackendConfig {
    BackendConfig {
        base_url: base_url.to_string(),
        timeout_seconds: 5,
        connect_timeout_seconds: 2,
        ..BackendConfig::default()
    }
}

/// Builds a line-delimited event body from `data:` payloads
#[allow(dead_code)]
pub fn event_body(payloads: &[&str]) -> Vec<u8> {
    let mut body = String::new();
    for payload in payloads {
        body.push_str("data: ");
        body.push_str(payload);
        body.push_str("\n\n");
    }
    body.into_bytes()
}

#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq)]
pub enum Observed {
    Token(String),
    Complete,
    Error(StreamErrorKind, String),
}

/// Observer that forwards callbacks into a channel
#[allow(dead_code)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<Observed>,
}

impl StreamObserver for ChannelObserver {
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

#[allow(dead_code)]
pub fn channel_observer() -> (Box<ChannelObserver>, mpsc::UnboundedReceiver<Observed>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Box::new(ChannelObserver { tx }), rx)
}

/// Receives events until the turn ends
#[allow(dead_code)]
pub async fn collect_until_end(rx: &mut mpsc::UnboundedReceiver<Observed>) -> Vec<Observed> {
    let mut events = Vec::new();
    loop {
        let event = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
            .await
            .expect("stream ended in time")
            .expect("observer channel open");
        let terminal = !matches!(event, Observed::Token(_));
        events.push(event);
        if terminal {
            return events;
        }
    }
}
