//! Streaming chat client
//!
//! [`StreamingChatClient::stream_turn`] spawns one task per turn. The task
//! reads the response body, decodes it line by line, and reports progress
//! to a [`StreamObserver`]. Every observer call goes through a delivery gate
//! that [`StreamHandle::cancel`] also takes, so once `cancel()` returns the
//! observer is never called again, even for data already buffered.

use crate::backend::{ByteStream, ChatRequest, Transport};
use crate::conversation::Message;
use crate::error::ChatlineError;
use futures::StreamExt;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub mod decoder;

pub use decoder::{decode_line, DecodeError, LineDecoder, StreamEvent};

/// Lifecycle of one streamed turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamState {
    /// Not started
    #[default]
    Idle,
    /// Request sent, no body bytes yet
    Requesting,
    /// Body is arriving
    Streaming,
    /// Ended normally
    Completed,
    /// Stopped by the caller
    Cancelled,
    /// Ended by a failure
    Errored,
}

impl StreamState {
    /// Whether the state is final
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StreamState::Completed | StreamState::Cancelled | StreamState::Errored
        )
    }
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StreamState::Idle => "idle",
            StreamState::Requesting => "requesting",
            StreamState::Streaming => "streaming",
            StreamState::Completed => "completed",
            StreamState::Cancelled => "cancelled",
            StreamState::Errored => "errored",
        };
        f.write_str(s)
    }
}

/// Why a stream failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamErrorKind {
    /// Connection or read failure
    Transport,
    /// Non-success HTTP status
    Http(u16),
    /// Error event sent inside the stream
    Backend,
}

impl fmt::Display for StreamErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamErrorKind::Transport => f.write_str("transport error"),
            StreamErrorKind::Http(status) => write!(f, "HTTP {}", status),
            StreamErrorKind::Backend => f.write_str("backend error"),
        }
    }
}

impl StreamErrorKind {
    fn from_error(error: &ChatlineError) -> (Self, String) {
        match error {
            ChatlineError::HttpStatus { status, message } => {
                (StreamErrorKind::Http(*status), message.clone())
            }
            ChatlineError::Transport(detail) => (StreamErrorKind::Transport, detail.clone()),
            other => (StreamErrorKind::Transport, other.to_string()),
        }
    }
}

/// Receives the progress of one streamed turn
///
/// Calls are serialized and arrive in body order. Exactly one of
/// `on_complete` or `on_error` ends a turn that was not cancelled, and
/// nothing follows it. Implementations must not call
/// [`StreamHandle::cancel`] on the handle that is driving them.
pub trait StreamObserver: Send {
    /// A content fragment arrived
    fn on_token(&mut self, fragment: &str);

    /// The backend finished the turn
    fn on_complete(&mut self);

    /// The turn failed; partial content already delivered stays valid
    fn on_error(&mut self, kind: StreamErrorKind, detail: &str);
}

enum Outcome {
    Completed,
    Failed(StreamErrorKind, String),
}

struct Gate {
    state: StreamState,
    observer: Box<dyn StreamObserver>,
}

impl Gate {
    fn mark_streaming(&mut self) {
        if self.state == StreamState::Requesting {
            self.state = StreamState::Streaming;
        }
    }

    /// Returns false once the turn is over
    fn token(&mut self, fragment: &str) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.mark_streaming();
        self.observer.on_token(fragment);
        true
    }

    fn finish(&mut self, outcome: Outcome) {
        if self.state.is_terminal() {
            return;
        }
        match outcome {
            Outcome::Completed => {
                self.state = StreamState::Completed;
                self.observer.on_complete();
            }
            Outcome::Failed(kind, detail) => {
                self.state = StreamState::Errored;
                self.observer.on_error(kind, &detail);
            }
        }
    }
}

type SharedGate = Arc<Mutex<Gate>>;

fn lock(gate: &SharedGate) -> MutexGuard<'_, Gate> {
    gate.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Optional sampling parameters sent with every turn
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SamplingOptions {
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Cap on generated tokens
    pub max_tokens: Option<u32>,
}

/// Opens streamed turns against a [`Transport`]
#[derive(Clone)]
pub struct StreamingChatClient {
    transport: Arc<dyn Transport>,
    sampling: SamplingOptions,
}

impl fmt::Debug for StreamingChatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingChatClient")
            .field("sampling", &self.sampling)
            .finish_non_exhaustive()
    }
}

impl StreamingChatClient {
    /// Creates a client over `transport`
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            sampling: SamplingOptions::default(),
        }
    }

    /// Sets the sampling parameters for later turns
    pub fn with_sampling(mut self, sampling: SamplingOptions) -> Self {
        self.sampling = sampling;
        self
    }

    /// Starts one streamed turn
    ///
    /// Must be called inside a Tokio runtime. The returned handle starts in
    /// [`StreamState::Requesting`]. Dropping the handle cancels the turn.
    pub fn stream_turn(
        &self,
        conversation_id: &str,
        model: &str,
        history: Vec<Message>,
        observer: Box<dyn StreamObserver>,
    ) -> StreamHandle {
        let session_id = uuid::Uuid::new_v4().to_string();
        self.stream_turn_as(session_id, conversation_id, model, history, observer)
    }

    /// Same as [`stream_turn`](Self::stream_turn) with a caller-chosen session id
    pub fn stream_turn_as(
        &self,
        session_id: String,
        conversation_id: &str,
        model: &str,
        history: Vec<Message>,
        observer: Box<dyn StreamObserver>,
    ) -> StreamHandle {
        let request = ChatRequest::streaming(model, history)
            .with_sampling(self.sampling.temperature, self.sampling.max_tokens);

        let gate = Arc::new(Mutex::new(Gate {
            state: StreamState::Requesting,
            observer,
        }));
        let cancellation = CancellationToken::new();

        tracing::info!(
            session = %session_id,
            conversation = %conversation_id,
            model = %model,
            "Starting streamed turn"
        );

        let task = tokio::spawn(run_stream(
            Arc::clone(&self.transport),
            request,
            Arc::clone(&gate),
            cancellation.clone(),
            session_id.clone(),
        ));

        StreamHandle {
            session_id,
            conversation_id: conversation_id.to_string(),
            gate,
            cancellation,
            task: Some(task),
        }
    }
}

/// Control over one streamed turn
pub struct StreamHandle {
    session_id: String,
    conversation_id: String,
    gate: SharedGate,
    cancellation: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamHandle")
            .field("session_id", &self.session_id)
            .field("conversation_id", &self.conversation_id)
            .field("state", &self.state())
            .finish()
    }
}

impl StreamHandle {
    /// Unique id of this turn
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Conversation the turn belongs to
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Current state
    pub fn state(&self) -> StreamState {
        lock(&self.gate).state
    }

    /// Whether the turn reached a final state
    pub fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }

    /// Stops the turn
    ///
    /// No observer callback runs after this returns. Calling it again, or
    /// after the turn ended on its own, does nothing.
    pub fn cancel(&self) {
        {
            let mut gate = lock(&self.gate);
            if !gate.state.is_terminal() {
                gate.state = StreamState::Cancelled;
                tracing::info!(session = %self.session_id, "Streamed turn cancelled");
            }
        }
        self.cancellation.cancel();
    }

    /// Waits for the stream task to exit
    pub async fn join(&mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!(session = %self.session_id, "Stream task failed: {}", e);
            }
        }
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn run_stream(
    transport: Arc<dyn Transport>,
    request: ChatRequest,
    gate: SharedGate,
    cancellation: CancellationToken,
    session_id: String,
) {
    let opened = tokio::select! {
        biased;
        _ = cancellation.cancelled() => return,
        opened = transport.open_chat_stream(&request) => opened,
    };

    let body = match opened {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(session = %session_id, "Failed to open stream: {}", e);
            let (kind, detail) = StreamErrorKind::from_error(&e);
            lock(&gate).finish(Outcome::Failed(kind, detail));
            return;
        }
    };

    read_body(body, &gate, &cancellation, &session_id).await;
    tracing::debug!(session = %session_id, state = %lock(&gate).state, "Stream task finished");
}

async fn read_body(
    mut body: ByteStream,
    gate: &SharedGate,
    cancellation: &CancellationToken,
    session_id: &str,
) {
    let mut lines = LineDecoder::new();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancellation.cancelled() => return,
            next = body.next() => next,
        };

        match next {
            Some(Ok(chunk)) => {
                if chunk.is_empty() {
                    continue;
                }
                lock(gate).mark_streaming();
                for line in lines.push(&chunk) {
                    if !handle_line(&line, gate, session_id) {
                        return;
                    }
                }
            }
            Some(Err(e)) => {
                tracing::warn!(session = %session_id, "Stream read failed: {}", e);
                let (kind, detail) = StreamErrorKind::from_error(&e);
                lock(gate).finish(Outcome::Failed(kind, detail));
                return;
            }
            None => break,
        }
    }

    if let Some(tail) = lines.finish() {
        if !handle_line(&tail, gate, session_id) {
            return;
        }
    }

    // EOF without an explicit marker still completes the turn.
    lock(gate).finish(Outcome::Completed);
}

/// Returns false when the turn is over
fn handle_line(line: &str, gate: &SharedGate, session_id: &str) -> bool {
    let events = match decode_line(line) {
        Ok(events) => events,
        Err(e) => {
            tracing::warn!(session = %session_id, "Skipping malformed stream event: {}", e);
            return true;
        }
    };

    for event in events {
        let mut guard = lock(gate);
        match event {
            StreamEvent::Token(fragment) => {
                if !guard.token(&fragment) {
                    return false;
                }
            }
            StreamEvent::Done => {
                guard.finish(Outcome::Completed);
                return false;
            }
            StreamEvent::Failed { code, message } => {
                tracing::warn!(session = %session_id, "Backend reported error {}: {}", code, message);
                let detail = if code.is_empty() {
                    message
                } else {
                    format!("{}: {}", code, message)
                };
                guard.finish(Outcome::Failed(StreamErrorKind::Backend, detail));
                return false;
            }
        }
    }
    true
}
