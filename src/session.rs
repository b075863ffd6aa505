//! Chat session: glue between the conversation store and streamed turns
//!
//! The stream task never touches the store. Its observer forwards each
//! callback as a [`TurnUpdate`] over a channel, and the owner of the
//! session applies updates to the store one at a time. Every update carries
//! the session id of the turn that produced it, so updates queued before a
//! cancel are recognized as stale and dropped.

use crate::conversation::{Conversation, ConversationStore, Message, Role};
use crate::error::{ChatlineError, StoreResult};
use crate::streaming::{StreamErrorKind, StreamHandle, StreamObserver, StreamingChatClient};
use std::collections::HashMap;
use std::future::Future;
use tokio::sync::mpsc;

/// What happened in a turn
#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    /// A content fragment
    Token(String),
    /// The turn finished
    Complete,
    /// The turn failed
    Failed {
        kind: StreamErrorKind,
        detail: String,
    },
}

/// One observer callback, tagged with its origin
#[derive(Debug, Clone, PartialEq)]
pub struct TurnUpdate {
    /// Stream session that produced the update
    pub session_id: String,
    /// Conversation being streamed into
    pub conversation_id: String,
    /// Assistant message being streamed into
    pub message_id: String,
    /// Payload
    pub event: TurnEvent,
}

/// Identifies a submitted turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnTicket {
    pub session_id: String,
    pub conversation_id: String,
    pub user_message_id: String,
    pub message_id: String,
    pub model: String,
}

/// Result of applying one update to the store
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    /// A fragment was appended
    Token(String),
    /// The message was finalized
    Completed,
    /// The message was marked failed
    Failed {
        kind: StreamErrorKind,
        detail: String,
    },
    /// The update belongs to a turn that is no longer active
    Stale,
    /// The target conversation or message is gone; the turn was stopped
    TargetGone,
}

/// How a turn driven by [`ChatSession::run_turn_until`] ended
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Completed,
    Failed {
        kind: StreamErrorKind,
        detail: String,
    },
    /// Stopped by the caller; partial content is kept
    Stopped,
    /// The conversation was deleted under the turn
    Vanished,
}

struct ActiveTurn {
    handle: StreamHandle,
    message_id: String,
}

struct ChannelObserver {
    tx: mpsc::UnboundedSender<TurnUpdate>,
    session_id: String,
    conversation_id: String,
    message_id: String,
}

impl ChannelObserver {
    fn send(&self, event: TurnEvent) {
        let update = TurnUpdate {
            session_id: self.session_id.clone(),
            conversation_id: self.conversation_id.clone(),
            message_id: self.message_id.clone(),
            event,
        };
        if self.tx.send(update).is_err() {
            tracing::debug!(session = %self.session_id, "Chat session gone, dropping update");
        }
    }
}

impl StreamObserver for ChannelObserver {
    fn on_token(&mut self, fragment: &str) {
        self.send(TurnEvent::Token(fragment.to_string()));
    }

    fn on_complete(&mut self) {
        self.send(TurnEvent::Complete);
    }

    fn on_error(&mut self, kind: StreamErrorKind, detail: &str) {
        self.send(TurnEvent::Failed {
            kind,
            detail: detail.to_string(),
        });
    }
}

/// Owns the store and the streams feeding it
pub struct ChatSession {
    store: ConversationStore,
    client: StreamingChatClient,
    tx: mpsc::UnboundedSender<TurnUpdate>,
    rx: mpsc::UnboundedReceiver<TurnUpdate>,
    turns: HashMap<String, ActiveTurn>,
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("store", &self.store)
            .field("active_turns", &self.turns.len())
            .finish()
    }
}

impl ChatSession {
    pub fn new(store: ConversationStore, client: StreamingChatClient) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            store,
            client,
            tx,
            rx,
            turns: HashMap::new(),
        }
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Direct store access for edits that do not affect streaming
    ///
    /// Use [`create`](Self::create), [`select`](Self::select) and
    /// [`delete`](Self::delete) on the session instead of the store so
    /// running turns are stopped.
    pub fn store_mut(&mut self) -> &mut ConversationStore {
        &mut self.store
    }

    /// Whether a turn is streaming into the conversation
    pub fn is_streaming(&self, conversation_id: &str) -> bool {
        self.turns.contains_key(conversation_id)
    }

    /// Submits a user turn and starts streaming the reply
    ///
    /// A turn already running in the conversation is stopped first.
    ///
    /// # Errors
    ///
    /// `NotFound` when the conversation does not exist.
    pub fn send(
        &mut self,
        conversation_id: &str,
        text: &str,
        model: &str,
    ) -> StoreResult<TurnTicket> {
        if self.store.get(conversation_id).is_none() {
            return Err(ChatlineError::conversation_not_found(conversation_id));
        }
        self.stop(conversation_id);

        let user_message = self.store.append_user_message(conversation_id, text)?;
        let history = self.history(conversation_id);
        let message_id = self.store.begin_assistant_message(conversation_id, model)?;

        let session_id = uuid::Uuid::new_v4().to_string();
        let observer = ChannelObserver {
            tx: self.tx.clone(),
            session_id: session_id.clone(),
            conversation_id: conversation_id.to_string(),
            message_id: message_id.clone(),
        };
        let handle = self.client.stream_turn_as(
            session_id.clone(),
            conversation_id,
            model,
            history,
            Box::new(observer),
        );

        self.turns.insert(
            conversation_id.to_string(),
            ActiveTurn {
                handle,
                message_id: message_id.clone(),
            },
        );

        Ok(TurnTicket {
            session_id,
            conversation_id: conversation_id.to_string(),
            user_message_id: user_message.id,
            message_id,
            model: model.to_string(),
        })
    }

    /// Messages sent as context for the next turn
    ///
    /// Assistant messages that never received content are left out.
    fn history(&self, conversation_id: &str) -> Vec<Message> {
        self.store
            .get(conversation_id)
            .map(|c| {
                c.messages
                    .iter()
                    .filter(|m| !(m.role == Role::Assistant && m.content.is_empty()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Waits for the next update from any turn
    pub async fn next_update(&mut self) -> Option<TurnUpdate> {
        self.rx.recv().await
    }

    /// Applies one update to the store
    pub fn apply(&mut self, update: TurnUpdate) -> Applied {
        let current = self
            .turns
            .get(&update.conversation_id)
            .map(|turn| turn.handle.session_id());
        if current != Some(update.session_id.as_str()) {
            tracing::debug!(session = %update.session_id, "Dropping update from stale turn");
            return Applied::Stale;
        }

        let conversation_id = update.conversation_id.as_str();
        let message_id = update.message_id.as_str();
        match update.event {
            TurnEvent::Token(fragment) => {
                match self
                    .store
                    .append_to_message(conversation_id, message_id, &fragment)
                {
                    Ok(()) => Applied::Token(fragment),
                    Err(e) => self.target_gone(conversation_id, e),
                }
            }
            TurnEvent::Complete => {
                self.turns.remove(conversation_id);
                match self.store.finalize_message(conversation_id, message_id) {
                    Ok(()) => Applied::Completed,
                    Err(e) => self.target_gone(conversation_id, e),
                }
            }
            TurnEvent::Failed { kind, detail } => {
                self.turns.remove(conversation_id);
                let recorded = format!("{}: {}", kind, detail);
                match self
                    .store
                    .fail_message(conversation_id, message_id, recorded)
                {
                    Ok(()) => Applied::Failed { kind, detail },
                    Err(e) => self.target_gone(conversation_id, e),
                }
            }
        }
    }

    fn target_gone(&mut self, conversation_id: &str, error: ChatlineError) -> Applied {
        tracing::warn!("Stream target vanished: {}", error);
        if let Some(turn) = self.turns.remove(conversation_id) {
            turn.handle.cancel();
        }
        Applied::TargetGone
    }

    /// Stops the turn streaming into a conversation, keeping partial content
    ///
    /// Returns false when nothing was streaming.
    pub fn stop(&mut self, conversation_id: &str) -> bool {
        let Some(turn) = self.turns.remove(conversation_id) else {
            return false;
        };
        turn.handle.cancel();
        if let Err(e) = self
            .store
            .finalize_message(conversation_id, &turn.message_id)
        {
            if !e.is_not_found() {
                tracing::warn!("Failed to finalize stopped message: {}", e);
            }
        }
        tracing::info!(conversation = %conversation_id, "Stopped streaming turn");
        true
    }

    /// Stops every running turn
    pub fn stop_all(&mut self) {
        let ids: Vec<String> = self.turns.keys().cloned().collect();
        for id in ids {
            self.stop(&id);
        }
    }

    /// Makes a conversation active, stopping the turn of the one it replaces
    pub fn select(&mut self, conversation_id: &str) {
        if self.store.get(conversation_id).is_none() {
            return;
        }
        if let Some(previous) = self.store.active_id().map(str::to_string) {
            if previous != conversation_id {
                self.stop(&previous);
            }
        }
        self.store.select(conversation_id);
    }

    /// Creates a conversation and makes it active, stopping the turn of the
    /// one it replaces
    pub fn create(&mut self) -> Conversation {
        if let Some(previous) = self.store.active_id().map(str::to_string) {
            self.stop(&previous);
        }
        self.store.create()
    }

    /// Stops the conversation's turn, then deletes it
    pub fn delete(&mut self, conversation_id: &str) {
        self.stop(conversation_id);
        self.store.delete(conversation_id);
    }

    /// Drives one turn to its end, applying updates from every turn
    pub async fn run_turn_to_end<F>(&mut self, ticket: &TurnTicket, on_token: F) -> TurnOutcome
    where
        F: FnMut(&str),
    {
        self.run_turn_until(ticket, on_token, std::future::pending::<()>())
            .await
    }

    /// Like [`run_turn_to_end`](Self::run_turn_to_end), stopping the turn
    /// when `interrupt` resolves first
    pub async fn run_turn_until<F, I>(
        &mut self,
        ticket: &TurnTicket,
        mut on_token: F,
        interrupt: I,
    ) -> TurnOutcome
    where
        F: FnMut(&str),
        I: Future<Output = ()>,
    {
        tokio::pin!(interrupt);

        loop {
            if !self.is_turn_active(ticket) {
                // Ended before this call, or replaced by a newer turn.
                return TurnOutcome::Stopped;
            }

            let update = tokio::select! {
                _ = &mut interrupt => {
                    self.stop(&ticket.conversation_id);
                    return TurnOutcome::Stopped;
                }
                update = self.rx.recv() => update,
            };

            let Some(update) = update else {
                return TurnOutcome::Stopped;
            };
            let ours = update.session_id == ticket.session_id;

            match self.apply(update) {
                Applied::Token(fragment) if ours => on_token(&fragment),
                Applied::Completed if ours => return TurnOutcome::Completed,
                Applied::Failed { kind, detail } if ours => {
                    return TurnOutcome::Failed { kind, detail }
                }
                Applied::TargetGone if ours => return TurnOutcome::Vanished,
                _ => {}
            }
        }
    }

    fn is_turn_active(&self, ticket: &TurnTicket) -> bool {
        self.turns
            .get(&ticket.conversation_id)
            .is_some_and(|turn| turn.handle.session_id() == ticket.session_id)
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.stop_all();
    }
}
