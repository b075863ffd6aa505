//! Conversation state management
//!
//! [`ConversationStore`] owns the ordered conversation collection, the active
//! conversation id and the last selected model. It is the only writer of the
//! persisted client state: every mutation is written back through the
//! injected [`KeyValueStorage`].
//!
//! # Streaming into a message
//!
//! An assistant reply is built in three steps:
//!
//! 1. [`ConversationStore::begin_assistant_message`] appends an empty
//!    placeholder and marks it in-flight (at most one per conversation)
//! 2. [`ConversationStore::append_to_message`] grows its content per token
//! 3. [`ConversationStore::finalize_message`] or
//!    [`ConversationStore::fail_message`] freezes it
//!
//! Token appends are the hot path, so their writes may be coalesced by a
//! flush interval. Every other mutation is written immediately.

use crate::error::{ChatlineError, StoreResult};
use crate::storage::{KeyValueStorage, StorageKey};
use std::collections::HashMap;
use std::time::{Duration, Instant};

pub mod types;
pub use types::{derive_title, Conversation, Message, Role, DEFAULT_TITLE};

/// Default number of characters kept when deriving a title
pub const DEFAULT_TITLE_MAX_CHARS: usize = 50;

/// Tuning knobs for [`ConversationStore`]
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Characters of the first user message used as the title
    pub title_max_chars: usize,
    /// Minimum time between writes caused by token appends; zero writes on
    /// every append
    pub flush_interval: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            title_max_chars: DEFAULT_TITLE_MAX_CHARS,
            flush_interval: Duration::ZERO,
        }
    }
}

/// Owner of the conversation collection
///
/// # Examples
///
/// ```
/// use chatline::conversation::{ConversationStore, Role};
/// use chatline::storage::MemoryStorage;
///
/// let mut store = ConversationStore::load(MemoryStorage::new());
/// let conv = store.create();
/// store.append_user_message(&conv.id, "Hello").unwrap();
///
/// let conv = store.get(&conv.id).unwrap();
/// assert_eq!(conv.title, "Hello");
/// assert_eq!(conv.messages[0].role, Role::User);
/// ```
pub struct ConversationStore {
    storage: Box<dyn KeyValueStorage>,
    conversations: Vec<Conversation>,
    active_id: Option<String>,
    selected_model: Option<String>,
    /// conversation id -> id of the assistant message being streamed into
    in_flight: HashMap<String, String>,
    options: StoreOptions,
    dirty: bool,
    last_flush: Option<Instant>,
}

impl std::fmt::Debug for ConversationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationStore")
            .field("conversations", &self.conversations.len())
            .field("active_id", &self.active_id)
            .field("selected_model", &self.selected_model)
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}

impl ConversationStore {
    /// Loads the persisted state with default options
    pub fn load(storage: impl KeyValueStorage + 'static) -> Self {
        Self::load_with_options(storage, StoreOptions::default())
    }

    /// Loads the persisted state
    ///
    /// Missing or unreadable state yields an empty store; the failure is
    /// logged and never returned.
    pub fn load_with_options(storage: impl KeyValueStorage + 'static, options: StoreOptions) -> Self {
        let storage: Box<dyn KeyValueStorage> = Box::new(storage);

        let conversations = read_conversations(storage.as_ref());
        let active_id = read_key(storage.as_ref(), StorageKey::ActiveConversationId)
            .filter(|id| conversations.iter().any(|c| &c.id == id));
        let selected_model = read_key(storage.as_ref(), StorageKey::SelectedModel)
            .filter(|m| !m.is_empty());

        tracing::debug!(
            conversations = conversations.len(),
            active = ?active_id,
            "Loaded conversation store"
        );

        Self {
            storage,
            conversations,
            active_id,
            selected_model,
            in_flight: HashMap::new(),
            options,
            dirty: false,
            last_flush: None,
        }
    }

    /// All conversations, newest first
    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    /// Number of conversations
    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    /// Whether the store holds no conversations
    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Looks up a conversation
    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    /// Id of the active conversation
    pub fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    /// The active conversation
    pub fn active(&self) -> Option<&Conversation> {
        self.active_id.as_deref().and_then(|id| self.get(id))
    }

    /// Id of the assistant message currently streamed into `conversation_id`
    pub fn in_flight(&self, conversation_id: &str) -> Option<&str> {
        self.in_flight.get(conversation_id).map(String::as_str)
    }

    /// Last model the user picked
    pub fn selected_model(&self) -> Option<&str> {
        self.selected_model.as_deref()
    }

    /// Resolves a full id or a unique id prefix
    ///
    /// # Errors
    ///
    /// `NotFound` when nothing matches, `Conflict` when the prefix is
    /// ambiguous.
    pub fn resolve_id(&self, id_or_prefix: &str) -> StoreResult<String> {
        if self.get(id_or_prefix).is_some() {
            return Ok(id_or_prefix.to_string());
        }
        let mut matches = self
            .conversations
            .iter()
            .filter(|c| !id_or_prefix.is_empty() && c.id.starts_with(id_or_prefix));
        match (matches.next(), matches.next()) {
            (Some(c), None) => Ok(c.id.clone()),
            (Some(_), Some(_)) => Err(ChatlineError::Conflict(format!(
                "id prefix '{}' matches more than one conversation",
                id_or_prefix
            ))),
            (None, _) => Err(ChatlineError::conversation_not_found(id_or_prefix)),
        }
    }

    /// Creates an empty conversation at the front and makes it active
    pub fn create(&mut self) -> Conversation {
        let conversation = Conversation::new();
        tracing::debug!(id = %conversation.id, "Created conversation");
        self.conversations.insert(0, conversation.clone());
        self.active_id = Some(conversation.id.clone());
        self.persist();
        conversation
    }

    /// Sets the active conversation; unknown ids are ignored
    pub fn select(&mut self, id: &str) {
        if self.get(id).is_none() {
            tracing::debug!(id, "Ignoring select of unknown conversation");
            return;
        }
        if self.active_id.as_deref() == Some(id) {
            return;
        }
        self.active_id = Some(id.to_string());
        self.persist();
    }

    /// Removes a conversation; unknown ids are ignored
    ///
    /// Deleting the active conversation leaves no conversation active.
    pub fn delete(&mut self, id: &str) {
        let before = self.conversations.len();
        self.conversations.retain(|c| c.id != id);
        if self.conversations.len() == before {
            return;
        }
        self.in_flight.remove(id);
        if self.active_id.as_deref() == Some(id) {
            self.active_id = None;
        }
        tracing::debug!(id, "Deleted conversation");
        self.persist();
    }

    /// Replaces the title of a conversation
    pub fn rename(&mut self, id: &str, title: impl Into<String>) -> StoreResult<()> {
        let conversation = self.conversation_mut(id)?;
        conversation.title = title.into();
        conversation.touch();
        self.persist();
        Ok(())
    }

    /// Records the model the user picked; `None` clears it
    pub fn set_selected_model(&mut self, model: Option<String>) {
        let model = model.filter(|m| !m.is_empty());
        if self.selected_model == model {
            return;
        }
        self.selected_model = model;
        self.persist();
    }

    /// Appends a user message
    ///
    /// When it is the first message of the conversation it also sets the title.
    pub fn append_user_message(
        &mut self,
        conversation_id: &str,
        text: impl Into<String>,
    ) -> StoreResult<Message> {
        let title_max_chars = self.options.title_max_chars;
        let text = text.into();
        let conversation = self.conversation_mut(conversation_id)?;

        if conversation.messages.is_empty() {
            conversation.title = derive_title(&text, title_max_chars);
        }

        let message = Message::user(text);
        conversation.push(message.clone());
        let message = conversation.messages.last().cloned().unwrap_or(message);

        self.persist();
        Ok(message)
    }

    /// Appends an empty assistant message and marks it in-flight
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown conversation, `Conflict` when another
    /// assistant message is still in-flight there.
    pub fn begin_assistant_message(
        &mut self,
        conversation_id: &str,
        model: impl Into<String>,
    ) -> StoreResult<String> {
        if self.get(conversation_id).is_none() {
            return Err(ChatlineError::conversation_not_found(conversation_id));
        }
        if let Some(existing) = self.in_flight.get(conversation_id) {
            return Err(ChatlineError::Conflict(format!(
                "assistant message {} is still streaming into conversation {}",
                existing, conversation_id
            )));
        }

        let conversation = self.conversation_mut(conversation_id)?;
        let message = Message::assistant_placeholder(model);
        let message_id = message.id.clone();
        conversation.push(message);

        self.in_flight
            .insert(conversation_id.to_string(), message_id.clone());
        self.persist();
        Ok(message_id)
    }

    /// Appends streamed text to the in-flight message
    ///
    /// # Errors
    ///
    /// `NotFound` when the conversation or message is gone, or when the
    /// message is no longer in-flight. Callers drop the fragment.
    pub fn append_to_message(
        &mut self,
        conversation_id: &str,
        message_id: &str,
        delta: &str,
    ) -> StoreResult<()> {
        if self.get(conversation_id).is_none() {
            return Err(ChatlineError::conversation_not_found(conversation_id));
        }
        if self.in_flight(conversation_id) != Some(message_id) {
            return Err(ChatlineError::message_not_found(message_id));
        }

        let conversation = self.conversation_mut(conversation_id)?;
        let message = conversation
            .message_mut(message_id)
            .ok_or_else(|| ChatlineError::message_not_found(message_id))?;
        if delta.is_empty() {
            return Ok(());
        }
        message.content.push_str(delta);
        conversation.touch();

        self.dirty = true;
        self.persist_debounced();
        Ok(())
    }

    /// Freezes a streamed message and frees the in-flight slot
    pub fn finalize_message(&mut self, conversation_id: &str, message_id: &str) -> StoreResult<()> {
        self.close_message(conversation_id, message_id, None)
    }

    /// Freezes a streamed message whose stream failed
    ///
    /// Partial content is kept; `detail` is recorded on the message so the
    /// turn can be offered for retry.
    pub fn fail_message(
        &mut self,
        conversation_id: &str,
        message_id: &str,
        detail: impl Into<String>,
    ) -> StoreResult<()> {
        self.close_message(conversation_id, message_id, Some(detail.into()))
    }

    fn close_message(
        &mut self,
        conversation_id: &str,
        message_id: &str,
        error: Option<String>,
    ) -> StoreResult<()> {
        let conversation = self.conversation_mut(conversation_id)?;
        let message = conversation
            .message_mut(message_id)
            .ok_or_else(|| ChatlineError::message_not_found(message_id))?;
        if error.is_some() {
            message.error = error;
            conversation.touch();
        }

        if self.in_flight(conversation_id) == Some(message_id) {
            self.in_flight.remove(conversation_id);
        }
        self.persist();
        Ok(())
    }

    /// Writes pending appends
    pub fn flush(&mut self) {
        if self.dirty {
            self.persist();
        }
    }

    fn conversation_mut(&mut self, id: &str) -> StoreResult<&mut Conversation> {
        self.conversations
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| ChatlineError::conversation_not_found(id))
    }

    fn persist_debounced(&mut self) {
        let due = self.options.flush_interval.is_zero()
            || self
                .last_flush
                .map_or(true, |at| at.elapsed() >= self.options.flush_interval);
        if due {
            self.persist();
        }
    }

    /// Serializes the full state and writes all keys in one batch
    fn persist(&mut self) {
        self.dirty = true;
        let conversations = match serde_json::to_string(&self.conversations) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Failed to serialize conversations: {}", e);
                return;
            }
        };

        let batch = [
            (StorageKey::Conversations, Some(conversations)),
            (StorageKey::ActiveConversationId, self.active_id.clone()),
            (StorageKey::SelectedModel, self.selected_model.clone()),
        ];

        match self.storage.write_batch(&batch) {
            Ok(()) => {
                self.dirty = false;
                self.last_flush = Some(Instant::now());
            }
            Err(e) => tracing::error!("Failed to persist conversations: {}", e),
        }
    }
}

impl Drop for ConversationStore {
    fn drop(&mut self) {
        self.flush();
    }
}

fn read_key(storage: &dyn KeyValueStorage, key: StorageKey) -> Option<String> {
    match storage.get(key) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Failed to read {}: {}", key, e);
            None
        }
    }
}

fn read_conversations(storage: &dyn KeyValueStorage) -> Vec<Conversation> {
    let Some(raw) = read_key(storage, StorageKey::Conversations) else {
        return Vec::new();
    };
    match serde_json::from_str::<Vec<Conversation>>(&raw) {
        Ok(conversations) => conversations,
        Err(e) => {
            tracing::warn!("Stored conversations are unreadable, starting empty: {}", e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn new_store() -> (ConversationStore, MemoryStorage) {
        let storage = MemoryStorage::new();
        (ConversationStore::load(storage.clone()), storage)
    }

    fn stored_conversations(storage: &MemoryStorage) -> Vec<Conversation> {
        let raw = storage
            .get(StorageKey::Conversations)
            .unwrap()
            .expect("conversations persisted");
        serde_json::from_str(&raw).unwrap()
    }

    #[test]
    fn test_create_inserts_at_front_and_activates() {
        let (mut store, _) = new_store();
        let first = store.create();
        let second = store.create();

        assert_eq!(store.conversations()[0].id, second.id);
        assert_eq!(store.conversations()[1].id, first.id);
        assert_eq!(store.active_id(), Some(second.id.as_str()));
    }

    #[test]
    fn test_select_unknown_is_noop() {
        let (mut store, _) = new_store();
        let conv = store.create();
        store.select("missing");
        assert_eq!(store.active_id(), Some(conv.id.as_str()));
    }

    #[test]
    fn test_delete_active_clears_active_without_reassigning() {
        let (mut store, storage) = new_store();
        let older = store.create();
        let newer = store.create();

        store.delete(&newer.id);
        assert!(store.active_id().is_none());
        assert_eq!(store.len(), 1);
        assert_eq!(store.conversations()[0].id, older.id);
        assert!(storage
            .get(StorageKey::ActiveConversationId)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_delete_twice_matches_delete_once() {
        let (mut store, storage) = new_store();
        let keep = store.create();
        let doomed = store.create();

        store.delete(&doomed.id);
        let once = stored_conversations(&storage);
        store.delete(&doomed.id);
        let twice = stored_conversations(&storage);

        assert_eq!(once, twice);
        assert_eq!(twice.len(), 1);
        assert_eq!(twice[0].id, keep.id);
    }

    #[test]
    fn test_first_user_message_sets_title() {
        let (mut store, _) = new_store();
        let conv = store.create();
        let msg = store.append_user_message(&conv.id, "Hello").unwrap();

        let conv = store.get(&conv.id).unwrap();
        assert_eq!(conv.title, "Hello");
        assert_eq!(conv.messages[0].role, Role::User);
        assert_eq!(conv.messages[0].id, msg.id);
    }

    #[test]
    fn test_title_set_once_and_truncated() {
        let (mut store, _) = new_store();
        let conv = store.create();
        let long = "x".repeat(70);
        store.append_user_message(&conv.id, long.as_str()).unwrap();
        store.append_user_message(&conv.id, "second").unwrap();

        let conv = store.get(&conv.id).unwrap();
        assert_eq!(conv.title, "x".repeat(50));
    }

    #[test]
    fn test_title_kept_when_assistant_spoke_first() {
        let (mut store, _) = new_store();
        let conv = store.create();
        let reply = store.begin_assistant_message(&conv.id, "m").unwrap();
        store.append_to_message(&conv.id, &reply, "Welcome").unwrap();
        store.finalize_message(&conv.id, &reply).unwrap();
        store.append_user_message(&conv.id, "Hello").unwrap();

        let conv = store.get(&conv.id).unwrap();
        assert_eq!(conv.title, DEFAULT_TITLE);
        assert_eq!(conv.messages.len(), 2);
    }

    #[test]
    fn test_rename_overrides_title() {
        let (mut store, _) = new_store();
        let conv = store.create();
        store.append_user_message(&conv.id, "Hello").unwrap();
        store.rename(&conv.id, "Greetings").unwrap();
        store.append_user_message(&conv.id, "again").unwrap();
        assert_eq!(store.get(&conv.id).unwrap().title, "Greetings");

        let err = store.rename("missing", "x").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_append_user_message_unknown_conversation() {
        let (mut store, _) = new_store();
        let err = store.append_user_message("nope", "hi").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_second_begin_conflicts_until_finalized() {
        let (mut store, _) = new_store();
        let conv = store.create();
        let first = store.begin_assistant_message(&conv.id, "tinyllama").unwrap();

        let err = store
            .begin_assistant_message(&conv.id, "tinyllama")
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.get(&conv.id).unwrap().messages.len(), 1);

        store.finalize_message(&conv.id, &first).unwrap();
        assert!(store.in_flight(&conv.id).is_none());
        store
            .begin_assistant_message(&conv.id, "tinyllama")
            .expect("slot freed after finalize");
    }

    #[test]
    fn test_begin_unknown_conversation_is_not_found() {
        let (mut store, _) = new_store();
        let err = store.begin_assistant_message("nope", "m").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_streamed_content_is_concatenation_in_order() {
        let (mut store, _) = new_store();
        let conv = store.create();
        store.append_user_message(&conv.id, "Say hi").unwrap();
        let msg_id = store.begin_assistant_message(&conv.id, "tinyllama").unwrap();

        for fragment in ["Hi", " there", "!"] {
            store.append_to_message(&conv.id, &msg_id, fragment).unwrap();
        }
        store.finalize_message(&conv.id, &msg_id).unwrap();

        let conv = store.get(&conv.id).unwrap();
        let roles: Vec<Role> = conv.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
        assert_eq!(conv.messages[1].content, "Hi there!");
        assert_eq!(conv.messages[1].model.as_deref(), Some("tinyllama"));
    }

    #[test]
    fn test_append_after_finalize_is_rejected() {
        let (mut store, _) = new_store();
        let conv = store.create();
        let msg_id = store.begin_assistant_message(&conv.id, "m").unwrap();
        store.append_to_message(&conv.id, &msg_id, "done").unwrap();
        store.finalize_message(&conv.id, &msg_id).unwrap();

        let err = store
            .append_to_message(&conv.id, &msg_id, "late")
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.get(&conv.id).unwrap().messages[0].content, "done");
    }

    #[test]
    fn test_append_after_delete_is_not_found() {
        let (mut store, _) = new_store();
        let conv = store.create();
        let msg_id = store.begin_assistant_message(&conv.id, "m").unwrap();
        store.append_to_message(&conv.id, &msg_id, "par").unwrap();

        store.delete(&conv.id);

        let err = store
            .append_to_message(&conv.id, &msg_id, "tial")
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(store.in_flight(&conv.id).is_none());
    }

    #[test]
    fn test_fail_message_keeps_partial_content() {
        let (mut store, _) = new_store();
        let conv = store.create();
        let msg_id = store.begin_assistant_message(&conv.id, "m").unwrap();
        store.append_to_message(&conv.id, &msg_id, "partial").unwrap();
        store
            .fail_message(&conv.id, &msg_id, "connection reset")
            .unwrap();

        let msg = store.get(&conv.id).unwrap().message(&msg_id).unwrap();
        assert_eq!(msg.content, "partial");
        assert_eq!(msg.error.as_deref(), Some("connection reset"));
        assert!(store.in_flight(&conv.id).is_none());
    }

    #[test]
    fn test_updated_at_refreshed_on_append() {
        let (mut store, _) = new_store();
        let conv = store.create();
        let created = store.get(&conv.id).unwrap().updated_at;
        let msg_id = store.begin_assistant_message(&conv.id, "m").unwrap();
        store.append_to_message(&conv.id, &msg_id, "x").unwrap();
        assert!(store.get(&conv.id).unwrap().updated_at >= created);
    }

    #[test]
    fn test_timestamps_non_decreasing() {
        let (mut store, _) = new_store();
        let conv = store.create();
        for i in 0..5 {
            store.append_user_message(&conv.id, format!("m{}", i)).unwrap();
        }
        let conv = store.get(&conv.id).unwrap();
        assert!(conv
            .messages
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_state_round_trips_through_storage() {
        let storage = MemoryStorage::new();
        let (conv_id, msg_id, before) = {
            let mut store = ConversationStore::load(storage.clone());
            let conv = store.create();
            store.append_user_message(&conv.id, "Hello").unwrap();
            let msg_id = store.begin_assistant_message(&conv.id, "tinyllama").unwrap();
            store.append_to_message(&conv.id, &msg_id, "Hi").unwrap();
            store.finalize_message(&conv.id, &msg_id).unwrap();
            store.set_selected_model(Some("tinyllama".to_string()));
            (conv.id.clone(), msg_id, store.get(&conv.id).unwrap().clone())
        };

        let store = ConversationStore::load(storage);
        let after = store.get(&conv_id).expect("conversation reloaded");
        assert_eq!(after, &before);
        assert_eq!(after.message(&msg_id).unwrap().content, "Hi");
        assert_eq!(store.active_id(), Some(conv_id.as_str()));
        assert_eq!(store.selected_model(), Some("tinyllama"));
        assert!(store.in_flight(&conv_id).is_none());
    }

    #[test]
    fn test_malformed_storage_loads_empty() {
        let storage = MemoryStorage::with_entries([
            (StorageKey::Conversations, "{not json".to_string()),
            (StorageKey::ActiveConversationId, "ghost".to_string()),
        ]);
        let store = ConversationStore::load(storage);
        assert!(store.is_empty());
        assert!(store.active_id().is_none());
    }

    #[test]
    fn test_dangling_active_id_is_dropped() {
        let storage = MemoryStorage::with_entries([
            (StorageKey::Conversations, "[]".to_string()),
            (StorageKey::ActiveConversationId, "ghost".to_string()),
        ]);
        let store = ConversationStore::load(storage);
        assert!(store.active_id().is_none());
    }

    #[test]
    fn test_debounced_appends_flush_on_finalize() {
        let storage = MemoryStorage::new();
        let mut store = ConversationStore::load_with_options(
            storage.clone(),
            StoreOptions {
                flush_interval: Duration::from_secs(3600),
                ..StoreOptions::default()
            },
        );
        let conv = store.create();
        let msg_id = store.begin_assistant_message(&conv.id, "m").unwrap();
        store.append_to_message(&conv.id, &msg_id, "a").unwrap();
        store.append_to_message(&conv.id, &msg_id, "b").unwrap();

        let persisted = stored_conversations(&storage);
        assert_eq!(persisted[0].messages[0].content, "");

        store.finalize_message(&conv.id, &msg_id).unwrap();
        let persisted = stored_conversations(&storage);
        assert_eq!(persisted[0].messages[0].content, "ab");
    }

    #[test]
    fn test_drop_flushes_pending_appends() {
        let storage = MemoryStorage::new();
        {
            let mut store = ConversationStore::load_with_options(
                storage.clone(),
                StoreOptions {
                    flush_interval: Duration::from_secs(3600),
                    ..StoreOptions::default()
                },
            );
            let conv = store.create();
            let msg_id = store.begin_assistant_message(&conv.id, "m").unwrap();
            store.append_to_message(&conv.id, &msg_id, "kept").unwrap();
        }
        let persisted = stored_conversations(&storage);
        assert_eq!(persisted[0].messages[0].content, "kept");
    }

    #[test]
    fn test_resolve_id_by_prefix() {
        let (mut store, _) = new_store();
        let conv = store.create();
        let prefix = &conv.id[..8];
        assert_eq!(store.resolve_id(prefix).unwrap(), conv.id);
        assert_eq!(store.resolve_id(&conv.id).unwrap(), conv.id);
        assert!(store.resolve_id("zzzzzzzz").unwrap_err().is_not_found());
        assert!(store.resolve_id("").unwrap_err().is_not_found());
    }

    #[test]
    fn test_selected_model_cleared_with_none() {
        let (mut store, storage) = new_store();
        store.set_selected_model(Some("phi".to_string()));
        assert_eq!(
            storage.get(StorageKey::SelectedModel).unwrap().as_deref(),
            Some("phi")
        );
        store.set_selected_model(None);
        assert!(store.selected_model().is_none());
        assert!(storage.get(StorageKey::SelectedModel).unwrap().is_none());
    }
}
