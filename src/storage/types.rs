use std::fmt;

/// Logical keys of the persisted client state
///
/// Each key is read and written independently; a missing key means the
/// default (empty collection, no active conversation, no selected model).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    /// Serialized conversation collection (JSON array)
    Conversations,
    /// Id of the conversation shown to the user
    ActiveConversationId,
    /// Last model the user picked
    SelectedModel,
}

impl StorageKey {
    /// All keys, in the order they are written
    pub const ALL: [StorageKey; 3] = [
        StorageKey::Conversations,
        StorageKey::ActiveConversationId,
        StorageKey::SelectedModel,
    ];

    /// Name of the key in the backing store
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKey::Conversations => "conversations",
            StorageKey::ActiveConversationId => "active_conversation_id",
            StorageKey::SelectedModel => "selected_model",
        }
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
