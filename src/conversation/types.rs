//! Message and conversation records
//!
//! These are the persisted shapes. Field names are camelCase on the wire so
//! the stored collection and the chat request body share one encoding.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Title given to a conversation before its first user message
pub const DEFAULT_TITLE: &str = "New conversation";

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Typed by the person at the keyboard
    User,
    /// Produced by the model
    Assistant,
    /// Instructions injected ahead of the dialogue
    System,
}

impl Role {
    /// Wire name of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single chat message
///
/// Everything except `content` is fixed at creation. `content` only grows
/// while an assistant stream is writing into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique identifier, never reused
    pub id: String,
    /// Author of the message
    pub role: Role,
    /// UTF-8 text body
    pub content: String,
    /// Creation instant
    pub timestamp: DateTime<Utc>,
    /// Model that produced an assistant message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Failure detail when the stream feeding this message failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Message {
    /// Creates a message with a fresh id and the current time
    ///
    /// # Examples
    ///
    /// ```
    /// use chatline::conversation::{Message, Role};
    ///
    /// let msg = Message::new(Role::User, "Hello");
    /// assert_eq!(msg.role, Role::User);
    /// assert_eq!(msg.content, "Hello");
    /// assert!(msg.model.is_none());
    /// ```
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            model: None,
            error: None,
        }
    }

    /// Creates a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates an empty assistant message tagged with the producing model
    pub fn assistant_placeholder(model: impl Into<String>) -> Self {
        let mut msg = Self::new(Role::Assistant, String::new());
        msg.model = Some(model.into());
        msg
    }

    /// Creates a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Whether the stream that produced this message failed
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// A titled, ordered thread of messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Unique identifier
    pub id: String,
    /// Display title, derived from the first user message
    pub title: String,
    /// Messages in append order
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Creation instant
    pub created_at: DateTime<Utc>,
    /// Refreshed on every mutation of `messages`
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Creates an empty conversation with the default title
    ///
    /// # Examples
    ///
    /// ```
    /// use chatline::conversation::Conversation;
    ///
    /// let conv = Conversation::new();
    /// assert_eq!(conv.title, "New conversation");
    /// assert!(conv.messages.is_empty());
    /// assert_eq!(conv.created_at, conv.updated_at);
    /// ```
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: DEFAULT_TITLE.to_string(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Looks up a message by id
    pub fn message(&self, message_id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == message_id)
    }

    pub(crate) fn message_mut(&mut self, message_id: &str) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == message_id)
    }

    /// Appends a message, keeping timestamps non-decreasing
    pub(crate) fn push(&mut self, mut message: Message) {
        if let Some(last) = self.messages.last() {
            if message.timestamp < last.timestamp {
                message.timestamp = last.timestamp;
            }
        }
        self.updated_at = message.timestamp.max(self.updated_at);
        self.messages.push(message);
    }

    /// Refreshes `updated_at` without moving it backwards
    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now().max(self.updated_at);
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

/// Derives a title from the first `max_chars` characters of `text`
///
/// Counts Unicode scalar values, so multi-byte text is never split inside a
/// character.
///
/// # Examples
///
/// ```
/// use chatline::conversation::derive_title;
///
/// assert_eq!(derive_title("Hello", 50), "Hello");
/// assert_eq!(derive_title("héllo wörld", 4), "héll");
/// ```
pub fn derive_title(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
