//! Session data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Title length taken from the first user message.
const TITLE_PREVIEW_CHARS: usize = 30;

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message role
    pub role: Role,
    /// Message content
    pub content: String,
}

impl ChatMessage {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A conversation session bound to one model.
///
/// Field names serialize in camelCase; the serialized shape is the
/// on-disk contract of the history slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    /// Opaque unique identifier, assigned at creation
    pub id: String,
    /// Display title, defaults to a creation-time label
    pub title: String,
    /// Inference model bound to this session
    pub model: String,
    /// Messages in conversation turn order
    pub messages: Vec<ChatMessage>,
    /// Session creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    /// Create a new empty session bound to `model`.
    ///
    /// The id is the creation time in milliseconds; uniqueness is
    /// best-effort, matching the persisted id format.
    pub fn new(model: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: now.timestamp_millis().to_string(),
            title: format!("Chat {}", now.format("%Y-%m-%d %H:%M")),
            model: model.into(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a message and refresh `updated_at`
    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
        self.updated_at = Utc::now();
    }

    /// Replace the message at `index` with `new_content` and discard
    /// everything after it. Returns false (and leaves the session
    /// untouched) when `index` is out of range.
    pub fn edit_and_truncate(&mut self, index: usize, new_content: impl Into<String>) -> bool {
        if index >= self.messages.len() {
            return false;
        }
        self.messages[index].content = new_content.into();
        self.messages.truncate(index + 1);
        self.updated_at = Utc::now();
        true
    }

    /// Derive a session title from the first user message
    pub fn title_preview(text: &str) -> String {
        if text.chars().count() > TITLE_PREVIEW_CHARS {
            text.chars().take(TITLE_PREVIEW_CHARS).collect()
        } else {
            text.to_string()
        }
    }

    /// Refresh `updated_at` to now
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
