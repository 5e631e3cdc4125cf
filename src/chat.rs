//! Conversation transcript.

use serde::{Deserialize, Serialize};

/// Author of a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single role-tagged message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Append-only transcript sent to the model on every turn.
///
/// By convention the system message sits at index 0, but nothing enforces it.
#[derive(Debug, Clone, Default)]
pub struct ChatBuilder {
    chat: Vec<ChatMessage>,
}

impl ChatBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn system_message(&mut self, content: impl Into<String>) -> &mut Self {
        self.push(Role::System, content)
    }

    pub fn user_message(&mut self, content: impl Into<String>) -> &mut Self {
        self.push(Role::User, content)
    }

    pub fn assistant_message(&mut self, content: impl Into<String>) -> &mut Self {
        self.push(Role::Assistant, content)
    }

    fn push(&mut self, role: Role, content: impl Into<String>) -> &mut Self {
        self.chat.push(ChatMessage::new(role, content));
        self
    }

    /// Messages in the order they were appended.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.chat
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.chat.last()
    }

    pub fn len(&self) -> usize {
        self.chat.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chat.is_empty()
    }
}
