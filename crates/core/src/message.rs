//! Chat turns and the append-only message store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::agent::AgentRole;

/// Greeting shown before the first exchange.
pub const WELCOME_MESSAGE: &str =
    "Hello! I'm your Multi-Agent Educational Copilot. What would you like to learn today?";

/// Who authored a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    Human,
    Agent,
}

/// A single chat turn. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// ULID (millisecond timestamp plus 80 random bits); only a render key
    pub id: String,
    pub text: String,
    pub sender: Sender,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<AgentRole>,
    pub timestamp: DateTime<Utc>,
    /// Agent turn carrying a failure notice rather than a backend reply
    #[serde(default)]
    pub is_error: bool,
}

impl ChatMessage {
    pub fn human(text: impl Into<String>) -> Self {
        Self {
            id: Ulid::new().to_string(),
            text: text.into(),
            sender: Sender::Human,
            agent: None,
            timestamp: Utc::now(),
            is_error: false,
        }
    }

    pub fn agent(agent: AgentRole, text: impl Into<String>) -> Self {
        Self {
            id: Ulid::new().to_string(),
            text: text.into(),
            sender: Sender::Agent,
            agent: Some(agent),
            timestamp: Utc::now(),
            is_error: false,
        }
    }

    pub fn agent_error(agent: AgentRole, notice: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::agent(agent, notice)
        }
    }

    pub fn is_human(&self) -> bool {
        self.sender == Sender::Human
    }
}

/// Ordered, append-only sequence of turns for the lifetime of a session.
#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    messages: Vec<ChatMessage>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with the planner's greeting.
    pub fn with_welcome() -> Self {
        let mut store = Self::new();
        store.push(ChatMessage::agent(AgentRole::Planner, WELCOME_MESSAGE));
        store
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ChatMessage> {
        self.messages.iter()
    }

    pub fn as_slice(&self) -> &[ChatMessage] {
        &self.messages
    }
}

impl<'a> IntoIterator for &'a MessageStore {
    type Item = &'a ChatMessage;
    type IntoIter = std::slice::Iter<'a, ChatMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}
