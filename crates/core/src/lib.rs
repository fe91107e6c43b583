//! Copilot Core - domain model for the educational copilot client.
//!
//! Contains:
//! - Agent: the backend persona roster
//! - Message: chat turns and the append-only store
//! - Session: the backend session mirror and its merge rule
//! - Mastery: display banding for mastery and sentiment
//! - Markdown: sanitizing formatter for agent replies
//! - Wire: HTTP request/response bodies
//! - Config / Error

pub mod agent;
pub mod config;
pub mod error;
pub mod markdown;
pub mod mastery;
pub mod message;
pub mod session;
pub mod wire;

pub use agent::AgentRole;
pub use config::{ConfigError, CopilotConfig, TuiConfig};
pub use error::BackendError;
pub use mastery::{MasteryBand, mastery_band, mastery_percent, ring_fraction};
pub use message::{ChatMessage, MessageStore, Sender, WELCOME_MESSAGE};
pub use session::{SessionPatch, SessionState, TopicMastery, merge};
pub use wire::{ChatReply, ChatRequest, ErrorBody, HealthReply};
