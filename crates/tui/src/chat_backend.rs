//! ChatBackend trait: abstracts the copilot HTTP service for the controller.
//!
//! This trait lives in `copilot-tui` so the UI never depends on
//! `copilot-interface`. `copilot-interface` provides the reqwest
//! implementation (`HttpChatBackend`).

use std::sync::Arc;

use async_trait::async_trait;
use copilot_core::{BackendError, ChatReply, ChatRequest, HealthReply};

/// The single request/response boundary to the copilot backend.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Base URL shown in status output and error notices.
    fn base_url(&self) -> &str;

    /// One chat turn (`POST /api/chat`).
    async fn send(&self, request: ChatRequest) -> Result<ChatReply, BackendError>;

    /// Liveness probe (`GET /health`).
    async fn health(&self) -> Result<HealthReply, BackendError>;
}

/// Convenience type alias used throughout the TUI crate.
pub type DynChatBackend = Arc<dyn ChatBackend>;
