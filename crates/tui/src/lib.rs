//! Copilot TUI: terminal user interface for the educational copilot.
//!
//! This crate provides the Chat Controller and the ratatui-based three-pane
//! session UI. It depends on `copilot-core` for domain types and defines the
//! `ChatBackend` trait that `copilot-interface` implements over HTTP.

pub mod chat_backend;
mod app;
mod chat_renderer;
mod commands;
pub mod controller;
pub mod dashboard_panel;
mod input_handler;
mod layout_manager;
pub mod roster_panel;
#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export the trait and controller as the primary public API
pub use chat_backend::{ChatBackend, DynChatBackend};
pub use controller::{ChatController, RejectReason, SubmitOutcome, TurnOutcome};

// Re-export TUI entry point and rendering helpers
pub use app::*;
pub use chat_renderer::*;
pub use commands::*;
pub use input_handler::*;
pub use layout_manager::*;
