//! Copilot Interface - user-facing layer
//!
//! Responsibilities:
//! - CLI entry point (`chat`, `ask`, `health`)
//! - HTTP implementation of the chat backend
//! - Tracing subscriber setup

pub mod cli;
pub mod http_backend;
pub mod logging;


pub use cli::{CliConfig, CliError, OutputFormat, ask_once, render_ask, render_health, run_cli};
pub use http_backend::HttpChatBackend;
