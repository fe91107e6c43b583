//! Shared test helpers for TUI sub-module tests.

use async_trait::async_trait;
use copilot_core::{BackendError, ChatReply, ChatRequest, HealthReply, SessionPatch};
use ratatui::text::Line;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::Notify;

use crate::chat_backend::ChatBackend;

pub fn line_plain(line: &Line<'_>) -> String {
    line.spans
        .iter()
        .map(|s| s.content.as_ref())
        .collect::<String>()
}

pub fn lines_plain(lines: &[Line<'_>]) -> Vec<String> {
    lines.iter().map(line_plain).collect()
}

pub fn reply_with(
    response: &str,
    agent: Option<&str>,
    session_id: Option<&str>,
    state: Option<SessionPatch>,
) -> ChatReply {
    ChatReply {
        response: response.to_string(),
        agent: agent.map(str::to_string),
        session_id: session_id.map(str::to_string),
        state,
    }
}

/// Answers from a queue and records every request.
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<ChatReply, BackendError>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedBackend {
    pub fn new(replies: Vec<Result<ChatReply, BackendError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    fn base_url(&self) -> &str {
        "http://scripted.test"
    }

    async fn send(&self, request: ChatRequest) -> Result<ChatReply, BackendError> {
        self.requests.lock().expect("requests lock").push(request);
        self.replies
            .lock()
            .expect("replies lock")
            .pop_front()
            .unwrap_or_else(|| {
                Err(BackendError::Transport {
                    message: "script exhausted".to_string(),
                })
            })
    }

    async fn health(&self) -> Result<HealthReply, BackendError> {
        Ok(HealthReply {
            status: "healthy".to_string(),
            agents: vec!["tutor".to_string()],
        })
    }
}

/// Holds every request until `release` is called.
pub struct GatedBackend {
    reply: ChatReply,
    gate: Notify,
}

impl GatedBackend {
    pub fn new(reply: ChatReply) -> Self {
        Self {
            reply,
            gate: Notify::new(),
        }
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl ChatBackend for GatedBackend {
    fn base_url(&self) -> &str {
        "http://gated.test"
    }

    async fn send(&self, _request: ChatRequest) -> Result<ChatReply, BackendError> {
        self.gate.notified().await;
        Ok(self.reply.clone())
    }

    async fn health(&self) -> Result<HealthReply, BackendError> {
        Err(BackendError::Status {
            status: 503,
            detail: None,
        })
    }
}

/// Never answers.
pub struct HangingBackend;

#[async_trait]
impl ChatBackend for HangingBackend {
    fn base_url(&self) -> &str {
        "http://hanging.test"
    }

    async fn send(&self, _request: ChatRequest) -> Result<ChatReply, BackendError> {
        std::future::pending().await
    }

    async fn health(&self) -> Result<HealthReply, BackendError> {
        std::future::pending().await
    }
}
