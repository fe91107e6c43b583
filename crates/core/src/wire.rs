//! JSON bodies exchanged with the copilot backend.

use serde::{Deserialize, Serialize};

use crate::session::SessionPatch;

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub student_id: String,
    /// `null` until the backend has issued a session
    pub session_id: Option<String>,
}

/// Successful reply. Only `response` is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<SessionPatch>,
}

impl ChatReply {
    pub fn text(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            agent: None,
            session_id: None,
            state: None,
        }
    }
}

/// Body of a non-2xx reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<String>,
}

/// `GET /health` reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReply {
    pub status: String,
    #[serde(default)]
    pub agents: Vec<String>,
}
