//! Backend call failures.

use thiserror::Error;

/// Every way a chat turn can fail. All variants collapse into one
/// user-visible notice; none is fatal and none is retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("Could not connect to the copilot backend: {message}")]
    Transport { message: String },

    #[error("{}", status_text(*status, detail.as_deref()))]
    Status { status: u16, detail: Option<String> },

    #[error("Malformed response from backend: {message}")]
    Malformed { message: String },

    #[error("Backend did not answer within {secs}s")]
    Timeout { secs: u64 },

    #[error("Request cancelled")]
    Cancelled,

    #[error("Request task failed: {message}")]
    TaskFailed { message: String },
}

fn status_text(status: u16, detail: Option<&str>) -> String {
    match detail {
        Some(detail) if !detail.trim().is_empty() => detail.to_string(),
        _ => format!("Server error: {}", status),
    }
}

impl BackendError {
    /// Message appended to the conversation when a turn fails.
    pub fn user_notice(&self, backend_url: &str) -> String {
        let explanation = match self {
            Self::Transport { .. } => "Could not connect to the copilot backend".to_string(),
            other => other.to_string(),
        };
        format!(
            "⚠️ {}. Make sure the backend server is reachable at {}.",
            explanation.trim_end_matches('.'),
            backend_url
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_with_detail_uses_detail() {
        let err = BackendError::Status {
            status: 400,
            detail: Some("Invalid agent type".to_string()),
        };
        assert_eq!(err.to_string(), "Invalid agent type");
    }

    #[test]
    fn test_status_without_detail_is_generic() {
        let err = BackendError::Status {
            status: 500,
            detail: None,
        };
        assert_eq!(err.to_string(), "Server error: 500");
    }

    #[test]
    fn test_user_notice_carries_connection_hint() {
        let err = BackendError::Status {
            status: 500,
            detail: None,
        };
        let notice = err.user_notice("http://localhost:8000");
        assert_eq!(
            notice,
            "⚠️ Server error: 500. Make sure the backend server is reachable at http://localhost:8000."
        );
    }

    #[test]
    fn test_transport_notice_is_generic() {
        let err = BackendError::Transport {
            message: "tcp connect error: Connection refused (os error 111)".to_string(),
        };
        let notice = err.user_notice("http://x");
        assert!(notice.starts_with("⚠️ Could not connect to the copilot backend."));
        assert!(!notice.contains("os error"));
    }

    #[test]
    fn test_timeout_and_cancel_display() {
        assert_eq!(
            BackendError::Timeout { secs: 5 }.to_string(),
            "Backend did not answer within 5s"
        );
        assert_eq!(BackendError::Cancelled.to_string(), "Request cancelled");
    }
}
