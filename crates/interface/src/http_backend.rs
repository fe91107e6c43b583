//! HTTP implementation of [`ChatBackend`] over reqwest.
//!
//! The request deadline is owned by the chat controller; the client only
//! carries a connect timeout so a dead host fails fast.

use std::time::Duration;

use async_trait::async_trait;
use copilot_core::{BackendError, ChatReply, ChatRequest, CopilotConfig, ErrorBody, HealthReply};
use copilot_tui::ChatBackend;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct HttpChatBackend {
    base_url: String,
    chat_url: String,
    health_url: String,
    request_timeout: Duration,
    http: reqwest::Client,
}

impl HttpChatBackend {
    pub fn new(config: &CopilotConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(concat!("copilot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BackendError::Transport {
                message: e.to_string(),
            })?;
        Ok(Self {
            base_url: config.base_url().to_string(),
            chat_url: config.chat_url(),
            health_url: config.health_url(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            http,
        })
    }

    fn transport_error(&self, err: reqwest::Error) -> BackendError {
        if err.is_timeout() {
            BackendError::Timeout {
                secs: self.request_timeout.as_secs(),
            }
        } else {
            BackendError::Transport {
                message: err.to_string(),
            }
        }
    }

    async fn read_json<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, BackendError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            // FastAPI puts a string in `detail`; validation errors use a list,
            // which falls back to the generic status text.
            let detail = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.detail);
            warn!(status = status.as_u16(), detail = ?detail, "backend returned an error status");
            return Err(BackendError::Status {
                status: status.as_u16(),
                detail,
            });
        }

        serde_json::from_str(&body).map_err(|e| BackendError::Malformed {
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(&self, request: ChatRequest) -> Result<ChatReply, BackendError> {
        debug!(url = %self.chat_url, "POST chat");
        let response = self
            .http
            .post(&self.chat_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.read_json(response).await
    }

    async fn health(&self) -> Result<HealthReply, BackendError> {
        debug!(url = %self.health_url, "GET health");
        let response = self
            .http
            .get(&self.health_url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.read_json(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_derived_from_config() {
        let config = CopilotConfig {
            backend_url: "http://example.test:8000/".to_string(),
            ..CopilotConfig::default()
        };
        let backend = HttpChatBackend::new(&config).unwrap();
        assert_eq!(backend.base_url(), "http://example.test:8000");
        assert_eq!(backend.chat_url, "http://example.test:8000/api/chat");
        assert_eq!(backend.health_url, "http://example.test:8000/health");
    }
}
