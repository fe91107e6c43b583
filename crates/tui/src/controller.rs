//! Chat controller: owns the conversation and the session mirror and runs
//! at most one backend call at a time.
//!
//! `submit` appends the human turn synchronously and spawns the request on
//! tokio. The UI loop calls [`ChatController::poll_settled`] every frame;
//! one-shot callers use [`ChatController::wait_settled`]. Whatever the
//! outcome, settling takes the in-flight handle first, so the controller can
//! never stay busy after the task ends. Requests carry a deadline and can be
//! cancelled.

use std::time::{Duration, Instant};

use copilot_core::{
    AgentRole, BackendError, ChatMessage, ChatReply, ChatRequest, MessageStore, SessionState,
};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::chat_backend::DynChatBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Input was empty after trimming
    Empty,
    /// A request is already in flight
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted,
    Rejected(RejectReason),
}

/// How an in-flight turn settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Replied { agent: AgentRole },
    Failed(BackendError),
}

struct PendingTurn {
    handle: JoinHandle<Result<ChatReply, BackendError>>,
    started_at: Instant,
}

pub struct ChatController {
    backend: DynChatBackend,
    student_id: String,
    session_id: Option<String>,
    messages: MessageStore,
    session: SessionState,
    active_agent: AgentRole,
    pending: Option<PendingTurn>,
    request_timeout: Duration,
    last_error: Option<BackendError>,
    last_reply: Option<ChatReply>,
}

impl std::fmt::Debug for ChatController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatController")
            .field("backend", &self.backend.base_url())
            .field("student_id", &self.student_id)
            .field("session_id", &self.session_id)
            .field("messages", &self.messages.len())
            .field("active_agent", &self.active_agent)
            .field("busy", &self.is_busy())
            .finish_non_exhaustive()
    }
}

impl ChatController {
    pub fn new(backend: DynChatBackend, request_timeout: Duration) -> Self {
        Self {
            backend,
            student_id: uuid::Uuid::new_v4().to_string(),
            session_id: None,
            messages: MessageStore::with_welcome(),
            session: SessionState::default(),
            active_agent: AgentRole::default(),
            pending: None,
            request_timeout,
            last_error: None,
            last_reply: None,
        }
    }

    /// Resume a backend session issued earlier (e.g. `ask --session`).
    pub fn with_session_id(mut self, session_id: Option<String>) -> Self {
        if let Some(id) = session_id.filter(|id| !id.trim().is_empty()) {
            self.session.session_id = id.clone();
            self.session_id = Some(id);
        }
        self
    }

    /// Start a turn. No-op unless `text` has content and nothing is in flight.
    pub fn submit(&mut self, text: &str) -> SubmitOutcome {
        if text.trim().is_empty() {
            return SubmitOutcome::Rejected(RejectReason::Empty);
        }
        if self.pending.is_some() {
            debug!("submit rejected: request in flight");
            return SubmitOutcome::Rejected(RejectReason::Busy);
        }

        self.messages.push(ChatMessage::human(text));
        let request = ChatRequest {
            message: text.to_string(),
            student_id: self.student_id.clone(),
            session_id: self.session_id.clone(),
        };
        info!(
            session_id = request.session_id.as_deref().unwrap_or("-"),
            chars = request.message.len(),
            "submitting chat turn"
        );

        let backend = self.backend.clone();
        let deadline = self.request_timeout;
        let handle = tokio::spawn(async move {
            match tokio::time::timeout(deadline, backend.send(request)).await {
                Ok(result) => result,
                Err(_) => Err(BackendError::Timeout {
                    secs: deadline.as_secs(),
                }),
            }
        });
        self.pending = Some(PendingTurn {
            handle,
            started_at: Instant::now(),
        });
        SubmitOutcome::Accepted
    }

    /// Settle the in-flight turn if its task has finished. Never blocks on
    /// the network.
    pub async fn poll_settled(&mut self) -> Option<TurnOutcome> {
        let finished = self
            .pending
            .as_ref()
            .is_some_and(|pending| pending.handle.is_finished());
        if !finished {
            return None;
        }
        let pending = self.pending.take()?;
        Some(self.settle(pending).await)
    }

    /// Wait for the in-flight turn, if any, and settle it.
    pub async fn wait_settled(&mut self) -> Option<TurnOutcome> {
        let pending = self.pending.take()?;
        Some(self.settle(pending).await)
    }

    /// Abort the in-flight turn and record it as failed.
    pub fn cancel(&mut self) -> Option<TurnOutcome> {
        let pending = self.pending.take()?;
        pending.handle.abort();
        info!(
            elapsed_ms = pending.started_at.elapsed().as_millis() as u64,
            "chat turn cancelled"
        );
        Some(self.apply_result(Err(BackendError::Cancelled)))
    }

    async fn settle(&mut self, pending: PendingTurn) -> TurnOutcome {
        let elapsed = pending.started_at.elapsed();
        let result = match pending.handle.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(BackendError::Cancelled),
            Err(e) => Err(BackendError::TaskFailed {
                message: e.to_string(),
            }),
        };
        debug!(elapsed_ms = elapsed.as_millis() as u64, ok = result.is_ok(), "chat turn settled");
        self.apply_result(result)
    }

    fn apply_result(&mut self, result: Result<ChatReply, BackendError>) -> TurnOutcome {
        match result {
            Ok(reply) => {
                self.last_reply = Some(reply.clone());
                if let Some(patch) = reply.state.as_ref() {
                    self.session.apply(patch);
                    if let Some(id) = patch.session_id.as_ref().filter(|id| !id.is_empty()) {
                        self.session_id = Some(id.clone());
                    }
                }
                if let Some(id) = reply.session_id.filter(|id| !id.is_empty()) {
                    self.session.session_id = id.clone();
                    self.session_id = Some(id);
                }
                if let Some(name) = reply.agent.as_deref() {
                    match AgentRole::parse(name) {
                        Some(agent) => self.active_agent = agent,
                        None => warn!(agent = name, "reply names an agent outside the roster"),
                    }
                }
                self.messages
                    .push(ChatMessage::agent(self.active_agent, reply.response));
                self.last_error = None;
                TurnOutcome::Replied {
                    agent: self.active_agent,
                }
            }
            Err(err) => {
                warn!(error = %err, "chat turn failed");
                let notice = err.user_notice(self.backend.base_url());
                self.messages
                    .push(ChatMessage::agent_error(self.active_agent, notice));
                self.last_error = Some(err.clone());
                TurnOutcome::Failed(err)
            }
        }
    }

    /// Highlight a roster agent; it tags replies that name no agent.
    pub fn select_agent(&mut self, agent: AgentRole) {
        self.active_agent = agent;
    }

    pub fn messages(&self) -> &MessageStore {
        &self.messages
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn active_agent(&self) -> AgentRole {
        self.active_agent
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// How long the in-flight turn has been waiting.
    pub fn busy_for(&self) -> Option<Duration> {
        self.pending.as_ref().map(|p| p.started_at.elapsed())
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn student_id(&self) -> &str {
        &self.student_id
    }

    pub fn last_error(&self) -> Option<&BackendError> {
        self.last_error.as_ref()
    }

    /// Raw body of the last successful reply.
    pub fn last_reply(&self) -> Option<&ChatReply> {
        self.last_reply.as_ref()
    }

    pub fn backend_url(&self) -> &str {
        self.backend.base_url()
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use copilot_core::{SessionPatch, mastery_band, mastery_percent};
    use std::sync::Arc;

    fn controller(backend: DynChatBackend) -> ChatController {
        ChatController::new(backend, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_submit_rejects_empty_and_whitespace() {
        let backend = Arc::new(ScriptedBackend::new(vec![]));
        let mut c = controller(backend.clone());
        assert_eq!(c.submit(""), SubmitOutcome::Rejected(RejectReason::Empty));
        assert_eq!(c.submit("   \n\t"), SubmitOutcome::Rejected(RejectReason::Empty));
        assert_eq!(c.messages().len(), 1);
        assert!(!c.is_busy());
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn test_big_o_scenario_session_is_sticky() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Ok(reply_with(
                "Big-O describes growth.",
                Some("tutor"),
                Some("abc123"),
                Some(SessionPatch {
                    global_mastery_score: Some(0.42),
                    ..SessionPatch::default()
                }),
            )),
            Ok(ChatReply::text("Next answer")),
        ]));
        let mut c = controller(backend.clone());

        assert_eq!(c.submit("What is Big-O notation?"), SubmitOutcome::Accepted);
        assert_eq!(c.messages().len(), 2);
        assert!(c.messages().last().unwrap().is_human());
        assert!(c.is_busy());

        let outcome = c.wait_settled().await;
        assert_eq!(
            outcome,
            Some(TurnOutcome::Replied {
                agent: AgentRole::Tutor
            })
        );
        assert_eq!(c.messages().len(), 3);
        assert_eq!(c.session_id(), Some("abc123"));
        assert_eq!(c.session().session_id, "abc123");
        assert_eq!(mastery_percent(c.session().global_mastery_score), 42);
        assert_eq!(mastery_band(c.session().global_mastery_score).label(), "Learning");

        assert_eq!(c.submit("And Big-Theta?"), SubmitOutcome::Accepted);
        c.wait_settled().await;
        assert_eq!(c.messages().len(), 5);

        let requests = backend.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].session_id, None);
        assert_eq!(requests[1].session_id.as_deref(), Some("abc123"));
        assert_eq!(requests[0].student_id, requests[1].student_id);
        assert_eq!(requests[0].student_id, c.student_id());
        assert_eq!(c.last_reply().map(|r| r.response.as_str()), Some("Next answer"));
    }

    #[tokio::test]
    async fn test_http_500_appends_single_error_and_keeps_state() {
        let backend = Arc::new(ScriptedBackend::new(vec![Err(BackendError::Status {
            status: 500,
            detail: None,
        })]));
        let mut c = controller(backend);
        let before = c.session().clone();

        c.submit("hello");
        let outcome = c.wait_settled().await.unwrap();
        assert!(matches!(outcome, TurnOutcome::Failed(BackendError::Status { status: 500, .. })));
        assert_eq!(c.messages().len(), 3);
        let last = c.messages().last().unwrap();
        assert!(last.is_error);
        assert!(last.text.contains("Server error: 500"));
        assert!(last.text.contains("Make sure the backend server"));
        assert_eq!(c.session(), &before);
        assert!(!c.is_busy());
        assert!(c.last_error().is_some());
    }

    #[tokio::test]
    async fn test_second_submit_rejected_while_in_flight() {
        let backend = Arc::new(GatedBackend::new(ChatReply::text("done")));
        let mut c = controller(backend.clone());

        assert_eq!(c.submit("first"), SubmitOutcome::Accepted);
        assert_eq!(c.submit("second"), SubmitOutcome::Rejected(RejectReason::Busy));
        assert_eq!(c.messages().len(), 2);

        backend.release();
        c.wait_settled().await;
        assert!(!c.is_busy());
        assert_eq!(c.submit("second"), SubmitOutcome::Accepted);
        backend.release();
        c.wait_settled().await;
        assert_eq!(c.messages().len(), 5);
    }

    #[tokio::test]
    async fn test_poll_settled_is_non_blocking() {
        let backend = Arc::new(GatedBackend::new(ChatReply::text("later")));
        let mut c = controller(backend.clone());
        c.submit("q");
        assert!(c.poll_settled().await.is_none());
        assert!(c.is_busy());

        backend.release();
        let outcome = loop {
            if let Some(outcome) = c.poll_settled().await {
                break outcome;
            }
            tokio::task::yield_now().await;
        };
        assert!(matches!(outcome, TurnOutcome::Replied { .. }));
        assert_eq!(c.messages().last().unwrap().text, "later");
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_exceeded_settles_as_failure() {
        let backend = Arc::new(HangingBackend);
        let mut c = ChatController::new(backend, Duration::from_secs(3));
        c.submit("anyone there?");
        let outcome = c.wait_settled().await.unwrap();
        assert_eq!(outcome, TurnOutcome::Failed(BackendError::Timeout { secs: 3 }));
        assert!(!c.is_busy());
        assert!(c.messages().last().unwrap().is_error);
    }

    #[tokio::test]
    async fn test_cancel_aborts_and_records_failure() {
        let backend = Arc::new(HangingBackend);
        let mut c = controller(backend);
        c.submit("slow question");
        let outcome = c.cancel();
        assert_eq!(outcome, Some(TurnOutcome::Failed(BackendError::Cancelled)));
        assert!(!c.is_busy());
        assert_eq!(c.messages().len(), 3);
        assert!(c.messages().last().unwrap().text.contains("Request cancelled"));
        assert_eq!(c.cancel(), None);
    }

    #[tokio::test]
    async fn test_unknown_agent_keeps_active_agent() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Ok(reply_with("drawing...", Some("animator"), None, None)),
            Ok(ChatReply::text("no agent named")),
        ]));
        let mut c = controller(backend);
        c.select_agent(AgentRole::Coach);

        c.submit("animate it");
        c.wait_settled().await;
        assert_eq!(c.active_agent(), AgentRole::Coach);
        assert_eq!(c.messages().last().unwrap().agent, Some(AgentRole::Coach));

        c.submit("again");
        c.wait_settled().await;
        assert_eq!(c.messages().last().unwrap().agent, Some(AgentRole::Coach));
    }

    #[tokio::test]
    async fn test_known_agent_becomes_active() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok(reply_with(
            "Take a breath.",
            Some("coach"),
            None,
            None,
        ))]));
        let mut c = controller(backend);
        c.submit("I give up");
        c.wait_settled().await;
        assert_eq!(c.active_agent(), AgentRole::Coach);
    }

    #[tokio::test]
    async fn test_state_patches_merge_across_turns() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Ok(reply_with(
                "a",
                None,
                None,
                Some(SessionPatch {
                    frustration_level: Some(0.6),
                    current_topic: Some("Sorting".to_string()),
                    ..SessionPatch::default()
                }),
            )),
            Ok(reply_with(
                "b",
                None,
                None,
                Some(SessionPatch {
                    sentiment: Some("positive".to_string()),
                    ..SessionPatch::default()
                }),
            )),
        ]));
        let mut c = controller(backend);
        c.submit("one");
        c.wait_settled().await;
        c.submit("two");
        c.wait_settled().await;
        assert_eq!(c.session().frustration_level, 0.6);
        assert_eq!(c.session().current_topic, "Sorting");
        assert_eq!(c.session().sentiment, "positive");
    }

    #[tokio::test]
    async fn test_each_completed_submission_adds_two_messages() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Ok(ChatReply::text("1")),
            Err(BackendError::Malformed {
                message: "missing field `response`".to_string(),
            }),
            Ok(ChatReply::text("3")),
        ]));
        let mut c = controller(backend);
        for (i, text) in ["a", "b", "c"].iter().enumerate() {
            let before = c.messages().len();
            c.submit(text);
            assert_eq!(c.messages().len(), before + 1);
            c.wait_settled().await;
            assert_eq!(c.messages().len(), before + 2, "turn {}", i);
            assert!(!c.is_busy());
        }
    }

    #[tokio::test]
    async fn test_with_session_id_is_sent_on_first_request() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok(ChatReply::text("hi"))]));
        let mut c = controller(backend.clone()).with_session_id(Some("resume-1".to_string()));
        c.submit("continue");
        c.wait_settled().await;
        assert_eq!(backend.requests()[0].session_id.as_deref(), Some("resume-1"));
    }

    #[tokio::test]
    async fn test_wait_settled_without_pending_is_none() {
        let backend = Arc::new(ScriptedBackend::new(vec![]));
        let mut c = controller(backend);
        assert!(c.wait_settled().await.is_none());
        assert!(c.poll_settled().await.is_none());
    }
}
