//! Slash command handling. Commands act on the controller and append local
//! notes; none of them reaches the backend.

use std::path::Path;

use copilot_core::markdown::{self, escape_html};
use copilot_core::mastery::{frustration_label, percent_label};
use copilot_core::{AgentRole, ChatMessage, SessionState, mastery_band};
use tracing::{info, warn};

use crate::chat_renderer::{LocalNote, NoteKind, agent_header, push_local_note};
use crate::controller::ChatController;
use crate::input_handler::{SLASH_COMMAND_SPECS, SlashCommand, parse_agent_argument};

/// What the loop should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandEffect {
    Continue,
    Quit,
}

fn note(notes: &mut Vec<LocalNote>, controller: &ChatController, kind: NoteKind, text: String) {
    push_local_note(
        notes,
        LocalNote {
            after: controller.messages().len(),
            kind,
            text,
        },
    );
}

pub fn help_text() -> String {
    let mut lines = vec!["Commands:".to_string()];
    for spec in SLASH_COMMAND_SPECS {
        lines.push(format!("  {:<8} {}", spec.command, spec.summary));
    }
    lines.push(
        "Keys: Enter send · Shift/Alt+Enter newline · ↑↓ history · PgUp/PgDn scroll · Ctrl+C cancel · Esc quit"
            .to_string(),
    );
    lines.join("\n")
}

pub fn status_text(controller: &ChatController) -> String {
    let session = controller.session();
    let mut lines = vec![
        format!("session:  {}", controller.session_id().unwrap_or("(none yet)")),
        format!("student:  {}", controller.student_id()),
        format!("backend:  {}", controller.backend_url()),
        format!("agent:    {}", agent_header(controller.active_agent())),
        format!(
            "mastery:  {} {}",
            percent_label(session.global_mastery_score),
            mastery_band(session.global_mastery_score).label()
        ),
        format!(
            "mood:     {} · frustration {}",
            session.sentiment,
            frustration_label(session.frustration_level)
        ),
    ];
    if controller.is_busy() {
        lines.push("request:  in flight".to_string());
    }
    if let Some(err) = controller.last_error() {
        lines.push(format!("last error: {}", err));
    }
    lines.join("\n")
}

/// Run one parsed slash command.
pub fn handle_slash_command(
    command: SlashCommand,
    controller: &mut ChatController,
    notes: &mut Vec<LocalNote>,
) -> CommandEffect {
    match command {
        SlashCommand::Help => note(notes, controller, NoteKind::System, help_text()),
        SlashCommand::Status => {
            let text = status_text(controller);
            note(notes, controller, NoteKind::System, text);
        }
        SlashCommand::Agent(None) => {
            let roster = AgentRole::ALL
                .iter()
                .map(|a| a.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            note(
                notes,
                controller,
                NoteKind::Warning,
                format!("Usage: /agent <name>  ({})", roster),
            );
        }
        SlashCommand::Agent(Some(name)) => match parse_agent_argument(&name) {
            Some(agent) => {
                controller.select_agent(agent);
                note(
                    notes,
                    controller,
                    NoteKind::System,
                    format!("{} selected", agent_header(agent)),
                );
            }
            None => note(
                notes,
                controller,
                NoteKind::Warning,
                format!("Unknown agent: {}", name),
            ),
        },
        SlashCommand::Export(None) => note(
            notes,
            controller,
            NoteKind::Warning,
            "Usage: /export <path>".to_string(),
        ),
        SlashCommand::Export(Some(path)) => {
            let html = render_transcript_html(controller.messages().as_slice(), controller.session());
            match std::fs::write(Path::new(&path), html) {
                Ok(()) => {
                    info!(path = %path, messages = controller.messages().len(), "transcript exported");
                    note(
                        notes,
                        controller,
                        NoteKind::System,
                        format!("Transcript written to {}", path),
                    );
                }
                Err(e) => {
                    warn!(path = %path, error = %e, "transcript export failed");
                    note(
                        notes,
                        controller,
                        NoteKind::Warning,
                        format!("Export failed: {}", e),
                    );
                }
            }
        }
        SlashCommand::Cancel => {
            if controller.cancel().is_none() {
                note(
                    notes,
                    controller,
                    NoteKind::Warning,
                    "No request in flight".to_string(),
                );
            }
        }
        SlashCommand::Quit => return CommandEffect::Quit,
        SlashCommand::Unknown(raw) => note(
            notes,
            controller,
            NoteKind::Warning,
            format!("Unknown command: {}  (try /help)", raw),
        ),
    }
    CommandEffect::Continue
}

fn message_html(message: &ChatMessage) -> String {
    let time = message.timestamp.format("%Y-%m-%d %H:%M:%S UTC");
    if message.is_human() {
        let body = escape_html(&message.text).replace('\n', "<br>\n");
        return format!(
            "<div class=\"message human\">\n<div class=\"sender\">You · {}</div>\n<div class=\"body\"><p>{}</p></div>\n</div>\n",
            time, body
        );
    }
    let agent = message.agent.unwrap_or_default();
    let (class, body) = if message.is_error {
        (
            "message agent error",
            format!("<p>{}</p>", escape_html(&message.text)),
        )
    } else {
        ("message agent", markdown::format(&message.text))
    };
    format!(
        "<div class=\"{} {}\">\n<div class=\"sender\">{} · {}</div>\n<div class=\"body\">{}</div>\n</div>\n",
        class,
        agent.as_str(),
        escape_html(&agent_header(agent)),
        time,
        body
    )
}

/// Standalone HTML document for the conversation. Agent text goes through
/// the formatter; human text and error notices are escaped.
pub fn render_transcript_html(messages: &[ChatMessage], session: &SessionState) -> String {
    let mut out = String::from(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>Copilot transcript</title>\n</head>\n<body>\n",
    );
    out.push_str("<header>\n");
    if !session.session_id.is_empty() {
        out.push_str(&format!(
            "<p class=\"session\">Session {}</p>\n",
            escape_html(&session.session_id)
        ));
    }
    out.push_str(&format!(
        "<p class=\"mastery\">Mastery {} ({})</p>\n",
        percent_label(session.global_mastery_score),
        mastery_band(session.global_mastery_score).label()
    ));
    out.push_str("</header>\n<main>\n");
    for message in messages {
        out.push_str(&message_html(message));
    }
    out.push_str("</main>\n</body>\n</html>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input_handler::parse_slash_command;
    use crate::test_helpers::*;
    use copilot_core::{ChatReply, SessionPatch};
    use std::sync::Arc;
    use std::time::Duration;

    fn controller() -> ChatController {
        ChatController::new(Arc::new(ScriptedBackend::new(vec![])), Duration::from_secs(5))
    }

    fn run(line: &str, controller: &mut ChatController, notes: &mut Vec<LocalNote>) -> CommandEffect {
        let command = parse_slash_command(line).expect("slash command");
        handle_slash_command(command, controller, notes)
    }

    #[test]
    fn test_help_lists_every_command() {
        let mut c = controller();
        let mut notes = Vec::new();
        assert_eq!(run("/help", &mut c, &mut notes), CommandEffect::Continue);
        assert_eq!(notes.len(), 1);
        for spec in SLASH_COMMAND_SPECS {
            assert!(notes[0].text.contains(spec.command));
        }
        assert_eq!(notes[0].after, c.messages().len());
        assert_eq!(c.messages().len(), 1);
    }

    #[test]
    fn test_quit_and_exit() {
        let mut c = controller();
        let mut notes = Vec::new();
        assert_eq!(run("/quit", &mut c, &mut notes), CommandEffect::Quit);
        assert_eq!(run("/exit", &mut c, &mut notes), CommandEffect::Quit);
        assert!(notes.is_empty());
    }

    #[test]
    fn test_agent_selects_roster_member() {
        let mut c = controller();
        let mut notes = Vec::new();
        run("/agent planner", &mut c, &mut notes);
        assert_eq!(c.active_agent(), AgentRole::Planner);
        assert_eq!(notes[0].kind, NoteKind::System);

        run("/agent animator", &mut c, &mut notes);
        assert_eq!(c.active_agent(), AgentRole::Planner);
        assert_eq!(notes[1].kind, NoteKind::Warning);
        assert!(notes[1].text.contains("animator"));

        run("/agent", &mut c, &mut notes);
        assert!(notes[2].text.starts_with("Usage: /agent"));
    }

    #[test]
    fn test_status_reports_ids_and_backend() {
        let mut c = controller();
        let mut notes = Vec::new();
        run("/status", &mut c, &mut notes);
        let text = &notes[0].text;
        assert!(text.contains("(none yet)"));
        assert!(text.contains(c.student_id()));
        assert!(text.contains("http://scripted.test"));
        assert!(text.contains("0% Starting"));
    }

    #[test]
    fn test_unknown_command_warns_without_sending() {
        let backend = Arc::new(ScriptedBackend::new(vec![]));
        let mut c = ChatController::new(backend.clone(), Duration::from_secs(5));
        let mut notes = Vec::new();
        run("/dance", &mut c, &mut notes);
        assert_eq!(notes[0].kind, NoteKind::Warning);
        assert!(notes[0].text.contains("/dance"));
        assert!(backend.requests().is_empty());
        assert_eq!(c.messages().len(), 1);
    }

    #[test]
    fn test_cancel_without_request() {
        let mut c = controller();
        let mut notes = Vec::new();
        run("/cancel", &mut c, &mut notes);
        assert_eq!(notes[0].text, "No request in flight");
    }

    #[tokio::test]
    async fn test_cancel_in_flight_request() {
        let mut c = ChatController::new(Arc::new(HangingBackend), Duration::from_secs(5));
        let mut notes = Vec::new();
        c.submit("slow");
        run("/cancel", &mut c, &mut notes);
        assert!(!c.is_busy());
        assert!(notes.is_empty());
        assert!(c.messages().last().unwrap().is_error);
    }

    #[tokio::test]
    async fn test_export_writes_html_transcript() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok(ChatReply {
            response: "Use **Big-O** <b>now</b>".to_string(),
            agent: Some("tutor".to_string()),
            session_id: Some("abc123".to_string()),
            state: Some(SessionPatch {
                global_mastery_score: Some(0.42),
                ..SessionPatch::default()
            }),
        })]));
        let mut c = ChatController::new(backend, Duration::from_secs(5));
        c.submit("Is 2 < 3 & \"true\"?");
        c.wait_settled().await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transcript.html");
        let mut notes = Vec::new();
        run(&format!("/export {}", path.display()), &mut c, &mut notes);
        assert_eq!(notes[0].kind, NoteKind::System);

        let html = std::fs::read_to_string(&path).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("Session abc123"));
        assert!(html.contains("Mastery 42% (Learning)"));
        assert!(html.contains("Is 2 &lt; 3 &amp; &quot;true&quot;?"));
        assert!(html.contains("<strong>Big-O</strong>"));
        assert!(html.contains("&lt;b&gt;now&lt;/b&gt;"));
        assert!(!html.contains("<b>now</b>"));
        assert!(html.contains("Tutor Agent"));
    }

    #[test]
    fn test_export_failure_is_a_warning() {
        let mut c = controller();
        let mut notes = Vec::new();
        run("/export /nonexistent-dir/for/sure/out.html", &mut c, &mut notes);
        assert_eq!(notes[0].kind, NoteKind::Warning);
        assert!(notes[0].text.starts_with("Export failed"));
    }

    #[test]
    fn test_export_requires_path() {
        let mut c = controller();
        let mut notes = Vec::new();
        run("/export", &mut c, &mut notes);
        assert_eq!(notes[0].text, "Usage: /export <path>");
    }

    #[test]
    fn test_transcript_escapes_error_notices() {
        let messages = vec![ChatMessage::agent_error(
            AgentRole::Coach,
            "⚠️ <oops>. Make sure the backend server is reachable at http://x.",
        )];
        let html = render_transcript_html(&messages, &SessionState::default());
        assert!(html.contains("message agent error coach"));
        assert!(html.contains("&lt;oops&gt;"));
        assert!(!html.contains("Session "));
    }
}
