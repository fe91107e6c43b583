//! Chat Renderer: conversation styling for the ratatui body pane.
//!
//! Human turns render as plain text; agent turns are tokenized with
//! `copilot_core::markdown::blocks` and styled span by span, so backend text
//! never reaches the terminal as raw markup.

use std::time::Duration;

use copilot_core::markdown::{self, InlineStyle, MdBlock, MdLine};
use copilot_core::{AgentRole, ChatMessage};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::layout_manager::{TuiSessionViewState, format_duration_ms};

#[derive(Debug, Clone, Copy)]
pub struct TuiTheme {
    pub text_strong: Color,
    pub text_base: Color,
    pub text_muted: Color,
    pub text_dim: Color,
    pub primary: Color,
    pub success: Color,
    pub warning: Color,
    pub danger: Color,
    pub info: Color,
    pub user_accent: Color,
    pub code: Color,
    pub border_normal: Color,
    pub border_active: Color,
    pub progress_done: Color,
    pub progress_pending: Color,
}

impl TuiTheme {
    pub fn default_dark() -> Self {
        Self {
            text_strong: Color::White,
            text_base: Color::Gray,
            text_muted: Color::DarkGray,
            text_dim: Color::Rgb(100, 100, 100),
            primary: Color::Cyan,
            success: Color::Green,
            warning: Color::Yellow,
            danger: Color::Red,
            info: Color::Blue,
            user_accent: Color::Blue,
            code: Color::Rgb(230, 180, 80),
            border_normal: Color::DarkGray,
            border_active: Color::Cyan,
            progress_done: Color::Green,
            progress_pending: Color::DarkGray,
        }
    }

    /// Per-persona accent used for headers and the roster highlight.
    pub fn agent_accent(&self, agent: AgentRole) -> Color {
        match agent {
            AgentRole::Tutor => Color::Cyan,
            AgentRole::Planner => Color::Magenta,
            AgentRole::Evaluator => Color::Green,
            AgentRole::Coach => Color::Yellow,
        }
    }
}

/// Kind of a client-side note interleaved with the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteKind {
    System,
    Warning,
}

/// Output of a slash command. Never stored in the message store and never
/// sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalNote {
    /// Rendered after this many conversation messages
    pub after: usize,
    pub kind: NoteKind,
    pub text: String,
}

pub const TUI_MAX_LOCAL_NOTES: usize = 200;

pub fn push_local_note(notes: &mut Vec<LocalNote>, note: LocalNote) {
    notes.push(note);
    if notes.len() > TUI_MAX_LOCAL_NOTES {
        let overflow = notes.len() - TUI_MAX_LOCAL_NOTES;
        notes.drain(0..overflow);
    }
}

/// Header label for an agent turn, e.g. `Tutor Agent`.
pub fn agent_header(agent: AgentRole) -> String {
    format!("{} Agent", agent.display_name())
}

fn inline_style(style: InlineStyle, base: Color, theme: &TuiTheme) -> Style {
    let mut out = Style::default().fg(if style.code { theme.code } else { base });
    if style.strong {
        out = out.add_modifier(Modifier::BOLD);
    }
    if style.emphasis {
        out = out.add_modifier(Modifier::ITALIC);
    }
    out
}

fn md_line_spans(line: &MdLine, base: Color, theme: &TuiTheme) -> Vec<Span<'static>> {
    line.iter()
        .map(|span| Span::styled(span.text.clone(), inline_style(span.style, base, theme)))
        .collect()
}

/// Style agent markdown as bordered lines. Blocks are separated by a bare
/// border line.
pub fn markdown_lines(text: &str, accent: Color, theme: &TuiTheme) -> Vec<Line<'static>> {
    let border = || Span::styled("│ ", Style::default().fg(accent));
    let mut lines = Vec::new();

    for (i, block) in markdown::blocks(text).iter().enumerate() {
        if i > 0 {
            lines.push(Line::from(border()));
        }
        match block {
            MdBlock::Heading { level, lines: body } => {
                let mut style = Style::default().fg(theme.text_strong).add_modifier(Modifier::BOLD);
                if *level == 2 {
                    style = style.add_modifier(Modifier::UNDERLINED);
                }
                for line in body {
                    lines.push(Line::from(vec![
                        border(),
                        Span::styled(markdown::line_text(line), style),
                    ]));
                }
            }
            MdBlock::Paragraph { lines: body, quote_depth } => {
                let quote = "▎ ".repeat(*quote_depth);
                for line in body {
                    let mut spans = vec![border()];
                    if !quote.is_empty() {
                        spans.push(Span::styled(quote.clone(), Style::default().fg(theme.text_muted)));
                    }
                    spans.extend(md_line_spans(line, theme.text_base, theme));
                    lines.push(Line::from(spans));
                }
            }
            MdBlock::ListItem {
                marker,
                depth,
                lines: body,
                quote_depth,
            } => {
                let quote = "▎ ".repeat(*quote_depth);
                let indent = "  ".repeat(*depth);
                let hang = " ".repeat(marker.chars().count() + 1);
                for (j, line) in body.iter().enumerate() {
                    let mut spans = vec![border()];
                    if !quote.is_empty() {
                        spans.push(Span::styled(quote.clone(), Style::default().fg(theme.text_muted)));
                    }
                    if j == 0 {
                        spans.push(Span::styled(
                            format!("{}{} ", indent, marker),
                            Style::default().fg(accent),
                        ));
                    } else {
                        spans.push(Span::raw(format!("{}{}", indent, hang)));
                    }
                    spans.extend(md_line_spans(line, theme.text_base, theme));
                    lines.push(Line::from(spans));
                }
            }
            MdBlock::Code { language, text } => {
                let label = language.as_deref().unwrap_or("code");
                lines.push(Line::from(vec![
                    border(),
                    Span::styled(format!("┌─ {}", label), Style::default().fg(theme.text_dim)),
                ]));
                for code_line in text.lines() {
                    lines.push(Line::from(vec![
                        border(),
                        Span::styled("│ ", Style::default().fg(theme.text_dim)),
                        Span::styled(code_line.to_string(), Style::default().fg(theme.code)),
                    ]));
                }
                lines.push(Line::from(vec![
                    border(),
                    Span::styled("└─", Style::default().fg(theme.text_dim)),
                ]));
            }
        }
    }

    if lines.is_empty() {
        lines.push(Line::from(border()));
    }
    lines
}

/// Render one message into styled lines.
pub fn style_message(message: &ChatMessage, theme: &TuiTheme, lines: &mut Vec<Line<'static>>) {
    if message.is_human() {
        // Header: ▌ You  HH:MM
        lines.push(Line::from(vec![
            Span::styled("▌ ", Style::default().fg(theme.user_accent)),
            Span::styled(
                "You",
                Style::default()
                    .fg(theme.user_accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  {}", message.timestamp.format("%H:%M")),
                Style::default().fg(theme.text_dim),
            ),
        ]));
        for l in message.text.lines() {
            lines.push(Line::from(vec![
                Span::styled("│ ", Style::default().fg(theme.user_accent)),
                Span::styled(l.to_string(), Style::default().fg(theme.text_strong)),
            ]));
        }
        if message.text.is_empty() {
            lines.push(Line::from(Span::styled("│ ", Style::default().fg(theme.user_accent))));
        }
        lines.push(Line::from(Span::styled(
            "└─",
            Style::default().fg(theme.user_accent),
        )));
        return;
    }

    let agent = message.agent.unwrap_or_default();
    let accent = if message.is_error {
        theme.danger
    } else {
        theme.agent_accent(agent)
    };
    lines.push(Line::from(vec![
        Span::styled("▌ ", Style::default().fg(accent)),
        Span::styled(
            agent_header(agent),
            Style::default().fg(accent).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("  {}", message.timestamp.format("%H:%M")),
            Style::default().fg(theme.text_dim),
        ),
    ]));
    if message.is_error {
        for l in message.text.lines() {
            lines.push(Line::from(vec![
                Span::styled("│ ", Style::default().fg(accent)),
                Span::styled(l.to_string(), Style::default().fg(theme.danger)),
            ]));
        }
    } else {
        lines.extend(markdown_lines(&message.text, accent, theme));
    }
    lines.push(Line::from(Span::styled("└─", Style::default().fg(accent))));
}

pub fn style_note(note: &LocalNote, theme: &TuiTheme, lines: &mut Vec<Line<'static>>) {
    let (icon, color) = match note.kind {
        NoteKind::System => ("  ◆ ", theme.primary),
        NoteKind::Warning => ("  ⚠ ", theme.warning),
    };
    for (i, l) in note.text.lines().enumerate() {
        let prefix = if i == 0 { icon } else { "    " };
        lines.push(Line::from(vec![
            Span::styled(prefix, Style::default().fg(color).add_modifier(Modifier::BOLD)),
            Span::styled(l.to_string(), Style::default().fg(color)),
        ]));
    }
}

/// `⠋ Tutor Agent is thinking… 1.2s`
pub fn typing_indicator_line(agent: AgentRole, elapsed: Duration, theme: &TuiTheme) -> Line<'static> {
    const FRAMES: [&str; 8] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧"];
    let frame = FRAMES[(elapsed.as_millis() / 120) as usize % FRAMES.len()];
    let accent = theme.agent_accent(agent);
    Line::from(vec![
        Span::styled(format!("  {} ", frame), Style::default().fg(accent)),
        Span::styled(
            format!("{} is thinking…", agent_header(agent)),
            Style::default().fg(accent).add_modifier(Modifier::ITALIC),
        ),
        Span::styled(
            format!(" {}", format_duration_ms(elapsed.as_millis() as u64)),
            Style::default().fg(theme.text_muted),
        ),
    ])
}

/// Styled lines for the whole conversation: messages with local notes
/// interleaved, then the typing indicator while a request is in flight.
pub fn style_conversation(
    messages: &[ChatMessage],
    notes: &[LocalNote],
    typing: Option<(AgentRole, Duration)>,
    theme: &TuiTheme,
) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let mut pending_notes = notes.iter().peekable();

    for (i, message) in messages.iter().enumerate() {
        while let Some(note) = pending_notes.next_if(|n| n.after <= i) {
            style_note(note, theme, &mut lines);
        }
        if i > 0 {
            lines.push(Line::default());
        }
        style_message(message, theme, &mut lines);
    }
    for note in pending_notes {
        style_note(note, theme, &mut lines);
    }
    if let Some((agent, elapsed)) = typing {
        lines.push(Line::default());
        lines.push(typing_indicator_line(agent, elapsed, theme));
    }
    lines
}

/// Compute effective scroll offset for the conversation (display-line based).
pub fn effective_chat_scroll(total_lines: usize, view: &TuiSessionViewState) -> usize {
    let max = total_lines.saturating_sub(view.body_height);
    if view.auto_follow || total_lines <= view.body_height {
        max
    } else {
        view.scroll_offset.min(max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use copilot_core::BackendError;

    fn render(message: &ChatMessage) -> Vec<String> {
        let mut lines = Vec::new();
        style_message(message, &TuiTheme::default_dark(), &mut lines);
        lines_plain(&lines)
    }

    #[test]
    fn test_human_message_rendering() {
        let rendered = render(&ChatMessage::human("hello world"));
        assert_eq!(rendered.len(), 3);
        assert!(rendered[0].starts_with("▌ You"));
        assert_eq!(rendered[1], "│ hello world");
        assert_eq!(rendered[2], "└─");
    }

    #[test]
    fn test_human_markdown_is_not_interpreted() {
        let rendered = render(&ChatMessage::human("**not bold** <b>x</b>"));
        assert_eq!(rendered[1], "│ **not bold** <b>x</b>");
    }

    #[test]
    fn test_human_multiline() {
        let rendered = render(&ChatMessage::human("line1\nline2\nline3"));
        assert_eq!(rendered.len(), 5);
        assert_eq!(rendered[3], "│ line3");
    }

    #[test]
    fn test_agent_message_header_and_markdown() {
        let msg = ChatMessage::agent(AgentRole::Tutor, "Use **Big-O** for `n` items");
        let rendered = render(&msg);
        assert!(rendered[0].starts_with("▌ Tutor Agent"));
        assert_eq!(rendered[1], "│ Use Big-O for n items");
        assert_eq!(rendered.last().unwrap(), "└─");
    }

    #[test]
    fn test_agent_markdown_spans_are_styled() {
        let theme = TuiTheme::default_dark();
        let lines = markdown_lines("**bold** and `code`", theme.primary, &theme);
        assert_eq!(lines.len(), 1);
        let bold = lines[0].spans.iter().find(|s| s.content == "bold").unwrap();
        assert!(bold.style.add_modifier.contains(Modifier::BOLD));
        let code = lines[0].spans.iter().find(|s| s.content == "code").unwrap();
        assert_eq!(code.style.fg, Some(theme.code));
    }

    #[test]
    fn test_agent_list_and_code_block() {
        let theme = TuiTheme::default_dark();
        let lines = markdown_lines(
            "Steps:\n\n- first\n- second\n\n```rust\nfn main() {}\n```",
            theme.primary,
            &theme,
        );
        let plain = lines_plain(&lines);
        assert!(plain.contains(&"│ • first".to_string()));
        assert!(plain.contains(&"│ • second".to_string()));
        assert!(plain.contains(&"│ ┌─ rust".to_string()));
        assert!(plain.contains(&"│ │ fn main() {}".to_string()));
    }

    #[test]
    fn test_agent_raw_html_shows_as_text() {
        let rendered = render(&ChatMessage::agent(AgentRole::Coach, "<script>x</script>"));
        assert!(rendered.iter().any(|l| l.contains("<script>")));
    }

    #[test]
    fn test_error_message_uses_danger_color() {
        let theme = TuiTheme::default_dark();
        let notice = BackendError::Cancelled.user_notice("http://x");
        let msg = ChatMessage::agent_error(AgentRole::Tutor, notice.clone());
        let mut lines = Vec::new();
        style_message(&msg, &theme, &mut lines);
        assert_eq!(lines[1].spans[1].content, notice);
        assert_eq!(lines[1].spans[1].style.fg, Some(theme.danger));
    }

    #[test]
    fn test_notes_interleave_after_message_count() {
        let theme = TuiTheme::default_dark();
        let messages = vec![
            ChatMessage::agent(AgentRole::Planner, "welcome"),
            ChatMessage::human("q"),
        ];
        let notes = vec![LocalNote {
            after: 1,
            kind: NoteKind::System,
            text: "status line".to_string(),
        }];
        let plain = lines_plain(&style_conversation(&messages, &notes, None, &theme));
        let note_idx = plain.iter().position(|l| l.contains("status line")).unwrap();
        let you_idx = plain.iter().position(|l| l.starts_with("▌ You")).unwrap();
        let welcome_idx = plain.iter().position(|l| l.contains("welcome")).unwrap();
        assert!(welcome_idx < note_idx);
        assert!(note_idx < you_idx);
    }

    #[test]
    fn test_trailing_note_and_typing_indicator() {
        let theme = TuiTheme::default_dark();
        let messages = vec![ChatMessage::human("q")];
        let notes = vec![LocalNote {
            after: 1,
            kind: NoteKind::Warning,
            text: "unknown command".to_string(),
        }];
        let plain = lines_plain(&style_conversation(
            &messages,
            &notes,
            Some((AgentRole::Evaluator, Duration::from_millis(1500))),
            &theme,
        ));
        assert!(plain.iter().any(|l| l.contains("⚠ unknown command")));
        let last = plain.last().unwrap();
        assert!(last.contains("Evaluator Agent is thinking…"));
        assert!(last.ends_with("1.5s"));
    }

    #[test]
    fn test_push_local_note_is_bounded() {
        let mut notes = Vec::new();
        for i in 0..TUI_MAX_LOCAL_NOTES + 5 {
            push_local_note(
                &mut notes,
                LocalNote {
                    after: i,
                    kind: NoteKind::System,
                    text: i.to_string(),
                },
            );
        }
        assert_eq!(notes.len(), TUI_MAX_LOCAL_NOTES);
        assert_eq!(notes[0].text, "5");
    }

    #[test]
    fn test_effective_chat_scroll_follow_and_manual() {
        let mut view = TuiSessionViewState {
            scroll_offset: 3,
            auto_follow: true,
            body_height: 10,
        };
        assert_eq!(effective_chat_scroll(25, &view), 15);
        assert_eq!(effective_chat_scroll(4, &view), 0);
        view.auto_follow = false;
        assert_eq!(effective_chat_scroll(25, &view), 3);
        view.scroll_offset = 99;
        assert_eq!(effective_chat_scroll(25, &view), 15);
    }
}
