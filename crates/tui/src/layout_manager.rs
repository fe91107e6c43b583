//! Layout Manager: TUI layout calculation, bars, and display formatting.

use copilot_core::{mastery_band, mastery_percent};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::chat_renderer::{TuiTheme, agent_header};
use crate::controller::ChatController;
use crate::input_handler::{
    CommandCompletionState, canonical_slash_command, matching_slash_commands, parse_slash_tokens,
    slash_argument_options,
};

pub const TUI_SCROLL_STEP: usize = 3;

/// Side panes are shown only from this terminal width up.
pub const TUI_SIDE_PANES_MIN_WIDTH: u16 = 90;
pub const TUI_ROSTER_WIDTH: u16 = 26;
pub const TUI_DASHBOARD_WIDTH: u16 = 34;

#[derive(Debug, Clone)]
pub struct TuiSessionViewState {
    pub scroll_offset: usize,
    pub auto_follow: bool,
    pub body_height: usize,
}

impl Default for TuiSessionViewState {
    fn default() -> Self {
        Self {
            scroll_offset: 0,
            auto_follow: true,
            body_height: 1,
        }
    }
}

/// Areas of the body row. Side panes are `None` when hidden or collapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaneAreas {
    pub roster: Option<Rect>,
    pub conversation: Rect,
    pub dashboard: Option<Rect>,
}

pub fn short_session_id(value: Option<&str>) -> String {
    let session = value.unwrap_or("-");
    let max = 12usize;
    if session.chars().count() <= max {
        return session.to_string();
    }
    let prefix = session.chars().take(max).collect::<String>();
    format!("{}…", prefix)
}

pub fn build_title_bar<'a>(controller: &ChatController, theme: &TuiTheme) -> Line<'a> {
    let agent = controller.active_agent();
    let score = controller.session().global_mastery_score;
    let band = mastery_band(score);
    let (r, g, b) = band.rgb();

    let (state_text, state_color) = if controller.is_busy() {
        ("thinking…", theme.warning)
    } else if controller.last_error().is_some() {
        ("last request failed", theme.danger)
    } else {
        ("idle", theme.text_muted)
    };

    Line::from(vec![
        Span::styled(
            " Copilot ",
            Style::default()
                .fg(theme.primary)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(" {}  ", short_session_id(controller.session_id())),
            Style::default().fg(theme.text_dim),
        ),
        Span::styled(
            format!("{}  ", agent_header(agent)),
            Style::default().fg(theme.agent_accent(agent)),
        ),
        Span::styled(
            format!("{}% {}  ", mastery_percent(score), band.label()),
            Style::default().fg(Color::Rgb(r, g, b)),
        ),
        Span::styled(state_text.to_string(), Style::default().fg(state_color)),
    ])
}

pub fn build_status_hint_bar<'a>(
    input: &str,
    completion: Option<&CommandCompletionState>,
    theme: &TuiTheme,
    is_busy: bool,
) -> Line<'a> {
    if let Some((_raw, norm, args, trailing_space)) = parse_slash_tokens(input)
        && completion.is_none()
    {
        if args.is_empty() && !trailing_space {
            let cmds: String = matching_slash_commands(&norm)
                .iter()
                .map(|s| s.command)
                .collect::<Vec<_>>()
                .join("  ");
            return Line::from(vec![
                Span::styled(" ", Style::default()),
                Span::styled(cmds, Style::default().fg(theme.text_muted)),
                Span::styled("  Tab: complete", Style::default().fg(theme.text_dim)),
            ]);
        }
        if let Some(opts) = slash_argument_options(&norm) {
            return Line::from(vec![
                Span::styled(
                    format!(" {}: ", canonical_slash_command(&norm)),
                    Style::default().fg(theme.primary),
                ),
                Span::styled(opts.join("  "), Style::default().fg(theme.text_muted)),
            ]);
        }
    }

    if let Some(comp) = completion {
        let label = format!(
            " [{}/{}] {} ",
            comp.selected_index + 1,
            comp.suggestions.len(),
            comp.suggestions
                .get(comp.selected_index)
                .map(String::as_str)
                .unwrap_or(""),
        );
        return Line::from(vec![
            Span::styled(label, Style::default().fg(theme.primary)),
            Span::styled("  Tab/Shift+Tab: cycle", Style::default().fg(theme.text_dim)),
        ]);
    }

    let sep = Span::styled(" │ ", Style::default().fg(theme.border_normal));
    let mut spans = vec![
        Span::styled(" /help", Style::default().fg(theme.text_muted)),
        sep,
    ];
    if is_busy {
        spans.push(Span::styled(
            "Ctrl+C cancel  PgUp/Dn scroll  Esc exit",
            Style::default().fg(theme.text_dim),
        ));
    } else {
        spans.push(Span::styled(
            "Enter send  Shift+Enter newline  ↑↓ history  PgUp/Dn scroll  Esc exit",
            Style::default().fg(theme.text_dim),
        ));
    }
    Line::from(spans)
}

/// Eight-cell bar for a `[0, 1]` metric, e.g. `[███░░░░░]`.
pub fn meter_bar(value: f64) -> String {
    let ratio = if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    };
    let filled = (ratio * 8.0).round() as usize;
    let empty = 8 - filled;
    format!("[{}{}]", "█".repeat(filled), "░".repeat(empty))
}

pub fn format_duration_ms(ms: u64) -> String {
    if ms >= 60_000 {
        format!("{:.1}m", ms as f64 / 60_000.0)
    } else if ms >= 1_000 {
        format!("{:.1}s", ms as f64 / 1_000.0)
    } else {
        format!("{}ms", ms)
    }
}

pub const TUI_INPUT_MAX_LINES: u16 = 4;

pub fn input_line_count(input: &str) -> u16 {
    let lines = input.split('\n').count().min(TUI_INPUT_MAX_LINES as usize);
    lines.max(1) as u16
}

/// Where the input box shows its text and cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputViewport {
    /// Lines scrolled off the top so the line being typed stays visible
    pub scroll: u16,
    pub cursor: (u16, u16),
}

/// Place the cursor at the end of the input inside the bordered `area`.
/// The cursor never leaves the box interior.
pub fn input_viewport(input: &str, area: Rect) -> InputViewport {
    let rows = area.height.saturating_sub(2).max(1) as usize;
    let cols = area.width.saturating_sub(2).max(1) as usize;
    let lines = input.split('\n').count();
    let scroll = lines.saturating_sub(rows);
    let last_line = input.rsplit('\n').next().unwrap_or(input);

    let col = last_line.chars().count().min(cols - 1);
    let row = lines - 1 - scroll;
    InputViewport {
        scroll: scroll.min(u16::MAX as usize) as u16,
        cursor: (
            area.x.saturating_add(1).saturating_add(col as u16),
            area.y.saturating_add(1).saturating_add(row as u16),
        ),
    }
}

/// Vertical layout: title, body, hint, input.
pub fn tui_layout_constraints(input_lines: u16) -> Vec<Constraint> {
    vec![
        Constraint::Length(1),
        Constraint::Min(5),
        Constraint::Length(1),
        Constraint::Length(input_lines + 2),
    ]
}

/// Split the body row into roster | conversation | dashboard.
///
/// Below [`TUI_SIDE_PANES_MIN_WIDTH`] columns both side panes collapse and the
/// conversation takes the full width.
pub fn three_pane_split(area: Rect, show_roster: bool, show_dashboard: bool) -> PaneAreas {
    if area.width < TUI_SIDE_PANES_MIN_WIDTH || (!show_roster && !show_dashboard) {
        return PaneAreas {
            roster: None,
            conversation: area,
            dashboard: None,
        };
    }
    let mut constraints = Vec::with_capacity(3);
    if show_roster {
        constraints.push(Constraint::Length(TUI_ROSTER_WIDTH));
    }
    constraints.push(Constraint::Min(30));
    if show_dashboard {
        constraints.push(Constraint::Length(TUI_DASHBOARD_WIDTH));
    }
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);

    let mut idx = 0;
    let roster = show_roster.then(|| {
        idx += 1;
        chunks[0]
    });
    let conversation = chunks[idx];
    let dashboard = show_dashboard.then(|| chunks[idx + 1]);
    PaneAreas {
        roster,
        conversation,
        dashboard,
    }
}

pub fn calc_scroll_max(total_lines: usize, body_height: usize) -> usize {
    total_lines.saturating_sub(body_height)
}
