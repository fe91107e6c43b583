//! Agent roster sidebar: the four personas, active one highlighted.

use copilot_core::AgentRole;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use crate::chat_renderer::TuiTheme;

fn roster_icon(active: bool, busy: bool) -> &'static str {
    match (active, busy) {
        (true, true) => "◉",
        (true, false) => "●",
        _ => "○",
    }
}

/// Two lines per agent: name, then its role description.
pub fn roster_lines(active: AgentRole, busy: bool, theme: &TuiTheme) -> Vec<Line<'static>> {
    let mut lines = Vec::with_capacity(AgentRole::ALL.len() * 3);
    for (i, agent) in AgentRole::ALL.iter().copied().enumerate() {
        if i > 0 {
            lines.push(Line::default());
        }
        let is_active = agent == active;
        let accent = theme.agent_accent(agent);
        let name_style = if is_active {
            Style::default().fg(accent).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.text_base)
        };
        let mut spans = vec![
            Span::styled(format!("{} ", roster_icon(is_active, busy)), Style::default().fg(accent)),
            Span::styled(agent.display_name().to_string(), name_style),
        ];
        if is_active {
            spans.push(Span::styled(
                if busy { "  thinking" } else { "  active" },
                Style::default().fg(theme.text_muted).add_modifier(Modifier::ITALIC),
            ));
        }
        lines.push(Line::from(spans));
        lines.push(Line::from(Span::styled(
            format!("  {}", agent.description()),
            Style::default().fg(theme.text_dim),
        )));
    }
    lines
}

pub fn render_roster_panel(
    frame: &mut Frame,
    area: Rect,
    active: AgentRole,
    busy: bool,
    theme: &TuiTheme,
) {
    let block = Block::default()
        .title(Span::styled(
            " Agents ",
            Style::default()
                .fg(theme.primary)
                .add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border_normal));
    let paragraph = Paragraph::new(roster_lines(active, busy, theme))
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}
