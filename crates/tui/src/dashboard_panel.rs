//! Mastery dashboard sidebar: overall ring gauge, sentiment meters and the
//! per-topic breakdown. Values are clamped for display only.

use copilot_core::mastery::{frustration_label, percent_label, topic_status_label};
use copilot_core::{SessionState, mastery_band, mastery_percent, ring_fraction};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
};

use crate::chat_renderer::TuiTheme;
use crate::layout_manager::meter_bar;

fn band_color(score: f64) -> Color {
    let (r, g, b) = mastery_band(score).rgb();
    Color::Rgb(r, g, b)
}

fn frustration_color(level: f64, theme: &TuiTheme) -> Color {
    match frustration_label(level) {
        "high" => theme.danger,
        "elevated" => theme.warning,
        _ => theme.success,
    }
}

/// Label drawn inside the ring gauge, e.g. `42% Learning`.
pub fn ring_label(score: f64) -> String {
    format!("{}% {}", mastery_percent(score), mastery_band(score).label())
}

fn metric_line(name: &str, value: f64, suffix: Option<&str>, color: Color, theme: &TuiTheme) -> Line<'static> {
    let mut spans = vec![
        Span::styled(format!("{:<12}", name), Style::default().fg(theme.text_muted)),
        Span::styled(meter_bar(value), Style::default().fg(color)),
        Span::styled(format!(" {:>4}", percent_label(value)), Style::default().fg(theme.text_base)),
    ];
    if let Some(suffix) = suffix {
        spans.push(Span::styled(format!(" {}", suffix), Style::default().fg(color)));
    }
    Line::from(spans)
}

fn field_line(name: &str, value: &str, theme: &TuiTheme) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{:<12}", name), Style::default().fg(theme.text_muted)),
        Span::styled(value.to_string(), Style::default().fg(theme.text_strong)),
    ])
}

/// Sentiment block and topic list below the gauge.
pub fn dashboard_lines(session: &SessionState, theme: &TuiTheme) -> Vec<Line<'static>> {
    let mut lines = vec![
        metric_line(
            "Frustration",
            session.frustration_level,
            Some(frustration_label(session.frustration_level)),
            frustration_color(session.frustration_level, theme),
            theme,
        ),
        metric_line("Engagement", session.engagement_score, None, theme.info, theme),
        field_line(
            "Sentiment",
            if session.sentiment.is_empty() {
                "-"
            } else {
                session.sentiment.as_str()
            },
            theme,
        ),
        field_line(
            "Topic",
            if session.current_topic.is_empty() {
                "-"
            } else {
                session.current_topic.as_str()
            },
            theme,
        ),
        Line::default(),
        Line::from(Span::styled(
            "Topics",
            Style::default()
                .fg(theme.primary)
                .add_modifier(Modifier::BOLD),
        )),
    ];

    let topics = session.topics_by_score();
    if topics.is_empty() {
        lines.push(Line::from(Span::styled(
            "  No topics assessed yet",
            Style::default()
                .fg(theme.text_dim)
                .add_modifier(Modifier::ITALIC),
        )));
        return lines;
    }
    for (name, topic) in topics {
        let marker = if name == session.current_topic { "▸ " } else { "  " };
        lines.push(Line::from(vec![
            Span::styled(marker, Style::default().fg(theme.primary)),
            Span::styled(name.to_string(), Style::default().fg(theme.text_strong)),
            Span::styled(
                format!(" {}", percent_label(topic.score)),
                Style::default().fg(band_color(topic.score)),
            ),
        ]));
        let tries = if topic.attempts == 1 { "try" } else { "tries" };
        lines.push(Line::from(Span::styled(
            format!(
                "    {} {} · {}",
                topic.attempts,
                tries,
                topic_status_label(&topic.status)
            ),
            Style::default().fg(theme.text_dim),
        )));
    }
    lines
}

pub fn render_dashboard_panel(frame: &mut Frame, area: Rect, session: &SessionState, theme: &TuiTheme) {
    let block = Block::default()
        .title(Span::styled(
            " Mastery ",
            Style::default()
                .fg(theme.primary)
                .add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border_normal));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(inner);

    let score = session.global_mastery_score;
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(" Overall "))
        .gauge_style(Style::default().fg(band_color(score)).bg(theme.progress_pending))
        .ratio(ring_fraction(score))
        .label(Span::styled(
            ring_label(score),
            Style::default()
                .fg(theme.text_strong)
                .add_modifier(Modifier::BOLD),
        ));
    frame.render_widget(gauge, rows[0]);

    frame.render_widget(
        Paragraph::new(dashboard_lines(session, theme)).wrap(Wrap { trim: false }),
        rows[1],
    );
}
