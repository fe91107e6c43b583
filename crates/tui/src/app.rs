//! TUI application loop: the ratatui event loop for the interactive chat.

use std::io::{self, Write};
use std::time::Duration;

use copilot_core::TuiConfig;
use crossterm::cursor::Show;
use crossterm::event::{
    self, DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{
    Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap,
};
use ratatui::{Frame, Terminal};
use tracing::{debug, info};

use crate::chat_renderer::{
    LocalNote, NoteKind, TuiTheme, agent_header, effective_chat_scroll, push_local_note,
    style_conversation,
};
use crate::commands::{CommandEffect, handle_slash_command};
use crate::controller::{ChatController, RejectReason, SubmitOutcome};
use crate::dashboard_panel::render_dashboard_panel;
use crate::input_handler::{
    CommandCompletionState, InputHistory, apply_slash_completion, handle_session_scroll_key,
    handle_session_scroll_mouse, parse_slash_command,
};
use crate::layout_manager::{
    TuiSessionViewState, build_status_hint_bar, build_title_bar, input_line_count,
    input_viewport, three_pane_split, tui_layout_constraints,
};
use crate::roster_panel::render_roster_panel;

pub const TUI_INPUT_POLL: Duration = Duration::from_millis(20);

/// Everything the loop owns besides the controller.
#[derive(Debug)]
pub struct ChatUiState {
    pub input: String,
    pub history: InputHistory,
    pub completion: Option<CommandCompletionState>,
    pub notes: Vec<LocalNote>,
    pub session_view: TuiSessionViewState,
    /// Wrapped conversation rows at the last draw
    pub total_lines: usize,
    pub should_quit: bool,
}

impl ChatUiState {
    pub fn new(config: &TuiConfig) -> Self {
        Self {
            input: String::new(),
            history: InputHistory::new(config.history_limit),
            completion: None,
            notes: vec![LocalNote {
                after: 1,
                kind: NoteKind::System,
                text: "Ask anything and press Enter.  /help for commands".to_string(),
            }],
            session_view: TuiSessionViewState::default(),
            total_lines: 0,
            should_quit: false,
        }
    }

    fn note(&mut self, controller: &ChatController, kind: NoteKind, text: impl Into<String>) {
        push_local_note(
            &mut self.notes,
            LocalNote {
                after: controller.messages().len(),
                kind,
                text: text.into(),
            },
        );
    }

    /// Enter: run a slash command or submit a chat turn.
    fn submit_input(&mut self, controller: &mut ChatController) {
        if self.input.trim().is_empty() {
            return;
        }
        self.completion = None;

        if let Some(command) = parse_slash_command(&self.input) {
            let line = std::mem::take(&mut self.input);
            self.history.push(line.trim().to_string());
            self.history.reset();
            debug!(command = line.trim(), "slash command");
            if handle_slash_command(command, controller, &mut self.notes) == CommandEffect::Quit {
                self.should_quit = true;
            }
            self.session_view.auto_follow = true;
            return;
        }

        match controller.submit(&self.input) {
            SubmitOutcome::Accepted => {
                let line = std::mem::take(&mut self.input);
                self.history.push(line);
                self.history.reset();
                self.session_view.auto_follow = true;
            }
            SubmitOutcome::Rejected(RejectReason::Busy) => {
                let waiting = agent_header(controller.active_agent());
                self.note(
                    controller,
                    NoteKind::Warning,
                    format!("{} is still answering; Ctrl+C or /cancel to stop it", waiting),
                );
            }
            SubmitOutcome::Rejected(RejectReason::Empty) => {}
        }
    }

    /// Bracketed paste: the text lands in the input box as is, newlines
    /// included. Nothing is submitted.
    pub fn handle_paste(&mut self, text: &str) {
        let text = text.replace("\r\n", "\n").replace('\r', "\n");
        self.input.push_str(&text);
        self.completion = None;
    }

    /// Apply one key press to the input box, history and controller.
    pub fn handle_key(&mut self, key: &KeyEvent, controller: &mut ChatController) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            if controller.cancel().is_none() {
                self.should_quit = true;
            }
            return;
        }

        if key.code == KeyCode::Esc {
            self.should_quit = true;
            return;
        }

        if handle_session_scroll_key(key, &mut self.session_view, self.total_lines) {
            return;
        }

        match key.code {
            KeyCode::Tab => {
                apply_slash_completion(&mut self.input, &mut self.completion, false);
            }
            KeyCode::BackTab => {
                apply_slash_completion(&mut self.input, &mut self.completion, true);
            }
            KeyCode::Up => {
                if let Some(prev) = self.history.up(&self.input) {
                    self.input = prev.to_string();
                }
            }
            KeyCode::Down => {
                if let Some(next) = self.history.down() {
                    self.input = next.to_string();
                }
            }
            KeyCode::Enter
                if key.modifiers.contains(KeyModifiers::SHIFT)
                    || key.modifiers.contains(KeyModifiers::ALT) =>
            {
                self.input.push('\n');
            }
            KeyCode::Enter => self.submit_input(controller),
            KeyCode::Backspace => {
                self.input.pop();
                self.completion = None;
            }
            KeyCode::Char(ch) => {
                if !key.modifiers.contains(KeyModifiers::CONTROL) {
                    self.input.push(ch);
                    self.completion = None;
                }
            }
            _ => {}
        }
    }
}

/// Draw one frame: title, three panes, hint bar, input box.
pub fn draw_chat(
    f: &mut Frame,
    ui: &mut ChatUiState,
    controller: &ChatController,
    config: &TuiConfig,
    theme: &TuiTheme,
) {
    let areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints(tui_layout_constraints(input_line_count(&ui.input)))
        .split(f.area());

    // [0] Title bar
    f.render_widget(
        Paragraph::new(build_title_bar(controller, theme))
            .style(Style::default().bg(Color::Rgb(30, 30, 30))),
        areas[0],
    );

    // [1] Roster | Conversation | Dashboard
    let panes = three_pane_split(areas[1], config.show_roster, config.show_dashboard);
    if let Some(area) = panes.roster {
        render_roster_panel(f, area, controller.active_agent(), controller.is_busy(), theme);
    }
    if let Some(area) = panes.dashboard {
        render_dashboard_panel(f, area, controller.session(), theme);
    }

    let body_block = Block::default()
        .title(Span::styled(" Conversation ", Style::default().fg(theme.primary)))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border_normal));
    let inner = body_block.inner(panes.conversation);
    ui.session_view.body_height = (inner.height as usize).max(1);
    let typing = controller
        .busy_for()
        .map(|elapsed| (controller.active_agent(), elapsed));
    let styled_lines = style_conversation(controller.messages().as_slice(), &ui.notes, typing, theme);
    let body = Paragraph::new(Text::from(styled_lines)).wrap(Wrap { trim: false });
    // Scrolling works on wrapped rows, not logical lines.
    ui.total_lines = body.line_count(inner.width);
    let scroll = effective_chat_scroll(ui.total_lines, &ui.session_view);
    let body = body
        .block(body_block)
        .scroll((scroll.min(u16::MAX as usize) as u16, 0));
    f.render_widget(body, panes.conversation);
    if ui.total_lines > ui.session_view.body_height {
        let mut scrollbar_state = ScrollbarState::new(ui.total_lines).position(scroll);
        let scrollbar = Scrollbar::default()
            .orientation(ScrollbarOrientation::VerticalRight)
            .thumb_style(Style::default().fg(theme.text_muted));
        f.render_stateful_widget(scrollbar, panes.conversation, &mut scrollbar_state);
    }

    // [2] Status / hint bar
    f.render_widget(
        Paragraph::new(build_status_hint_bar(
            &ui.input,
            ui.completion.as_ref(),
            theme,
            controller.is_busy(),
        ))
        .style(Style::default().bg(Color::Rgb(25, 25, 25))),
        areas[2],
    );

    // [3] Input area (multiline)
    let multiline_hint = if ui.input.contains('\n') {
        " (multiline) "
    } else {
        ""
    };
    let input_block = Block::default()
        .title(Span::styled(
            format!(" > {}", multiline_hint),
            Style::default()
                .fg(theme.primary)
                .add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border_active));
    let input_lines: Vec<Line<'_>> = ui
        .input
        .split('\n')
        .map(|l| Line::from(l.to_string()))
        .collect();
    let viewport = input_viewport(&ui.input, areas[3]);
    f.render_widget(
        Paragraph::new(Text::from(input_lines))
            .block(input_block)
            .scroll((viewport.scroll, 0)),
        areas[3],
    );
    f.set_cursor_position(viewport.cursor);
}

async fn chat_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    controller: &mut ChatController,
    config: &TuiConfig,
) -> anyhow::Result<()> {
    let theme = TuiTheme::default_dark();
    let mut ui = ChatUiState::new(config);

    while !ui.should_quit {
        if let Some(outcome) = controller.poll_settled().await {
            debug!(?outcome, "turn settled");
        }

        terminal.draw(|f| draw_chat(f, &mut ui, controller, config, &theme))?;

        if event::poll(TUI_INPUT_POLL)? {
            match event::read()? {
                Event::Key(key) => ui.handle_key(&key, controller),
                Event::Mouse(mouse) => {
                    let _ = handle_session_scroll_mouse(&mouse, &mut ui.session_view, ui.total_lines);
                }
                Event::Paste(text) => ui.handle_paste(&text),
                _ => {}
            }
        }
    }
    Ok(())
}

fn enter_screen<W: Write>(out: &mut W) -> io::Result<()> {
    execute!(out, EnterAlternateScreen, EnableMouseCapture, EnableBracketedPaste)
}

fn leave_screen<W: Write>(out: &mut W) -> io::Result<()> {
    execute!(out, DisableBracketedPaste, DisableMouseCapture, LeaveAlternateScreen, Show)
}

fn open_terminal() -> io::Result<Terminal<CrosstermBackend<io::Stdout>>> {
    let mut stdout = io::stdout();
    enter_screen(&mut stdout)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal() -> io::Result<()> {
    let raw = disable_raw_mode();
    leave_screen(&mut io::stdout())?;
    raw
}

/// Run the interactive chat until the user quits. The terminal is restored
/// even when setup or the loop fails.
pub async fn run_chat_tui(controller: &mut ChatController, config: &TuiConfig) -> anyhow::Result<()> {
    info!(backend = controller.backend_url(), "starting chat tui");
    enable_raw_mode()?;

    let result = match open_terminal() {
        Ok(mut terminal) => chat_loop(&mut terminal, controller, config).await,
        Err(e) => Err(anyhow::Error::new(e).context("terminal setup failed")),
    };

    let restored = restore_terminal();
    if controller.cancel().is_some() {
        info!("in-flight request cancelled on exit");
    }
    info!(messages = controller.messages().len(), "chat tui closed");
    result?;
    restored?;
    Ok(())
}
