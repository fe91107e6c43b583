//! Input Handler: input history, slash command parsing and completion,
//! conversation scroll keys.

use copilot_core::AgentRole;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};

use crate::chat_renderer::effective_chat_scroll;
use crate::layout_manager::{TUI_SCROLL_STEP, TuiSessionViewState, calc_scroll_max};

pub const AGENT_ARGUMENT_OPTIONS: &[&str] = &["tutor", "planner", "evaluator", "coach"];

#[derive(Debug, Clone)]
pub struct InputHistory {
    pub entries: Vec<String>,
    pub cursor: Option<usize>,
    pub draft: String,
    pub max_entries: usize,
}

impl InputHistory {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            cursor: None,
            draft: String::new(),
            max_entries: max_entries.max(1),
        }
    }

    pub fn push(&mut self, entry: String) {
        if entry.trim().is_empty() {
            return;
        }
        self.entries.retain(|e| e != &entry);
        self.entries.push(entry);
        if self.entries.len() > self.max_entries {
            self.entries.remove(0);
        }
        self.cursor = None;
    }

    pub fn up(&mut self, current_input: &str) -> Option<&str> {
        if self.entries.is_empty() {
            return None;
        }
        match self.cursor {
            None => {
                self.draft = current_input.to_string();
                self.cursor = Some(self.entries.len() - 1);
            }
            Some(0) => return Some(&self.entries[0]),
            Some(i) => {
                self.cursor = Some(i - 1);
            }
        }
        self.cursor.map(|i| self.entries[i].as_str())
    }

    pub fn down(&mut self) -> Option<&str> {
        match self.cursor {
            None => None,
            Some(i) if i + 1 >= self.entries.len() => {
                self.cursor = None;
                Some(self.draft.as_str())
            }
            Some(i) => {
                self.cursor = Some(i + 1);
                Some(self.entries[i + 1].as_str())
            }
        }
    }

    pub fn reset(&mut self) {
        self.cursor = None;
        self.draft.clear();
    }
}

#[derive(Debug, Clone)]
pub struct CommandCompletionState {
    pub suggestions: Vec<String>,
    pub selected_index: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct SlashCommandSpec {
    pub command: &'static str,
    pub summary: &'static str,
}

pub const SLASH_COMMAND_SPECS: &[SlashCommandSpec] = &[
    SlashCommandSpec {
        command: "/help",
        summary: "show commands and keys",
    },
    SlashCommandSpec {
        command: "/agent",
        summary: "highlight an agent: tutor|planner|evaluator|coach",
    },
    SlashCommandSpec {
        command: "/status",
        summary: "show session, student and backend",
    },
    SlashCommandSpec {
        command: "/export",
        summary: "write the transcript as HTML: /export <path>",
    },
    SlashCommandSpec {
        command: "/cancel",
        summary: "cancel the request in flight",
    },
    SlashCommandSpec {
        command: "/quit",
        summary: "leave the copilot",
    },
    SlashCommandSpec {
        command: "/exit",
        summary: "alias of /quit",
    },
];

pub fn canonical_slash_command(command: &str) -> &str {
    match command {
        "/help" | "/h" | "/?" => "/help",
        "/agent" | "/a" => "/agent",
        "/status" | "/st" => "/status",
        "/export" | "/save" => "/export",
        "/cancel" | "/stop" => "/cancel",
        "/quit" | "/exit" | "/q" => "/quit",
        _ => command,
    }
}

pub fn slash_argument_options(command: &str) -> Option<&'static [&'static str]> {
    match canonical_slash_command(command) {
        "/agent" => Some(AGENT_ARGUMENT_OPTIONS),
        _ => None,
    }
}

/// `(raw command, lowercased command, args, trailing space)` for `/…` input.
pub fn parse_slash_tokens(input: &str) -> Option<(String, String, Vec<String>, bool)> {
    let raw = input.trim_start();
    if !raw.starts_with('/') {
        return None;
    }
    let trailing_space = raw.ends_with(' ');
    let mut iter = raw.split_whitespace();
    let command_raw = iter.next().unwrap_or("/").to_string();
    let command_norm = command_raw.to_ascii_lowercase();
    let args = iter.map(|value| value.to_string()).collect::<Vec<_>>();
    Some((command_raw, command_norm, args, trailing_space))
}

pub fn matching_slash_commands(prefix: &str) -> Vec<SlashCommandSpec> {
    let normalized = prefix.trim();
    if normalized.is_empty() || normalized == "/" {
        return SLASH_COMMAND_SPECS.to_vec();
    }
    SLASH_COMMAND_SPECS
        .iter()
        .copied()
        .filter(|spec| spec.command.starts_with(normalized))
        .collect()
}

pub fn completion_suggestions_for_input(input: &str) -> Vec<String> {
    let Some((command_raw, command_norm, args, trailing_space)) = parse_slash_tokens(input) else {
        return Vec::new();
    };
    if args.is_empty() && !trailing_space {
        return matching_slash_commands(command_norm.as_str())
            .into_iter()
            .map(|spec| spec.command.to_string())
            .collect();
    }
    if args.len() > 1 {
        return Vec::new();
    }
    let arg_prefix = args
        .first()
        .map(|arg| arg.to_ascii_lowercase())
        .unwrap_or_default();
    slash_argument_options(command_norm.as_str())
        .unwrap_or(&[])
        .iter()
        .copied()
        .filter(|option| option.starts_with(arg_prefix.as_str()))
        .map(|option| format!("{} {}", command_raw, option))
        .collect()
}

/// Tab / Shift+Tab completion. Returns true when the input changed.
pub fn apply_slash_completion(
    input: &mut String,
    completion: &mut Option<CommandCompletionState>,
    reverse: bool,
) -> bool {
    if let Some(state) = completion.as_mut()
        && !state.suggestions.is_empty()
        && state.selected_index < state.suggestions.len()
        && input.trim() == state.suggestions[state.selected_index]
    {
        let len = state.suggestions.len();
        state.selected_index = if reverse {
            if state.selected_index == 0 {
                len - 1
            } else {
                state.selected_index - 1
            }
        } else {
            (state.selected_index + 1) % len
        };
        *input = state.suggestions[state.selected_index].clone();
        return true;
    }

    let suggestions = completion_suggestions_for_input(input);
    if suggestions.is_empty() {
        *completion = None;
        return false;
    }
    let selected_index = if reverse { suggestions.len() - 1 } else { 0 };
    *input = suggestions[selected_index].clone();
    *completion = Some(CommandCompletionState {
        suggestions,
        selected_index,
    });
    true
}

/// A parsed slash command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Help,
    Agent(Option<String>),
    Status,
    Export(Option<String>),
    Cancel,
    Quit,
    Unknown(String),
}

/// Parse `/command args…`; `None` when the line is a chat message.
pub fn parse_slash_command(line: &str) -> Option<SlashCommand> {
    let (raw, norm, args, _) = parse_slash_tokens(line)?;
    let first_arg = args.first().cloned();
    let command = match canonical_slash_command(&norm) {
        "/help" => SlashCommand::Help,
        "/agent" => SlashCommand::Agent(first_arg),
        "/status" => SlashCommand::Status,
        "/export" => {
            // Paths may contain spaces; keep everything after the command.
            let rest = line.trim_start()[raw.len()..].trim();
            SlashCommand::Export((!rest.is_empty()).then(|| rest.to_string()))
        }
        "/cancel" => SlashCommand::Cancel,
        "/quit" => SlashCommand::Quit,
        _ => SlashCommand::Unknown(raw),
    };
    Some(command)
}

/// Roster agent named by a `/agent` argument.
pub fn parse_agent_argument(arg: &str) -> Option<AgentRole> {
    AgentRole::parse(arg)
}

pub fn move_session_scroll(session_view: &mut TuiSessionViewState, total_lines: usize, delta: isize) {
    let max_scroll = calc_scroll_max(total_lines, session_view.body_height);
    let current = effective_chat_scroll(total_lines, session_view) as isize;
    let next = (current + delta).clamp(0, max_scroll as isize) as usize;
    session_view.scroll_offset = next;
    session_view.auto_follow = next >= max_scroll;
}

pub fn handle_session_scroll_key(
    key: &KeyEvent,
    session_view: &mut TuiSessionViewState,
    total_lines: usize,
) -> bool {
    let page = (session_view.body_height / 2).max(1) as isize;
    match key.code {
        KeyCode::Up if key.modifiers.contains(KeyModifiers::CONTROL) => {
            move_session_scroll(session_view, total_lines, -1);
            true
        }
        KeyCode::Down if key.modifiers.contains(KeyModifiers::CONTROL) => {
            move_session_scroll(session_view, total_lines, 1);
            true
        }
        KeyCode::PageUp => {
            move_session_scroll(session_view, total_lines, -page);
            true
        }
        KeyCode::PageDown => {
            move_session_scroll(session_view, total_lines, page);
            true
        }
        KeyCode::Home if key.modifiers.contains(KeyModifiers::CONTROL) => {
            session_view.scroll_offset = 0;
            session_view.auto_follow = false;
            true
        }
        KeyCode::End if key.modifiers.contains(KeyModifiers::CONTROL) => {
            session_view.scroll_offset = calc_scroll_max(total_lines, session_view.body_height);
            session_view.auto_follow = true;
            true
        }
        _ => false,
    }
}

pub fn handle_session_scroll_mouse(
    mouse: &MouseEvent,
    session_view: &mut TuiSessionViewState,
    total_lines: usize,
) -> bool {
    match mouse.kind {
        MouseEventKind::ScrollUp => {
            move_session_scroll(session_view, total_lines, -(TUI_SCROLL_STEP as isize));
            true
        }
        MouseEventKind::ScrollDown => {
            move_session_scroll(session_view, total_lines, TUI_SCROLL_STEP as isize);
            true
        }
        _ => false,
    }
}
