//! CLI - Command Line Interface
//!
//! Available Commands:
//! - copilot            - Interactive chat TUI (same as `copilot chat`)
//! - copilot ask -m ".." - One-shot question, reply printed to stdout
//! - copilot health     - Check the backend and list its agents
//!
//! Settings resolve as: defaults, YAML file, environment, then flags.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use copilot_core::{BackendError, CopilotConfig, HealthReply, markdown, mastery_band, mastery_percent};
use copilot_tui::{ChatController, DynChatBackend, SubmitOutcome, TurnOutcome, agent_header};

use crate::http_backend::HttpChatBackend;
use crate::logging;

/// CLI Errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// A chat turn failed; carries the user-facing notice
    #[error("{0}")]
    Request(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Terminal UI failed: {0}")]
    Tui(String),

    #[error("Output error: {0}")]
    Output(String),
}

/// CLI Configuration
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Explicit config file (`--config`)
    pub config_path: Option<PathBuf>,

    /// Backend base URL override
    pub backend_url: Option<String>,

    /// Request deadline override (seconds)
    pub timeout_secs: Option<u64>,

    /// Verbose output
    pub verbose: bool,

    /// Output format
    pub output_format: OutputFormat,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            config_path: None,
            backend_url: None,
            timeout_secs: None,
            verbose: false,
            output_format: OutputFormat::Pretty,
        }
    }
}

impl CliConfig {
    /// Load the client config and apply flag overrides on top.
    pub fn resolve(&self) -> Result<CopilotConfig, CliError> {
        let mut config = CopilotConfig::load(self.config_path.as_deref())
            .map_err(|e| CliError::Config(e.to_string()))?;
        if let Some(url) = self.backend_url.as_deref().map(str::trim)
            && !url.is_empty()
        {
            config.backend_url = url.to_string();
        }
        if let Some(secs) = self.timeout_secs {
            config.request_timeout_secs = secs;
        }
        if config.request_timeout_secs == 0 {
            return Err(CliError::Config(
                "request timeout must be at least 1 second".to_string(),
            ));
        }
        if !config.backend_url.starts_with("http://") && !config.backend_url.starts_with("https://") {
            return Err(CliError::Config(format!(
                "backend URL must start with http:// or https://, got '{}'",
                config.backend_url
            )));
        }
        Ok(config)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Json,
    Html,
}

/// Copilot CLI
#[derive(Parser, Debug)]
#[command(name = "copilot")]
#[command(author, version, about = "Terminal client for the multi-agent educational copilot", long_about = None)]
pub(crate) struct Cli {
    /// Backend base URL (e.g. http://localhost:8000)
    #[arg(long, global = true, value_name = "URL")]
    pub(crate) backend_url: Option<String>,

    /// Config file (YAML)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub(crate) config: Option<PathBuf>,

    /// Request deadline in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub(crate) timeout: Option<u64>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub(crate) verbose: bool,

    /// Output format
    #[arg(long, global = true, value_enum)]
    pub(crate) output: Option<OutputFormat>,

    #[command(subcommand)]
    pub(crate) command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub(crate) enum Commands {
    /// Interactive chat (default)
    Chat,

    /// Ask a single question and print the reply
    Ask(AskArgs),

    /// Check that the backend is up
    Health,
}

#[derive(Args, Debug, PartialEq)]
pub(crate) struct AskArgs {
    /// Message to send
    #[arg(short = 'm', long)]
    pub message: String,

    /// Backend session to continue
    #[arg(short = 's', long)]
    pub session: Option<String>,
}

impl Cli {
    pub(crate) fn cli_config(&self) -> CliConfig {
        CliConfig {
            config_path: self.config.clone(),
            backend_url: self.backend_url.clone(),
            timeout_secs: self.timeout,
            verbose: self.verbose,
            output_format: self.output.unwrap_or(OutputFormat::Pretty),
        }
    }
}

/// Run CLI
pub async fn run_cli() -> Result<(), CliError> {
    run(Cli::parse()).await
}

pub(crate) async fn run(cli: Cli) -> Result<(), CliError> {
    let settings = cli.cli_config();
    let command = cli.command.unwrap_or(Commands::Chat);

    if command == Commands::Chat {
        logging::init_file_logging(settings.verbose)
            .map_err(|e| CliError::Config(format!("cannot open log file: {e}")))?;
    } else {
        logging::init_stderr_logging(settings.verbose);
    }

    let config = settings.resolve()?;
    info!(backend = %config.base_url(), timeout_secs = config.request_timeout_secs, "copilot starting");

    let backend: DynChatBackend = Arc::new(HttpChatBackend::new(&config)?);
    let timeout = Duration::from_secs(config.request_timeout_secs);

    match command {
        Commands::Chat => {
            let mut controller = ChatController::new(backend, timeout);
            copilot_tui::run_chat_tui(&mut controller, &config.tui)
                .await
                .map_err(|e| CliError::Tui(format!("{e:#}")))
        }
        Commands::Ask(args) => {
            let controller = ask_once(backend, timeout, &args.message, args.session).await?;
            println!("{}", render_ask(&controller, settings.output_format)?);
            Ok(())
        }
        Commands::Health => {
            let reply = backend.health().await?;
            println!(
                "{}",
                render_health(backend.base_url(), &reply, settings.output_format)?
            );
            Ok(())
        }
    }
}

/// Send one message and wait for the reply. The returned controller holds
/// the conversation and the merged session.
pub async fn ask_once(
    backend: DynChatBackend,
    timeout: Duration,
    message: &str,
    session: Option<String>,
) -> Result<ChatController, CliError> {
    let mut controller = ChatController::new(backend, timeout).with_session_id(session);
    if let SubmitOutcome::Rejected(reason) = controller.submit(message) {
        return Err(CliError::InvalidInput(format!(
            "message not sent ({reason:?})"
        )));
    }
    match controller.wait_settled().await {
        Some(TurnOutcome::Replied { .. }) => Ok(controller),
        Some(TurnOutcome::Failed(err)) => {
            Err(CliError::Request(err.user_notice(controller.backend_url())))
        }
        None => Err(CliError::Request("no reply received".to_string())),
    }
}

/// Format the settled turn of [`ask_once`].
pub fn render_ask(controller: &ChatController, format: OutputFormat) -> Result<String, CliError> {
    let reply = controller
        .last_reply()
        .ok_or_else(|| CliError::Output("no reply to render".to_string()))?;

    match format {
        OutputFormat::Pretty => {
            let session = controller.session();
            let score = session.global_mastery_score;
            let mut out = format!(
                "{}:\n{}\n",
                agent_header(controller.active_agent()),
                reply.response.trim_end()
            );
            out.push_str(&format!(
                "\nmastery {}% {}",
                mastery_percent(score),
                mastery_band(score).label()
            ));
            if let Some(id) = controller.session_id() {
                out.push_str(&format!(" · session {id}"));
            }
            Ok(out)
        }
        OutputFormat::Json => serde_json::to_string_pretty(&serde_json::json!({
            "reply": reply,
            "agent": controller.active_agent(),
            "session_id": controller.session_id(),
            "student_id": controller.student_id(),
            "state": controller.session(),
        }))
        .map_err(|e| CliError::Output(e.to_string())),
        OutputFormat::Html => Ok(markdown::format(&reply.response)),
    }
}

pub fn render_health(
    base_url: &str,
    reply: &HealthReply,
    format: OutputFormat,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(&serde_json::json!({
            "backend_url": base_url,
            "status": reply.status,
            "agents": reply.agents,
        }))
        .map_err(|e| CliError::Output(e.to_string())),
        OutputFormat::Pretty | OutputFormat::Html => {
            let agents = if reply.agents.is_empty() {
                "-".to_string()
            } else {
                reply.agents.join(", ")
            };
            Ok(format!(
                "Backend {base_url}: {}\nAgents: {agents}",
                reply.status
            ))
        }
    }
}
