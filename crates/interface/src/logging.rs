//! Tracing subscriber setup.
//!
//! One-shot commands log to stderr. The chat TUI owns the terminal, so it
//! logs to a file instead.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

pub const ENV_LOG: &str = "COPILOT_LOG";
pub const ENV_LOG_FILE: &str = "COPILOT_LOG_FILE";

/// `COPILOT_LOG` if set and valid, else `info` with `--verbose`, else `warn`.
pub fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "info" } else { "warn" })
    })
}

pub fn log_file_path() -> PathBuf {
    match std::env::var(ENV_LOG_FILE) {
        Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
        _ => std::env::temp_dir().join("copilot.log"),
    }
}

pub fn init_stderr_logging(verbose: bool) {
    // A subscriber may already be installed (tests); keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(std::io::stderr)
        .try_init();
}

/// Append logs to [`log_file_path`]. Returns the path in use.
pub fn init_file_logging(verbose: bool) -> std::io::Result<PathBuf> {
    let path = log_file_path();
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();
    Ok(path)
}
