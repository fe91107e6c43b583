//! Copilot CLI Entry Point
//!
//! This binary provides the terminal client for the educational copilot.

use std::process;

#[tokio::main]
async fn main() {
    if let Err(e) = copilot_interface::run_cli().await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
