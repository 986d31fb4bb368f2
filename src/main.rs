//! Multiverify: supervise several coding agents working on the same prompt.
//!
//! This is the main entry point for the `multiverify` CLI. It parses
//! arguments, installs logging and the interrupt handler, dispatches to the
//! command handler, and maps the outcome to a process exit code.

mod cli;
mod collect;
mod commands;
mod config;
mod error;
mod exit_codes;
mod fs;
mod git;
mod launcher;
mod logging;
mod monitor;
mod report;
mod run;
mod supervisor;
mod workspace;

#[cfg(test)]
mod test_support;

use cli::Cli;
use std::process::ExitCode;
use supervisor::CancelToken;

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    logging::init(cli.verbose);

    // SIGINT and SIGTERM both request a graceful stop.
    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_token.cancel()) {
        tracing::warn!(error = %e, "failed to install interrupt handler");
    }

    match commands::dispatch(cli.command, &cancel) {
        Ok(code) => ExitCode::from(code as u8),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {:#}", err);

            let code = err
                .downcast_ref::<error::VerifyError>()
                .map(|e| e.exit_code())
                .unwrap_or(exit_codes::FAILURE);
            ExitCode::from(code as u8)
        }
    }
}
