//! Implementation of the `multiverify run` command.

use super::{load_agents, resolve_locations};
use crate::cli::RunArgs;
use crate::config::Settings;
use crate::launcher::Launcher;
use crate::monitor::TimeoutPolicy;
use crate::report::Report;
use crate::supervisor::{CancelToken, Supervisor, load_prompt};
use anyhow::{Context, Result};
use chrono::Local;
use std::time::Duration;

/// Format of the default naming token.
const TOKEN_FORMAT: &str = "%Y%m%d-%H%M%S";

pub fn cmd_run(args: RunArgs, cancel: &CancelToken) -> Result<i32> {
    let prompt = load_prompt(&args.prompt_file)?;
    let locations = resolve_locations(&args.location)?;
    let agents = load_agents(args.agents_config.as_deref())?.select(&args.agents)?;

    let token = args
        .token
        .clone()
        .unwrap_or_else(|| Local::now().format(TOKEN_FORMAT).to_string());

    let mut settings = Settings::new(locations.repo_root, token);
    settings.state_dir = locations.state_dir;
    settings.worktree_base = locations.worktree_base;
    settings.timeouts =
        TimeoutPolicy::from_secs(args.max_timeout, args.stale_timeout, args.grace_period);
    settings.poll_interval = Duration::from_secs(args.check_interval);
    settings.keep_workspaces = args.keep_workspaces && !args.cleanup;

    let outcome = Supervisor::new(
        agents,
        settings,
        prompt,
        Launcher::from_process_env(),
        cancel.clone(),
    )
    .run()?;

    outcome
        .report
        .emit(args.output.as_deref())
        .context("emitting report")?;
    print_summary(&outcome.report);

    Ok(outcome.exit_code)
}

/// One line per agent on stderr, so stdout stays pure JSON.
fn print_summary(report: &Report) {
    eprintln!();
    for (name, result) in &report.agents {
        let mut line = format!(
            "  {:<12} {:<11} {:>7.1}s  {} file(s)",
            name, result.status, result.duration_seconds, result.files_changed
        );
        if result.committed {
            let short = result.commit_hash.get(..12).unwrap_or(&result.commit_hash);
            line.push_str(&format!(", committed {}", short));
        }
        eprintln!("{}", line);
    }
    eprintln!(
        "{}/{} agent(s) completed{}",
        report.completed_count,
        report.total_count,
        if report.interrupted { " (interrupted)" } else { "" }
    );
}
