//! CLI argument parsing for multiverify.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use crate::config::{
    DEFAULT_GRACE_PERIOD_SECS, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_STALE_TIMEOUT_SECS,
};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// Multiverify: run several coding agents on the same prompt, each in its own
/// git worktree, and report what each one did.
#[derive(Parser, Debug)]
#[command(name = "multiverify")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable debug logging (overridden by MULTIVERIFY_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for multiverify.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run every selected agent on a prompt and emit a JSON report.
    ///
    /// Each agent gets a detached worktree at the current HEAD. Agents are
    /// stopped when they exceed the hard timeout or stop writing output.
    Run(RunArgs),

    /// List configured agents and whether their executables are installed.
    Agents(AgentsArgs),

    /// Remove the workspaces left behind by a previous run.
    Clean(CleanArgs),
}

/// Where a run keeps its state.
#[derive(Args, Debug, Clone)]
pub struct LocationArgs {
    /// Repository to verify.
    #[arg(long, default_value = ".")]
    pub repo: PathBuf,

    /// Directory for logs and the status file [default: <repo>/.multiverify].
    #[arg(long)]
    pub state_dir: Option<PathBuf>,

    /// Directory for per-agent worktrees [default: <state-dir>/worktrees].
    #[arg(long)]
    pub worktree_base: Option<PathBuf>,
}

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub location: LocationArgs,

    /// File containing the prompt handed to every agent.
    #[arg(long)]
    pub prompt_file: PathBuf,

    /// Naming token for workspaces and logs [default: local time, %Y%m%d-%H%M%S].
    #[arg(long)]
    pub token: Option<String>,

    /// YAML file replacing the built-in agent definitions.
    #[arg(long)]
    pub agents_config: Option<PathBuf>,

    /// Only run the named agent (repeatable).
    #[arg(long = "agent")]
    pub agents: Vec<String>,

    /// Hard limit per agent in seconds (0 = unbounded).
    #[arg(long, default_value_t = 0)]
    pub max_timeout: u64,

    /// Seconds without log output before an agent is stopped (0 = never).
    #[arg(long, default_value_t = DEFAULT_STALE_TIMEOUT_SECS)]
    pub stale_timeout: u64,

    /// Seconds between liveness checks.
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    pub check_interval: u64,

    /// Seconds to wait after SIGTERM before SIGKILL.
    #[arg(long, default_value_t = DEFAULT_GRACE_PERIOD_SECS)]
    pub grace_period: u64,

    /// Write the report here instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Keep worktrees after the run for inspection.
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub keep_workspaces: bool,

    /// Remove worktrees once results are collected.
    #[arg(long)]
    pub cleanup: bool,
}

/// Arguments for the `agents` command.
#[derive(Args, Debug)]
pub struct AgentsArgs {
    /// YAML file replacing the built-in agent definitions.
    #[arg(long)]
    pub agents_config: Option<PathBuf>,
}

/// Arguments for the `clean` command.
#[derive(Args, Debug)]
pub struct CleanArgs {
    #[command(flatten)]
    pub location: LocationArgs,

    /// Naming token of the run whose workspaces should be removed.
    #[arg(long)]
    pub token: String,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
