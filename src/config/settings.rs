//! Per-run settings: where state lives and how long agents may run.

use crate::monitor::TimeoutPolicy;
use crate::workspace::run_slug;
use std::path::PathBuf;
use std::time::Duration;

/// Directory (relative to the repository root) holding logs, status and worktrees.
pub const DEFAULT_STATE_DIR: &str = ".multiverify";

/// Seconds without log growth before a live agent is considered stale.
pub const DEFAULT_STALE_TIMEOUT_SECS: u64 = 120;

/// Seconds between liveness checks.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Seconds between a graceful terminate and a forced kill.
pub const DEFAULT_GRACE_PERIOD_SECS: u64 = 10;

/// Everything one supervised run needs besides the agents and the prompt.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Absolute path to the repository whose `HEAD` is the baseline.
    pub repo_root: PathBuf,
    /// Root for logs and the status file.
    pub state_dir: PathBuf,
    /// Parent directory of the per-agent worktrees.
    pub worktree_base: PathBuf,
    /// Naming token shared by every workspace and log of this run.
    pub token: String,
    pub timeouts: TimeoutPolicy,
    pub poll_interval: Duration,
    /// Leave worktrees in place after collection so they can be inspected.
    pub keep_workspaces: bool,
}

impl Settings {
    /// Settings rooted at `repo_root` with default paths and limits.
    pub fn new(repo_root: impl Into<PathBuf>, token: impl Into<String>) -> Self {
        let repo_root = repo_root.into();
        let state_dir = repo_root.join(DEFAULT_STATE_DIR);
        let worktree_base = state_dir.join("worktrees");
        Self {
            repo_root,
            state_dir,
            worktree_base,
            token: token.into(),
            timeouts: TimeoutPolicy::default(),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            keep_workspaces: true,
        }
    }

    pub fn log_dir(&self) -> PathBuf {
        self.state_dir.join("logs")
    }

    /// `<state_dir>/logs/verify-<agent>--<token>.log`
    pub fn log_path(&self, agent: &str) -> PathBuf {
        self.log_dir()
            .join(format!("{}.log", run_slug(agent, &self.token)))
    }

    /// `<state_dir>/verify-status--<token>.json`
    pub fn status_path(&self) -> PathBuf {
        self.state_dir
            .join(format!("{}.json", run_slug("status", &self.token)))
    }
}
