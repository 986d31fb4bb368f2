//! Runtime record for one agent.
//!
//! An [`AgentRun`] moves `pending -> running -> <terminal>` exactly once.
//! Every transition goes through a method here, and terminal states are
//! sticky: a second `finish` is ignored.

use crate::config::AgentSpec;
use crate::launcher::ProcessHandle;
use crate::workspace::WorkspaceRef;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::info;

/// Lifecycle state of an agent run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Running,
    /// Exited on its own with code 0.
    Completed,
    /// Could not start, or exited on its own with a non-zero code.
    Failed,
    /// Killed for exceeding the hard timeout.
    Timeout,
    /// Killed for producing no output within the inactivity limit.
    Stale,
    /// Stopped because the supervisor itself was interrupted.
    Interrupted,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RunStatus::Pending | RunStatus::Running)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Timeout => "timeout",
            RunStatus::Stale => "stale",
            RunStatus::Interrupted => "interrupted",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Mutable state of one agent across a supervised run.
#[derive(Debug)]
pub struct AgentRun {
    pub(crate) spec: AgentSpec,
    pub(crate) workspace: Option<WorkspaceRef>,
    pub(crate) handle: Option<ProcessHandle>,
    pub(crate) pid: Option<u32>,
    pub(crate) log_path: Option<PathBuf>,
    pub(crate) started_at: Option<Instant>,
    pub(crate) ended_at: Option<Instant>,
    pub(crate) last_activity: Option<Instant>,
    pub(crate) last_log_size: u64,
    pub(crate) status: RunStatus,
    pub(crate) exit_code: Option<i32>,
    pub(crate) error: String,
}

impl AgentRun {
    pub fn pending(spec: AgentSpec) -> Self {
        Self {
            spec,
            workspace: None,
            handle: None,
            pid: None,
            log_path: None,
            started_at: None,
            ended_at: None,
            last_activity: None,
            last_log_size: 0,
            status: RunStatus::Pending,
            exit_code: None,
            error: String::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    pub fn error(&self) -> &str {
        &self.error
    }

    pub fn workspace(&self) -> Option<&WorkspaceRef> {
        self.workspace.as_ref()
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn is_running(&self) -> bool {
        self.status == RunStatus::Running
    }

    /// Attach the workspace created for this run. Only valid while pending.
    pub(crate) fn assign_workspace(&mut self, workspace: WorkspaceRef) {
        if self.status == RunStatus::Pending && self.workspace.is_none() {
            self.workspace = Some(workspace);
        }
    }

    /// `pending -> running` once the process has been spawned.
    pub(crate) fn mark_running(&mut self, handle: ProcessHandle, log_path: PathBuf, now: Instant) {
        if self.status != RunStatus::Pending {
            return;
        }
        self.pid = Some(handle.pid());
        self.handle = Some(handle);
        self.log_path = Some(log_path);
        self.started_at = Some(now);
        self.last_activity = Some(now);
        self.last_log_size = 0;
        self.status = RunStatus::Running;
    }

    /// Move to a terminal state. No-op if the run is already terminal.
    ///
    /// The process handle is released here; the caller must have reaped or
    /// killed the process first.
    pub(crate) fn finish(
        &mut self,
        status: RunStatus,
        exit_code: Option<i32>,
        error: impl Into<String>,
        now: Instant,
    ) {
        if self.status.is_terminal() || !status.is_terminal() {
            return;
        }
        self.status = status;
        self.exit_code = exit_code;
        self.error = error.into();
        self.handle = None;
        if self.started_at.is_some() {
            self.ended_at = Some(now);
        }
        info!(agent = %self.spec.name, status = %status, exit_code = ?exit_code, "agent finished");
    }

    /// Wall-clock time spent running; zero for runs that never started.
    pub fn duration(&self, now: Instant) -> Duration {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => end.saturating_duration_since(start),
            (Some(start), None) => now.saturating_duration_since(start),
            _ => Duration::ZERO,
        }
    }

    /// Record the current log size; returns true if the log grew.
    pub(crate) fn observe_log_size(&mut self, size: u64, now: Instant) -> bool {
        if size > self.last_log_size {
            self.last_log_size = size;
            self.last_activity = Some(now);
            true
        } else {
            false
        }
    }

    /// Time since the log last grew (or since launch if it never has).
    pub(crate) fn idle(&self, now: Instant) -> Duration {
        self.last_activity
            .map(|t| now.saturating_duration_since(t))
            .unwrap_or(Duration::ZERO)
    }
}
