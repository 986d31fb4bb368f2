//! Consolidated run report.
//!
//! One [`RunResult`] per agent, keyed by name in a `BTreeMap` so the JSON is
//! stable across runs. Struct fields are declared in alphabetical order for
//! the same reason.

mod status;

pub use status::write_status;

use crate::collect::Collected;
use crate::error::{Result, VerifyError};
use crate::exit_codes;
use crate::fs::atomic_write_file;
use crate::run::{AgentRun, RunStatus};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::time::Instant;

/// Final outcome of one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// New `HEAD` if the agent committed, empty otherwise.
    pub commit_hash: String,
    pub committed: bool,
    pub duration_seconds: f64,
    pub error: String,
    /// `None` when the supervisor stopped the process or it never started.
    pub exit_code: Option<i32>,
    pub files_changed: usize,
    pub status: RunStatus,
    /// Worktree path, empty if none was created.
    pub workspace: String,
}

impl RunResult {
    /// Snapshot a terminal run together with what its workspace showed.
    pub fn from_run(run: &AgentRun, collected: &Collected, now: Instant) -> Self {
        let duration = run.duration(now).as_secs_f64();
        Self {
            commit_hash: collected.revision.clone(),
            committed: collected.committed,
            duration_seconds: (duration * 10.0).round() / 10.0,
            error: run.error().to_string(),
            exit_code: run.exit_code(),
            files_changed: collected.files_changed,
            status: run.status(),
            workspace: run
                .workspace()
                .map(|w| w.path.display().to_string())
                .unwrap_or_default(),
        }
    }
}

/// The document emitted at the end of a supervised run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub agents: BTreeMap<String, RunResult>,
    /// Commit every workspace was created from.
    pub baseline: String,
    pub completed_count: usize,
    /// The run was cut short by an external interrupt.
    pub interrupted: bool,
    /// At least one agent completed.
    pub success: bool,
    /// RFC 3339, UTC.
    pub timestamp: String,
    pub total_count: usize,
}

impl Report {
    pub fn build<I>(timestamp: DateTime<Utc>, baseline: &str, results: I, interrupted: bool) -> Self
    where
        I: IntoIterator<Item = (String, RunResult)>,
    {
        let agents: BTreeMap<String, RunResult> = results.into_iter().collect();
        let completed_count = agents
            .values()
            .filter(|r| r.status == RunStatus::Completed)
            .count();
        let total_count = agents.len();

        Self {
            agents,
            baseline: baseline.to_string(),
            completed_count,
            interrupted,
            success: completed_count > 0,
            timestamp: timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            total_count,
        }
    }

    /// Process exit code implied by this report.
    ///
    /// - 130 if the run was interrupted
    /// - 0 if any agent completed
    /// - 124 if the only agent timed out or went stale
    /// - 1 otherwise
    pub fn exit_code(&self) -> i32 {
        if self.interrupted {
            return exit_codes::INTERRUPTED;
        }
        if self.success {
            return exit_codes::SUCCESS;
        }
        if self.total_count == 1
            && self
                .agents
                .values()
                .all(|r| matches!(r.status, RunStatus::Timeout | RunStatus::Stale))
        {
            return exit_codes::TIMEOUT;
        }
        exit_codes::FAILURE
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| VerifyError::UserError(format!("failed to serialize report: {}", e)))
    }

    /// Write the report to `output`, or to stdout when `None`.
    pub fn emit(&self, output: Option<&Path>) -> Result<()> {
        let mut json = self.to_json()?;
        json.push('\n');

        match output {
            Some(path) => atomic_write_file(path, &json),
            None => {
                let mut stdout = std::io::stdout().lock();
                stdout
                    .write_all(json.as_bytes())
                    .and_then(|()| stdout.flush())
                    .map_err(|e| VerifyError::UserError(format!("failed to write report: {}", e)))
            }
        }
    }
}
