//! Live status file, rewritten on every poll tick.
//!
//! External tooling can read `<state_dir>/verify-status--<token>.json` while a
//! run is in progress. The file is replaced atomically so it is never torn.

use crate::error::{Result, VerifyError};
use crate::fs::atomic_write_file;
use crate::run::{AgentRun, RunStatus};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// Minutes since launch, one decimal place.
    pub elapsed_min: f64,
    pub workspace: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub timestamp: String,
    pub agents: BTreeMap<String, StatusEntry>,
}

impl StatusSnapshot {
    pub fn capture(runs: &[AgentRun], now: Instant, timestamp: DateTime<Utc>) -> Self {
        let agents = runs
            .iter()
            .map(|run| {
                let minutes = run.duration(now).as_secs_f64() / 60.0;
                let entry = StatusEntry {
                    status: run.status(),
                    pid: run.pid().filter(|_| run.is_running()),
                    exit_code: run.exit_code(),
                    elapsed_min: (minutes * 10.0).round() / 10.0,
                    workspace: run
                        .workspace()
                        .map(|w| w.path.display().to_string())
                        .unwrap_or_default(),
                };
                (run.name().to_string(), entry)
            })
            .collect();

        Self {
            timestamp: timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            agents,
        }
    }
}

/// Capture the current state of `runs` and atomically replace `path` with it.
pub fn write_status(path: &Path, runs: &[AgentRun], now: Instant) -> Result<()> {
    let snapshot = StatusSnapshot::capture(runs, now, Utc::now());
    let json = serde_json::to_string_pretty(&snapshot)
        .map_err(|e| VerifyError::UserError(format!("failed to serialize status: {}", e)))?;
    atomic_write_file(path, &json)
}
