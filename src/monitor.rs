//! Liveness monitoring for running agents.
//!
//! Each poll tick looks at every running agent once:
//!
//! 1. If the process exited on its own, classify it `completed` (exit 0) or
//!    `failed` (anything else, with the log tail as context).
//! 2. Otherwise, if it has run for at least the hard timeout, stop it as
//!    `timeout`, however busy its log looks.
//! 3. Otherwise compare the log size with the last observation. Growth
//!    counts as activity; no growth for at least the stale timeout stops it
//!    as `stale`.
//!
//! Stopping is always SIGTERM, a bounded grace period, then SIGKILL. The run
//! reaches its terminal state even if the process never dies.

use crate::config::{DEFAULT_GRACE_PERIOD_SECS, DEFAULT_STALE_TIMEOUT_SECS};
use crate::launcher::ProcessHandle;
use crate::run::{AgentRun, RunStatus};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Lines of log kept as error context for a failed run.
pub const ERROR_TAIL_LINES: usize = 50;

/// Upper bound on the error context, in bytes.
pub const ERROR_TAIL_BYTES: usize = 4000;

/// Dual timeout policy: an absolute cap and an inactivity cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPolicy {
    /// Absolute limit per run; `None` is unbounded.
    pub hard_timeout: Option<Duration>,
    /// Limit on time without log growth; `None` disables stale detection.
    pub stale_timeout: Option<Duration>,
    /// Wait between SIGTERM and SIGKILL.
    pub grace_period: Duration,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            hard_timeout: None,
            stale_timeout: Some(Duration::from_secs(DEFAULT_STALE_TIMEOUT_SECS)),
            grace_period: Duration::from_secs(DEFAULT_GRACE_PERIOD_SECS),
        }
    }
}

impl TimeoutPolicy {
    /// Build a policy from second counts, where 0 disables a limit.
    pub fn from_secs(hard: u64, stale: u64, grace: u64) -> Self {
        let limit = |secs| (secs > 0).then(|| Duration::from_secs(secs));
        Self {
            hard_timeout: limit(hard),
            stale_timeout: limit(stale),
            grace_period: Duration::from_secs(grace),
        }
    }
}

/// Outcome of checking one live run against the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Alive,
    HardTimeout,
    Stale,
}

/// Applies a [`TimeoutPolicy`] to running agents.
#[derive(Debug, Clone)]
pub struct LivenessMonitor {
    policy: TimeoutPolicy,
}

impl LivenessMonitor {
    pub fn new(policy: TimeoutPolicy) -> Self {
        Self { policy }
    }

    /// Judge a running agent given its current log size.
    ///
    /// Updates the run's activity tracking when the log has grown.
    pub fn evaluate(&self, run: &mut AgentRun, log_size: Option<u64>, now: Instant) -> Verdict {
        if let Some(limit) = self.policy.hard_timeout
            && run.duration(now) >= limit
        {
            return Verdict::HardTimeout;
        }

        if let Some(size) = log_size
            && run.observe_log_size(size, now)
        {
            return Verdict::Alive;
        }

        match self.policy.stale_timeout {
            Some(limit) if run.idle(now) >= limit => Verdict::Stale,
            _ => Verdict::Alive,
        }
    }

    /// One poll tick over every run. Returns how many are still running.
    pub fn tick(&self, runs: &mut [AgentRun], now: Instant) -> usize {
        for run in runs.iter_mut() {
            self.check(run, now);
        }
        runs.iter().filter(|r| r.is_running()).count()
    }

    fn check(&self, run: &mut AgentRun, now: Instant) {
        if !run.is_running() {
            return;
        }
        let Some(handle) = run.handle.as_mut() else {
            return;
        };

        match handle.poll() {
            Ok(Some(code)) => {
                classify_exit(run, code, now);
                return;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(agent = %run.spec.name, error = %e, "failed to poll agent process; stopping it");
                terminate_with_grace(handle, self.policy.grace_period);
                run.finish(
                    RunStatus::Failed,
                    None,
                    format!("lost track of agent process: {}", e),
                    Instant::now(),
                );
                return;
            }
        }

        let log_size = run
            .log_path()
            .and_then(|p| std::fs::metadata(p).ok())
            .map(|m| m.len());

        let (status, reason) = match self.evaluate(run, log_size, now) {
            Verdict::Alive => return,
            Verdict::HardTimeout => (
                RunStatus::Timeout,
                format!(
                    "hard timeout after {}s",
                    self.policy.hard_timeout.unwrap_or_default().as_secs()
                ),
            ),
            Verdict::Stale => (
                RunStatus::Stale,
                format!(
                    "no log activity for {}s",
                    self.policy.stale_timeout.unwrap_or_default().as_secs()
                ),
            ),
        };

        if let Some(handle) = run.handle.as_mut() {
            warn!(agent = %run.spec.name, pid = handle.pid(), %status, "stopping agent");
            terminate_with_grace(handle, self.policy.grace_period);
        }
        run.finish(status, None, reason, Instant::now());
    }

    /// Stop every running agent and mark it `status`.
    ///
    /// Agents whose process already exited since the last tick are
    /// classified by their exit code instead. All remaining processes are
    /// signalled first and share one grace period, so shutdown takes at most
    /// about two grace periods regardless of how many agents are running.
    pub fn stop_all(&self, runs: &mut [AgentRun], status: RunStatus, reason: &str) {
        let grace = self.policy.grace_period;

        for run in runs.iter_mut().filter(|r| r.is_running()) {
            let Some(handle) = run.handle.as_mut() else {
                continue;
            };
            match handle.poll() {
                Ok(Some(code)) => {
                    classify_exit(run, code, Instant::now());
                    continue;
                }
                Ok(None) => {}
                Err(e) => debug!(agent = %run.spec.name, error = %e, "poll failed"),
            }
            if let Some(handle) = run.handle.as_mut()
                && let Err(e) = handle.terminate()
            {
                debug!(agent = %run.spec.name, pid = handle.pid(), error = %e, "terminate failed");
            }
        }

        let deadline = Instant::now() + grace;
        for run in runs.iter_mut().filter(|r| r.is_running()) {
            if let Some(handle) = run.handle.as_mut() {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if !matches!(handle.wait(remaining), Ok(Some(_))) {
                    force_kill(handle, grace);
                }
            }
            run.finish(status, None, reason, Instant::now());
        }
    }
}

/// Classify a run whose process exited by itself.
fn classify_exit(run: &mut AgentRun, code: i32, now: Instant) {
    if code == 0 {
        run.finish(RunStatus::Completed, Some(0), "", now);
        return;
    }

    let tail = run
        .log_path()
        .map(|p| log_tail(p, ERROR_TAIL_LINES, ERROR_TAIL_BYTES))
        .unwrap_or_default();
    let error = if tail.trim().is_empty() {
        format!("exited with code {}", code)
    } else {
        tail
    };
    run.finish(RunStatus::Failed, Some(code), error, now);
}

/// SIGTERM, wait up to `grace`, then SIGKILL.
///
/// Returns the exit code if the process was reaped.
pub fn terminate_with_grace(handle: &mut ProcessHandle, grace: Duration) -> Option<i32> {
    if let Err(e) = handle.terminate() {
        debug!(pid = handle.pid(), error = %e, "terminate failed");
    }
    match handle.wait(grace) {
        Ok(Some(code)) => Some(code),
        _ => force_kill(handle, grace),
    }
}

fn force_kill(handle: &mut ProcessHandle, grace: Duration) -> Option<i32> {
    if let Err(e) = handle.kill() {
        warn!(pid = handle.pid(), error = %e, "kill failed");
    }
    match handle.wait(grace) {
        Ok(code) => code,
        Err(e) => {
            warn!(pid = handle.pid(), error = %e, "agent did not exit after kill");
            None
        }
    }
}

/// Last `max_lines` lines of a log, further capped at `max_bytes`.
///
/// Unreadable logs yield an empty string.
pub fn log_tail(path: &Path, max_lines: usize, max_bytes: usize) -> String {
    // Enough to hold `max_lines` of typical output without reading a huge log.
    const WINDOW: u64 = 64 * 1024;

    let Ok(mut file) = File::open(path) else {
        return String::new();
    };
    let len = file.metadata().map(|m| m.len()).unwrap_or(0);
    if len > WINDOW && file.seek(SeekFrom::Start(len - WINDOW)).is_err() {
        return String::new();
    }
    let mut bytes = Vec::new();
    if file.read_to_end(&mut bytes).is_err() {
        return String::new();
    }

    let text = String::from_utf8_lossy(&bytes);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(max_lines);
    let joined = lines[start..].join("\n");

    if joined.len() <= max_bytes {
        return joined;
    }
    let mut cut = joined.len() - max_bytes;
    while !joined.is_char_boundary(cut) {
        cut += 1;
    }
    joined[cut..].to_string()
}
