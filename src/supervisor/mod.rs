//! The supervisor loop.
//!
//! ```text
//! Idle -> Launching -> Monitoring -> Finalizing -> Done
//!            \             |
//!             +-----> Cancelling -> Finalizing -> Done
//! ```
//!
//! All state lives on the control thread. Agents run as OS processes and are
//! only observed at discrete poll ticks; the sole cross-thread signal is the
//! [`CancelToken`], which an interrupt handler sets and the loop checks
//! between steps.

use crate::collect::{Collected, collect};
use crate::config::{AgentsConfig, Settings};
use crate::error::{Result, VerifyError};
use crate::git::{get_repo_root, resolve_revision};
use crate::launcher::Launcher;
use crate::monitor::LivenessMonitor;
use crate::report::{Report, RunResult, write_status};
use crate::run::{AgentRun, RunStatus};
use crate::workspace::WorkspaceManager;
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Reason recorded on runs stopped by an interrupt.
pub const INTERRUPTED_REASON: &str = "interrupted";

/// Granularity of interruptible sleeps.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Shared interrupt flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Sleep for `duration`, waking early on cancellation.
    ///
    /// Returns true if cancelled.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_cancelled() {
                return true;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            std::thread::sleep(remaining.min(SLEEP_SLICE));
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Launching,
    Monitoring,
    Finalizing,
    Cancelling,
    Done,
}

/// Final report plus the exit code it implies.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub report: Report,
    pub exit_code: i32,
}

/// Read a prompt file. A missing, unreadable or blank prompt is fatal.
pub fn load_prompt(path: &Path) -> Result<String> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        VerifyError::UserError(format!(
            "failed to read prompt file '{}': {}",
            path.display(),
            e
        ))
    })?;
    let prompt = raw.strip_prefix('\u{feff}').unwrap_or(&raw);
    if prompt.trim().is_empty() {
        return Err(VerifyError::UserError(format!(
            "prompt file '{}' is empty",
            path.display()
        )));
    }
    Ok(prompt.to_string())
}

/// Drives every configured agent through one supervised run.
pub struct Supervisor {
    settings: Settings,
    prompt: String,
    launcher: Launcher,
    cancel: CancelToken,
    monitor: LivenessMonitor,
    phase: Phase,
    runs: Vec<AgentRun>,
    baseline: String,
    workspaces: Option<WorkspaceManager>,
}

impl Supervisor {
    pub fn new(
        agents: AgentsConfig,
        settings: Settings,
        prompt: impl Into<String>,
        launcher: Launcher,
        cancel: CancelToken,
    ) -> Self {
        let monitor = LivenessMonitor::new(settings.timeouts);
        let runs = agents.into_iter().map(AgentRun::pending).collect();
        Self {
            settings,
            prompt: prompt.into(),
            launcher,
            cancel,
            monitor,
            phase: Phase::Idle,
            runs,
            baseline: String::new(),
            workspaces: None,
        }
    }

    /// Run to completion.
    ///
    /// Errors only for fatal input problems, before any agent starts. Every
    /// other failure ends up in the report.
    pub fn run(mut self) -> Result<Outcome> {
        self.validate()?;

        self.enter(Phase::Launching);
        self.launch_all();

        if !self.cancel.is_cancelled() {
            self.enter(Phase::Monitoring);
            self.monitor_until_done();
        }

        let interrupted = self.cancel.is_cancelled();
        if interrupted {
            self.enter(Phase::Cancelling);
            self.cancel_all();
        }

        self.enter(Phase::Finalizing);
        let outcome = self.finalize(interrupted);
        self.enter(Phase::Done);
        Ok(outcome)
    }

    fn enter(&mut self, phase: Phase) {
        debug!(from = ?self.phase, to = ?phase, "supervisor phase");
        self.phase = phase;
    }

    fn validate(&mut self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(VerifyError::UserError("prompt is empty".to_string()));
        }
        if self.runs.is_empty() {
            return Err(VerifyError::UserError("no agents configured".to_string()));
        }

        let repo_root = get_repo_root(&self.settings.repo_root)?;
        self.baseline = resolve_revision(&repo_root, "HEAD").map_err(|_| {
            VerifyError::UserError(format!(
                "repository '{}' has no commits to verify against",
                repo_root.display()
            ))
        })?;
        info!(repo = %repo_root.display(), baseline = %self.baseline, agents = self.runs.len(), "starting verification run");

        self.workspaces = Some(WorkspaceManager::new(
            repo_root,
            self.settings.worktree_base.clone(),
        ));
        Ok(())
    }

    fn launch_all(&mut self) {
        let Some(workspaces) = self.workspaces.clone() else {
            return;
        };

        for run in self.runs.iter_mut() {
            if self.cancel.is_cancelled() {
                break;
            }

            // Resolve before creating the workspace so missing agents leave nothing behind.
            if self.launcher.resolve(&run.spec).is_none() {
                warn!(agent = %run.spec.name, executable = %run.spec.executable, "executable not found");
                let reason = format!("executable not found: {}", run.spec.executable);
                run.finish(RunStatus::Failed, None, reason, Instant::now());
                continue;
            }

            let workspace =
                match workspaces.create(&self.baseline, &run.spec.name, &self.settings.token) {
                    Ok(workspace) => workspace,
                    Err(e) => {
                        warn!(agent = %run.spec.name, error = %e, "workspace creation failed");
                        run.finish(RunStatus::Failed, None, e.to_string(), Instant::now());
                        continue;
                    }
                };
            let workspace_path = workspace.path.clone();
            run.assign_workspace(workspace);

            let log_path = self.settings.log_path(&run.spec.name);
            match self
                .launcher
                .launch(&run.spec, &self.prompt, &workspace_path, &log_path)
            {
                Ok(Some(handle)) => run.mark_running(handle, log_path, Instant::now()),
                Ok(None) => {
                    let reason = format!("executable not found: {}", run.spec.executable);
                    run.finish(RunStatus::Failed, None, reason, Instant::now());
                }
                Err(e) => {
                    warn!(agent = %run.spec.name, error = %e, "launch failed");
                    run.finish(RunStatus::Failed, None, e.to_string(), Instant::now());
                }
            }
        }
    }

    fn monitor_until_done(&mut self) {
        loop {
            if self.cancel.is_cancelled() {
                return;
            }

            let now = Instant::now();
            let running = self.monitor.tick(&mut self.runs, now);
            self.write_status(now);

            if running == 0 {
                return;
            }
            debug!(running, "poll tick");

            if self.cancel.sleep(self.settings.poll_interval) {
                return;
            }
        }
    }

    fn cancel_all(&mut self) {
        let running = self.runs.iter().filter(|r| r.is_running()).count();
        warn!(running, "interrupted; stopping agents");

        self.monitor
            .stop_all(&mut self.runs, RunStatus::Interrupted, INTERRUPTED_REASON);

        let now = Instant::now();
        for run in self.runs.iter_mut().filter(|r| !r.status().is_terminal()) {
            run.finish(RunStatus::Interrupted, None, INTERRUPTED_REASON, now);
        }
    }

    fn finalize(&mut self, interrupted: bool) -> Outcome {
        let now = Instant::now();
        self.write_status(now);

        let mut results = Vec::with_capacity(self.runs.len());
        for run in &self.runs {
            let collected = run
                .workspace()
                .map(|ws| collect(&ws.path, &self.baseline))
                .unwrap_or_else(Collected::default);
            results.push((run.name().to_string(), RunResult::from_run(run, &collected, now)));
        }

        if !self.settings.keep_workspaces
            && let Some(workspaces) = &self.workspaces
        {
            for workspace in self.runs.iter().filter_map(|r| r.workspace()) {
                workspaces.destroy(workspace);
            }
        }

        let report = Report::build(Utc::now(), &self.baseline, results, interrupted);
        let exit_code = report.exit_code();
        info!(
            completed = report.completed_count,
            total = report.total_count,
            interrupted,
            exit_code,
            "verification run finished"
        );
        Outcome { report, exit_code }
    }

    fn write_status(&self, now: Instant) {
        let path = self.settings.status_path();
        if let Err(e) = write_status(&path, &self.runs, now) {
            warn!(path = %path.display(), error = %e, "failed to write status file");
        }
    }
}
