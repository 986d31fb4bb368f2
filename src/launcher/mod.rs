//! Agent process launching.
//!
//! Turns an [`AgentSpec`] plus a prompt and a workspace into a running OS
//! process:
//!
//! - Executable lookup on `PATH` (a missing agent is not an error, just absent)
//! - Command-line construction per [`PromptDelivery`]
//! - Environment sanitizing (nesting markers removed)
//! - Combined stdout/stderr redirected to an exclusive per-run log file

mod handle;

pub use handle::ProcessHandle;

use crate::config::template::ArgVars;
use crate::config::{AgentSpec, NESTING_MARKERS, PromptDelivery};
use crate::error::{Result, VerifyError};
use std::ffi::{OsStr, OsString};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// A fully resolved command line for one agent run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Payload for the child's stdin; `None` means stdin is null.
    pub stdin: Option<String>,
}

/// Build the invocation for `spec`, delivering `prompt` the way it expects.
pub fn build_invocation(
    spec: &AgentSpec,
    program: &Path,
    prompt: &str,
    vars: ArgVars<'_>,
) -> Invocation {
    let mut args: Vec<String> = spec.args.iter().map(|a| a.render(vars)).collect();

    let stdin = match spec.prompt_via {
        PromptDelivery::Stdin => Some(prompt.to_string()),
        PromptDelivery::TrailingArgument => {
            args.push(prompt.to_string());
            None
        }
    };

    Invocation {
        program: program.to_path_buf(),
        args,
        stdin,
    }
}

/// Copy of `ambient` without nesting markers or the agent's `unset_env`,
/// with the agent's own `environment` layered on top.
pub fn sanitized_env<I>(ambient: I, spec: &AgentSpec) -> Vec<(OsString, OsString)>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    let stripped = |key: &OsStr| {
        NESTING_MARKERS.iter().any(|m| key == OsStr::new(m))
            || spec.unset_env.iter().any(|u| key == OsStr::new(u))
            || spec.environment.contains_key(&*key.to_string_lossy())
    };

    let mut env: Vec<(OsString, OsString)> =
        ambient.into_iter().filter(|(k, _)| !stripped(k.as_os_str())).collect();
    env.extend(
        spec.environment
            .iter()
            .map(|(k, v)| (OsString::from(k), OsString::from(v))),
    );
    env
}

/// Look `executable` up the way a shell would.
///
/// Names containing a path separator are checked directly; bare names are
/// searched in each directory of `path_var`.
pub fn resolve_executable(executable: &str, path_var: Option<&OsStr>) -> Option<PathBuf> {
    if executable.contains(std::path::MAIN_SEPARATOR) || executable.contains('/') {
        let candidate = PathBuf::from(executable);
        return is_executable(&candidate).then_some(candidate);
    }

    std::env::split_paths(path_var?)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(executable))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Spawns agent processes against a fixed ambient environment.
#[derive(Debug, Clone)]
pub struct Launcher {
    env: Vec<(OsString, OsString)>,
}

impl Launcher {
    /// A launcher that inherits (a sanitized copy of) this process's environment.
    pub fn from_process_env() -> Self {
        Self::with_env(std::env::vars_os())
    }

    pub fn with_env<I>(env: I) -> Self
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        Self {
            env: env.into_iter().collect(),
        }
    }

    fn path_var(&self) -> Option<&OsStr> {
        self.env
            .iter()
            .find(|(k, _)| k == OsStr::new("PATH"))
            .map(|(_, v)| v.as_os_str())
    }

    /// Resolve the agent's executable against this launcher's `PATH`.
    pub fn resolve(&self, spec: &AgentSpec) -> Option<PathBuf> {
        resolve_executable(&spec.executable, self.path_var())
    }

    /// Start `spec` inside `workspace`, logging to `log_path`.
    ///
    /// Returns `Ok(None)` when the executable cannot be found. The log file is
    /// created exclusively; an existing file at `log_path` is a launch error.
    pub fn launch(
        &self,
        spec: &AgentSpec,
        prompt: &str,
        workspace: &Path,
        log_path: &Path,
    ) -> Result<Option<ProcessHandle>> {
        let Some(program) = self.resolve(spec) else {
            return Ok(None);
        };

        let invocation = build_invocation(
            spec,
            &program,
            prompt,
            ArgVars {
                workspace,
                log_file: log_path,
            },
        );

        let log = open_exclusive_log(log_path)?;
        let log_err = log.try_clone().map_err(|e| {
            VerifyError::LaunchError(format!(
                "failed to duplicate log handle '{}': {}",
                log_path.display(),
                e
            ))
        })?;

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .current_dir(workspace)
            .env_clear()
            .envs(sanitized_env(self.env.iter().cloned(), spec))
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err))
            .stdin(if invocation.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            });

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        debug!(agent = %spec.name, program = %invocation.program.display(), args = ?invocation.args.len(), "spawning agent");
        let mut child = command.spawn().map_err(|e| {
            VerifyError::LaunchError(format!(
                "failed to execute '{}' for agent '{}': {}",
                invocation.program.display(),
                spec.name,
                e
            ))
        })?;

        if let (Some(payload), Some(mut stdin)) = (invocation.stdin, child.stdin.take()) {
            // A pipe write blocks once the buffer fills; keep it off the control loop.
            std::thread::spawn(move || {
                let _ = stdin.write_all(payload.as_bytes());
            });
        }

        let handle = ProcessHandle::new(child);
        info!(agent = %spec.name, pid = handle.pid(), workspace = %workspace.display(), "agent launched");
        Ok(Some(handle))
    }
}

fn open_exclusive_log(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            VerifyError::LaunchError(format!(
                "failed to create log directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| {
            VerifyError::LaunchError(format!(
                "failed to create log file '{}': {}",
                path.display(),
                e
            ))
        })
}

#[cfg(test)]
mod tests;
