//! Git command runner for multiverify.
//!
//! Provides a thin wrapper around the `git` binary with captured
//! stdout/stderr and structured error handling. Workspace creation and
//! result collection both go through this module.

use crate::error::{Result, VerifyError};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Result of a successful git command execution.
#[derive(Debug, Clone)]
pub struct GitOutput {
    /// Standard output from the command (trimmed).
    pub stdout: String,
    /// Standard error from the command (trimmed).
    pub stderr: String,
}

impl GitOutput {
    fn from_output(output: &Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }

    /// Returns true if stdout is empty.
    pub fn is_empty(&self) -> bool {
        self.stdout.is_empty()
    }

    /// Returns the non-empty stdout lines.
    pub fn lines(&self) -> Vec<&str> {
        self.stdout.lines().filter(|l| !l.is_empty()).collect()
    }
}

/// Run a git command with the specified working directory.
///
/// Paths are never quoted in the output (`core.quotePath=off`) so callers
/// can treat each output line as a literal path.
///
/// # Returns
///
/// * `Ok(GitOutput)` - On exit code 0
/// * `Err(VerifyError::GitError)` - On spawn failure or non-zero exit
pub fn run_git<P: AsRef<Path>>(cwd: P, args: &[&str]) -> Result<GitOutput> {
    let cwd = cwd.as_ref();

    let output = Command::new("git")
        .current_dir(cwd)
        .args(["-c", "core.quotePath=off"])
        .args(args)
        .output()
        .map_err(|e| {
            VerifyError::GitError(format!(
                "failed to execute git {}: {}",
                args.first().unwrap_or(&""),
                e
            ))
        })?;

    let git_output = GitOutput::from_output(&output);

    if output.status.success() {
        Ok(git_output)
    } else {
        let exit_code = output.status.code().unwrap_or(-1);
        let error_msg = if git_output.stderr.is_empty() {
            git_output.stdout.clone()
        } else {
            git_output.stderr.clone()
        };

        Err(VerifyError::GitError(format!(
            "git {} failed (exit code {}): {}",
            args.join(" "),
            exit_code,
            error_msg
        )))
    }
}

/// Get the repository root using `git rev-parse --show-toplevel`.
///
/// A directory outside any repository is a user error, not a git failure:
/// the supervisor refuses to start rather than reporting a broken run.
pub fn get_repo_root<P: AsRef<Path>>(cwd: P) -> Result<PathBuf> {
    let cwd = cwd.as_ref();
    if !cwd.is_dir() {
        return Err(VerifyError::UserError(format!(
            "repository root '{}' does not exist or is not a directory",
            cwd.display()
        )));
    }

    run_git(cwd, &["rev-parse", "--show-toplevel"])
        .map(|out| PathBuf::from(out.stdout))
        .map_err(|_| {
            VerifyError::UserError(format!(
                "'{}' is not inside a git repository",
                cwd.display()
            ))
        })
}

/// Resolve a revision expression (e.g. `HEAD`) to a full commit id.
pub fn resolve_revision<P: AsRef<Path>>(cwd: P, rev: &str) -> Result<String> {
    let spec = format!("{}^{{commit}}", rev);
    let output = run_git(cwd, &["rev-parse", "--verify", "--quiet", &spec])?;
    if output.is_empty() {
        return Err(VerifyError::GitError(format!(
            "revision '{}' did not resolve to a commit",
            rev
        )));
    }
    Ok(output.stdout)
}

/// Paths that differ between `HEAD` and the working tree, including
/// staged changes and untracked (non-ignored) files.
pub fn uncommitted_paths<P: AsRef<Path>>(cwd: P) -> Result<Vec<String>> {
    let cwd = cwd.as_ref();
    let tracked = run_git(cwd, &["diff", "--name-only", "HEAD"])?;
    let untracked = run_git(cwd, &["ls-files", "--others", "--exclude-standard"])?;

    Ok(tracked
        .lines()
        .into_iter()
        .chain(untracked.lines())
        .map(str::to_string)
        .collect())
}

/// Paths touched between two revisions.
pub fn paths_between<P: AsRef<Path>>(cwd: P, from: &str, to: &str) -> Result<Vec<String>> {
    let output = run_git(cwd, &["diff", "--name-only", from, to])?;
    Ok(output.lines().into_iter().map(str::to_string).collect())
}
