//! Isolated, revision-pinned working copies for agent runs.
//!
//! Every agent gets its own detached git worktree checked out at the run's
//! baseline commit. Nothing else writes to it, which is what keeps agents
//! from observing or clobbering each other's changes.

mod naming;

pub use naming::{parse_run_slug, run_slug, workspace_path};
pub(crate) use naming::sanitize_component;

use crate::error::{Result, VerifyError};
use crate::git::run_git;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A worktree owned by exactly one agent run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceRef {
    /// Agent that owns this workspace.
    pub agent: String,
    /// Absolute path to the worktree.
    pub path: PathBuf,
    /// Commit the worktree was created from.
    pub baseline: String,
}

/// Creates and destroys worktrees under a fixed base directory.
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    repo_root: PathBuf,
    base_dir: PathBuf,
}

impl WorkspaceManager {
    pub fn new(repo_root: impl Into<PathBuf>, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
            base_dir: base_dir.into(),
        }
    }

    /// Where the workspace for `name`/`token` lives, whether or not it exists.
    pub fn path_for(&self, name: &str, token: &str) -> PathBuf {
        workspace_path(&self.base_dir, name, token)
    }

    /// Materialize a detached worktree of `baseline` for agent `name`.
    ///
    /// Fails if the deterministic path is already occupied: a workspace is
    /// never handed to two runs.
    pub fn create(&self, baseline: &str, name: &str, token: &str) -> Result<WorkspaceRef> {
        let path = self.path_for(name, token);

        if path.exists() {
            return Err(VerifyError::GitError(format!(
                "workspace path '{}' already exists.\n\
                 Remove it with `git worktree remove --force {}` or pick another token.",
                path.display(),
                path.display()
            )));
        }

        std::fs::create_dir_all(&self.base_dir).map_err(|e| {
            VerifyError::GitError(format!(
                "failed to create worktree base directory '{}': {}",
                self.base_dir.display(),
                e
            ))
        })?;

        let path_str = path.to_string_lossy();
        run_git(
            &self.repo_root,
            &["worktree", "add", "--detach", &path_str, baseline],
        )
        .map_err(|e| {
            VerifyError::GitError(format!(
                "failed to create worktree at '{}' for {}: {}",
                path_str, baseline, e
            ))
        })?;

        info!(agent = name, path = %path.display(), baseline, "workspace created");
        Ok(WorkspaceRef {
            agent: name.to_string(),
            path,
            baseline: baseline.to_string(),
        })
    }

    /// Force-remove a workspace. Best-effort: failures are logged, never returned.
    pub fn destroy(&self, workspace: &WorkspaceRef) {
        self.destroy_path(&workspace.path);
    }

    /// Force-remove whatever worktree lives at `path`.
    ///
    /// Returns true if the path no longer exists afterwards.
    pub fn destroy_path(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();
        if let Err(e) = run_git(
            &self.repo_root,
            &["worktree", "remove", "--force", &path_str],
        ) {
            debug!(path = %path.display(), error = %e, "git worktree remove failed; deleting directory");
            if path.exists()
                && let Err(e) = std::fs::remove_dir_all(path)
            {
                warn!(path = %path.display(), error = %e, "failed to delete workspace directory");
            }
            let _ = run_git(&self.repo_root, &["worktree", "prune"]);
        }

        let removed = !path.exists();
        if removed {
            info!(path = %path.display(), "workspace removed");
        }
        removed
    }

    /// Existing workspaces created with exactly `token`, sorted by path.
    pub fn find_for_token(&self, token: &str) -> Vec<PathBuf> {
        let token = sanitize_component(token);
        let Ok(entries) = std::fs::read_dir(&self.base_dir) else {
            return Vec::new();
        };

        let mut found: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_dir()
                    && path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .and_then(parse_run_slug)
                        .is_some_and(|(_, t)| t == token)
            })
            .collect();
        found.sort();
        found
    }
}
