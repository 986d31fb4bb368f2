//! Command implementations for multiverify.
//!
//! Routes parsed CLI commands to their handlers. Handlers return the process
//! exit code; errors are reported by `main`.

mod agents;
mod clean;
mod run;

use crate::cli::{Command, LocationArgs};
use crate::config::{AgentsConfig, DEFAULT_STATE_DIR};
use crate::git::get_repo_root;
use crate::supervisor::CancelToken;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Dispatch a command to its implementation.
pub fn dispatch(command: Command, cancel: &CancelToken) -> Result<i32> {
    match command {
        Command::Run(args) => run::cmd_run(args, cancel),
        Command::Agents(args) => agents::cmd_agents(args),
        Command::Clean(args) => clean::cmd_clean(args),
    }
}

/// Resolved filesystem locations for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Locations {
    repo_root: PathBuf,
    state_dir: PathBuf,
    worktree_base: PathBuf,
}

fn resolve_locations(args: &LocationArgs) -> Result<Locations> {
    let repo_root = get_repo_root(&args.repo)?;
    let state_dir = args
        .state_dir
        .clone()
        .unwrap_or_else(|| repo_root.join(DEFAULT_STATE_DIR));
    let worktree_base = args
        .worktree_base
        .clone()
        .unwrap_or_else(|| state_dir.join("worktrees"));

    Ok(Locations {
        repo_root,
        state_dir,
        worktree_base,
    })
}

fn load_agents(path: Option<&Path>) -> Result<AgentsConfig> {
    match path {
        Some(path) => AgentsConfig::load(path)
            .with_context(|| format!("loading agents from '{}'", path.display())),
        None => Ok(AgentsConfig::builtin()?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::create_test_repo;

    #[test]
    fn test_default_locations() {
        let temp_dir = create_test_repo();
        let args = LocationArgs {
            repo: temp_dir.path().to_path_buf(),
            state_dir: None,
            worktree_base: None,
        };

        let locations = resolve_locations(&args).unwrap();
        assert_eq!(locations.state_dir, locations.repo_root.join(".multiverify"));
        assert_eq!(
            locations.worktree_base,
            locations.repo_root.join(".multiverify").join("worktrees")
        );
    }

    #[test]
    fn test_explicit_locations() {
        let temp_dir = create_test_repo();
        let args = LocationArgs {
            repo: temp_dir.path().to_path_buf(),
            state_dir: Some(PathBuf::from("/var/tmp/state")),
            worktree_base: Some(PathBuf::from("/var/tmp/trees")),
        };

        let locations = resolve_locations(&args).unwrap();
        assert_eq!(locations.state_dir, PathBuf::from("/var/tmp/state"));
        assert_eq!(locations.worktree_base, PathBuf::from("/var/tmp/trees"));
    }

    #[test]
    fn test_locations_require_repository() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let args = LocationArgs {
            repo: temp_dir.path().to_path_buf(),
            state_dir: None,
            worktree_base: None,
        };
        assert!(resolve_locations(&args).is_err());
    }

    #[test]
    fn test_load_agents_missing_file_has_context() {
        let err = load_agents(Some(Path::new("/nonexistent/agents.yaml"))).unwrap_err();
        assert!(format!("{:#}", err).contains("loading agents from"));
    }
}
