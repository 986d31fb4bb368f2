//! Implementation of the `multiverify clean` command.
//!
//! Removes every workspace under the worktree base that belongs to one
//! naming token. Workspaces are kept by default after a run so they can be
//! inspected; this is the way to get rid of them afterwards.

use super::resolve_locations;
use crate::cli::CleanArgs;
use crate::exit_codes;
use crate::git::run_git;
use crate::workspace::WorkspaceManager;
use anyhow::Result;
use tracing::warn;

pub fn cmd_clean(args: CleanArgs) -> Result<i32> {
    let locations = resolve_locations(&args.location)?;
    let manager = WorkspaceManager::new(&locations.repo_root, &locations.worktree_base);

    let candidates = manager.find_for_token(&args.token);
    if candidates.is_empty() {
        println!("No workspaces found for token '{}'.", args.token);
    }

    let mut removed = 0;
    for path in &candidates {
        if manager.destroy_path(path) {
            println!("  removed {}", path.display());
            removed += 1;
        } else {
            println!("  could not remove {}", path.display());
        }
    }

    if let Err(e) = run_git(&locations.repo_root, &["worktree", "prune"]) {
        warn!(error = %e, "git worktree prune failed");
    }

    if !candidates.is_empty() {
        println!();
        println!("Removed {} of {} workspace(s).", removed, candidates.len());
    }
    Ok(exit_codes::SUCCESS)
}
