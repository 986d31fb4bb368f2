//! Post-run inspection of an agent's workspace.
//!
//! Determines what an agent changed, independent of how it exited:
//!
//! - Uncommitted changes (tracked or untracked) are counted directly.
//! - A clean tree whose `HEAD` moved past the baseline means the agent
//!   committed; the files touched by that last commit are counted.
//! - A clean tree still at the baseline changed nothing.
//!
//! Inspection errors degrade to the zero values instead of failing the run.

use crate::error::Result;
use crate::git::{paths_between, resolve_revision, uncommitted_paths};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, warn};

/// What inspecting a workspace found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collected {
    /// Distinct paths changed.
    pub files_changed: usize,
    /// Whether `HEAD` moved past the baseline.
    pub committed: bool,
    /// New `HEAD` when `committed`, empty otherwise.
    pub revision: String,
}

/// Inspect `workspace` relative to `baseline`.
pub fn collect(workspace: &Path, baseline: &str) -> Collected {
    match try_collect(workspace, baseline) {
        Ok(collected) => {
            debug!(
                workspace = %workspace.display(),
                files_changed = collected.files_changed,
                committed = collected.committed,
                "workspace inspected"
            );
            collected
        }
        Err(e) => {
            warn!(workspace = %workspace.display(), error = %e, "workspace inspection failed");
            Collected::default()
        }
    }
}

fn try_collect(workspace: &Path, baseline: &str) -> Result<Collected> {
    let head = resolve_revision(workspace, "HEAD")?;
    let committed = head != baseline;
    let revision = if committed { head.clone() } else { String::new() };

    let dirty: BTreeSet<String> = uncommitted_paths(workspace)?.into_iter().collect();
    if !dirty.is_empty() {
        return Ok(Collected {
            files_changed: dirty.len(),
            committed,
            revision,
        });
    }

    if !committed {
        return Ok(Collected::default());
    }

    let parent = format!("{}^", head);
    let touched: BTreeSet<String> = paths_between(workspace, &parent, &head)?
        .into_iter()
        .collect();
    Ok(Collected {
        files_changed: touched.len(),
        committed,
        revision,
    })
}
