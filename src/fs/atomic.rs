//! Atomic file replacement.
//!
//! Content is written to a temporary sibling (`.{filename}.{pid}.tmp`),
//! synced, then renamed over the target. Readers see either the old file or
//! the new one, never a partial write. Source and target share a directory,
//! so the rename never crosses filesystems.

use crate::error::{Result, VerifyError};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Atomically write bytes to a file, creating parent directories as needed.
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            VerifyError::UserError(format!(
                "failed to create parent directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let temp_path = temp_path_for(path)?;
    write_and_sync(&temp_path, content)?;

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        VerifyError::UserError(format!(
            "failed to atomically replace '{}': {}",
            path.display(),
            e
        ))
    })
}

/// Atomically write a string to a file.
pub fn atomic_write_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
    atomic_write(path, content.as_bytes())
}

fn temp_path_for(target: &Path) -> Result<PathBuf> {
    let parent = target.parent().unwrap_or(Path::new("."));
    let filename = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            VerifyError::UserError(format!("invalid file path '{}'", target.display()))
        })?;

    Ok(parent.join(format!(".{}.{}.tmp", filename, std::process::id())))
}

fn write_and_sync(path: &Path, content: &[u8]) -> Result<()> {
    let cleanup = |e: std::io::Error, what: &str| {
        let _ = fs::remove_file(path);
        VerifyError::UserError(format!(
            "failed to {} temporary file '{}': {}",
            what,
            path.display(),
            e
        ))
    };

    let mut file = File::create(path).map_err(|e| cleanup(e, "create"))?;
    file.write_all(content).map_err(|e| cleanup(e, "write"))?;
    file.sync_all().map_err(|e| cleanup(e, "sync"))
}
