//! Commit marker stored alongside the exports.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

/// Default file name of the marker inside the working directory.
pub const MARKER_FILE: &str = "last_commit.txt";

/// Plain-text file holding the last upstream commit that was fully exported.
#[derive(Debug, Clone)]
pub struct CommitMarker {
    path: PathBuf,
}

impl CommitMarker {
    /// Marker backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the marker file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored commit id, returning an empty string if the file does not exist.
    pub fn load(&self) -> Result<String> {
        if !self.path.exists() {
            return Ok(String::new());
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read commit marker {}", self.path.display()))?;
        Ok(contents.trim_end().to_string())
    }

    /// Persist `commit` to the marker file, creating parent directories if needed.
    pub fn persist(&self, commit: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create marker directory {}", parent.display())
            })?;
        }

        fs::write(&self.path, commit)
            .with_context(|| format!("failed to write commit marker {}", self.path.display()))
    }
}
