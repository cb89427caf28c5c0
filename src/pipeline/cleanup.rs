//! Removal of files a pipeline run creates along the way

use std::path::{Path, PathBuf};

use crate::utils::fs::remove_file_quietly;

/// Files deleted when the guard goes out of scope
///
/// Deletion is best effort: failures are logged, never returned. The guard
/// runs on success, on error returns and on panics alike.
#[derive(Debug, Default)]
pub struct TransientFiles {
    paths: Vec<PathBuf>,
}

impl TransientFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file for deletion
    pub fn track(&mut self, path: impl Into<PathBuf>) {
        self.paths.push(path.into());
    }

    /// Stop tracking a file so it survives the run
    pub fn release(&mut self, path: &Path) {
        self.paths.retain(|tracked| tracked != path);
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

impl Drop for TransientFiles {
    fn drop(&mut self) {
        for path in self.paths.drain(..) {
            remove_file_quietly(&path);
        }
    }
}
