//! Utility functions shared by the converter, the pipeline and the CLI
//!
//! - File system helpers
//! - Duration and byte size formatting for log lines

use std::path::Path;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{BsonJsonError, Result};

/// File system utilities
pub mod fs {
    use super::*;

    /// Ensure directory exists, create if not
    ///
    /// # Arguments
    /// * `path` - Directory path
    ///
    /// # Returns
    /// * `Result<()>` - Success or error with the path attached
    pub fn ensure_dir_exists<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            std::fs::create_dir_all(path).map_err(|e| BsonJsonError::io(path, e))?;
        }
        Ok(())
    }

    /// Delete a file, logging instead of failing
    ///
    /// A file that is already gone is not worth a warning.
    ///
    /// # Returns
    /// * `bool` - True if the file was removed
    pub fn remove_file_quietly<P: AsRef<Path>>(path: P) -> bool {
        let path = path.as_ref();
        match std::fs::remove_file(path) {
            Ok(()) => {
                debug!("Removed {}", path.display());
                true
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                warn!("Could not remove {}: {}", path.display(), e);
                false
            }
        }
    }
}

/// Formatting for log output
pub mod format {
    use super::*;

    /// Format duration as human-readable string
    ///
    /// # Arguments
    /// * `duration` - Duration to format
    ///
    /// # Returns
    /// * `String` - Formatted duration (e.g., "1m 30s", "250ms")
    pub fn format_duration(duration: Duration) -> String {
        let secs = duration.as_secs();
        if secs == 0 {
            return format!("{}ms", duration.subsec_millis());
        }

        let minutes = secs / 60;
        let seconds = secs % 60;
        match (minutes, seconds) {
            (0, s) => format!("{}.{:03}s", s, duration.subsec_millis()),
            (m, 0) => format!("{}m", m),
            (m, s) => format!("{}m {}s", m, s),
        }
    }

    /// Format a byte count with a binary unit
    ///
    /// # Arguments
    /// * `bytes` - Number of bytes
    ///
    /// # Returns
    /// * `String` - Formatted size (e.g., "1.50 KB")
    pub fn format_bytes(bytes: u64) -> String {
        const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

        let mut size = bytes as f64;
        let mut unit = 0;
        while size >= 1024.0 && unit < UNITS.len() - 1 {
            size /= 1024.0;
            unit += 1;
        }

        if unit == 0 {
            format!("{} {}", bytes, UNITS[0])
        } else {
            format!("{:.2} {}", size, UNITS[unit])
        }
    }
}
