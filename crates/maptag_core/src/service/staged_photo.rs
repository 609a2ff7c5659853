//! Scoped ownership of an uploaded photo awaiting address creation.

use log::{debug, warn};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Temporary upload that is deleted on drop unless kept.
///
/// Attach it to a creation request: every path that does not persist the
/// address (validation failure, conflict, exhaustion, storage error) drops it
/// and releases the file.
#[derive(Debug)]
pub struct StagedPhoto {
    path: PathBuf,
    kept: bool,
}

impl StagedPhoto {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kept: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reference string stored on the address.
    pub fn reference(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }

    /// Disarms cleanup and hands the file over to its new owner.
    pub fn keep(mut self) -> PathBuf {
        self.kept = true;
        std::mem::take(&mut self.path)
    }
}

impl Drop for StagedPhoto {
    fn drop(&mut self) {
        if self.kept {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("event=photo_release module=photo status=ok"),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => warn!(
                "event=photo_release module=photo status=error error_code=remove_failed error={err}"
            ),
        }
    }
}
