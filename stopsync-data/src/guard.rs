//! Single-instance execution guard backed by a marker file.
//!
//! The marker is created with an exclusive create, so two processes racing
//! for it cannot both succeed. Holding an [`ExecutionGuard`] means this
//! process owns the run; releasing it removes the marker.

use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, error};
use thiserror::Error;

/// Errors raised while acquiring or releasing the run marker.
#[derive(Debug, Error)]
pub enum GuardError {
    /// Another run holds the marker.
    #[error("another run is in progress (marker {path} exists)")]
    AlreadyRunning {
        /// Marker location.
        path: Utf8PathBuf,
    },
    /// The marker could not be created.
    #[error("failed to create run marker {path}: {source}")]
    Create {
        /// Marker location.
        path: Utf8PathBuf,
        /// Underlying IO failure.
        #[source]
        source: io::Error,
    },
    /// The marker could not be removed; it must be deleted by hand.
    #[error("failed to remove run marker {path}; delete it manually: {source}")]
    Release {
        /// Marker location.
        path: Utf8PathBuf,
        /// Underlying IO failure.
        #[source]
        source: io::Error,
    },
}

/// Proof that this process owns the run marker.
///
/// Call [`ExecutionGuard::release`] to remove the marker and observe failures.
/// A guard dropped without release (for example while unwinding) still
/// attempts removal and logs any failure.
///
/// # Examples
/// ```no_run
/// use stopsync_data::{ExecutionGuard, GuardError};
///
/// # fn main() -> Result<(), GuardError> {
/// let guard = ExecutionGuard::acquire(".lock")?;
/// // ... run the pipeline ...
/// guard.release()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ExecutionGuard {
    path: Utf8PathBuf,
    held: bool,
}

impl ExecutionGuard {
    /// Create the marker at `path`, failing if it already exists.
    ///
    /// Missing parent directories are created. The marker records the
    /// owning process identifier.
    ///
    /// # Errors
    /// Returns [`GuardError::AlreadyRunning`] when the marker is present and
    /// [`GuardError::Create`] for any other IO failure.
    pub fn acquire(marker: impl Into<Utf8PathBuf>) -> Result<Self, GuardError> {
        let path = marker.into();
        if let Err(source) = stopsync_fs::ensure_parent_dir(&path) {
            return Err(GuardError::Create { path, source });
        }
        let mut file = match stopsync_fs::create_new_file(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                return Err(GuardError::AlreadyRunning { path });
            }
            Err(source) => return Err(GuardError::Create { path, source }),
        };
        // The marker now exists, so the guard owns it even if the write fails.
        let guard = Self { path, held: true };
        writeln!(file, "{}", std::process::id()).map_err(|source| GuardError::Create {
            path: guard.path.clone(),
            source,
        })?;
        debug!("acquired run marker {}", guard.path);
        Ok(guard)
    }

    /// Marker location.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Remove the marker.
    ///
    /// # Errors
    /// Returns [`GuardError::Release`] when the marker cannot be removed.
    pub fn release(mut self) -> Result<(), GuardError> {
        self.held = false;
        stopsync_fs::remove_file(&self.path).map_err(|source| GuardError::Release {
            path: self.path.clone(),
            source,
        })?;
        debug!("released run marker {}", self.path);
        Ok(())
    }
}

impl Drop for ExecutionGuard {
    fn drop(&mut self) {
        if !self.held {
            return;
        }
        if let Err(err) = stopsync_fs::remove_file(&self.path) {
            error!(
                "failed to remove run marker {}; delete it manually: {err}",
                self.path
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn temp_dir() -> TempDir {
        TempDir::new().expect("create temp dir")
    }

    fn marker_in(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().join(".lock")).expect("utf-8 temp path")
    }

    #[rstest]
    fn second_acquire_reports_running(temp_dir: TempDir) {
        let path = marker_in(&temp_dir);
        let guard = ExecutionGuard::acquire(path.clone()).expect("first acquire");

        let err = ExecutionGuard::acquire(path.clone()).expect_err("second acquire");

        assert!(matches!(err, GuardError::AlreadyRunning { path: p } if p == path));
        guard.release().expect("release");
    }

    #[rstest]
    fn release_allows_reacquire(temp_dir: TempDir) {
        let path = marker_in(&temp_dir);
        ExecutionGuard::acquire(path.clone())
            .expect("acquire")
            .release()
            .expect("release");

        assert!(!path.exists());
        let guard = ExecutionGuard::acquire(path).expect("reacquire");
        guard.release().expect("release again");
    }

    #[rstest]
    fn drop_removes_marker(temp_dir: TempDir) {
        let path = marker_in(&temp_dir);
        {
            let _guard = ExecutionGuard::acquire(path.clone()).expect("acquire");
            assert!(path.exists());
        }
        assert!(!path.exists());
    }

    #[rstest]
    fn release_reports_missing_marker(temp_dir: TempDir) {
        let path = marker_in(&temp_dir);
        let guard = ExecutionGuard::acquire(path.clone()).expect("acquire");
        std::fs::remove_file(&path).expect("remove marker behind the guard");

        let err = guard.release().expect_err("release should fail");

        assert!(matches!(err, GuardError::Release { .. }));
    }

    #[rstest]
    fn marker_records_process_id(temp_dir: TempDir) {
        let path = marker_in(&temp_dir);
        let guard = ExecutionGuard::acquire(path.clone()).expect("acquire");

        let contents = std::fs::read_to_string(&path).expect("read marker");

        assert_eq!(contents.trim(), std::process::id().to_string());
        guard.release().expect("release");
    }
}
