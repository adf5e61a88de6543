//! Durable per-kind snapshot storage.
//!
//! Each dataset kind lives in its own JSON file under a cache root. A missing
//! file (first run) loads as the empty snapshot; a file that fails to decode
//! is reported as corrupt. Stores replace the file atomically.

use std::fmt;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use serde::Serialize;
use serde::de::DeserializeOwned;
use stopsync_core::{MapSnapshot, StopDataset};
use thiserror::Error;

/// The independently addressed datasets held by the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetKind {
    /// Per-locality agency stops.
    Stops,
    /// Crowd-sourced map elements.
    Map,
}

impl DatasetKind {
    /// File name of the persisted representation below the cache root.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Stops => "stops.json",
            Self::Map => "map.json",
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stops => f.write_str("stops"),
            Self::Map => f.write_str("map"),
        }
    }
}

/// A dataset that can be persisted in the cache.
///
/// `Default` supplies the first-run value returned when nothing is stored.
pub trait Snapshot: Serialize + DeserializeOwned + Default {
    /// Which cache slot the snapshot occupies.
    const KIND: DatasetKind;
}

impl Snapshot for StopDataset {
    const KIND: DatasetKind = DatasetKind::Stops;
}

impl Snapshot for MapSnapshot {
    const KIND: DatasetKind = DatasetKind::Map;
}

/// Errors raised by [`SnapshotCache`].
#[derive(Debug, Error)]
pub enum CacheError {
    /// The persisted file exists but could not be read.
    #[error("failed to read {kind} snapshot {path}: {source}")]
    Read {
        /// Dataset kind.
        kind: DatasetKind,
        /// File location.
        path: Utf8PathBuf,
        /// Underlying IO failure.
        #[source]
        source: io::Error,
    },
    /// The persisted file does not decode as a snapshot.
    #[error("{kind} snapshot {path} is corrupt: {source}")]
    Corrupt {
        /// Dataset kind.
        kind: DatasetKind,
        /// File location.
        path: Utf8PathBuf,
        /// Decoder failure.
        #[source]
        source: serde_json::Error,
    },
    /// The cache root could not be created.
    #[error("failed to create cache directory {path}: {source}")]
    CreateDir {
        /// Directory location.
        path: Utf8PathBuf,
        /// Underlying IO failure.
        #[source]
        source: io::Error,
    },
    /// The snapshot could not be encoded.
    #[error("failed to serialise {kind} snapshot: {source}")]
    Serialise {
        /// Dataset kind.
        kind: DatasetKind,
        /// Encoder failure.
        #[source]
        source: serde_json::Error,
    },
    /// The encoded snapshot could not be written.
    #[error("failed to write {kind} snapshot {path}: {source}")]
    Write {
        /// Dataset kind.
        kind: DatasetKind,
        /// File location.
        path: Utf8PathBuf,
        /// Underlying IO failure.
        #[source]
        source: io::Error,
    },
}

impl CacheError {
    /// Whether the error came from [`SnapshotCache::store`].
    #[must_use]
    pub const fn is_write_failure(&self) -> bool {
        matches!(
            self,
            Self::CreateDir { .. } | Self::Serialise { .. } | Self::Write { .. }
        )
    }
}

/// JSON snapshot store rooted at a directory.
///
/// # Examples
/// ```no_run
/// use stopsync_core::StopDataset;
/// use stopsync_data::{CacheError, SnapshotCache};
///
/// # fn main() -> Result<(), CacheError> {
/// let cache = SnapshotCache::new("cache");
/// let stops: StopDataset = cache.load()?;
/// cache.store(&stops)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotCache {
    root: Utf8PathBuf,
}

impl SnapshotCache {
    /// Construct a cache rooted at `root`. Nothing is touched on disk.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Cache root directory.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Location of the persisted representation for `kind`.
    #[must_use]
    pub fn path_for(&self, kind: DatasetKind) -> Utf8PathBuf {
        self.root.join(kind.file_name())
    }

    /// Load the stored snapshot, or the empty snapshot when none exists.
    ///
    /// # Errors
    /// Returns [`CacheError::Read`] when the file cannot be read and
    /// [`CacheError::Corrupt`] when it does not decode.
    pub fn load<T: Snapshot>(&self) -> Result<T, CacheError> {
        let kind = T::KIND;
        let path = self.path_for(kind);
        let bytes = match stopsync_fs::read_optional(&path) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!("no {kind} snapshot at {path}; starting empty");
                return Ok(T::default());
            }
            Err(source) => return Err(CacheError::Read { kind, path, source }),
        };
        match serde_json::from_slice(&bytes) {
            Ok(snapshot) => {
                debug!("loaded {kind} snapshot from {path}");
                Ok(snapshot)
            }
            Err(source) => Err(CacheError::Corrupt { kind, path, source }),
        }
    }

    /// Replace the stored snapshot with `snapshot`.
    ///
    /// The cache root is created when missing.
    ///
    /// # Errors
    /// Returns [`CacheError::CreateDir`], [`CacheError::Serialise`] or
    /// [`CacheError::Write`] depending on which step failed.
    pub fn store<T: Snapshot>(&self, snapshot: &T) -> Result<(), CacheError> {
        let kind = T::KIND;
        stopsync_fs::ensure_dir(&self.root).map_err(|source| CacheError::CreateDir {
            path: self.root.clone(),
            source,
        })?;
        let bytes =
            serde_json::to_vec(snapshot).map_err(|source| CacheError::Serialise { kind, source })?;
        let path = self.path_for(kind);
        if let Err(source) = stopsync_fs::replace_file(&path, &bytes) {
            return Err(CacheError::Write { kind, path, source });
        }
        debug!("stored {kind} snapshot at {path}");
        Ok(())
    }
}
