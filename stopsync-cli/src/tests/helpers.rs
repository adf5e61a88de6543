//! Test doubles and workspace helpers for the reconcile command.

use crate::reconcile::{ReconcileArgs, ReconcileConfig, SourceFactory};
use camino::Utf8PathBuf;
use chrono::{DateTime, TimeZone, Utc};
use stopsync_core::test_support::{StubMapSource, StubStopSource};
use stopsync_core::{MapSnapshot, MapSource, StopRecord, StopSource};
use tempfile::TempDir;

use super::CliError;

/// Factory handing out stub collaborators with canned answers.
#[derive(Debug, Default)]
pub(super) struct StubFactory {
    stops: Vec<(String, Vec<StopRecord>)>,
    map: MapSnapshot,
}

impl StubFactory {
    pub(super) fn with_stops(mut self, locality: &str, stops: Vec<StopRecord>) -> Self {
        self.stops.push((locality.to_owned(), stops));
        self
    }

    pub(super) fn with_map(mut self, map: MapSnapshot) -> Self {
        self.map = map;
        self
    }
}

impl SourceFactory for StubFactory {
    fn stop_source(&self, _config: &ReconcileConfig) -> Result<Box<dyn StopSource>, CliError> {
        let source = self
            .stops
            .iter()
            .fold(StubStopSource::default(), |source, (locality, stops)| {
                source.with_stops(locality.clone(), stops.clone())
            });
        Ok(Box::new(source))
    }

    fn map_source(&self, _config: &ReconcileConfig) -> Result<Box<dyn MapSource>, CliError> {
        Ok(Box::new(StubMapSource::with_snapshot(self.map.clone())))
    }
}

/// Temporary directory hosting the cache root, marker and output file.
pub(super) struct Workspace {
    _dir: TempDir,
    pub(super) root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        Self { _dir: dir, root }
    }

    pub(super) fn lock(&self) -> Utf8PathBuf {
        self.root.join(".lock")
    }

    pub(super) fn cache_root(&self) -> Utf8PathBuf {
        self.root.join("cache")
    }

    /// Arguments pointing every path into the workspace.
    pub(super) fn args(&self, localities: &[&str]) -> ReconcileArgs {
        ReconcileArgs {
            locality: Some(localities.iter().map(|&name| name.to_owned()).collect()),
            cache_root: Some(self.cache_root()),
            lock_file: Some(self.lock()),
            ..ReconcileArgs::default()
        }
    }
}

pub(super) fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 2, 8, 0, 0)
        .single()
        .expect("valid timestamp")
}
