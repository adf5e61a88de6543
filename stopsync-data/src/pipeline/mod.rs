//! The guarded reconciliation run.
//!
//! A run acquires the execution guard, loads both cached datasets, refreshes
//! the stop dataset per locality, persists it, optionally refreshes the map,
//! reconciles the two and finally releases the guard. The guard is released
//! on every exit path once acquired; a release failure outranks any error the
//! run itself produced.

use std::path::{Path, PathBuf};

use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use stopsync_core::{
    LocalityRefresh, MapSnapshot, MapSource, MatchedGroup, PipelineConfig, RefreshPolicy,
    StopDataset, StopSource, reconcile,
};
use thiserror::Error;

use crate::{CacheError, ExecutionGuard, GuardError, SnapshotCache};

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A configured path is not valid UTF-8.
    #[error("path {path:?} is not valid UTF-8")]
    NonUtf8Path {
        /// Offending path.
        path: PathBuf,
    },
    /// The guard could not be acquired.
    #[error(transparent)]
    Guard(#[from] GuardError),
    /// A cached dataset could not be loaded.
    #[error(transparent)]
    Cache(#[from] CacheError),
    /// The guard could not be released after the run.
    #[error("{source}")]
    GuardRelease {
        /// Release failure.
        #[source]
        source: GuardError,
        /// Error the run produced before release was attempted, if any.
        run_error: Option<Box<PipelineError>>,
    },
}

/// Everything a completed run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    /// The refreshed stop dataset, as persisted.
    pub stops: StopDataset,
    /// The map snapshot that was reconciled against.
    pub map: MapSnapshot,
    /// Reconciled groups in emission order.
    pub groups: Vec<MatchedGroup>,
    /// Number of (stop, element) comparisons performed.
    pub comparisons: usize,
    /// Per-locality refresh outcomes in configured order.
    pub refresh: Vec<LocalityRefresh>,
    /// Whether the refreshed stop dataset reached the cache.
    pub stops_persisted: bool,
    /// Whether a fresh map snapshot replaced the cached one.
    pub map_refreshed: bool,
}

/// Run the pipeline once.
///
/// `map_source` is consulted only when [`PipelineConfig::refresh_map`] is set.
///
/// The guard is released before this function returns, so rendering the
/// report happens outside the guarded section. The guard covers the cache
/// files only; writing results never touches them, and a failing writer
/// cannot leave the marker behind.
///
/// # Errors
/// Returns [`PipelineError::Guard`] when another run holds the marker,
/// [`PipelineError::Cache`] when a cached dataset cannot be loaded and
/// [`PipelineError::GuardRelease`] when the marker cannot be removed.
/// Fetch failures and cache write failures do not end the run.
///
/// # Examples
/// ```no_run
/// use chrono::Utc;
/// use stopsync_core::PipelineConfig;
/// use stopsync_data::{DEFAULT_STOP_SEARCH_URL, HttpStopSource, run_pipeline};
///
/// let config = PipelineConfig::default();
/// let stops = HttpStopSource::new(DEFAULT_STOP_SEARCH_URL)?;
/// let report = run_pipeline(&config, &stops, None, Utc::now())?;
/// println!("{} groups", report.groups.len());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn run_pipeline(
    config: &PipelineConfig,
    stop_source: &dyn StopSource,
    map_source: Option<&dyn MapSource>,
    now: DateTime<Utc>,
) -> Result<PipelineReport, PipelineError> {
    let lock_path = utf8_path(config.lock_path())?;
    let cache = SnapshotCache::new(utf8_path(config.cache_root())?);
    let guard = ExecutionGuard::acquire(lock_path)?;

    let result = run_guarded(config, &cache, stop_source, map_source, now);

    let marker = guard.path().to_owned();
    match (result, guard.release()) {
        (outcome, Ok(())) => outcome,
        (outcome, Err(source)) => {
            error!("run marker {marker} must be removed before the next run: {source}");
            Err(PipelineError::GuardRelease {
                source,
                run_error: outcome.err().map(Box::new),
            })
        }
    }
}

fn run_guarded(
    config: &PipelineConfig,
    cache: &SnapshotCache,
    stop_source: &dyn StopSource,
    map_source: Option<&dyn MapSource>,
    now: DateTime<Utc>,
) -> Result<PipelineReport, PipelineError> {
    let previous: StopDataset = cache.load()?;
    let mut map: MapSnapshot = cache.load()?;

    let refreshed = RefreshPolicy::from_config(config).refresh(&previous, stop_source, now);
    info!(
        "refreshed {} localities with {} fetches",
        refreshed.localities.len(),
        refreshed.fetch_count()
    );
    let stops_persisted = persist(cache, &refreshed.dataset);

    let map_refreshed = match map_source {
        Some(source) if config.refresh_map() => refresh_map(cache, source, config, &mut map),
        _ => false,
    };

    let reconciliation = reconcile(&refreshed.dataset, &map, config.orphan_policy());
    info!(
        "reconciled into {} groups ({} orphan)",
        reconciliation.groups.len(),
        reconciliation.orphans().count()
    );

    Ok(PipelineReport {
        stops: refreshed.dataset,
        map,
        groups: reconciliation.groups,
        comparisons: reconciliation.comparisons,
        refresh: refreshed.localities,
        stops_persisted,
        map_refreshed,
    })
}

fn persist(cache: &SnapshotCache, stops: &StopDataset) -> bool {
    match cache.store(stops) {
        Ok(()) => true,
        Err(err) => {
            warn!("{err}; continuing with the in-memory dataset");
            false
        }
    }
}

fn refresh_map(
    cache: &SnapshotCache,
    source: &dyn MapSource,
    config: &PipelineConfig,
    map: &mut MapSnapshot,
) -> bool {
    match source.fetch_map(config.localities()) {
        Ok(fresh) => {
            if let Err(err) = cache.store(&fresh) {
                warn!("{err}; continuing with the in-memory map");
            }
            *map = fresh;
            true
        }
        Err(err) => {
            warn!("fetching the map failed, keeping the cached snapshot: {err}");
            debug!(
                "cached map holds {} elements (osm base {:?})",
                map.elements.len(),
                map.provenance().timestamp_osm_base
            );
            false
        }
    }
}

fn utf8_path(path: &Path) -> Result<Utf8PathBuf, PipelineError> {
    Utf8PathBuf::from_path_buf(path.to_path_buf())
        .map_err(|path_buf| PipelineError::NonUtf8Path { path: path_buf })
}
