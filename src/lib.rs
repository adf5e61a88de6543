//! Facade crate for stop reconciliation.
//!
//! This crate re-exports the core domain types and exposes the cache, guard
//! and HTTP collaborators behind the `http` feature.

#![forbid(unsafe_code)]

pub use stopsync_core::{
    CitySnapshot, ConfigError, FetchError, LocalityRefresh, MapElement, MapProvenance,
    MapSnapshot, MapSource, MatchedGroup, OrphanPolicy, PipelineConfig, Reconciliation,
    RefreshOutcome, RefreshPolicy, RefreshStatus, StopDataset, StopRecord, StopSource, reconcile,
};

#[cfg(feature = "http")]
pub use stopsync_data::{
    CacheError, ExecutionGuard, GuardError, HttpMapSource, HttpSourceConfig, HttpStopSource,
    PipelineError, PipelineReport, SnapshotCache, run_pipeline,
};
