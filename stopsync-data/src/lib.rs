//! Persistence, remote collaborators and the run driver for stop
//! reconciliation.
//!
//! Responsibilities:
//! - Guard a run against concurrent instances with a marker file.
//! - Persist the stop and map datasets as JSON snapshots.
//! - Fetch stops and map elements over HTTP.
//! - Drive one guarded run from cache load to reconciliation.
//!
//! Boundaries:
//! - Matching and refresh rules live in `stopsync-core`.
//! - Rendering of results is left to the caller.

#![forbid(unsafe_code)]

mod cache;
mod guard;
mod pipeline;
mod source;

pub use cache::{CacheError, DatasetKind, Snapshot, SnapshotCache};
pub use guard::{ExecutionGuard, GuardError};
pub use pipeline::{PipelineError, PipelineReport, run_pipeline};
pub use source::{
    DEFAULT_OVERPASS_URL, DEFAULT_STOP_SEARCH_URL, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT,
    HttpMapSource, HttpSourceConfig, HttpStopSource, SourceBuildError, overpass_query,
};
