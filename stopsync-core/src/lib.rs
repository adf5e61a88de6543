//! Core domain types and algorithms for reconciling transit-agency bus stops
//! with crowd-sourced map elements.
//!
//! The crate performs no I/O. Remote datasets arrive through the
//! [`StopSource`] and [`MapSource`] traits, persistence lives in
//! `stopsync-data`, and everything here is deterministic given its inputs
//! and the supplied clock value.

#![forbid(unsafe_code)]

mod config;
mod map;
pub mod reconcile;
pub mod refresh;
mod source;
mod stop;

#[doc(hidden)]
pub mod test_support;

pub use config::{
    ConfigError, DEFAULT_CACHE_ROOT, DEFAULT_LOCALITIES, DEFAULT_LOCK_PATH, DEFAULT_TTL_HOURS,
    OrphanPolicy, PipelineConfig,
};
pub use map::{ElementTags, MapElement, MapProvenance, MapSnapshot};
pub use reconcile::{MatchedGroup, Reconciliation, reconcile};
pub use refresh::{LocalityRefresh, RefreshOutcome, RefreshPolicy, RefreshStatus};
pub use source::{FetchError, MapSource, StopSource};
pub use stop::{CitySnapshot, StopDataset, StopRecord};
