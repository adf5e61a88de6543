//! HTTP implementations of the stop and map collaborators.
//!
//! Both sources block on an owned Tokio runtime so they satisfy the
//! synchronous [`stopsync_core::StopSource`] and [`stopsync_core::MapSource`]
//! traits. Every request is bounded by the configured timeout; a timeout
//! surfaces as [`stopsync_core::FetchError::Timeout`].

mod client;
mod overpass;
mod stops;

pub use client::{DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT, HttpSourceConfig, SourceBuildError};
pub use overpass::{DEFAULT_OVERPASS_URL, HttpMapSource, overpass_query};
pub use stops::{DEFAULT_STOP_SEARCH_URL, HttpStopSource};
