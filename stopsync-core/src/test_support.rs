//! Deterministic in-memory sources used by unit and behaviour tests.
//!
//! The stubs record how often they were asked for data so tests can assert
//! that cached snapshots suppress fetches.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use crate::{FetchError, MapSnapshot, MapSource, StopRecord, StopSource};

/// Stub [`StopSource`] answering from a per-locality table.
///
/// Localities without a configured response fail with
/// [`FetchError::Service`].
///
/// # Examples
/// ```
/// use stopsync_core::test_support::StubStopSource;
/// use stopsync_core::{StopRecord, StopSource};
///
/// let source = StubStopSource::default()
///     .with_stops("Parow", vec![StopRecord::new("1", "Markt", "")])
///     .failing("Prohn");
///
/// assert!(source.fetch_stops("Parow").is_ok());
/// assert!(source.fetch_stops("Prohn").is_err());
/// assert_eq!(source.calls_for("Parow"), 1);
/// ```
#[derive(Debug, Default)]
pub struct StubStopSource {
    responses: HashMap<String, Result<Vec<StopRecord>, FetchError>>,
    calls: RefCell<HashMap<String, usize>>,
}

impl StubStopSource {
    /// Answer `locality` with `stops`.
    #[must_use]
    pub fn with_stops(mut self, locality: impl Into<String>, stops: Vec<StopRecord>) -> Self {
        self.responses.insert(locality.into(), Ok(stops));
        self
    }

    /// Answer `locality` with a network failure.
    #[must_use]
    pub fn failing(self, locality: impl Into<String>) -> Self {
        let locality = locality.into();
        let error = FetchError::Network {
            url: format!("stub://stops/{locality}"),
            message: "connection refused".to_owned(),
        };
        self.with_error(locality, error)
    }

    /// Answer `locality` with `error`.
    #[must_use]
    pub fn with_error(mut self, locality: impl Into<String>, error: FetchError) -> Self {
        self.responses.insert(locality.into(), Err(error));
        self
    }

    /// Number of fetches issued for `locality`.
    #[must_use]
    pub fn calls_for(&self, locality: &str) -> usize {
        self.calls.borrow().get(locality).copied().unwrap_or(0)
    }

    /// Number of fetches issued across all localities.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.calls.borrow().values().sum()
    }
}

impl StopSource for StubStopSource {
    fn fetch_stops(&self, locality: &str) -> Result<Vec<StopRecord>, FetchError> {
        *self
            .calls
            .borrow_mut()
            .entry(locality.to_owned())
            .or_insert(0) += 1;
        self.responses
            .get(locality)
            .cloned()
            .unwrap_or_else(|| {
                Err(FetchError::Service {
                    message: format!("no stub response for {locality}"),
                })
            })
    }
}

/// Stub [`MapSource`] returning a fixed outcome.
#[derive(Debug)]
pub struct StubMapSource {
    response: Result<MapSnapshot, FetchError>,
    calls: Cell<usize>,
}

impl StubMapSource {
    /// Answer every request with `snapshot`.
    #[must_use]
    pub const fn with_snapshot(snapshot: MapSnapshot) -> Self {
        Self {
            response: Ok(snapshot),
            calls: Cell::new(0),
        }
    }

    /// Answer every request with `error`.
    #[must_use]
    pub const fn with_error(error: FetchError) -> Self {
        Self {
            response: Err(error),
            calls: Cell::new(0),
        }
    }

    /// Number of fetches issued.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl MapSource for StubMapSource {
    fn fetch_map(&self, _localities: &[String]) -> Result<MapSnapshot, FetchError> {
        self.calls.set(self.calls.get() + 1);
        self.response.clone()
    }
}
