//! Collaborator traits for the two remote datasets.
//!
//! Both traits are synchronous so the pipeline stays a straight sequence of
//! steps; HTTP implementations block internally and must bound their latency
//! with a timeout.

mod error;

pub use error::FetchError;

use crate::{MapSnapshot, StopRecord};

/// Fetch the transit-agency stops for one locality.
///
/// # Examples
///
/// ```rust
/// use stopsync_core::{FetchError, StopRecord, StopSource};
///
/// struct Fixed;
///
/// impl StopSource for Fixed {
///     fn fetch_stops(&self, locality: &str) -> Result<Vec<StopRecord>, FetchError> {
///         Ok(vec![StopRecord::new("1", format!("{locality}, Markt"), "")])
///     }
/// }
///
/// let stops = Fixed.fetch_stops("Parow")?;
/// assert_eq!(stops[0].value, "Parow, Markt");
/// # Ok::<(), FetchError>(())
/// ```
pub trait StopSource {
    /// Return the stops for `locality` in service order.
    fn fetch_stops(&self, locality: &str) -> Result<Vec<StopRecord>, FetchError>;
}

/// Fetch a fresh map snapshot covering a set of localities.
pub trait MapSource {
    /// Return the map elements for `localities` with provenance metadata.
    fn fetch_map(&self, localities: &[String]) -> Result<MapSnapshot, FetchError>;
}

impl<T: StopSource + ?Sized> StopSource for &T {
    fn fetch_stops(&self, locality: &str) -> Result<Vec<StopRecord>, FetchError> {
        (**self).fetch_stops(locality)
    }
}

impl<T: MapSource + ?Sized> MapSource for &T {
    fn fetch_map(&self, localities: &[String]) -> Result<MapSnapshot, FetchError> {
        (**self).fetch_map(localities)
    }
}
