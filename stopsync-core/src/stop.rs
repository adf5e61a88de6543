//! Transit-agency stop records and the per-locality cache they live in.

use chrono::{DateTime, TimeDelta, Utc};

/// One stop as returned by the transit-agency search service.
///
/// Field names follow the search service's JSON payload so that fetched
/// records deserialise without an intermediate type.
///
/// # Examples
/// ```
/// use stopsync_core::StopRecord;
///
/// let stop = StopRecord::new("1234", "Markt", "Stralsund, Markt");
/// assert_eq!(stop.value, "Markt");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StopRecord {
    /// Opaque identifier assigned by the agency.
    pub id: String,
    /// Display value; this is the name used for matching.
    pub value: String,
    /// Presentation label.
    #[cfg_attr(feature = "serde", serde(default))]
    pub label: String,
}

impl StopRecord {
    /// Construct a stop record.
    #[must_use]
    pub fn new(id: impl Into<String>, value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Cached stops for a single locality key.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CitySnapshot {
    /// Locality key this snapshot covers.
    pub locality: String,
    /// Time of the last successful fetch.
    pub fetched_at: DateTime<Utc>,
    /// Stops in the order the search service returned them.
    #[cfg_attr(feature = "serde", serde(default))]
    pub stops: Vec<StopRecord>,
}

impl CitySnapshot {
    /// Construct a snapshot fetched at `fetched_at`.
    #[must_use]
    pub fn new(
        locality: impl Into<String>,
        fetched_at: DateTime<Utc>,
        stops: Vec<StopRecord>,
    ) -> Self {
        Self {
            locality: locality.into(),
            fetched_at,
            stops,
        }
    }

    /// Age of the snapshot relative to `now`.
    ///
    /// Negative when the stored timestamp lies in the future.
    #[must_use]
    pub fn age(&self, now: DateTime<Utc>) -> TimeDelta {
        now.signed_duration_since(self.fetched_at)
    }

    /// Whether the snapshot is older than `ttl` at `now`.
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>, ttl: TimeDelta) -> bool {
        self.age(now) > ttl
    }
}

/// The per-city dataset: at most one [`CitySnapshot`] per locality key.
///
/// Snapshots keep insertion order, which is the configured locality order
/// when the dataset was produced by a refresh.
///
/// # Examples
/// ```
/// use chrono::Utc;
/// use stopsync_core::{CitySnapshot, StopDataset};
///
/// let mut dataset = StopDataset::default();
/// dataset.upsert(CitySnapshot::new("Parow", Utc::now(), Vec::new()));
/// dataset.upsert(CitySnapshot::new("Parow", Utc::now(), Vec::new()));
/// assert_eq!(dataset.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StopDataset {
    #[cfg_attr(feature = "serde", serde(default))]
    cities: Vec<CitySnapshot>,
}

impl StopDataset {
    /// Build a dataset from snapshots, collapsing duplicate keys.
    ///
    /// A later snapshot for an existing key replaces the earlier one in place.
    #[must_use]
    pub fn from_snapshots<I>(snapshots: I) -> Self
    where
        I: IntoIterator<Item = CitySnapshot>,
    {
        let mut dataset = Self::default();
        for snapshot in snapshots {
            dataset.upsert(snapshot);
        }
        dataset
    }

    /// Look up the snapshot for `locality`.
    #[must_use]
    pub fn get(&self, locality: &str) -> Option<&CitySnapshot> {
        self.cities.iter().find(|city| city.locality == locality)
    }

    /// Whether a snapshot exists for `locality`.
    #[must_use]
    pub fn contains(&self, locality: &str) -> bool {
        self.get(locality).is_some()
    }

    /// Insert `snapshot`, replacing any snapshot with the same key.
    pub fn upsert(&mut self, snapshot: CitySnapshot) {
        match self
            .cities
            .iter_mut()
            .find(|city| city.locality == snapshot.locality)
        {
            Some(existing) => *existing = snapshot,
            None => self.cities.push(snapshot),
        }
    }

    /// Iterate snapshots in key order.
    pub fn iter(&self) -> impl Iterator<Item = &CitySnapshot> {
        self.cities.iter()
    }

    /// Locality keys present in the dataset.
    pub fn localities(&self) -> impl Iterator<Item = &str> {
        self.cities.iter().map(|city| city.locality.as_str())
    }

    /// Number of locality keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cities.len()
    }

    /// Whether the dataset holds no snapshots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    /// Total number of stop records across all localities.
    #[must_use]
    pub fn stop_count(&self) -> usize {
        self.cities.iter().map(|city| city.stops.len()).sum()
    }
}

impl<'a> IntoIterator for &'a StopDataset {
    type Item = &'a CitySnapshot;
    type IntoIter = std::slice::Iter<'a, CitySnapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.cities.iter()
    }
}
