//! Per-locality refresh of the cached stop dataset.
//!
//! Each configured locality is handled independently: a fresh snapshot is
//! reused, a stale or missing one is fetched, and a failed fetch falls back to
//! the previous snapshot when one exists. A failure for one key never affects
//! the others.

use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, info, warn};

use crate::{CitySnapshot, FetchError, PipelineConfig, StopDataset, StopSource};

/// What happened to a single locality during a refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshStatus {
    /// The cached snapshot was young enough and was reused unchanged.
    Reused,
    /// A fetch succeeded and replaced (or created) the snapshot.
    Refreshed {
        /// Number of stops returned by the fetch.
        stops: usize,
    },
    /// A fetch failed and the previous snapshot was carried forward.
    FellBack {
        /// The fetch failure.
        error: FetchError,
    },
    /// A fetch failed and no previous snapshot existed; the key is absent.
    Omitted {
        /// The fetch failure.
        error: FetchError,
    },
}

impl RefreshStatus {
    /// Whether a fetch was attempted for the locality.
    #[must_use]
    pub const fn attempted_fetch(&self) -> bool {
        !matches!(self, Self::Reused)
    }
}

/// Refresh record for one locality key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalityRefresh {
    /// Locality key.
    pub locality: String,
    /// Outcome for the key.
    pub status: RefreshStatus,
}

/// Result of [`RefreshPolicy::refresh`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshOutcome {
    /// The dataset replacing the previous one.
    pub dataset: StopDataset,
    /// Per-key records in configured order.
    pub localities: Vec<LocalityRefresh>,
}

impl RefreshOutcome {
    /// Number of fetches attempted.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.localities
            .iter()
            .filter(|entry| entry.status.attempted_fetch())
            .count()
    }

    /// Whether any fetch failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.localities.iter().any(|entry| {
            matches!(
                entry.status,
                RefreshStatus::FellBack { .. } | RefreshStatus::Omitted { .. }
            )
        })
    }
}

/// Decides per locality whether to reuse or refetch cached stops.
///
/// # Examples
/// ```
/// use chrono::{TimeDelta, Utc};
/// use stopsync_core::{FetchError, RefreshPolicy, StopDataset, StopRecord, StopSource};
///
/// struct Fixed;
///
/// impl StopSource for Fixed {
///     fn fetch_stops(&self, _locality: &str) -> Result<Vec<StopRecord>, FetchError> {
///         Ok(vec![StopRecord::new("1", "Markt", "")])
///     }
/// }
///
/// let policy = RefreshPolicy::new(vec!["Parow".to_owned()], TimeDelta::hours(23));
/// let outcome = policy.refresh(&StopDataset::default(), &Fixed, Utc::now());
/// assert_eq!(outcome.dataset.stop_count(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshPolicy {
    localities: Vec<String>,
    ttl: TimeDelta,
}

impl RefreshPolicy {
    /// Construct a policy over `localities` with the given TTL.
    ///
    /// Repeated localities collapse onto their first occurrence so each key
    /// is fetched at most once per refresh.
    #[must_use]
    pub fn new(localities: Vec<String>, ttl: TimeDelta) -> Self {
        let mut unique: Vec<String> = Vec::with_capacity(localities.len());
        for locality in localities {
            if !unique.contains(&locality) {
                unique.push(locality);
            }
        }
        Self {
            localities: unique,
            ttl,
        }
    }

    /// Construct a policy from pipeline configuration.
    #[must_use]
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.localities().to_vec(), config.ttl())
    }

    /// Maximum snapshot age before a refresh is required.
    #[must_use]
    pub const fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    /// Produce the refreshed dataset.
    ///
    /// Keys of `previous` outside the configured set are not carried over.
    pub fn refresh<S>(&self, previous: &StopDataset, source: &S, now: DateTime<Utc>) -> RefreshOutcome
    where
        S: StopSource + ?Sized,
    {
        let mut dataset = StopDataset::default();
        let mut localities = Vec::with_capacity(self.localities.len());
        for locality in &self.localities {
            let prior = previous.get(locality);
            let status = self.refresh_locality(locality, prior, source, now, &mut dataset);
            localities.push(LocalityRefresh {
                locality: locality.clone(),
                status,
            });
        }
        RefreshOutcome {
            dataset,
            localities,
        }
    }

    fn refresh_locality<S>(
        &self,
        locality: &str,
        prior: Option<&CitySnapshot>,
        source: &S,
        now: DateTime<Utc>,
        dataset: &mut StopDataset,
    ) -> RefreshStatus
    where
        S: StopSource + ?Sized,
    {
        if let Some(snapshot) = prior
            && !snapshot.is_stale(now, self.ttl)
        {
            debug!(
                "reusing cached stops for {locality} fetched at {}",
                snapshot.fetched_at
            );
            dataset.upsert(snapshot.clone());
            return RefreshStatus::Reused;
        }

        match source.fetch_stops(locality) {
            Ok(stops) => {
                info!("fetched {} stops for {locality}", stops.len());
                let count = stops.len();
                dataset.upsert(CitySnapshot::new(locality, now, stops));
                RefreshStatus::Refreshed { stops: count }
            }
            Err(error) => match prior {
                Some(snapshot) => {
                    warn!(
                        "fetching stops for {locality} failed, reusing snapshot from {}: {error}",
                        snapshot.fetched_at
                    );
                    dataset.upsert(snapshot.clone());
                    RefreshStatus::FellBack { error }
                }
                None => {
                    warn!("fetching stops for {locality} failed and nothing is cached: {error}");
                    RefreshStatus::Omitted { error }
                }
            },
        }
    }
}
