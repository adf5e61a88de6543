//! Run configuration handed to each pipeline component at construction.

use std::path::{Path, PathBuf};

use chrono::TimeDelta;
use thiserror::Error;

/// Localities tracked when none are configured.
pub const DEFAULT_LOCALITIES: [&str; 5] = ["Altefähr", "Kramerhof", "Parow", "Prohn", "Stralsund"];

/// Maximum snapshot age, in hours, before a refresh is attempted.
pub const DEFAULT_TTL_HOURS: u32 = 23;

/// Directory holding the persisted snapshots.
pub const DEFAULT_CACHE_ROOT: &str = "cache";

/// Marker file signalling a run in progress.
pub const DEFAULT_LOCK_PATH: &str = ".lock";

/// How the reconciliation engine reports map elements without a stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum OrphanPolicy {
    /// Emit an orphan group for every failed (stop, element) comparison.
    #[default]
    PerComparison,
    /// Emit each element at most once, and only when it matched no stop.
    Deduplicated,
}

/// Errors returned by [`PipelineConfig::new`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A locality key was empty or whitespace.
    #[error("locality names must not be blank")]
    BlankLocality,
}

/// Validated pipeline configuration.
///
/// # Examples
/// ```
/// use stopsync_core::PipelineConfig;
///
/// # fn main() -> Result<(), stopsync_core::ConfigError> {
/// let config = PipelineConfig::new(["Parow", "Prohn", "Parow"], 23, "cache")?;
/// assert_eq!(config.localities(), ["Parow", "Prohn"]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    localities: Vec<String>,
    ttl_hours: u32,
    cache_root: PathBuf,
    lock_path: PathBuf,
    orphan_policy: OrphanPolicy,
    refresh_map: bool,
}

impl PipelineConfig {
    /// Validate and construct a configuration.
    ///
    /// Duplicate localities collapse onto their first occurrence; names are
    /// trimmed.
    ///
    /// # Errors
    /// Returns [`ConfigError::BlankLocality`] when any name is blank.
    pub fn new<I, S>(
        localities: I,
        ttl_hours: u32,
        cache_root: impl Into<PathBuf>,
    ) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut unique: Vec<String> = Vec::new();
        for raw in localities {
            let name = raw.as_ref().trim();
            if name.is_empty() {
                return Err(ConfigError::BlankLocality);
            }
            if !unique.iter().any(|seen| seen == name) {
                unique.push(name.to_owned());
            }
        }
        Ok(Self {
            localities: unique,
            ttl_hours,
            cache_root: cache_root.into(),
            lock_path: PathBuf::from(DEFAULT_LOCK_PATH),
            orphan_policy: OrphanPolicy::default(),
            refresh_map: false,
        })
    }

    /// Override the marker file location.
    #[must_use]
    pub fn with_lock_path(mut self, lock_path: impl Into<PathBuf>) -> Self {
        self.lock_path = lock_path.into();
        self
    }

    /// Override the orphan reporting policy.
    #[must_use]
    pub const fn with_orphan_policy(mut self, orphan_policy: OrphanPolicy) -> Self {
        self.orphan_policy = orphan_policy;
        self
    }

    /// Enable or disable refreshing the map snapshot.
    #[must_use]
    pub const fn with_map_refresh(mut self, refresh_map: bool) -> Self {
        self.refresh_map = refresh_map;
        self
    }

    /// Configured locality keys in iteration order.
    #[must_use]
    pub fn localities(&self) -> &[String] {
        &self.localities
    }

    /// Snapshot TTL in hours.
    #[must_use]
    pub const fn ttl_hours(&self) -> u32 {
        self.ttl_hours
    }

    /// Snapshot TTL as a duration.
    #[must_use]
    pub fn ttl(&self) -> TimeDelta {
        TimeDelta::hours(i64::from(self.ttl_hours))
    }

    /// Directory holding the persisted snapshots.
    #[must_use]
    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    /// Marker file location.
    #[must_use]
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Orphan reporting policy.
    #[must_use]
    pub const fn orphan_policy(&self) -> OrphanPolicy {
        self.orphan_policy
    }

    /// Whether the map snapshot is refreshed during the run.
    #[must_use]
    pub const fn refresh_map(&self) -> bool {
        self.refresh_map
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            localities: DEFAULT_LOCALITIES.iter().map(|&name| name.to_owned()).collect(),
            ttl_hours: DEFAULT_TTL_HOURS,
            cache_root: PathBuf::from(DEFAULT_CACHE_ROOT),
            lock_path: PathBuf::from(DEFAULT_LOCK_PATH),
            orphan_policy: OrphanPolicy::default(),
            refresh_map: false,
        }
    }
}
