//! The `reconcile` command: one guarded run plus the JSON result sink.

use std::io::Write;
use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use clap::Parser;
use log::{debug, error};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use stopsync_core::{
    DEFAULT_CACHE_ROOT, DEFAULT_LOCALITIES, DEFAULT_LOCK_PATH, DEFAULT_TTL_HOURS, MapProvenance,
    MapSource, MatchedGroup, OrphanPolicy, PipelineConfig, StopSource,
};
use stopsync_data::{
    DEFAULT_OVERPASS_URL, DEFAULT_STOP_SEARCH_URL, DEFAULT_TIMEOUT_SECS, HttpMapSource,
    HttpSourceConfig, HttpStopSource, PipelineError, PipelineReport, run_pipeline,
};

use crate::{
    ARG_CACHE_ROOT, ARG_DEDUPE_ORPHANS, ARG_LOCALITY, ARG_LOCK_FILE, ARG_OUTPUT,
    ARG_OVERPASS_URL, ARG_REFRESH_MAP, ARG_STOP_SEARCH_URL, ARG_TIMEOUT_SECS, ARG_TTL_HOURS,
    CliError,
};

/// CLI arguments for the `reconcile` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Refresh the cached agency stops for each locality, match \
                 them by name against the cached map elements and write the \
                 matched groups as JSON. Options can come from CLI flags, \
                 configuration files, or environment variables.",
    about = "Reconcile agency stops with map elements"
)]
#[ortho_config(prefix = "STOPSYNC")]
pub(crate) struct ReconcileArgs {
    /// Locality to track; repeat for several. Defaults to the Stralsund area.
    #[arg(long = ARG_LOCALITY, value_name = "name")]
    #[serde(default)]
    pub(crate) locality: Option<Vec<String>>,
    /// Maximum age of a cached locality before it is fetched again.
    #[arg(long = ARG_TTL_HOURS, value_name = "hours")]
    #[serde(default)]
    pub(crate) ttl_hours: Option<u32>,
    /// Directory holding the cached snapshots.
    #[arg(long = ARG_CACHE_ROOT, value_name = "dir")]
    #[serde(default)]
    pub(crate) cache_root: Option<Utf8PathBuf>,
    /// Marker file preventing concurrent runs.
    #[arg(long = ARG_LOCK_FILE, value_name = "path")]
    #[serde(default)]
    pub(crate) lock_file: Option<Utf8PathBuf>,
    /// Stop search endpoint.
    #[arg(long = ARG_STOP_SEARCH_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) stop_search_url: Option<String>,
    /// Overpass interpreter endpoint.
    #[arg(long = ARG_OVERPASS_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) overpass_url: Option<String>,
    /// Timeout for each HTTP request.
    #[arg(long = ARG_TIMEOUT_SECS, value_name = "secs")]
    #[serde(default)]
    pub(crate) timeout_secs: Option<u64>,
    /// Report each unmatched map element once instead of once per stop.
    #[arg(long = ARG_DEDUPE_ORPHANS)]
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub(crate) dedupe_orphans: bool,
    /// Fetch a fresh map snapshot before matching.
    #[arg(long = ARG_REFRESH_MAP)]
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub(crate) refresh_map: bool,
    /// Write results to this file instead of stdout.
    #[arg(long = ARG_OUTPUT, value_name = "path")]
    #[serde(default)]
    pub(crate) output: Option<Utf8PathBuf>,
}

impl ReconcileArgs {
    pub(crate) fn into_config(self) -> Result<ReconcileConfig, CliError> {
        let merged = self.load_and_merge()?;
        ReconcileConfig::try_from(merged)
    }
}

/// Resolved `reconcile` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ReconcileConfig {
    /// Settings handed to the pipeline.
    pub(crate) pipeline: PipelineConfig,
    /// Stop search connection settings.
    pub(crate) stop_search: HttpSourceConfig,
    /// Overpass connection settings.
    pub(crate) overpass: HttpSourceConfig,
    /// Output file; `None` writes to stdout.
    pub(crate) output: Option<Utf8PathBuf>,
}

impl TryFrom<ReconcileArgs> for ReconcileConfig {
    type Error = CliError;

    fn try_from(args: ReconcileArgs) -> Result<Self, Self::Error> {
        let localities = args
            .locality
            .unwrap_or_else(|| DEFAULT_LOCALITIES.iter().map(|&name| name.to_owned()).collect());
        let cache_root = args
            .cache_root
            .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_CACHE_ROOT));
        let lock_file = args
            .lock_file
            .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_LOCK_PATH));
        let orphan_policy = if args.dedupe_orphans {
            OrphanPolicy::Deduplicated
        } else {
            OrphanPolicy::PerComparison
        };
        let pipeline = PipelineConfig::new(
            &localities,
            args.ttl_hours.unwrap_or(DEFAULT_TTL_HOURS),
            cache_root.into_std_path_buf(),
        )?
        .with_lock_path(lock_file.into_std_path_buf())
        .with_orphan_policy(orphan_policy)
        .with_map_refresh(args.refresh_map);

        let timeout = Duration::from_secs(args.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
        let stop_search = HttpSourceConfig::new(
            args.stop_search_url
                .unwrap_or_else(|| DEFAULT_STOP_SEARCH_URL.to_owned()),
        )
        .with_timeout(timeout);
        let overpass = HttpSourceConfig::new(
            args.overpass_url
                .unwrap_or_else(|| DEFAULT_OVERPASS_URL.to_owned()),
        )
        .with_timeout(timeout);

        Ok(Self {
            pipeline,
            stop_search,
            overpass,
            output: args.output,
        })
    }
}

/// Builds the remote collaborators for a run.
pub(crate) trait SourceFactory {
    fn stop_source(&self, config: &ReconcileConfig) -> Result<Box<dyn StopSource>, CliError>;
    fn map_source(&self, config: &ReconcileConfig) -> Result<Box<dyn MapSource>, CliError>;
}

pub(crate) struct HttpSourceFactory;

impl SourceFactory for HttpSourceFactory {
    fn stop_source(&self, config: &ReconcileConfig) -> Result<Box<dyn StopSource>, CliError> {
        let source = HttpStopSource::with_config(&config.stop_search).map_err(|source| {
            CliError::BuildSource {
                role: "stop search",
                base_url: config.stop_search.base_url.clone(),
                source,
            }
        })?;
        Ok(Box::new(source))
    }

    fn map_source(&self, config: &ReconcileConfig) -> Result<Box<dyn MapSource>, CliError> {
        let source =
            HttpMapSource::with_config(&config.overpass).map_err(|source| CliError::BuildSource {
                role: "overpass",
                base_url: config.overpass.base_url.clone(),
                source,
            })?;
        Ok(Box::new(source))
    }
}

/// The JSON document handed to the result sink.
#[derive(Debug, Serialize)]
pub(crate) struct ResultDocument<'a> {
    pub(crate) generated_at: DateTime<Utc>,
    pub(crate) map_provenance: &'a MapProvenance,
    pub(crate) groups: &'a [MatchedGroup],
}

impl<'a> ResultDocument<'a> {
    pub(crate) fn new(report: &'a PipelineReport, generated_at: DateTime<Utc>) -> Self {
        Self {
            generated_at,
            map_provenance: report.map.provenance(),
            groups: &report.groups,
        }
    }
}

pub(crate) fn run_reconcile(args: ReconcileArgs) -> Result<(), CliError> {
    let started = Instant::now();
    let mut stdout = std::io::stdout().lock();
    let outcome = run_reconcile_with(args, &HttpSourceFactory, &mut stdout, Utc::now());
    debug!("reconcile finished in {:?}", started.elapsed());
    outcome
}

pub(crate) fn run_reconcile_with(
    args: ReconcileArgs,
    factory: &dyn SourceFactory,
    writer: &mut dyn Write,
    now: DateTime<Utc>,
) -> Result<(), CliError> {
    let config = args.into_config()?;
    let report = execute_reconcile(&config, factory, now)?;
    write_results(&config, writer, &ResultDocument::new(&report, now))
}

pub(crate) fn execute_reconcile(
    config: &ReconcileConfig,
    factory: &dyn SourceFactory,
    now: DateTime<Utc>,
) -> Result<PipelineReport, CliError> {
    let stop_source = factory.stop_source(config)?;
    let map_source = if config.pipeline.refresh_map() {
        Some(factory.map_source(config)?)
    } else {
        None
    };
    run_pipeline(&config.pipeline, stop_source.as_ref(), map_source.as_deref(), now).map_err(
        |err| {
            if let PipelineError::GuardRelease {
                run_error: Some(run_error),
                ..
            } = &err
            {
                error!("the run had already failed: {run_error}");
            }
            CliError::from(err)
        },
    )
}

fn write_results(
    config: &ReconcileConfig,
    writer: &mut dyn Write,
    document: &ResultDocument<'_>,
) -> Result<(), CliError> {
    let mut payload = serde_json::to_vec_pretty(document).map_err(CliError::SerialiseOutput)?;
    payload.push(b'\n');
    match &config.output {
        Some(path) => {
            stopsync_fs::replace_file(path, &payload).map_err(|source| CliError::WriteOutput {
                target: path.to_string(),
                source,
            })
        }
        None => writer
            .write_all(&payload)
            .and_then(|()| writer.flush())
            .map_err(|source| CliError::WriteOutput {
                target: "stdout".to_owned(),
                source,
            }),
    }
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<ReconcileConfig, CliError> {
    let merged = ReconcileArgs::merge_from_layers(layers)?;
    ReconcileConfig::try_from(merged)
}
