//! Command-line interface for reconciling agency bus stops with map data.
#![forbid(unsafe_code)]

use std::ffi::OsString;

use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use log::LevelFilter;

mod error;
mod reconcile;

pub use error::{CliError, EXIT_FAILURE, EXIT_MARKER_STUCK, EXIT_SUCCESS};

pub(crate) const ARG_LOCALITY: &str = "locality";
pub(crate) const ARG_TTL_HOURS: &str = "ttl-hours";
pub(crate) const ARG_CACHE_ROOT: &str = "cache-root";
pub(crate) const ARG_LOCK_FILE: &str = "lock-file";
pub(crate) const ARG_STOP_SEARCH_URL: &str = "stop-search-url";
pub(crate) const ARG_OVERPASS_URL: &str = "overpass-url";
pub(crate) const ARG_TIMEOUT_SECS: &str = "timeout-secs";
pub(crate) const ARG_DEDUPE_ORPHANS: &str = "dedupe-orphans";
pub(crate) const ARG_REFRESH_MAP: &str = "refresh-map";
pub(crate) const ARG_OUTPUT: &str = "output";

/// Run the stopsync CLI with the current process arguments and environment.
///
/// # Errors
/// Returns a [`CliError`]; [`CliError::exit_code`] maps it to a process
/// exit status.
pub fn run() -> Result<(), CliError> {
    let Some(cli) = parse_args(std::env::args_os())? else {
        return Ok(());
    };
    init_logging(cli.log_level())?;
    match cli.command {
        Command::Reconcile(args) => reconcile::run_reconcile(args),
    }
}

/// Parse `args`, answering `--help` and `--version` on stdout.
///
/// Returns `None` when the request was informational and nothing should run.
fn parse_args<I, T>(args: I) -> Result<Option<Cli>, CliError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match Cli::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) if is_informational(err.kind()) => {
            err.print().map_err(|source| CliError::WriteOutput {
                target: "stdout".to_owned(),
                source,
            })?;
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

const fn is_informational(kind: ErrorKind) -> bool {
    matches!(kind, ErrorKind::DisplayHelp | ErrorKind::DisplayVersion)
}

fn init_logging(level: LevelFilter) -> Result<(), CliError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level.as_str()))
        .try_init()?;
    Ok(())
}

#[derive(Debug, Parser)]
#[command(
    name = "stopsync",
    about = "Compare transit-agency bus stops with OpenStreetMap",
    version
)]
struct Cli {
    /// Log progress at info level.
    #[arg(short = 'v', long, global = true)]
    verbose: bool,
    /// Log diagnostics at debug level; implies --verbose.
    #[arg(short = 'd', long, global = true)]
    debug: bool,
    #[command(subcommand)]
    command: Command,
}

impl Cli {
    const fn log_level(&self) -> LevelFilter {
        if self.debug {
            LevelFilter::Debug
        } else if self.verbose {
            LevelFilter::Info
        } else {
            LevelFilter::Warn
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Refresh cached stops and match them against map elements.
    Reconcile(reconcile::ReconcileArgs),
}

#[cfg(test)]
mod tests;
