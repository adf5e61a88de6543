//! Error types emitted by the stopsync CLI.

use std::sync::Arc;

use stopsync_core::ConfigError;
use stopsync_data::{PipelineError, SourceBuildError};
use thiserror::Error;

/// Exit status for a completed run or an answered `--help`/`--version`.
pub const EXIT_SUCCESS: i32 = 0;

/// Exit status for ordinary failures.
pub const EXIT_FAILURE: i32 = 1;

/// Exit status when the run marker could not be removed.
pub const EXIT_MARKER_STUCK: i32 = 2;

/// Errors emitted by the stopsync CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// The merged configuration is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
    /// A logger was already installed.
    #[error("failed to initialise logging: {0}")]
    Logging(#[from] log::SetLoggerError),
    /// Constructing an HTTP source failed.
    #[error("failed to build {role} source for {base_url:?}: {source}")]
    BuildSource {
        /// Which collaborator was being built.
        role: &'static str,
        /// Configured endpoint.
        base_url: String,
        /// Construction failure.
        #[source]
        source: SourceBuildError,
    },
    /// The pipeline run failed.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    /// Serialising the result document failed.
    #[error("failed to serialise results: {0}")]
    SerialiseOutput(#[source] serde_json::Error),
    /// Writing the result document failed.
    #[error("failed to write results to {target}: {source}")]
    WriteOutput {
        /// Output file, or `stdout`.
        target: String,
        /// Underlying IO failure.
        #[source]
        source: std::io::Error,
    },
}

impl CliError {
    /// Process exit status for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::ArgumentParsing(err) if !err.use_stderr() => EXIT_SUCCESS,
            Self::Pipeline(PipelineError::GuardRelease { .. }) => EXIT_MARKER_STUCK,
            _ => EXIT_FAILURE,
        }
    }
}
