//! Stop search service client.

use log::debug;
use stopsync_core::{FetchError, StopRecord, StopSource};

use super::client::{BlockingClient, HttpSourceConfig, SourceBuildError};

/// Default stop search endpoint.
pub const DEFAULT_STOP_SEARCH_URL: &str = "https://vvr.verbindungssuche.de/fpl/suhast.php";

const QUERY_PARAM: &str = "query";

/// [`StopSource`] backed by the agency's stop search endpoint.
///
/// The locality is passed as the `query` parameter and the response is a
/// JSON array of `{id, value, label}` objects.
///
/// # Examples
/// ```no_run
/// use stopsync_core::StopSource;
/// use stopsync_data::{DEFAULT_STOP_SEARCH_URL, HttpStopSource};
///
/// let source = HttpStopSource::new(DEFAULT_STOP_SEARCH_URL)?;
/// let stops = source.fetch_stops("Parow")?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct HttpStopSource {
    client: BlockingClient,
}

impl HttpStopSource {
    /// Create a source for `base_url` with default settings.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, SourceBuildError> {
        Self::with_config(&HttpSourceConfig::new(base_url))
    }

    /// Create a source from explicit settings.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the client cannot be built.
    pub fn with_config(config: &HttpSourceConfig) -> Result<Self, SourceBuildError> {
        Ok(Self {
            client: BlockingClient::new(config)?,
        })
    }
}

impl StopSource for HttpStopSource {
    fn fetch_stops(&self, locality: &str) -> Result<Vec<StopRecord>, FetchError> {
        let url = self.client.url_with(QUERY_PARAM, locality);
        debug!("requesting stops for {locality} from {url}");
        self.client.get_json(&url)
    }
}
