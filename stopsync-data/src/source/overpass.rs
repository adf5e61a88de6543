//! Overpass interpreter client and query construction.

use log::{debug, info};
use stopsync_core::{FetchError, MapSnapshot, MapSource};

use super::client::{BlockingClient, HttpSourceConfig, SourceBuildError};

/// Default Overpass interpreter endpoint.
pub const DEFAULT_OVERPASS_URL: &str = "http://overpass-api.de/api/interpreter";

const DATA_PARAM: &str = "data";

const QUERY_PREFIX: &str =
    "[out:json][timeout:600];area[boundary=administrative][admin_level=8][name~'(";

const QUERY_SUFFIX: &str = concat!(
    ")']->.searchArea;(",
    r#"nw["highway"="bus_stop"](area.searchArea);"#,
    r#"node["public_transport"="stop_position"](area.searchArea);"#,
    ");out;"
);

/// Build the Overpass QL query selecting bus stops inside `localities`.
///
/// Localities are matched against level-8 administrative area names through
/// a single alternation; names are inserted verbatim.
///
/// # Examples
/// ```
/// use stopsync_data::overpass_query;
///
/// let query = overpass_query(&["Parow".to_owned(), "Prohn".to_owned()]);
/// assert!(query.contains("[name~'(Parow|Prohn)']"));
/// ```
#[must_use]
pub fn overpass_query(localities: &[String]) -> String {
    format!("{QUERY_PREFIX}{}{QUERY_SUFFIX}", localities.join("|"))
}

/// [`MapSource`] backed by an Overpass API interpreter.
#[derive(Debug)]
pub struct HttpMapSource {
    client: BlockingClient,
}

impl HttpMapSource {
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

impl MapSource for HttpMapSource {
    fn fetch_map(&self, localities: &[String]) -> Result<MapSnapshot, FetchError> {
        let url = self.client.url_with(DATA_PARAM, &overpass_query(localities));
        debug!("requesting map elements for {} localities", localities.len());
        let snapshot: MapSnapshot = self.client.get_json(&url)?;
        let provenance = snapshot.provenance();
        info!(
            "fetched {} map elements (osm base {:?}, areas base {:?})",
            snapshot.elements.len(),
            provenance.timestamp_osm_base,
            provenance.timestamp_areas_base
        );
        Ok(snapshot)
    }
}
