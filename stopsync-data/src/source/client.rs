//! Blocking HTTP client shared by the stop and map sources.
//!
//! The collaborator traits are synchronous, so requests are driven on a Tokio
//! runtime owned by the client. When called from inside a multi-threaded
//! runtime the caller's handle is used through
//! [`tokio::task::block_in_place`]; otherwise the owned current-thread runtime
//! runs the request.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use stopsync_core::FetchError;
use thiserror::Error;
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};
use url::Url;

/// Default user agent for outbound requests.
pub const DEFAULT_USER_AGENT: &str = concat!("stopsync/", env!("CARGO_PKG_VERSION"));

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Errors raised while constructing an HTTP source.
#[derive(Debug, Error)]
pub enum SourceBuildError {
    /// The configured base URL does not parse.
    #[error("invalid base URL {url:?}: {source}")]
    InvalidUrl {
        /// Rejected URL.
        url: String,
        /// Parser failure.
        #[source]
        source: url::ParseError,
    },
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
    /// Failed to build the Tokio runtime.
    #[error("failed to build Tokio runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Connection settings for an HTTP source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSourceConfig {
    /// Endpoint URL; request parameters are appended to it.
    pub base_url: String,
    /// Request timeout covering connect and body transfer.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl HttpSourceConfig {
    /// Create a configuration for `base_url` with default timeout and agent.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

pub(crate) struct BlockingClient {
    client: Client,
    base_url: Url,
    timeout: Duration,
    runtime: Runtime,
}

impl std::fmt::Debug for BlockingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingClient")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .field("runtime", &"<tokio::runtime::Runtime>")
            .finish_non_exhaustive()
    }
}

impl BlockingClient {
    pub(crate) fn new(config: &HttpSourceConfig) -> Result<Self, SourceBuildError> {
        let base_url =
            Url::parse(&config.base_url).map_err(|source| SourceBuildError::InvalidUrl {
                url: config.base_url.clone(),
                source,
            })?;
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()
            .map_err(SourceBuildError::HttpClient)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(SourceBuildError::Runtime)?;
        Ok(Self {
            client,
            base_url,
            timeout: config.timeout,
            runtime,
        })
    }

    /// Base URL with a single query parameter appended.
    pub(crate) fn url_with(&self, key: &str, value: &str) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut().append_pair(key, value);
        url
    }

    /// Fetch `url` and decode the body as JSON, blocking the caller.
    pub(crate) fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T, FetchError> {
        let future = self.fetch_json(url);
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(future))
            }
            _ => self.runtime.block_on(future),
        }
    }

    async fn fetch_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, url))?
            .error_for_status()
            .map_err(|err| self.convert_reqwest_error(&err, url))?;
        let body = response
            .bytes()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, url))?;
        serde_json::from_slice(&body).map_err(|err| FetchError::Parse {
            url: url.to_string(),
            message: err.to_string(),
        })
    }

    fn convert_reqwest_error(&self, error: &reqwest::Error, url: &Url) -> FetchError {
        if error.is_timeout() {
            return FetchError::Timeout {
                url: url.to_string(),
                timeout_secs: self.timeout.as_secs(),
            };
        }
        if let Some(status) = error.status() {
            return FetchError::Http {
                url: url.to_string(),
                status: status.as_u16(),
                message: error.to_string(),
            };
        }
        FetchError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn config_builder_pattern() {
        let config = HttpSourceConfig::new("https://example.com/search")
            .with_timeout(Duration::from_secs(3))
            .with_user_agent("test-agent/1.0");

        assert_eq!(config.base_url, "https://example.com/search");
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.user_agent, "test-agent/1.0");
    }

    #[rstest]
    fn default_timeout_is_ten_seconds() {
        let config = HttpSourceConfig::new("https://example.com");
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[rstest]
    #[case("not a url")]
    #[case("")]
    fn rejects_unparseable_base_url(#[case] base_url: &str) {
        let err = BlockingClient::new(&HttpSourceConfig::new(base_url)).expect_err("invalid url");
        assert!(matches!(err, SourceBuildError::InvalidUrl { .. }));
    }

    #[rstest]
    fn url_with_encodes_parameter() {
        let client = BlockingClient::new(&HttpSourceConfig::new("https://example.com/s.php"))
            .expect("client should build");

        let url = client.url_with("query", "Altefähr Markt");

        assert_eq!(
            url.as_str(),
            "https://example.com/s.php?query=Altef%C3%A4hr+Markt"
        );
    }

    #[rstest]
    fn unreachable_host_maps_to_network_or_timeout() {
        let config = HttpSourceConfig::new("http://127.0.0.1:9/")
            .with_timeout(Duration::from_millis(500));
        let client = BlockingClient::new(&config).expect("client should build");

        let err = client
            .get_json::<serde_json::Value>(&client.url_with("query", "x"))
            .expect_err("nothing listens on the discard port");

        assert!(matches!(
            err,
            FetchError::Network { .. } | FetchError::Timeout { .. }
        ));
    }
}
