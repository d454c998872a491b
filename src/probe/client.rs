//! HTTP client abstraction for probe requests.
//!
//! The prober only needs the status code of a GET. Hiding the client behind a
//! trait lets tests count and script requests without a network.

use std::future::Future;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;
use thiserror::Error;

use crate::config::{ConfigError, ProbeConfig};

/// Transport-level failure of a probe request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("{0}")]
    Transport(String),
}

/// Issues probe GET requests.
pub trait CheckClient: Send + Sync {
    /// GET `url` and return the response status.
    fn fetch_status(&self, url: &str) -> impl Future<Output = Result<StatusCode, FetchError>> + Send;
}

/// Build the header map sent with every probe request.
pub fn build_headers<'a, I>(headers: I) -> Result<HeaderMap, ConfigError>
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ConfigError::Validation(format!("invalid header name `{}`: {}", name, e)))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|e| ConfigError::Validation(format!("invalid value for header `{}`: {}", name, e)))?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

/// Real client implementation using reqwest.
///
/// Cloning is cheap and shares the connection pool.
#[derive(Debug, Clone)]
pub struct HttpCheckClient {
    client: reqwest::Client,
}

impl HttpCheckClient {
    /// Create a client sending the configured headers, with the probe timeout
    /// applied at the transport level as well.
    pub fn new(config: &ProbeConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .default_headers(build_headers(&config.headers)?)
            .timeout(config.timeout())
            .build()
            .map_err(|e| ConfigError::Validation(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl CheckClient for HttpCheckClient {
    async fn fetch_status(&self, url: &str) -> Result<StatusCode, FetchError> {
        match self.client.get(url).send().await {
            Ok(response) => Ok(response.status()),
            Err(e) if e.is_timeout() => Err(FetchError::Timeout),
            Err(e) => Err(FetchError::Transport(e.to_string())),
        }
    }
}
