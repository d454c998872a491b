//! Resolution of mirror subnet lists.
//!
//! A descriptor either lists its network ranges inline or points at a URL
//! serving a JSON array of them. The list is advisory: a failed fetch leaves
//! the mirror with no subnets and never affects its availability.

use std::net::IpAddr;
use std::time::Duration;

use ipnet::IpNet;
use reqwest::StatusCode;
use thiserror::Error;

/// Why a remote subnet list could not be used.
#[derive(Debug, Error)]
pub enum SubnetError {
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(StatusCode),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("response is not a JSON array of strings: {0}")]
    Body(#[source] reqwest::Error),

    #[error("\"{0}\" is not a network range")]
    Entry(String),
}

/// Parse a CIDR range; a bare address becomes a single-host range.
pub fn parse_subnet(entry: &str) -> Option<IpNet> {
    let entry = entry.trim();
    if let Ok(net) = entry.parse::<IpNet>() {
        return Some(net);
    }
    let addr = entry.parse::<IpAddr>().ok()?;
    let prefix = if addr.is_ipv4() { 32 } else { 128 };
    IpNet::new(addr, prefix).ok()
}

/// Parse every entry, failing on the first one that is not a range.
pub fn parse_subnets<S: AsRef<str>>(entries: &[S]) -> Result<Vec<IpNet>, SubnetError> {
    entries
        .iter()
        .map(|entry| {
            parse_subnet(entry.as_ref()).ok_or_else(|| SubnetError::Entry(entry.as_ref().to_string()))
        })
        .collect()
}

/// Fetches remote subnet lists over a shared HTTP client.
#[derive(Debug, Clone)]
pub struct SubnetResolver {
    client: reqwest::Client,
    timeout: Duration,
}

impl SubnetResolver {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Fetch the subnets of `mirror` from `url`. Any failure is logged and
    /// resolves to an empty list.
    pub async fn resolve(&self, mirror: &str, url: &str) -> Vec<IpNet> {
        match self.fetch(url).await {
            Ok(subnets) => {
                tracing::debug!(mirror = %mirror, url = %url, count = subnets.len(), "Resolved mirror subnets");
                subnets
            }
            Err(e) => {
                tracing::error!(
                    mirror = %mirror,
                    url = %url,
                    error = %e,
                    "Cannot get subnets of mirror \"{}\" by url \"{}\"",
                    mirror,
                    url
                );
                Vec::new()
            }
        }
    }

    async fn fetch(&self, url: &str) -> Result<Vec<IpNet>, SubnetError> {
        let request = async {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(SubnetError::Transport)?;
            if !response.status().is_success() {
                return Err(SubnetError::Status(response.status()));
            }
            let entries: Vec<String> = response.json().await.map_err(SubnetError::Body)?;
            parse_subnets(&entries)
        };

        tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| SubnetError::Timeout(self.timeout))?
    }
}
