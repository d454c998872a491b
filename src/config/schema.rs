//! Service settings definitions.
//!
//! This module defines the tunables of the checker itself (timeouts, pool size,
//! request headers, schema locations). The mirror manifest and descriptors are
//! modelled separately in `crate::manifest`.
//! All types derive Serde traits for deserialization from a TOML file.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root settings for the mirror checker.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CheckerConfig {
    /// Path to the global manifest. Falls back to `$CONFIG_ROOT/mirrors/updates/config.yml`.
    pub manifest_path: Option<PathBuf>,

    /// Overrides the `mirrors_dir` declared by the manifest.
    pub mirrors_dir: Option<PathBuf>,

    /// Availability probe settings.
    pub probe: ProbeConfig,

    /// Manifest and descriptor loading settings.
    pub loader: LoaderConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// How a mirror's address is chosen among the acceptable protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ProtocolPolicy {
    /// Walk `required_protocols` in declared order and take the first one the
    /// mirror publishes an address for.
    #[default]
    ManifestPriority,
    /// Walk the mirror's addresses in document order and take the first whose
    /// protocol is acceptable.
    DescriptorOrder,
}

/// Probe configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Maximum number of mirrors probed at the same time.
    pub concurrency: usize,

    /// Protocol selection policy.
    pub protocol_policy: ProtocolPolicy,

    /// Mirror names reported available without any network check.
    pub always_available: Vec<String>,

    /// Headers sent with every probe request.
    pub headers: BTreeMap<String, String>,
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            concurrency: 15,
            protocol_policy: ProtocolPolicy::default(),
            always_available: vec!["repo.almalinux.org".to_string()],
            headers: default_headers(),
        }
    }
}

/// Browser-like header set. Some mirrors refuse obvious non-browser clients.
pub fn default_headers() -> BTreeMap<String, String> {
    [
        (
            "User-Agent",
            "Mozilla/5.0 (Windows NT 6.1; WOW64) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/56.0.2924.76 Safari/537.36",
        ),
        ("Upgrade-Insecure-Requests", "1"),
        ("DNT", "1"),
        (
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        ),
        ("Accept-Language", "en-US,en;q=0.5"),
        ("Accept-Encoding", "gzip, deflate"),
    ]
    .into_iter()
    .map(|(name, value)| (name.to_string(), value.to_string()))
    .collect()
}

/// Loader configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// File extension (without the dot) of mirror descriptor files.
    pub descriptor_extension: String,

    /// Timeout in seconds for fetching a remote subnet list.
    pub subnet_fetch_timeout_secs: u64,

    /// Optional replacement for the built-in manifest schema.
    pub manifest_schema: Option<PathBuf>,

    /// Optional replacement for the built-in mirror descriptor schema.
    pub mirror_schema: Option<PathBuf>,
}

impl LoaderConfig {
    pub fn subnet_fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.subnet_fetch_timeout_secs)
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            descriptor_extension: "yml".to_string(),
            subnet_fetch_timeout_secs: 30,
            manifest_schema: None,
            mirror_schema: None,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus exporter. It is only scrapeable while a run is
    /// in progress.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
