//! Run orchestration.
//!
//! # Responsibilities
//! - Wire settings, manifest loader and prober together
//! - Probe all mirrors with a bounded number in flight
//! - Collect verdicts keyed by mirror name
//!
//! # Design Decisions
//! - Probes are interleaved on the current task (`buffer_unordered`), not
//!   spawned: they only wait on the network and share everything read-only
//! - Completion order is arbitrary; callers key results by name

use std::path::PathBuf;

use futures_util::stream::{self, StreamExt};

use crate::config::{CheckerConfig, ConfigError};
use crate::manifest::{default_manifest_path, GlobalManifest, ManifestLoader, MirrorDescriptor};
use crate::probe::{CheckClient, HttpCheckClient, ProbeResult, Prober};

/// Probe every mirror, at most `concurrency` at a time.
pub async fn check_mirrors<C: CheckClient>(
    prober: &Prober<C>,
    manifest: &GlobalManifest,
    mirrors: &[MirrorDescriptor],
    concurrency: usize,
) -> Vec<ProbeResult> {
    stream::iter(mirrors)
        .map(|mirror| prober.probe_with_manifest(mirror, manifest))
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await
}

/// Resolve the manifest path from settings or the environment.
pub fn manifest_path(config: &CheckerConfig) -> PathBuf {
    config
        .manifest_path
        .clone()
        .unwrap_or_else(default_manifest_path)
}

/// Load everything and probe every valid mirror once.
///
/// Fails only when the manifest (or a configured schema) is unusable; bad
/// descriptors are skipped.
pub async fn run(config: &CheckerConfig) -> Result<Vec<ProbeResult>, ConfigError> {
    let loader = ManifestLoader::new(&config.loader, reqwest::Client::new())?;

    let path = manifest_path(config);
    let manifest = loader.load_global_manifest(&path).map_err(|e| {
        tracing::error!(path = %path.display(), error = %e, "Main config of the mirror service is invalid");
        e
    })?;

    let mirrors_dir = config
        .mirrors_dir
        .clone()
        .unwrap_or_else(|| manifest.mirrors_dir.clone());
    let mirrors = loader.discover_mirrors(&mirrors_dir).await;

    let prober = Prober::new(HttpCheckClient::new(&config.probe)?, &config.probe);

    tracing::info!(
        mirrors = mirrors.len(),
        concurrency = config.probe.concurrency,
        "Checking mirrors"
    );
    let results = check_mirrors(&prober, &manifest, &mirrors, config.probe.concurrency).await;

    let available = results.iter().filter(|r| r.available).count();
    tracing::info!(
        mirrors = mirrors.len(),
        available,
        unavailable = results.len() - available,
        "Mirror check finished"
    );
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProbeConfig;
    use crate::manifest::{ProtocolType, RepoDescriptor};
    use crate::probe::prober::tests::{mirror, MockCheckClient};
    use crate::probe::FetchError;
    use reqwest::StatusCode;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn manifest() -> GlobalManifest {
        GlobalManifest {
            allowed_outdate: "12 hours".to_string(),
            mirrors_dir: "/srv/mirrors".into(),
            versions: vec!["9".to_string()],
            duplicated_versions: Default::default(),
            arches: vec!["x86_64".to_string()],
            required_protocols: vec![ProtocolType::Https],
            repos: vec![RepoDescriptor {
                name: "baseos".to_string(),
                path: "$basearch/baseos".to_string(),
                arches: vec![],
                versions: vec![],
            }],
        }
    }

    /// Counts how many requests are in flight at once.
    struct GaugeClient {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl CheckClient for GaugeClient {
        async fn fetch_status(&self, url: &str) -> Result<StatusCode, FetchError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(30)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if url.contains("down") {
                Ok(StatusCode::NOT_FOUND)
            } else {
                Ok(StatusCode::OK)
            }
        }
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let client = GaugeClient {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        };
        let prober = Prober::new(client, &ProbeConfig::default());
        let mirrors: Vec<_> = (0..6)
            .map(|i| {
                let url = if i % 3 == 0 {
                    format!("https://down{}.example.com", i)
                } else {
                    format!("https://up{}.example.com", i)
                };
                mirror(&format!("mirror{}", i), &[(ProtocolType::Https, url.as_str())])
            })
            .collect();

        let results = check_mirrors(&prober, &manifest(), &mirrors, 2).await;

        assert_eq!(results.len(), 6);
        assert_eq!(prober.client().peak.load(Ordering::SeqCst), 2);
        let verdicts: HashMap<String, bool> =
            results.into_iter().map(|r| (r.name, r.available)).collect();
        assert_eq!(verdicts["mirror0"], false);
        assert_eq!(verdicts["mirror1"], true);
        assert_eq!(verdicts["mirror3"], false);
        assert_eq!(verdicts["mirror5"], true);
    }

    #[tokio::test]
    async fn test_zero_concurrency_still_progresses() {
        let prober = Prober::new(MockCheckClient::default(), &ProbeConfig::default());
        let mirrors = vec![mirror("a", &[(ProtocolType::Https, "https://a.example.com")])];

        let results = check_mirrors(&prober, &manifest(), &mirrors, 0).await;
        assert_eq!(results, vec![ProbeResult { name: "a".to_string(), available: true }]);
    }

    #[tokio::test]
    async fn test_run_fails_on_missing_manifest() {
        let config = CheckerConfig {
            manifest_path: Some("/nonexistent/config.yml".into()),
            ..CheckerConfig::default()
        };
        assert!(matches!(run(&config).await, Err(ConfigError::Io { .. })));
    }
}
