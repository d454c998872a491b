//! Availability probing of a single mirror.
//!
//! # Responsibilities
//! - Exempt private and always-available mirrors
//! - Choose the mirror address to probe
//! - Request the repository index of every required (version, repo) pair
//! - Reduce the results to one verdict, stopping at the first failure

use std::collections::HashSet;
use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ProbeConfig, ProtocolPolicy};
use crate::manifest::model::ARCH_PLACEHOLDER;
use crate::manifest::{GlobalManifest, MirrorDescriptor, ProtocolType, RepoDescriptor};
use crate::observability::metrics;
use crate::probe::client::{CheckClient, FetchError};
use crate::probe::selection::{select_protocol, ProtocolSelection};

/// Index file whose presence certifies a repository snapshot.
pub const REPO_INDEX_SUFFIX: &str = "repodata/repomd.xml";

/// Verdict for one mirror.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub name: String,
    pub available: bool,
}

impl ProbeResult {
    fn new(name: &str, available: bool) -> Self {
        Self {
            name: name.to_string(),
            available,
        }
    }
}

/// Why a probe ended unavailable. Only ever logged; callers see a bool.
#[derive(Debug, Error)]
pub enum CheckFailure {
    #[error("no address with protocols {required:?}")]
    NoMatchingProtocol { required: Vec<ProtocolType> },

    #[error("version \"{version}\" repo path \"{repo_path}\" answered {status} at {url}")]
    Status {
        version: String,
        repo_path: String,
        url: String,
        status: StatusCode,
    },

    #[error("version \"{version}\" repo path \"{repo_path}\" is not available at {url}: {source}")]
    Request {
        version: String,
        repo_path: String,
        url: String,
        #[source]
        source: FetchError,
    },
}

/// Join the mirror base, version and repo path into the index URL.
pub fn check_url(base_url: &str, version: &str, repo_path: &str) -> String {
    format!(
        "{}/{}/{}/{}",
        base_url.trim_end_matches('/'),
        version.trim_matches('/'),
        repo_path.trim_matches('/'),
        REPO_INDEX_SUFFIX
    )
}

/// Substitute the first effective arch into the repo path template.
///
/// Only one arch is checked per repo.
pub fn repo_check_path(repo: &RepoDescriptor, default_arches: &[String]) -> String {
    match repo.effective_arches(default_arches).first() {
        Some(arch) => repo.path.replace(ARCH_PLACEHOLDER, arch),
        None => repo.path.clone(),
    }
}

/// Decides whether mirrors serve everything the manifest requires.
pub struct Prober<C> {
    client: C,
    timeout: Duration,
    policy: ProtocolPolicy,
    always_available: HashSet<String>,
}

impl<C: CheckClient> Prober<C> {
    pub fn new(client: C, config: &ProbeConfig) -> Self {
        Self {
            client,
            timeout: config.timeout(),
            policy: config.protocol_policy,
            always_available: config.always_available.iter().cloned().collect(),
        }
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Probe `mirror` against the manifest's requirements.
    pub async fn probe_with_manifest(
        &self,
        mirror: &MirrorDescriptor,
        manifest: &GlobalManifest,
    ) -> ProbeResult {
        self.probe(
            mirror,
            &manifest.versions,
            &manifest.repos,
            &manifest.arches,
            &manifest.required_protocols,
        )
        .await
    }

    /// Check one mirror.
    ///
    /// `arches` is the default list for repos that declare none.
    pub async fn probe(
        &self,
        mirror: &MirrorDescriptor,
        versions: &[String],
        repos: &[RepoDescriptor],
        arches: &[String],
        required_protocols: &[ProtocolType],
    ) -> ProbeResult {
        tracing::info!(mirror = %mirror.name, "Checking mirror \"{}\"...", mirror.name);

        if mirror.private || self.always_available.contains(&mirror.name) {
            tracing::info!(
                mirror = %mirror.name,
                "Mirror \"{}\" is private or in exclusion list and won't be checked",
                mirror.name
            );
            metrics::record_probe_result(true);
            return ProbeResult::new(&mirror.name, true);
        }

        let available = match self
            .check(mirror, versions, repos, arches, required_protocols)
            .await
        {
            Ok(()) => {
                tracing::info!(mirror = %mirror.name, "Mirror \"{}\" is available", mirror.name);
                true
            }
            Err(failure) => {
                tracing::error!(
                    mirror = %mirror.name,
                    error = %failure,
                    "Mirror \"{}\" is not available",
                    mirror.name
                );
                false
            }
        };

        metrics::record_probe_result(available);
        ProbeResult::new(&mirror.name, available)
    }

    async fn check(
        &self,
        mirror: &MirrorDescriptor,
        versions: &[String],
        repos: &[RepoDescriptor],
        arches: &[String],
        required_protocols: &[ProtocolType],
    ) -> Result<(), CheckFailure> {
        let (protocol, base_url) = match select_protocol(mirror, required_protocols, self.policy) {
            ProtocolSelection::Selected { protocol, url } => (protocol, url),
            ProtocolSelection::NoMatchingProtocol => {
                return Err(CheckFailure::NoMatchingProtocol {
                    required: required_protocols.to_vec(),
                })
            }
        };
        tracing::debug!(mirror = %mirror.name, protocol = %protocol, url = %base_url, "Selected mirror address");

        for version in versions {
            for repo in repos.iter().filter(|repo| repo.applies_to(version)) {
                let repo_path = repo_check_path(repo, arches);
                let url = check_url(base_url, version, &repo_path);

                let outcome = tokio::time::timeout(self.timeout, self.client.fetch_status(&url)).await;
                let status = match outcome {
                    Ok(Ok(status)) => status,
                    Ok(Err(source)) => {
                        return Err(CheckFailure::Request {
                            version: version.clone(),
                            repo_path,
                            url,
                            source,
                        })
                    }
                    Err(_) => {
                        return Err(CheckFailure::Request {
                            version: version.clone(),
                            repo_path,
                            url,
                            source: FetchError::Timeout,
                        })
                    }
                };

                if status != StatusCode::OK {
                    return Err(CheckFailure::Status {
                        version: version.clone(),
                        repo_path,
                        url,
                        status,
                    });
                }
                tracing::debug!(mirror = %mirror.name, url = %url, "Repository index found");
            }
        }

        Ok(())
    }
}
