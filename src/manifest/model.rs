//! Typed manifest and mirror descriptor model.
//!
//! Raw documents are deserialized into the `*Document` types after schema
//! validation, then converted into the public types. Conversion is where the
//! cross-referential invariants are enforced.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::ConfigError;

/// Token in a repo path replaced by a concrete architecture at check time.
pub const ARCH_PLACEHOLDER: &str = "$basearch";

/// Network protocol a mirror address is reachable by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolType {
    Http,
    Https,
    Rsync,
}

impl ProtocolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolType::Http => "http",
            ProtocolType::Https => "https",
            ProtocolType::Rsync => "rsync",
        }
    }
}

impl fmt::Display for ProtocolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProtocolType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "http" => Ok(ProtocolType::Http),
            "https" => Ok(ProtocolType::Https),
            "rsync" => Ok(ProtocolType::Rsync),
            _ => Err(format!("Unknown protocol type: {}", s)),
        }
    }
}

/// Service-wide requirements every mirror is checked against.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalManifest {
    /// Staleness tolerance, passed through untouched.
    pub allowed_outdate: String,
    pub mirrors_dir: PathBuf,
    pub versions: Vec<String>,
    pub duplicated_versions: BTreeMap<String, String>,
    pub arches: Vec<String>,
    pub required_protocols: Vec<ProtocolType>,
    pub repos: Vec<RepoDescriptor>,
}

/// One named content set a mirror has to carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoDescriptor {
    pub name: String,
    /// Path template containing [`ARCH_PLACEHOLDER`].
    pub path: String,
    /// Empty means the default arch list of the check applies.
    pub arches: Vec<String>,
    /// Empty means the repo applies to every version.
    pub versions: Vec<String>,
}

impl RepoDescriptor {
    pub fn applies_to(&self, version: &str) -> bool {
        self.versions.is_empty() || self.versions.iter().any(|v| v == version)
    }

    /// `self.arches` if set, otherwise `defaults`.
    pub fn effective_arches<'a>(&'a self, defaults: &'a [String]) -> &'a [String] {
        if self.arches.is_empty() {
            defaults
        } else {
            &self.arches
        }
    }
}

/// Descriptor of a single mirror.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MirrorDescriptor {
    pub name: String,
    pub update_frequency: String,
    pub sponsor_name: String,
    pub sponsor_url: String,
    pub email: String,
    /// Base addresses in the order the descriptor lists them.
    pub urls: Vec<(ProtocolType, String)>,
    pub subnets: Vec<IpNet>,
    pub asn: Option<u32>,
    pub cloud_type: String,
    pub cloud_region: String,
    pub geolocation: Geolocation,
    /// Private mirrors are never probed and always reported available.
    pub private: bool,
}

impl MirrorDescriptor {
    pub fn url_for(&self, protocol: ProtocolType) -> Option<&str> {
        self.urls
            .iter()
            .find(|(p, _)| *p == protocol)
            .map(|(_, url)| url.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Geolocation {
    pub continent: String,
    pub country: String,
    #[serde(alias = "state")]
    pub state_province: String,
    pub city: String,
}

impl Geolocation {
    pub fn is_empty(&self) -> bool {
        self.continent.is_empty()
            && self.country.is_empty()
            && self.state_province.is_empty()
            && self.city.is_empty()
    }
}

/// Version identifiers may be written as YAML numbers (`9`, `8.9`).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum VersionId {
    Text(String),
    Number(serde_json::Number),
}

impl From<VersionId> for String {
    fn from(id: VersionId) -> Self {
        match id {
            VersionId::Text(s) => s,
            VersionId::Number(n) => n.to_string(),
        }
    }
}

fn normalize(ids: Vec<VersionId>) -> Vec<String> {
    ids.into_iter().map(String::from).collect()
}

#[derive(Debug, Deserialize)]
pub(crate) struct ManifestDocument {
    allowed_outdate: String,
    mirrors_dir: PathBuf,
    versions: Vec<VersionId>,
    duplicated_versions: BTreeMap<String, VersionId>,
    arches: Vec<String>,
    required_protocols: Vec<ProtocolType>,
    repos: Vec<RepoDocument>,
}

#[derive(Debug, Deserialize)]
struct RepoDocument {
    name: String,
    path: String,
    #[serde(default)]
    arches: Vec<String>,
    #[serde(default)]
    versions: Vec<VersionId>,
}

/// Every attribute of a repo must already be declared globally.
fn check_subset(
    repo_name: &str,
    attribute: &str,
    values: &[String],
    allowed: &[String],
) -> Result<(), ConfigError> {
    match values.iter().find(|v| !allowed.contains(v)) {
        Some(missing) => Err(ConfigError::Validation(format!(
            "{} \"{}\" of repo \"{}\" is absent in the main list of {} \"{}\"",
            attribute,
            missing,
            repo_name,
            attribute,
            allowed.join(", "),
        ))),
        None => Ok(()),
    }
}

impl TryFrom<ManifestDocument> for GlobalManifest {
    type Error = ConfigError;

    fn try_from(doc: ManifestDocument) -> Result<Self, Self::Error> {
        let versions = normalize(doc.versions);
        let repos = doc
            .repos
            .into_iter()
            .map(|repo| {
                let repo_versions = normalize(repo.versions);
                check_subset(&repo.name, "arches", &repo.arches, &doc.arches)?;
                check_subset(&repo.name, "versions", &repo_versions, &versions)?;
                Ok(RepoDescriptor {
                    name: repo.name,
                    path: repo.path,
                    arches: repo.arches,
                    versions: repo_versions,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(GlobalManifest {
            allowed_outdate: doc.allowed_outdate,
            mirrors_dir: doc.mirrors_dir,
            versions,
            duplicated_versions: doc
                .duplicated_versions
                .into_iter()
                .map(|(alias, version)| (alias, version.into()))
                .collect(),
            arches: doc.arches,
            required_protocols: doc.required_protocols,
            repos,
        })
    }
}

/// `subnets` is either a list of ranges or a URL serving such a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum SubnetSource {
    Inline(Vec<String>),
    Remote(String),
}

impl Default for SubnetSource {
    fn default() -> Self {
        SubnetSource::Inline(Vec::new())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct MirrorDocument {
    pub(crate) name: String,
    update_frequency: String,
    sponsor: String,
    sponsor_url: String,
    #[serde(default = "default_email")]
    email: String,
    /// Kept as a JSON map so the descriptor's key order survives.
    address: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub(crate) subnets: SubnetSource,
    #[serde(default)]
    asn: Option<u32>,
    #[serde(default)]
    cloud_type: String,
    #[serde(default)]
    cloud_region: String,
    #[serde(default)]
    geolocation: Geolocation,
    #[serde(default)]
    private: bool,
}

fn default_email() -> String {
    "unknown".to_string()
}

impl MirrorDocument {
    /// Build the descriptor once subnets have been resolved.
    pub(crate) fn into_descriptor(self, subnets: Vec<IpNet>) -> Result<MirrorDescriptor, ConfigError> {
        let mut urls = Vec::with_capacity(self.address.len());
        for (key, value) in self.address {
            let protocol: ProtocolType = key.parse().map_err(|e| {
                ConfigError::Validation(format!("Mirror \"{}\": {}", self.name, e))
            })?;
            let url = value.as_str().ok_or_else(|| {
                ConfigError::Validation(format!(
                    "Address \"{}\" of mirror \"{}\" is not a string",
                    key, self.name
                ))
            })?;
            Url::parse(url).map_err(|e| {
                ConfigError::Validation(format!(
                    "Address \"{}\" of mirror \"{}\" is not a valid URL: {}",
                    url, self.name, e
                ))
            })?;
            urls.push((protocol, url.to_string()));
        }

        Ok(MirrorDescriptor {
            name: self.name,
            update_frequency: self.update_frequency,
            sponsor_name: self.sponsor,
            sponsor_url: self.sponsor_url,
            email: self.email,
            urls,
            subnets,
            asn: self.asn,
            cloud_type: self.cloud_type,
            cloud_region: self.cloud_region,
            geolocation: self.geolocation,
            private: self.private,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manifest_doc(repos: serde_json::Value) -> ManifestDocument {
        serde_json::from_value(json!({
            "allowed_outdate": "12 hours",
            "mirrors_dir": "/srv/mirrors",
            "versions": ["8.9", 9],
            "duplicated_versions": {"8": "8.9", "9": 9.3},
            "arches": ["x86_64", "aarch64"],
            "required_protocols": ["https", "http"],
            "repos": repos,
        }))
        .unwrap()
    }

    #[test]
    fn test_manifest_normalizes_versions() {
        let manifest = GlobalManifest::try_from(manifest_doc(json!([
            {"name": "baseos", "path": "$basearch/baseos", "versions": [9]}
        ])))
        .unwrap();

        assert_eq!(manifest.versions, vec!["8.9", "9"]);
        assert_eq!(manifest.duplicated_versions["8"], "8.9");
        assert_eq!(manifest.duplicated_versions["9"], "9.3");
        assert_eq!(manifest.repos[0].versions, vec!["9"]);
        assert!(manifest.repos[0].arches.is_empty());
        assert_eq!(
            manifest.required_protocols,
            vec![ProtocolType::Https, ProtocolType::Http]
        );
    }

    #[test]
    fn test_repo_arch_outside_global_list_is_rejected() {
        let err = GlobalManifest::try_from(manifest_doc(json!([
            {"name": "baseos", "path": "$basearch/baseos", "arches": ["x86_64", "ppc64le"]}
        ])))
        .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("ppc64le"));
        assert!(message.contains("baseos"));
        assert!(message.contains("arches"));
    }

    #[test]
    fn test_repo_version_checked_against_versions_not_arches() {
        let err = GlobalManifest::try_from(manifest_doc(json!([
            {"name": "appstream", "path": "$basearch/appstream", "versions": ["10"]}
        ])))
        .unwrap_err();
        assert!(err.to_string().contains("versions \"10\" of repo \"appstream\""));

        let err = GlobalManifest::try_from(manifest_doc(json!([
            {"name": "appstream", "path": "$basearch/appstream", "versions": ["x86_64"]}
        ])))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_repo_helpers() {
        let repo = RepoDescriptor {
            name: "extras".to_string(),
            path: "$basearch/extras".to_string(),
            arches: vec![],
            versions: vec!["9".to_string()],
        };
        let defaults = vec!["x86_64".to_string()];

        assert!(repo.applies_to("9"));
        assert!(!repo.applies_to("8"));
        assert_eq!(repo.effective_arches(&defaults), defaults.as_slice());
    }

    fn mirror_doc(extra: serde_json::Value) -> MirrorDocument {
        let mut doc = json!({
            "name": "mirror.example.com",
            "update_frequency": "3h",
            "sponsor": "Example",
            "sponsor_url": "https://example.com",
            "address": {
                "rsync": "rsync://mirror.example.com/almalinux",
                "http": "http://mirror.example.com/almalinux",
                "https": "https://mirror.example.com/almalinux"
            }
        });
        if let (Some(doc), Some(extra)) = (doc.as_object_mut(), extra.as_object()) {
            for (k, v) in extra {
                doc.insert(k.clone(), v.clone());
            }
        }
        serde_json::from_value(doc).unwrap()
    }

    #[test]
    fn test_mirror_defaults_and_url_order() {
        let mirror = mirror_doc(json!({})).into_descriptor(Vec::new()).unwrap();

        assert_eq!(mirror.email, "unknown");
        assert_eq!(mirror.cloud_type, "");
        assert_eq!(mirror.cloud_region, "");
        assert!(mirror.geolocation.is_empty());
        assert!(!mirror.private);
        assert_eq!(mirror.asn, None);
        let order: Vec<ProtocolType> = mirror.urls.iter().map(|(p, _)| *p).collect();
        assert_eq!(
            order,
            vec![ProtocolType::Rsync, ProtocolType::Http, ProtocolType::Https]
        );
        assert_eq!(
            mirror.url_for(ProtocolType::Https),
            Some("https://mirror.example.com/almalinux")
        );
    }

    #[test]
    fn test_mirror_optional_fields() {
        let mirror = mirror_doc(json!({
            "email": "ops@example.com",
            "asn": 64512,
            "cloud_type": "aws",
            "cloud_region": "us-east-1",
            "private": true,
            "geolocation": {"country": "DE", "state": "Hesse", "city": "Frankfurt"}
        }))
        .into_descriptor(Vec::new())
        .unwrap();

        assert_eq!(mirror.email, "ops@example.com");
        assert_eq!(mirror.asn, Some(64512));
        assert_eq!(mirror.cloud_region, "us-east-1");
        assert!(mirror.private);
        assert_eq!(mirror.geolocation.state_province, "Hesse");
        assert_eq!(mirror.geolocation.continent, "");
    }

    #[test]
    fn test_mirror_rejects_bad_address() {
        let err = mirror_doc(json!({"address": {"https": "not a url"}}))
            .into_descriptor(Vec::new())
            .unwrap_err();
        assert!(err.to_string().contains("not a valid URL"));

        let err = mirror_doc(json!({"address": {"ftp": "ftp://mirror.example.com"}}))
            .into_descriptor(Vec::new())
            .unwrap_err();
        assert!(err.to_string().contains("Unknown protocol type: ftp"));
    }

    #[test]
    fn test_subnet_source_shapes() {
        let inline = mirror_doc(json!({"subnets": ["10.0.0.0/8"]}));
        assert!(matches!(inline.subnets, SubnetSource::Inline(ref v) if v.len() == 1));

        let remote = mirror_doc(json!({"subnets": "https://example.com/subnets.json"}));
        assert!(matches!(remote.subnets, SubnetSource::Remote(_)));

        let absent = mirror_doc(json!({}));
        assert!(matches!(absent.subnets, SubnetSource::Inline(ref v) if v.is_empty()));
    }
}
