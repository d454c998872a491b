//! Manifest and mirror descriptor loading.
//!
//! Both kinds of document go through the same pipeline:
//! read → parse YAML → validate against a schema → build the typed model.
//! A broken manifest is fatal to the run; a broken descriptor only removes
//! that mirror from it.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};
use serde_yaml::Value as YamlValue;

use crate::config::{ConfigError, LoaderConfig};
use crate::manifest::model::{GlobalManifest, ManifestDocument, MirrorDescriptor, MirrorDocument, SubnetSource};
use crate::manifest::subnets::{parse_subnets, SubnetResolver};
use crate::manifest::validator::SchemaValidator;
use crate::observability::metrics;

/// Location of the manifest below `$CONFIG_ROOT`.
pub const DEFAULT_MANIFEST_RELATIVE_PATH: &str = "mirrors/updates/config.yml";

/// `$CONFIG_ROOT/mirrors/updates/config.yml`, with `CONFIG_ROOT` defaulting to `.`.
pub fn default_manifest_path() -> PathBuf {
    let root = std::env::var_os("CONFIG_ROOT").unwrap_or_else(|| ".".into());
    PathBuf::from(root).join(DEFAULT_MANIFEST_RELATIVE_PATH)
}

/// Convert parsed YAML into a JSON value so it can be schema-checked.
///
/// YAML allows non-string mapping keys (`8: "8.9"`); scalar keys are turned
/// into their string form, anything else is rejected.
pub fn yaml_to_json(value: YamlValue) -> Result<Value, String> {
    Ok(match value {
        YamlValue::Null => Value::Null,
        YamlValue::Bool(b) => Value::Bool(b),
        YamlValue::Number(n) => yaml_number(&n),
        YamlValue::String(s) => Value::String(s),
        YamlValue::Sequence(items) => Value::Array(
            items
                .into_iter()
                .map(yaml_to_json)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        YamlValue::Mapping(mapping) => {
            let mut object = Map::with_capacity(mapping.len());
            for (key, value) in mapping {
                let key = match key {
                    YamlValue::String(s) => s,
                    YamlValue::Number(n) => n.to_string(),
                    YamlValue::Bool(b) => b.to_string(),
                    other => return Err(format!("unsupported mapping key {:?}", other)),
                };
                object.insert(key, yaml_to_json(value)?);
            }
            Value::Object(object)
        }
        YamlValue::Tagged(tagged) => yaml_to_json(tagged.value)?,
    })
}

fn yaml_number(n: &serde_yaml::Number) -> Value {
    if let Some(i) = n.as_i64() {
        Value::Number(i.into())
    } else if let Some(u) = n.as_u64() {
        Value::Number(u.into())
    } else {
        n.as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

/// Parse YAML text into a JSON document.
pub fn parse_document(path: &Path, content: &str) -> Result<Value, ConfigError> {
    let parse_error = |message: String| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    };
    let yaml: YamlValue = serde_yaml::from_str(content).map_err(|e| parse_error(e.to_string()))?;
    yaml_to_json(yaml).map_err(parse_error)
}

fn deserialize<T: DeserializeOwned>(document: Value) -> Result<T, ConfigError> {
    serde_json::from_value(document).map_err(|e| ConfigError::Validation(e.to_string()))
}

/// Recursively list files with the given extension below `dir`.
///
/// Unreadable subdirectories are logged and skipped; only an unreadable root
/// is an error. Symlinked directories are not entered, so a link back to an
/// ancestor cannot list the same descriptor twice.
pub fn descriptor_files(dir: &Path, extension: &str) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    let mut is_root = true;

    while let Some(current) = pending.pop() {
        let entries = match std::fs::read_dir(&current) {
            Ok(entries) => entries,
            Err(e) if is_root => return Err(e),
            Err(e) => {
                tracing::warn!(dir = %current.display(), error = %e, "Skipping unreadable directory");
                continue;
            }
        };
        is_root = false;

        for entry in entries {
            let (path, file_type) = match entry.and_then(|entry| Ok((entry.path(), entry.file_type()?))) {
                Ok(found) => found,
                Err(e) => {
                    tracing::warn!(dir = %current.display(), error = %e, "Skipping unreadable entry");
                    continue;
                }
            };
            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_symlink() && path.is_dir() {
                tracing::debug!(path = %path.display(), "Not following symlinked directory");
            } else if path.extension().is_some_and(|ext| ext == extension) {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Reads the manifest and mirror descriptors into the typed model.
pub struct ManifestLoader {
    manifest_schema: SchemaValidator,
    mirror_schema: SchemaValidator,
    descriptor_extension: String,
    subnets: SubnetResolver,
}

impl ManifestLoader {
    /// Create a loader from settings, compiling the configured schemas.
    ///
    /// `client` is used for remote subnet lists.
    pub fn new(config: &LoaderConfig, client: reqwest::Client) -> Result<Self, ConfigError> {
        let manifest_schema = match &config.manifest_schema {
            Some(path) => SchemaValidator::from_file(path)?,
            None => SchemaValidator::service_config()?,
        };
        let mirror_schema = match &config.mirror_schema {
            Some(path) => SchemaValidator::from_file(path)?,
            None => SchemaValidator::mirror_config()?,
        };

        Ok(Self {
            manifest_schema,
            mirror_schema,
            descriptor_extension: config.descriptor_extension.trim_start_matches('.').to_string(),
            subnets: SubnetResolver::new(client, config.subnet_fetch_timeout()),
        })
    }

    /// Read, validate and build the global manifest.
    pub fn load_global_manifest(&self, path: &Path) -> Result<GlobalManifest, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let document = parse_document(path, &content)?;
        self.manifest_schema
            .validate(&document)
            .map_err(ConfigError::Validation)?;

        let manifest = GlobalManifest::try_from(deserialize::<ManifestDocument>(document)?)?;
        tracing::info!(
            path = %path.display(),
            versions = manifest.versions.len(),
            repos = manifest.repos.len(),
            "Main config loaded"
        );
        Ok(manifest)
    }

    /// Read, validate and build one mirror descriptor, resolving its subnets.
    pub async fn load_mirror_descriptor(&self, path: &Path) -> Result<MirrorDescriptor, ConfigError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let document = parse_document(path, &content)?;
        self.mirror_schema
            .validate(&document)
            .map_err(ConfigError::Validation)?;

        let mut raw: MirrorDocument = deserialize(document)?;
        let subnets = match std::mem::take(&mut raw.subnets) {
            SubnetSource::Inline(entries) => parse_subnets(&entries).map_err(|e| {
                ConfigError::Validation(format!("Mirror \"{}\": {}", raw.name, e))
            })?,
            SubnetSource::Remote(url) => self.subnets.resolve(&raw.name, &url).await,
        };
        raw.into_descriptor(subnets)
    }

    /// Load every descriptor below `dir`, skipping (and logging) invalid ones.
    ///
    /// Mirror names are result keys: when two files declare the same name the
    /// first in path order wins and the later one is skipped.
    pub async fn discover_mirrors(&self, dir: &Path) -> Vec<MirrorDescriptor> {
        let root = dir.to_path_buf();
        let extension = self.descriptor_extension.clone();
        let walk = tokio::task::spawn_blocking(move || descriptor_files(&root, &extension)).await;
        let files = match walk {
            Ok(Ok(files)) => files,
            Ok(Err(e)) => {
                tracing::error!(dir = %dir.display(), error = %e, "Cannot read mirrors directory");
                return Vec::new();
            }
            Err(e) => {
                tracing::error!(dir = %dir.display(), error = %e, "Mirrors directory walk failed");
                return Vec::new();
            }
        };

        let mut mirrors = Vec::with_capacity(files.len());
        let mut seen = HashSet::with_capacity(files.len());
        for path in files {
            let result = self.load_mirror_descriptor(&path).await.and_then(|mirror| {
                if seen.insert(mirror.name.clone()) {
                    Ok(mirror)
                } else {
                    Err(ConfigError::Validation(format!(
                        "mirror name \"{}\" is already declared by another config",
                        mirror.name
                    )))
                }
            });

            match result {
                Ok(mirror) => mirrors.push(mirror),
                Err(e) => {
                    let file_name = path
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_else(|| path.display().to_string());
                    tracing::error!(
                        file = %path.display(),
                        error = %e,
                        "Mirror config \"{}\" is invalid because \"{}\"",
                        file_name,
                        e
                    );
                    metrics::record_descriptor_skipped();
                }
            }
        }

        tracing::info!(dir = %dir.display(), count = mirrors.len(), "Mirror configs loaded");
        mirrors
    }
}
