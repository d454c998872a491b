//! JSON Schema validation of raw documents.
//!
//! Documents are validated in their generic form (`serde_json::Value`) before
//! typed deserialization, so the error a user sees points at the schema rule
//! they broke rather than at a serde field.

use std::fs;
use std::path::Path;

use jsonschema::Validator;
use serde_json::Value;

use crate::config::ConfigError;

/// Built-in schema of the global manifest.
pub const SERVICE_CONFIG_SCHEMA: &str = include_str!("../../schemas/service_config.json");

/// Built-in schema of a mirror descriptor.
pub const MIRROR_CONFIG_SCHEMA: &str = include_str!("../../schemas/mirror_config.json");

/// A compiled schema.
pub struct SchemaValidator {
    inner: Validator,
}

impl SchemaValidator {
    /// Compile a schema. A broken schema is a fault of the service, not of
    /// the document being checked.
    pub fn new(schema: &Value) -> Result<Self, ConfigError> {
        let inner = Validator::new(schema).map_err(|e| ConfigError::Schema(e.to_string()))?;
        Ok(Self { inner })
    }

    pub fn parse(schema: &str) -> Result<Self, ConfigError> {
        let value: Value =
            serde_json::from_str(schema).map_err(|e| ConfigError::Schema(e.to_string()))?;
        Self::new(&value)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn service_config() -> Result<Self, ConfigError> {
        Self::parse(SERVICE_CONFIG_SCHEMA)
    }

    pub fn mirror_config() -> Result<Self, ConfigError> {
        Self::parse(MIRROR_CONFIG_SCHEMA)
    }

    /// Validate a document, reporting the first violation only.
    pub fn validate(&self, document: &Value) -> Result<(), String> {
        match self.inner.iter_errors(document).next() {
            None => Ok(()),
            Some(error) => {
                let location = error.instance_path.to_string();
                if location.is_empty() {
                    Err(error.to_string())
                } else {
                    Err(format!("{} (at {})", error, location))
                }
            }
        }
    }

    pub fn is_valid(&self, document: &Value) -> bool {
        self.inner.is_valid(document)
    }
}
