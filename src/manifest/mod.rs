//! Mirror manifest subsystem.
//!
//! # Data Flow
//! ```text
//! config.yml (global manifest)          mirrors_dir/**/*.yml (descriptors)
//!     → loader.rs (read, YAML → JSON)       → loader.rs (read, YAML → JSON)
//!     → validator.rs (service schema)       → validator.rs (mirror schema)
//!     → model.rs (subset invariants)        → subnets.rs (inline or fetched)
//!     → GlobalManifest (fatal on error)     → MirrorDescriptor (skipped on error)
//! ```
//!
//! # Design Decisions
//! - Schema validation runs on the generic document, before typed deserialization
//! - Repo arches/versions must be declared globally; violations are errors,
//!   never silently dropped
//! - Subnet lists are advisory and cannot make a descriptor invalid when fetched

pub mod loader;
pub mod model;
pub mod subnets;
pub mod validator;

pub use loader::{default_manifest_path, ManifestLoader};
pub use model::{GlobalManifest, Geolocation, MirrorDescriptor, ProtocolType, RepoDescriptor};
pub use validator::SchemaValidator;
