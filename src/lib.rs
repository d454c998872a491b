//! Mirror availability checker library

pub mod config;
pub mod manifest;
pub mod observability;
pub mod probe;
pub mod runner;

pub use config::schema::CheckerConfig;
pub use manifest::{GlobalManifest, ManifestLoader, MirrorDescriptor};
pub use probe::{ProbeResult, Prober};
