//! Checker settings subsystem.
//!
//! # Data Flow
//! ```text
//! settings file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → CheckerConfig (validated, immutable)
//!     → handed by reference to the manifest loader and the prober
//! ```
//!
//! # Design Decisions
//! - Every tunable the checker uses (headers, timeouts, pool size, the
//!   always-available list) lives here instead of in process-wide constants
//! - All fields have defaults, so running without a settings file works
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_settings, ConfigError};
pub use schema::CheckerConfig;
pub use schema::LoaderConfig;
pub use schema::ObservabilityConfig;
pub use schema::ProbeConfig;
pub use schema::ProtocolPolicy;
