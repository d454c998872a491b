//! Mirror availability probing.
//!
//! # Data Flow
//! ```text
//! MirrorDescriptor + manifest requirements
//!     → prober.rs (private / always-available exemption)
//!     → selection.rs (pick one address by protocol policy)
//!     → for version in versions, for repo in repos:
//!           client.rs GET base/version/repo_path/repodata/repomd.xml
//!     → ProbeResult { name, available }
//! ```
//!
//! # States
//! ```text
//! PENDING → CHECKING → AVAILABLE    (every pair answered 200)
//!                    → UNAVAILABLE  (first non-200, error or timeout)
//! ```
//!
//! # Design Decisions
//! - Strict AND over the required pairs; the first failure ends the probe
//! - One arch per repo and one protocol per mirror are exercised
//! - No retries: a timeout counts the same as any other failure
//! - The failure reason is logged, never returned

pub mod client;
pub mod prober;
pub mod selection;

pub use client::{CheckClient, FetchError, HttpCheckClient};
pub use prober::{check_url, repo_check_path, CheckFailure, ProbeResult, Prober};
pub use selection::{select_protocol, ProtocolSelection};
