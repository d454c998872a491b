//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! manifest loader, prober, runner
//!     → logging.rs (structured log events)
//!     → metrics.rs (probe and discovery counters)
//!
//! Consumers:
//!     → stdout (fmt layer)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```

pub mod logging;
pub mod metrics;
