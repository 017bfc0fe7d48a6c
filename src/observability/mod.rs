//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! dispatcher, pool, config watcher, admin server produce:
//!     → logging.rs (structured log events, one span per dispatch)
//!     → metrics.rs (attempt counters, latency histograms, score gauges)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Every dispatch carries a UUID call id in its span
//! - Metrics are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
