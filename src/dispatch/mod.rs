//! Dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Pool::fetch(resource, init)
//!     → normalize Resource into FetchRequest
//!     → loop:
//!         selector.rs (best two untried backends)
//!         → coin flip between the two
//!         → rescore if stale, count the attempt
//!         → resilience::timeouts (transport call, measured)
//!         → record status + latency, rescore on 5xx
//!         → return, or retry on another backend (GET/HEAD only)
//!     → response.rs synthesizes 502/400 when nothing usable came back
//! ```
//!
//! # Design Decisions
//! - No lock around the loop; each backend's stats are locked briefly
//! - Scoring and selection never await
//! - Never returns an error; failures become responses

pub mod dispatcher;
pub mod response;

pub use dispatcher::dispatch;
