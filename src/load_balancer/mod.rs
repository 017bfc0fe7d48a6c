//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Pool constructed from transports (pool.rs)
//!     → one Backend record per transport (backend.rs)
//!         - ring.rs buffers of recent statuses/latencies
//!     → dispatcher asks selector.rs for the two best untried backends
//!     → after each attempt, scoring.rs refreshes the backend's scores
//! ```
//!
//! # Design Decisions
//! - Backend membership is fixed at construction
//! - Scores only rank backends against each other; nothing is ever excluded
//! - Statistics are a sampled health signal, not an exact ledger
//! - Scoring tunables are explicit config, one set per pool

pub mod backend;
pub mod pool;
pub mod ring;
pub mod scoring;
pub mod selector;

pub use backend::{Backend, BackendSnapshot, BackendStats};
pub use pool::{Pool, PoolBuilder, PoolError};
pub use scoring::{ScoringConfig, Scores};
pub use selector::{choose_backends, AttemptSet};
