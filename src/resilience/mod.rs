//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Attempt against a backend:
//!     → timeouts.rs (optional per-attempt deadline)
//!     → On 5xx or transport failure: retries.rs (is the request safe to replay?)
//!     → dispatcher moves on to an untried backend, or returns
//! ```
//!
//! # Design Decisions
//! - Retries only for GET and HEAD, matched case-sensitively
//! - No backoff between attempts; every retry goes to a different backend
//! - At most one attempt per backend per call
//! - No deadline unless the caller or the pool config asks for one

pub mod retries;
pub mod timeouts;
