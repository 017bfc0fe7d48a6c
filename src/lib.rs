//! Health- and latency-ranked transport pool.
//!
//! A [`Pool`] sits in front of a fixed set of fetch-like transports and
//! presents the same call contract as a single one. Each call picks between
//! the two best-scoring untried backends, records what happened, and retries
//! GET/HEAD requests on another backend after a 5xx or transport failure.
//!
//! ```no_run
//! use std::sync::Arc;
//! use balanced_fetch::{transport::HttpTransport, Pool, ScoringConfig, Transport};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let transports: Vec<Arc<dyn Transport>> = vec![
//!     Arc::new(HttpTransport::new("http://10.0.0.1:8545")?),
//!     Arc::new(HttpTransport::new("http://10.0.0.2:8545")?),
//! ];
//! let pool = Pool::new(transports, ScoringConfig::default())?;
//! let response = pool.fetch("/status", None).await;
//! println!("{} {}", response.status, response.text());
//! # Ok(())
//! # }
//! ```

// Core
pub mod dispatch;
pub mod load_balancer;
pub mod transport;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

// Diagnostics
pub mod admin;

pub use config::PoolConfig;
pub use load_balancer::{Backend, BackendSnapshot, Pool, PoolError, ScoringConfig};
pub use transport::{FetchRequest, FetchResponse, RequestInit, Resource, Transport, TransportError};
