//! Backend record.
//!
//! # Responsibilities
//! - Own one transport for the pool's lifetime
//! - Track rolling status/latency samples and the derived scores
//! - Make each attempt's statistics update a single locked unit
//!
//! # Design Decisions
//! - One mutex per backend; no pool-wide lock
//! - The lock is never held across an await
//! - `statuses[i]` and `latencies[i]` always describe the same attempt

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::load_balancer::ring::RingBuffer;
use crate::resilience::retries::is_server_error;
use crate::transport::Transport;

/// Status recorded when a transport fails without a response.
pub const TRANSPORT_FAILURE_STATUS: u16 = 502;

/// Mutable statistics of one backend.
#[derive(Debug, Clone, Serialize)]
pub struct BackendStats {
    /// Dispatch attempts ever routed here. Never reset.
    pub request_count: u64,
    /// `request_count` as of the last scoring pass.
    pub scored_request_count: u64,
    pub statuses: RingBuffer<u16>,
    /// Round-trip times in milliseconds; 0 means no sample.
    pub latencies: RingBuffer<u64>,
    /// Epoch millis of the latest 5xx or transport failure, 0 if never.
    pub last_error: u64,
    pub health_score: f64,
    pub latency_score: f64,
    pub score: f64,
    /// Informational only; the scorer does not read it.
    pub error_count: u64,
}

impl Default for BackendStats {
    fn default() -> Self {
        Self {
            request_count: 0,
            scored_request_count: 0,
            statuses: RingBuffer::default(),
            latencies: RingBuffer::default(),
            last_error: 0,
            health_score: 1.0,
            latency_score: 1.0,
            score: 1.0,
            error_count: 0,
        }
    }
}

impl BackendStats {
    /// True when attempts happened since the last scoring pass.
    pub fn is_stale(&self) -> bool {
        self.scored_request_count != self.request_count
    }

    /// Store one completed attempt. Returns true if it counts as an error.
    pub fn record(&mut self, status: u16, latency_ms: u64, now_ms: u64) -> bool {
        self.statuses.push(status);
        self.latencies.push(latency_ms);
        let is_error = is_server_error(status);
        if is_error {
            self.last_error = now_ms;
            self.error_count += 1;
        }
        is_error
    }
}

/// A single backend in the pool.
pub struct Backend {
    index: usize,
    name: String,
    transport: Arc<dyn Transport>,
    stats: Mutex<BackendStats>,
}

impl Backend {
    pub fn new(index: usize, name: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            index,
            name: name.into(),
            transport,
            stats: Mutex::new(BackendStats::default()),
        }
    }

    /// Position in the pool; stable identity for the pool's lifetime.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Lock the statistics. A poisoned lock still yields the data.
    pub fn stats(&self) -> MutexGuard<'_, BackendStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current statistics.
    pub fn stats_snapshot(&self) -> BackendStats {
        self.stats().clone()
    }

    pub fn score(&self) -> f64 {
        self.stats().score
    }

    pub fn request_count(&self) -> u64 {
        self.stats().request_count
    }

    /// Diagnostic view of this backend.
    pub fn snapshot(&self) -> BackendSnapshot {
        let stats = self.stats_snapshot();
        BackendSnapshot {
            index: self.index,
            name: self.name.clone(),
            stats,
        }
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backend")
            .field("index", &self.index)
            .field("name", &self.name)
            .field("transport", &self.transport)
            .finish()
    }
}

/// Serializable view of one backend for monitoring.
#[derive(Debug, Clone, Serialize)]
pub struct BackendSnapshot {
    pub index: usize,
    pub name: String,
    #[serde(flatten)]
    pub stats: BackendStats,
}
