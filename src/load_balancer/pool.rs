//! Backend pool.
//!
//! # Responsibilities
//! - Own the fixed, ordered set of backends
//! - Hold the scoring tunables (swappable at runtime)
//! - Entry point for `fetch`, delegating to the dispatcher
//! - Expose backend snapshots for monitoring

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use thiserror::Error;

use crate::config::loader::join_errors;
use crate::config::{validate_scoring, PoolConfig, ValidationError};
use crate::dispatch;
use crate::load_balancer::backend::{Backend, BackendSnapshot};
use crate::load_balancer::scoring::ScoringConfig;
use crate::transport::{FetchResponse, HttpTransport, RequestInit, Resource, Transport};

/// Errors raised while building a pool.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("a pool needs at least one transport")]
    Empty,

    #[error("backend {index} is not a valid transport: {reason}")]
    InvalidTransport { index: usize, reason: String },

    #[error("invalid scoring configuration: {}", join_errors(.0))]
    InvalidScoring(Vec<ValidationError>),
}

/// A fixed set of scored backends behind one fetch entry point.
#[derive(Debug)]
pub struct Pool {
    backends: Vec<Arc<Backend>>,
    scoring: ArcSwap<ScoringConfig>,
    default_timeout: Option<Duration>,
}

impl Pool {
    /// Build a pool from transports; backends are named `backend-<n>`.
    pub fn new(transports: Vec<Arc<dyn Transport>>, scoring: ScoringConfig) -> Result<Self, PoolError> {
        let mut builder = PoolBuilder::new().scoring(scoring);
        for (i, transport) in transports.into_iter().enumerate() {
            builder = builder.transport(format!("backend-{}", i), transport);
        }
        builder.build()
    }

    pub fn builder() -> PoolBuilder {
        PoolBuilder::new()
    }

    /// Build a pool of HTTP backends from configuration.
    pub fn from_config(config: &PoolConfig) -> Result<Self, PoolError> {
        let client = reqwest::Client::new();
        let mut builder = PoolBuilder::new()
            .scoring(config.scoring.clone())
            .default_timeout(config.timeouts.attempt());

        for (index, backend) in config.backends.iter().enumerate() {
            let base_url = url::Url::parse(&backend.url).map_err(|e| PoolError::InvalidTransport {
                index,
                reason: e.to_string(),
            })?;
            let transport = HttpTransport::with_client(base_url, client.clone());
            builder = builder.transport(backend.name.clone(), Arc::new(transport));
        }
        builder.build()
    }

    /// Dispatch a request across the pool. Always resolves to a response.
    pub async fn fetch(&self, resource: impl Into<Resource>, init: Option<RequestInit>) -> FetchResponse {
        dispatch::dispatch(self, resource.into(), init).await
    }

    pub fn backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Diagnostic view of every backend, in pool order.
    pub fn snapshot(&self) -> Vec<BackendSnapshot> {
        self.backends.iter().map(|b| b.snapshot()).collect()
    }

    /// Tunables currently in effect.
    pub fn scoring(&self) -> Arc<ScoringConfig> {
        self.scoring.load_full()
    }

    /// Replace the tunables; in-flight dispatches keep the ones they started with.
    ///
    /// Rejected tunables leave the current ones in place.
    pub fn set_scoring(&self, config: ScoringConfig) -> Result<(), PoolError> {
        validate_scoring(&config).map_err(PoolError::InvalidScoring)?;
        tracing::info!(?config, "Scoring configuration updated");
        self.scoring.store(Arc::new(config));
        Ok(())
    }

    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout
    }
}

/// Step-by-step pool construction.
#[derive(Default)]
pub struct PoolBuilder {
    transports: Vec<(String, Arc<dyn Transport>)>,
    scoring: ScoringConfig,
    default_timeout: Option<Duration>,
}

impl PoolBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transport(mut self, name: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        self.transports.push((name.into(), transport));
        self
    }

    pub fn scoring(mut self, scoring: ScoringConfig) -> Self {
        self.scoring = scoring;
        self
    }

    /// Deadline applied to each attempt unless the call overrides it.
    pub fn default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<Pool, PoolError> {
        if self.transports.is_empty() {
            return Err(PoolError::Empty);
        }
        validate_scoring(&self.scoring).map_err(PoolError::InvalidScoring)?;

        let mut backends = Vec::with_capacity(self.transports.len());
        for (index, (name, transport)) in self.transports.into_iter().enumerate() {
            transport
                .validate()
                .map_err(|reason| PoolError::InvalidTransport { index, reason })?;
            backends.push(Arc::new(Backend::new(index, name, transport)));
        }

        tracing::debug!(backends = backends.len(), "Backend pool constructed");

        Ok(Pool {
            backends,
            scoring: ArcSwap::from_pointee(self.scoring),
            default_timeout: self.default_timeout,
        })
    }
}
