//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (weights, latency baseline, deviation)
//! - Check backend definitions (non-empty, unique names, parseable URLs)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: PoolConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use thiserror::Error;
use url::Url;

use crate::config::schema::{PoolConfig, ScoringConfig};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("at least one backend is required")]
    NoBackends,

    #[error("duplicate backend name '{0}'")]
    DuplicateBackend(String),

    #[error("backend '{name}' has an invalid url: {reason}")]
    InvalidUrl { name: String, reason: String },

    #[error("scoring.{field} must be {requirement}, got {value}")]
    OutOfRange {
        field: &'static str,
        requirement: &'static str,
        value: f64,
    },
}

/// Validate a full pool configuration.
pub fn validate_config(config: &PoolConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.backends.is_empty() {
        errors.push(ValidationError::NoBackends);
    }

    let mut seen = HashSet::new();
    for backend in &config.backends {
        if !seen.insert(backend.name.as_str()) {
            errors.push(ValidationError::DuplicateBackend(backend.name.clone()));
        }
        match Url::parse(&backend.url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => {}
            Ok(url) => errors.push(ValidationError::InvalidUrl {
                name: backend.name.clone(),
                reason: format!("expected an http(s) URL with a host, got '{}'", url),
            }),
            Err(e) => errors.push(ValidationError::InvalidUrl {
                name: backend.name.clone(),
                reason: e.to_string(),
            }),
        }
    }

    if let Err(mut scoring_errors) = validate_scoring(&config.scoring) {
        errors.append(&mut scoring_errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate scoring tunables on their own (used on hot reload too).
pub fn validate_scoring(scoring: &ScoringConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let positive = [
        ("allowed_latency_deviation_ms", scoring.allowed_latency_deviation_ms),
        ("expected_average_latency_ms", scoring.expected_average_latency_ms),
    ];
    for (field, value) in positive {
        if !(value.is_finite() && value > 0.0) {
            errors.push(ValidationError::OutOfRange {
                field,
                requirement: "a finite number above 0",
                value,
            });
        }
    }

    let weights = [
        ("health_weight", scoring.health_weight),
        ("latency_weight", scoring.latency_weight),
    ];
    for (field, value) in weights {
        if !(value.is_finite() && value >= 0.0) {
            errors.push(ValidationError::OutOfRange {
                field,
                requirement: "a finite, non-negative number",
                value,
            });
        }
    }

    if !(0.0..=1.0).contains(&scoring.instability_weight) {
        errors.push(ValidationError::OutOfRange {
            field: "instability_weight",
            requirement: "between 0 and 1",
            value: scoring.instability_weight,
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
