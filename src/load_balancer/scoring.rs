//! Health and latency scoring for backend ranking.
//!
//! Scores are computed from a backend's last `SAMPLE_CAPACITY` observations
//! and decay back toward full trust within ten seconds of the last error.
//!
//! # Scores
//! - `health_score`: `1 - decay * (errors / measured)`
//! - `latency_score`: `1 - decay * raw`, where `raw` blends the ping ratio
//!   against the expected baseline with an instability ratio
//! - `score`: weighted sum of the two, only ever compared between backends

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::load_balancer::backend::BackendStats;
use crate::resilience::retries::is_server_error;

/// Tunables for the scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// A sample within this many ms of the running average counts as stable.
    pub allowed_latency_deviation_ms: f64,

    /// Average latency at or below which the ping score is perfect.
    pub expected_average_latency_ms: f64,

    /// Weight of the health score in the combined score.
    pub health_weight: f64,

    /// Weight of the latency score in the combined score.
    pub latency_weight: f64,

    /// Share of the raw latency score taken by the instability ratio.
    pub instability_weight: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            allowed_latency_deviation_ms: 250.0,
            expected_average_latency_ms: 500.0,
            health_weight: 0.75,
            latency_weight: 0.25,
            instability_weight: 0.5,
        }
    }
}

/// Result of one scoring pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Scores {
    pub health: f64,
    pub latency: f64,
    pub combined: f64,
}

impl Scores {
    pub const ZERO: Scores = Scores {
        health: 0.0,
        latency: 0.0,
        combined: 0.0,
    };
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Weight of recent errors, stepping down as the last error ages.
pub fn decay_weight(last_error: u64, now_ms: u64) -> f64 {
    if last_error == 0 {
        return 0.0;
    }
    match now_ms.saturating_sub(last_error) {
        0..=999 => 1.0,
        1_000..=2_999 => 0.8,
        3_000..=4_999 => 0.3,
        5_000..=9_999 => 0.1,
        _ => 0.0,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Rescore `stats` in place.
///
/// With fewer than two latency samples nothing is written and
/// `Scores::ZERO` is returned.
pub fn score_backend(stats: &mut BackendStats, config: &ScoringConfig, now_ms: u64) -> Scores {
    let mut samples: Vec<u64> = stats.latencies.samples().collect();
    let measured = samples.len();
    if measured < 2 {
        return Scores::ZERO;
    }

    let weight = decay_weight(stats.last_error, now_ms);

    let errors = stats
        .statuses
        .iter()
        .filter(|s| is_server_error(**s))
        .count();
    // transport failures count as errors but not as samples, so the ratio can exceed 1
    let health = round2(1.0 - weight * (errors as f64 / measured as f64)).max(0.0);

    samples.sort_unstable();
    let (average, instabilities) = smooth_latency(&samples, config.allowed_latency_deviation_ms);
    let instability_score = if measured > 3 {
        1.0 - instabilities as f64 / measured as f64
    } else {
        1.0
    };

    let discrepancy = average / config.expected_average_latency_ms;
    let ping_score = if discrepancy <= 1.0 {
        1.0
    } else {
        config.expected_average_latency_ms / average
    };

    let raw_latency = round2(
        ping_score * (1.0 - config.instability_weight) + instability_score * config.instability_weight,
    );
    let latency = round2(1.0 - weight * raw_latency);

    let combined = health * config.health_weight + latency * config.latency_weight;

    stats.health_score = health;
    stats.latency_score = latency;
    stats.score = combined;
    stats.scored_request_count = stats.request_count;

    Scores {
        health,
        latency,
        combined,
    }
}

/// Fold sorted samples into a smoothed average, seeded with the median.
///
/// Returns the average and the number of samples too far from it to count.
fn smooth_latency(sorted: &[u64], allowed_deviation: f64) -> (f64, usize) {
    let mut average = sorted[sorted.len() / 2] as f64;
    let mut instabilities = 0;
    for &sample in sorted {
        let sample = sample as f64;
        if (sample - average).abs() < allowed_deviation {
            average = (average + sample) / 2.0;
        } else {
            instabilities += 1;
        }
    }
    (average, instabilities)
}
