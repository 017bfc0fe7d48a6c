//! Two-candidate selection.
//!
//! Single streaming pass keeping the best and second-best untried backends.
//! Higher score wins; on equal scores the backend that has served fewer
//! requests wins, and on a full tie the earlier pool position is kept.

use std::collections::HashSet;
use std::sync::Arc;

use crate::load_balancer::backend::Backend;

/// Backends already tried during one logical dispatch.
#[derive(Debug, Default, Clone)]
pub struct AttemptSet {
    tried: HashSet<usize>,
}

impl AttemptSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, backend: &Backend) -> bool {
        self.tried.insert(backend.index())
    }

    pub fn contains(&self, backend: &Backend) -> bool {
        self.tried.contains(&backend.index())
    }

    pub fn len(&self) -> usize {
        self.tried.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tried.is_empty()
    }
}

/// Ranking key read once per candidate.
#[derive(Debug, Clone, Copy)]
struct Rank {
    score: f64,
    request_count: u64,
}

impl Rank {
    fn of(backend: &Backend) -> Self {
        let stats = backend.stats();
        Self {
            score: stats.score,
            request_count: stats.request_count,
        }
    }

    fn beats(&self, other: &Rank) -> bool {
        self.score > other.score
            || (self.score == other.score && self.request_count < other.request_count)
    }
}

/// Pick the two best backends not yet in `attempted`.
///
/// The first element is `None` only when every backend was attempted.
pub fn choose_backends(
    backends: &[Arc<Backend>],
    attempted: &AttemptSet,
) -> (Option<Arc<Backend>>, Option<Arc<Backend>>) {
    let mut best: Option<(&Arc<Backend>, Rank)> = None;
    let mut second: Option<(&Arc<Backend>, Rank)> = None;

    for backend in backends {
        if attempted.contains(backend) {
            continue;
        }
        let rank = Rank::of(backend);

        match best {
            Some((_, best_rank)) if !rank.beats(&best_rank) => {
                if second.map_or(true, |(_, second_rank)| rank.beats(&second_rank)) {
                    second = Some((backend, rank));
                }
            }
            _ => {
                // the demoted best still outranks whatever was second
                if best.is_some() {
                    second = best;
                }
                best = Some((backend, rank));
            }
        }
    }

    (best.map(|(b, _)| b.clone()), second.map(|(b, _)| b.clone()))
}
