//! Retry/dispatch loop.
//!
//! # Responsibilities
//! - Choose a backend per attempt (two best untried, then a coin flip)
//! - Keep each backend's statistics and scores current
//! - Retry idempotent requests on 5xx and transport failures
//! - Resolve every path to a response

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use tracing::Instrument;
use uuid::Uuid;

use crate::dispatch::response;
use crate::load_balancer::backend::{Backend, BackendStats, TRANSPORT_FAILURE_STATUS};
use crate::load_balancer::pool::Pool;
use crate::load_balancer::scoring::{now_millis, score_backend, Scores, ScoringConfig};
use crate::load_balancer::selector::{choose_backends, AttemptSet};
use crate::observability::metrics;
use crate::resilience::retries::is_retryable;
use crate::resilience::timeouts::{call_with_deadline, effective_deadline};
use crate::transport::{FetchResponse, RequestInit, Resource};

/// Route one logical call through the pool.
pub async fn dispatch(pool: &Pool, resource: Resource, init: Option<RequestInit>) -> FetchResponse {
    let request = match resource.into_request() {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(error = %e, "Rejecting unparseable request target");
            return response::invalid_request(&e.to_string());
        }
    };

    let call_id = Uuid::new_v4();
    let span = tracing::debug_span!(
        "dispatch",
        call_id = %call_id,
        method = %request.method,
        target = %request.target,
    );

    async move {
        let retryable = is_retryable(&request.method);
        let scoring = pool.scoring();
        let deadline = effective_deadline(init.as_ref(), pool.default_timeout());
        let mut attempted = AttemptSet::new();

        loop {
            let backend = match choose_backends(pool.backends(), &attempted) {
                (Some(best), Some(second)) => pick_one(best, second),
                (Some(only), None) => only,
                (None, _) if attempted.is_empty() => {
                    tracing::warn!("No backend available");
                    metrics::record_exhausted("no_backend");
                    return response::no_backend_available();
                }
                (None, _) => {
                    tracing::warn!(attempts = attempted.len(), "All backends failed");
                    metrics::record_exhausted("all_failed");
                    return response::pool_exhausted();
                }
            };

            {
                let mut stats = backend.stats();
                if stats.is_stale() {
                    rescore(&backend, &mut stats, &scoring, now_millis());
                }
                stats.request_count += 1;
            }
            attempted.insert(&backend);

            let started = Instant::now();
            let outcome = call_with_deadline(
                backend.transport().as_ref(),
                request.clone(),
                init.clone(),
                deadline,
            )
            .await;
            let elapsed = started.elapsed();

            let (response, status, latency_ms) = match outcome {
                Ok(response) => {
                    let status = response.status.as_u16();
                    (response, status, latency_sample(elapsed))
                }
                Err(e) => {
                    tracing::warn!(backend = %backend.name(), error = %e, "Transport failed");
                    (response::upstream_failed(), TRANSPORT_FAILURE_STATUS, 0)
                }
            };

            let is_error = record_outcome(&backend, status, latency_ms, &scoring);
            metrics::record_attempt(backend.name(), status, elapsed);

            tracing::debug!(
                backend = %backend.name(),
                status,
                latency_ms,
                "Attempt finished"
            );

            if !is_error {
                return response;
            }
            if !retryable {
                tracing::debug!(status, "Not retrying non-idempotent request");
                return response;
            }

            metrics::record_retry();
            tracing::info!(
                backend = %backend.name(),
                status,
                attempt = attempted.len(),
                "Retrying on another backend"
            );
        }
    }
    .instrument(span)
    .await
}

/// Split traffic evenly between the two best candidates.
fn pick_one(best: Arc<Backend>, second: Arc<Backend>) -> Arc<Backend> {
    if rand::thread_rng().gen_bool(0.5) {
        best
    } else {
        second
    }
}

/// Milliseconds for a completed exchange; at least 1 so it counts as a sample.
fn latency_sample(elapsed: Duration) -> u64 {
    (elapsed.as_millis() as u64).max(1)
}

/// Store the attempt and rescore on error, as one locked unit.
fn record_outcome(
    backend: &Backend,
    status: u16,
    latency_ms: u64,
    scoring: &ScoringConfig,
) -> bool {
    let now = now_millis();
    let mut stats = backend.stats();
    let is_error = stats.record(status, latency_ms, now);
    if is_error {
        rescore(backend, &mut stats, scoring, now);
    }
    is_error
}

/// Score `stats` (the locked statistics of `backend`) and publish the result.
fn rescore(backend: &Backend, stats: &mut BackendStats, scoring: &ScoringConfig, now_ms: u64) -> Scores {
    let scores = score_backend(stats, scoring, now_ms);
    // left stale when there were too few samples to score
    if !stats.is_stale() {
        metrics::record_backend_score(backend.name(), stats.score);
        tracing::debug!(
            backend = %backend.name(),
            health = scores.health,
            latency = scores.latency,
            score = stats.score,
            "Backend rescored"
        );
    }
    scores
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use http::{Method, StatusCode, Uri};

    use crate::transport::{transport_fn, FetchRequest, Transport, TransportError};

    fn status_transport(status: u16, body: &'static str, calls: Arc<AtomicUsize>) -> Arc<dyn Transport> {
        Arc::new(transport_fn(move |_request, _init| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                Ok::<_, TransportError>(FetchResponse::new(
                    StatusCode::from_u16(status).unwrap_or(StatusCode::OK),
                    body,
                ))
            }
        }))
    }

    fn total_requests(pool: &Pool) -> u64 {
        pool.backends().iter().map(|b| b.request_count()).sum()
    }

    #[tokio::test]
    async fn test_success_returned_after_single_attempt() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pool = Pool::new(
            vec![status_transport(200, "ok", calls.clone())],
            ScoringConfig::default(),
        )
        .unwrap();

        let response = pool.fetch("/items", None).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.text(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(total_requests(&pool), 1);
    }

    #[tokio::test]
    async fn test_post_not_retried_on_server_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pool = Pool::new(
            vec![
                status_transport(500, "boom", calls.clone()),
                status_transport(500, "boom", calls.clone()),
                status_transport(500, "boom", calls.clone()),
            ],
            ScoringConfig::default(),
        )
        .unwrap();

        let request = FetchRequest::new(Method::POST, Uri::from_static("/orders")).with_body("{}");
        let response = pool.fetch(request, None).await;

        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.text(), "boom");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(total_requests(&pool), 1);
    }

    #[tokio::test]
    async fn test_client_error_not_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pool = Pool::new(
            vec![
                status_transport(404, "missing", calls.clone()),
                status_transport(404, "missing", calls.clone()),
            ],
            ScoringConfig::default(),
        )
        .unwrap();

        let response = pool.fetch("/nope", None).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(total_requests(&pool), 1);
    }

    #[tokio::test]
    async fn test_get_exhausts_pool_then_reports_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pool = Pool::new(
            vec![
                status_transport(503, "down", calls.clone()),
                status_transport(500, "down", calls.clone()),
                status_transport(502, "down", calls.clone()),
            ],
            ScoringConfig::default(),
        )
        .unwrap();

        let response = pool.fetch("/", None).await;
        assert_eq!(response.status, StatusCode::BAD_GATEWAY);
        assert_eq!(response.text(), "Unable to reach any backend");
        // each backend exactly once
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        for backend in pool.backends() {
            assert_eq!(backend.request_count(), 1);
            assert_ne!(backend.stats().last_error, 0);
        }
    }

    #[tokio::test]
    async fn test_head_is_retried() {
        let failing = Arc::new(AtomicUsize::new(0));
        let healthy = Arc::new(AtomicUsize::new(0));
        let pool = Pool::new(
            vec![
                status_transport(500, "", failing.clone()),
                status_transport(200, "", healthy.clone()),
            ],
            ScoringConfig::default(),
        )
        .unwrap();

        for _ in 0..10 {
            let request = FetchRequest::new(Method::HEAD, Uri::from_static("/"));
            let response = pool.fetch(request, None).await;
            assert_eq!(response.status, StatusCode::OK);
        }
        assert_eq!(healthy.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_transport_failure_recorded_as_sentinel() {
        let pool = Pool::new(
            vec![Arc::new(transport_fn(|_request, _init| async {
                Err::<FetchResponse, _>(TransportError::Connect("refused".into()))
            })) as Arc<dyn Transport>],
            ScoringConfig::default(),
        )
        .unwrap();

        let request = FetchRequest::new(Method::PUT, Uri::from_static("/doc"));
        let response = pool.fetch(request, None).await;
        assert_eq!(response.status, StatusCode::BAD_GATEWAY);
        assert_eq!(response.text(), "Upstream request failed");

        let stats = pool.backends()[0].stats_snapshot();
        assert_eq!(stats.statuses.to_vec().last(), Some(&TRANSPORT_FAILURE_STATUS));
        assert_eq!(stats.latencies.to_vec().last(), Some(&0));
        assert_eq!(stats.error_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_expiry_counts_as_failure() {
        let hung: Arc<dyn Transport> = Arc::new(transport_fn(|_request, _init| async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok::<_, TransportError>(FetchResponse::ok("never"))
        }));
        let pool = Pool::builder()
            .transport("hung", hung)
            .default_timeout(Some(Duration::from_millis(200)))
            .build()
            .unwrap();

        let response = pool.fetch("/", None).await;
        assert_eq!(response.status, StatusCode::BAD_GATEWAY);
        assert_eq!(response.text(), "Unable to reach any backend");

        let stats = pool.backends()[0].stats_snapshot();
        assert_eq!(stats.request_count, 1);
        assert_eq!(stats.latencies.to_vec().last(), Some(&0));
        assert_ne!(stats.last_error, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_deadline_overrides_pool_default() {
        let slow: Arc<dyn Transport> = Arc::new(transport_fn(|_request, _init| async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Ok::<_, TransportError>(FetchResponse::ok("slow but fine"))
        }));
        let pool = Pool::builder()
            .transport("slow", slow)
            .default_timeout(Some(Duration::from_secs(1)))
            .build()
            .unwrap();

        let init = RequestInit {
            timeout: Some(Duration::from_secs(5)),
            ..RequestInit::default()
        };
        let response = pool.fetch("/", Some(init)).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.text(), "slow but fine");
    }

    #[tokio::test]
    async fn test_invalid_target_touches_no_backend() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pool = Pool::new(
            vec![status_transport(200, "ok", calls.clone())],
            ScoringConfig::default(),
        )
        .unwrap();

        let response = pool.fetch("http://bad host/", None).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stale_backend_rescored_before_dispatch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pool = Pool::new(
            vec![status_transport(200, "ok", calls.clone())],
            ScoringConfig::default(),
        )
        .unwrap();

        for _ in 0..3 {
            pool.fetch("/", None).await;
        }
        let stats = pool.backends()[0].stats_snapshot();
        assert_eq!(stats.request_count, 3);
        // rescored before the third attempt, with two samples on record
        assert_eq!(stats.scored_request_count, 2);
        assert!(stats.is_stale());
        assert_eq!(stats.health_score, 1.0);
    }

    #[test]
    fn test_server_error_rescores_and_drops_backend_from_top_two() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pool = Pool::new(
            vec![
                status_transport(200, "a", calls.clone()),
                status_transport(200, "b", calls.clone()),
                status_transport(200, "c", calls.clone()),
            ],
            ScoringConfig::default(),
        )
        .unwrap();
        let scoring = pool.scoring();
        let flaky = &pool.backends()[0];

        // two good samples, then a third attempt in flight
        {
            let mut stats = flaky.stats();
            let now = now_millis();
            stats.record(200, 20, now);
            stats.record(200, 20, now);
            stats.request_count = 3;
            stats.scored_request_count = 2;
        }

        assert!(record_outcome(flaky, 500, 20, &scoring));

        let stats = flaky.stats_snapshot();
        assert_ne!(stats.last_error, 0);
        assert_eq!(stats.scored_request_count, stats.request_count);
        assert_eq!(stats.health_score, 0.67);
        assert_eq!(stats.latency_score, 0.0);
        assert!(flaky.score() < 1.0);

        let (best, second) = choose_backends(pool.backends(), &AttemptSet::new());
        let mut picked = vec![best.unwrap().index(), second.unwrap().index()];
        picked.sort_unstable();
        assert_eq!(picked, vec![1, 2]);
    }

    #[test]
    fn test_success_does_not_rescore() {
        let pool = Pool::new(
            vec![status_transport(200, "ok", Arc::new(AtomicUsize::new(0)))],
            ScoringConfig::default(),
        )
        .unwrap();
        let backend = &pool.backends()[0];
        {
            let mut stats = backend.stats();
            stats.record(200, 10, now_millis());
            stats.request_count = 2;
            stats.scored_request_count = 1;
        }

        assert!(!record_outcome(backend, 200, 10, &pool.scoring()));
        let stats = backend.stats_snapshot();
        assert!(stats.is_stale());
        assert_eq!(stats.last_error, 0);
    }

    #[test]
    fn test_rescore_clears_staleness_once_enough_samples() {
        let pool = Pool::new(
            vec![status_transport(200, "ok", Arc::new(AtomicUsize::new(0)))],
            ScoringConfig::default(),
        )
        .unwrap();
        let backend = &pool.backends()[0];
        let scoring = pool.scoring();

        let mut stats = backend.stats();
        stats.record(200, 15, 0);
        stats.request_count = 1;
        assert_eq!(rescore(backend, &mut stats, &scoring, now_millis()), Scores::ZERO);
        assert!(stats.is_stale());

        stats.record(200, 15, 0);
        stats.request_count = 2;
        let scores = rescore(backend, &mut stats, &scoring, now_millis());
        assert!(!stats.is_stale());
        assert_eq!(scores.combined, 1.0);
        assert_eq!(stats.score, 1.0);
    }

    #[tokio::test]
    async fn test_transport_failure_after_samples_lowers_score() {
        let fail = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let switch = fail.clone();
        let pool = Pool::new(
            vec![Arc::new(transport_fn(move |_request, _init| {
                let failing = switch.load(Ordering::SeqCst);
                async move {
                    if failing {
                        Err(TransportError::Connect("reset".into()))
                    } else {
                        Ok(FetchResponse::ok("ok"))
                    }
                }
            })) as Arc<dyn Transport>],
            ScoringConfig::default(),
        )
        .unwrap();

        for _ in 0..3 {
            pool.fetch("/", None).await;
        }
        fail.store(true, Ordering::SeqCst);
        let response = pool.fetch("/", None).await;
        assert_eq!(response.status, StatusCode::BAD_GATEWAY);

        let stats = pool.backends()[0].stats_snapshot();
        assert_eq!(stats.statuses.to_vec().last(), Some(&TRANSPORT_FAILURE_STATUS));
        assert_eq!(stats.scored_request_count, stats.request_count);
        assert!(stats.health_score < 1.0);
        assert!(stats.score < 1.0);
    }

    #[test]
    fn test_latency_sample_never_zero_for_responses() {
        assert_eq!(latency_sample(Duration::from_micros(300)), 1);
        assert_eq!(latency_sample(Duration::from_millis(42)), 42);
    }
}
