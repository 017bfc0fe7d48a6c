//! Per-attempt deadlines.
//!
//! # Responsibilities
//! - Wrap a transport call with an optional timeout
//! - Report expiry as `TransportError::Timeout` so it scores like any other failure
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; the pending call is dropped on expiry
//! - A deadline set on `RequestInit` wins over the pool default

use std::time::Duration;

use tokio::time;

use crate::transport::{FetchRequest, FetchResponse, RequestInit, Transport, TransportError};

/// Pick the deadline for one attempt.
pub fn effective_deadline(init: Option<&RequestInit>, pool_default: Option<Duration>) -> Option<Duration> {
    init.and_then(|i| i.timeout).or(pool_default)
}

/// Invoke the transport, bounded by `deadline` when one is given.
pub async fn call_with_deadline(
    transport: &dyn Transport,
    request: FetchRequest,
    init: Option<RequestInit>,
    deadline: Option<Duration>,
) -> Result<FetchResponse, TransportError> {
    match deadline {
        Some(limit) => match time::timeout(limit, transport.call(request, init)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(limit)),
        },
        None => transport.call(request, init).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::transport_fn;

    #[test]
    fn test_call_deadline_overrides_pool_default() {
        let init = RequestInit {
            timeout: Some(Duration::from_millis(50)),
            ..RequestInit::default()
        };
        assert_eq!(
            effective_deadline(Some(&init), Some(Duration::from_secs(5))),
            Some(Duration::from_millis(50))
        );
        assert_eq!(
            effective_deadline(Some(&RequestInit::default()), Some(Duration::from_secs(5))),
            Some(Duration::from_secs(5))
        );
        assert_eq!(effective_deadline(None, None), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_transport_times_out() {
        let slow = transport_fn(|_request, _init| async {
            time::sleep(Duration::from_secs(60)).await;
            Ok::<_, TransportError>(FetchResponse::ok("late"))
        });

        let result = call_with_deadline(
            &slow,
            FetchRequest::get("/").unwrap(),
            None,
            Some(Duration::from_millis(100)),
        )
        .await;
        assert!(matches!(result, Err(TransportError::Timeout(d)) if d == Duration::from_millis(100)));
    }

    #[tokio::test]
    async fn test_no_deadline_waits_for_response() {
        let fast = transport_fn(|_request, _init| async {
            Ok::<_, TransportError>(FetchResponse::ok("done"))
        });
        let response = call_with_deadline(&fast, FetchRequest::get("/").unwrap(), None, None)
            .await
            .unwrap();
        assert_eq!(response.text(), "done");
    }
}
