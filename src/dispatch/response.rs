//! Responses synthesized by the dispatcher.
//!
//! Every failure path ends in one of these, so callers always receive a
//! status code and never an error.

use http::StatusCode;

use crate::transport::FetchResponse;

/// Stand-in for a transport call that produced no response.
pub fn upstream_failed() -> FetchResponse {
    FetchResponse::new(StatusCode::BAD_GATEWAY, "Upstream request failed")
}

/// No untried backend was available on the first selection.
pub fn no_backend_available() -> FetchResponse {
    FetchResponse::new(StatusCode::BAD_GATEWAY, "No backend available")
}

/// Every backend was attempted and none produced a non-5xx response.
pub fn pool_exhausted() -> FetchResponse {
    FetchResponse::new(StatusCode::BAD_GATEWAY, "Unable to reach any backend")
}

/// The caller's target could not be parsed into a request.
pub fn invalid_request(reason: &str) -> FetchResponse {
    FetchResponse::new(StatusCode::BAD_REQUEST, format!("Invalid request: {}", reason))
}
