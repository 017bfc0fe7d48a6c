//! Retry eligibility.
//!
//! # Design Decisions
//! - Never retry POST/PUT/DELETE/PATCH (non-idempotent)
//! - Only exact `GET` / `HEAD`; `get` parses as an extension method and is not retried
//! - Only 5xx and transport failures trigger a retry; anything below 500 is final

use http::Method;

/// True if a failed attempt with this method may be replayed on another backend.
pub fn is_retryable(method: &Method) -> bool {
    *method == Method::GET || *method == Method::HEAD
}

/// True if a recorded status counts against the backend (5xx, including
/// the transport failure sentinel).
pub fn is_server_error(status: u16) -> bool {
    (500..600).contains(&status)
}
