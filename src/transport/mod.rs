//! Transport abstraction.
//!
//! # Data Flow
//! ```text
//! Pool::fetch(resource)
//!     → Resource normalized into FetchRequest
//!     → dispatcher picks a Backend
//!     → Backend.transport.call(request, init)
//!         - http.rs (reqwest against a base URL)
//!         - fn_transport.rs (any async closure, in-process handlers, test stubs)
//!     → FetchResponse or TransportError
//! ```
//!
//! # Design Decisions
//! - One capability: request in, response or failure out
//! - Transports must tolerate concurrent and repeated calls
//! - A transport failure never leaves the pool; the dispatcher turns it into a 502

pub mod fn_transport;
pub mod http;

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use futures_util::future::BoxFuture;
use ::http::{HeaderMap, Method, StatusCode, Uri};
use thiserror::Error;

pub use fn_transport::{transport_fn, FnTransport};
pub use self::http::HttpTransport;

/// Description of an outbound request.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    /// Absolute URL or origin-relative path (`/v1/items?page=2`).
    pub target: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl FetchRequest {
    pub fn new(method: Method, target: Uri) -> Self {
        Self {
            method,
            target,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Build a GET request from a URL-like string.
    pub fn get(target: &str) -> Result<Self, TransportError> {
        let target = target
            .parse::<Uri>()
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        Ok(Self::new(Method::GET, target))
    }

    pub fn with_header(mut self, name: ::http::HeaderName, value: ::http::HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }
}

/// Secondary options passed through to the transport on every attempt.
#[derive(Debug, Clone, Default)]
pub struct RequestInit {
    /// Extra headers merged over the request headers.
    pub headers: HeaderMap,
    /// Deadline for a single transport invocation.
    pub timeout: Option<Duration>,
}

/// Response produced by a transport or synthesized by the dispatcher.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl FetchResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(StatusCode::OK, body)
    }

    /// Body as UTF-8 text, lossy.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Input accepted by `Pool::fetch`: a URL-like string or a full request.
#[derive(Debug, Clone)]
pub enum Resource {
    Url(String),
    Request(FetchRequest),
}

impl Resource {
    /// Normalize into a request, defaulting the method to GET.
    pub fn into_request(self) -> Result<FetchRequest, TransportError> {
        match self {
            Resource::Url(url) => FetchRequest::get(&url),
            Resource::Request(request) => Ok(request),
        }
    }
}

impl From<&str> for Resource {
    fn from(url: &str) -> Self {
        Resource::Url(url.to_string())
    }
}

impl From<String> for Resource {
    fn from(url: String) -> Self {
        Resource::Url(url)
    }
}

impl From<FetchRequest> for Resource {
    fn from(request: FetchRequest) -> Self {
        Resource::Request(request)
    }
}

/// Errors a transport can report.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection refused, reset, DNS failure and friends.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The attempt exceeded its deadline.
    #[error("transport timed out after {0:?}")]
    Timeout(Duration),

    /// The request could not be turned into something this transport can send.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("transport error: {0}")]
    Other(String),
}

/// A backend capable of serving fetch-like requests.
pub trait Transport: Send + Sync + fmt::Debug {
    /// Perform one request. Must be safe to call concurrently.
    fn call(
        &self,
        request: FetchRequest,
        init: Option<RequestInit>,
    ) -> BoxFuture<'_, Result<FetchResponse, TransportError>>;

    /// Checked once at pool construction; an `Err` rejects the transport.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}
