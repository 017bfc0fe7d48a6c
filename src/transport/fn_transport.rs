//! Closure-backed transport.
//!
//! Wraps any async function with the transport signature, so in-process
//! handlers and test stubs can sit in a pool next to real HTTP backends.

use std::fmt;
use std::future::Future;

use futures_util::future::{BoxFuture, FutureExt};

use crate::transport::{FetchRequest, FetchResponse, RequestInit, Transport, TransportError};

/// Transport delegating every call to a closure.
pub struct FnTransport<F> {
    label: String,
    f: F,
}

impl<F> FnTransport<F> {
    pub fn new(label: impl Into<String>, f: F) -> Self {
        Self {
            label: label.into(),
            f,
        }
    }
}

impl<F> fmt::Debug for FnTransport<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTransport").field("label", &self.label).finish()
    }
}

impl<F, Fut> Transport for FnTransport<F>
where
    F: Fn(FetchRequest, Option<RequestInit>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<FetchResponse, TransportError>> + Send + 'static,
{
    fn call(
        &self,
        request: FetchRequest,
        init: Option<RequestInit>,
    ) -> BoxFuture<'_, Result<FetchResponse, TransportError>> {
        (self.f)(request, init).boxed()
    }
}

/// Shorthand for an unlabeled closure transport.
pub fn transport_fn<F, Fut>(f: F) -> FnTransport<F>
where
    F: Fn(FetchRequest, Option<RequestInit>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<FetchResponse, TransportError>> + Send + 'static,
{
    FnTransport::new("fn", f)
}
