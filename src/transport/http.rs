//! HTTP transport backed by reqwest.
//!
//! # Responsibilities
//! - Rebase the request target onto the backend's base URL
//! - Merge `RequestInit` headers over request headers
//! - Carry status, headers and body back as a `FetchResponse`
//!
//! # Design Decisions
//! - Connection pooling is left to reqwest's client
//! - Any reqwest error maps to a `TransportError`; the status of a
//!   completed exchange is never an error here

use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use url::Url;

use crate::transport::{FetchRequest, FetchResponse, RequestInit, Transport, TransportError};

/// A backend reached over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpTransport {
    /// Parse the base URL and build a transport around a fresh client.
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        let base_url = Url::parse(base_url).map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        Ok(Self::with_client(base_url, reqwest::Client::new()))
    }

    /// Share an existing client between several backends.
    pub fn with_client(base_url: Url, client: reqwest::Client) -> Self {
        Self { base_url, client }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve the outbound URL: the base's scheme and authority, the request's path and query.
    fn resolve(&self, request: &FetchRequest) -> Url {
        let mut url = self.base_url.clone();
        let base_path = self.base_url.path().trim_end_matches('/');
        let path = request.target.path();
        if base_path.is_empty() {
            url.set_path(path);
        } else {
            url.set_path(&format!("{}{}", base_path, path));
        }
        url.set_query(request.target.query());
        url
    }

    async fn send(
        &self,
        request: FetchRequest,
        init: Option<RequestInit>,
    ) -> Result<FetchResponse, TransportError> {
        let url = self.resolve(&request);
        let mut headers = request.headers;
        let mut timeout: Option<Duration> = None;
        if let Some(init) = init {
            for (name, value) in init.headers.iter() {
                headers.insert(name.clone(), value.clone());
            }
            timeout = init.timeout;
        }

        let mut builder = self
            .client
            .request(request.method, url.clone())
            .headers(headers)
            .body(request.body);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        tracing::trace!(url = %url, "Sending upstream request");

        let response = builder.send().await.map_err(|e| map_error(e, timeout))?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| map_error(e, timeout))?;

        Ok(FetchResponse {
            status,
            headers,
            body,
        })
    }
}

fn map_error(error: reqwest::Error, timeout: Option<Duration>) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(timeout.unwrap_or_default())
    } else if error.is_connect() {
        TransportError::Connect(error.to_string())
    } else {
        TransportError::Other(error.to_string())
    }
}

impl Transport for HttpTransport {
    fn call(
        &self,
        request: FetchRequest,
        init: Option<RequestInit>,
    ) -> BoxFuture<'_, Result<FetchResponse, TransportError>> {
        self.send(request, init).boxed()
    }

    fn validate(&self) -> Result<(), String> {
        match self.base_url.scheme() {
            "http" | "https" => {}
            other => return Err(format!("unsupported scheme '{}'", other)),
        }
        if self.base_url.host_str().is_none() {
            return Err("base URL has no host".to_string());
        }
        Ok(())
    }
}
