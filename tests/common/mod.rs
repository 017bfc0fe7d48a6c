//! Shared utilities for integration tests.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use balanced_fetch::{FetchResponse, Transport, TransportError};
use balanced_fetch::transport::transport_fn;
use http::StatusCode;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

/// Start a programmable HTTP/1.1 backend on an ephemeral port.
///
/// The closure receives the request line (`GET /path HTTP/1.1`) and returns
/// the status code and body to send back.
#[allow(dead_code)]
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let (read_half, mut write_half) = socket.into_split();
                        let mut reader = BufReader::new(read_half);

                        let mut request_line = String::new();
                        if reader.read_line(&mut request_line).await.is_err() {
                            return;
                        }
                        // drain headers, then the body so closing doesn't reset the connection
                        let mut content_length = 0usize;
                        loop {
                            let mut line = String::new();
                            match reader.read_line(&mut line).await {
                                Ok(0) => break,
                                Ok(_) if line == "\r\n" => break,
                                Ok(_) => {
                                    if let Some((name, value)) = line.split_once(':') {
                                        if name.eq_ignore_ascii_case("content-length") {
                                            content_length = value.trim().parse().unwrap_or(0);
                                        }
                                    }
                                }
                                Err(_) => return,
                            }
                        }
                        let mut body = vec![0u8; content_length];
                        if reader.read_exact(&mut body).await.is_err() {
                            return;
                        }

                        let (status, body) = f(request_line.trim_end().to_string()).await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = write_half.write_all(response.as_bytes()).await;
                        let _ = write_half.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// In-process transport answering every call with a fixed status and body.
#[allow(dead_code)]
pub fn fixed_transport(status: u16, body: &'static str, calls: Arc<AtomicUsize>) -> Arc<dyn Transport> {
    Arc::new(transport_fn(move |_request, _init| {
        calls.fetch_add(1, Ordering::SeqCst);
        async move {
            Ok::<_, TransportError>(FetchResponse::new(
                StatusCode::from_u16(status).unwrap(),
                body,
            ))
        }
    }))
}

/// In-process transport that always fails without a response.
#[allow(dead_code)]
pub fn failing_transport(calls: Arc<AtomicUsize>) -> Arc<dyn Transport> {
    Arc::new(transport_fn(move |_request, _init| {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Err::<FetchResponse, _>(TransportError::Connect("connection refused".into())) }
    }))
}
