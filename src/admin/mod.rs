//! Read-only diagnostics endpoint.
//!
//! Serves the pool's backend records (counts, buffers, scores) as JSON for
//! monitoring. Nothing here feeds back into dispatch.

pub mod handlers;

use std::sync::Arc;

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::lifecycle::Shutdown;
use crate::load_balancer::Pool;
use self::handlers::*;

pub fn setup_admin_router(pool: Arc<Pool>) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/backends", get(get_backends))
        .route("/admin/backends/{index}", get(get_backend))
        .route("/admin/scoring", get(get_scoring))
        .layer(TraceLayer::new_for_http())
        .with_state(pool)
}

/// Serve diagnostics until `shutdown` triggers.
pub async fn serve(listener: TcpListener, pool: Arc<Pool>, shutdown: &Shutdown) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "Diagnostics endpoint starting");

    axum::serve(listener, setup_admin_router(pool))
        .with_graceful_shutdown(shutdown.wait())
        .await?;

    tracing::info!("Diagnostics endpoint stopped");
    Ok(())
}
