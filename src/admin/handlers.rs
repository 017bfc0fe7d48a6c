use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::load_balancer::{BackendSnapshot, Pool, ScoringConfig};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub backends: usize,
    pub total_requests: u64,
}

pub async fn get_status(State(pool): State<Arc<Pool>>) -> Json<SystemStatus> {
    let total_requests = pool.backends().iter().map(|b| b.request_count()).sum();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        backends: pool.len(),
        total_requests,
    })
}

pub async fn get_backends(State(pool): State<Arc<Pool>>) -> Json<Vec<BackendSnapshot>> {
    Json(pool.snapshot())
}

pub async fn get_backend(
    State(pool): State<Arc<Pool>>,
    Path(index): Path<usize>,
) -> Result<Json<BackendSnapshot>, StatusCode> {
    pool.backends()
        .get(index)
        .map(|b| Json(b.snapshot()))
        .ok_or(StatusCode::NOT_FOUND)
}

pub async fn get_scoring(State(pool): State<Arc<Pool>>) -> Json<ScoringConfig> {
    Json((*pool.scoring()).clone())
}
