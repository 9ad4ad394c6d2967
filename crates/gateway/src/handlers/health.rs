//! Health check handlers

use axum::{extract::State, Json};
use serde::Serialize;
use crate::AppState;
use swai_common::cache::NamespaceStats;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub version: &'static str,
    pub catalog: String,
    pub cache: Vec<NamespaceStats>,
}

/// Liveness check, healthy whenever the server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

/// Readiness check, reports the catalog provider and cache occupancy
pub async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    Json(ReadyResponse {
        status: "ready".to_string(),
        version: swai_common::VERSION,
        catalog: state.aggregator.catalog().provider().to_string(),
        cache: state.aggregator.cache().stats(),
    })
}
