//! HTTP handlers for API endpoints.

use crate::metrics::CycleReport;
use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared handler state: the most recent cycle report.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    latest: Arc<RwLock<Option<CycleReport>>>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the latest report.
    pub async fn publish(&self, report: CycleReport) {
        *self.latest.write().await = Some(report);
    }

    pub async fn latest(&self) -> Option<CycleReport> {
        self.latest.read().await.clone()
    }
}

/// Latest cycle report as JSON, or 503 before the first cycle completes.
pub async fn get_metrics(State(state): State<AppState>) -> Result<Json<CycleReport>, StatusCode> {
    state
        .latest()
        .await
        .map(Json)
        .ok_or(StatusCode::SERVICE_UNAVAILABLE)
}

/// Health check endpoint.
pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let last_cycle = state.latest().await.map(|report| {
        json!({
            "timestamp": report.timestamp,
            "success": report.is_success(),
            "metrics": report.metrics.len(),
        })
    });

    Json(json!({
        "status": "ok",
        "service": "exec-gather",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "last_cycle": last_cycle,
    }))
}
