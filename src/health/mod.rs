/*!
 * # Health Check Module
 *
 * - Liveness (`/health`): process is up, with cached collection sizes
 * - Readiness (`/health/ready`): the content backend answers a supplier fetch
 */

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::warn;
use utoipa::ToSchema;

use crate::AppState;

lazy_static::lazy_static! {
    static ref STARTED: Instant = Instant::now();
}

/// Basic health status
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    Down,
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct HealthDetail {
    pub status: HealthStatus,
    pub message: Option<String>,
}

/// Overall health information
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct HealthInfo {
    pub status: HealthStatus,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub details: BTreeMap<String, HealthDetail>,
}

impl HealthInfo {
    fn new(status: HealthStatus, details: BTreeMap<String, HealthDetail>) -> Self {
        Self {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now(),
            uptime_seconds: STARTED.elapsed().as_secs(),
            details,
        }
    }
}

fn detail(status: HealthStatus, message: impl Into<String>) -> HealthDetail {
    HealthDetail {
        status,
        message: Some(message.into()),
    }
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is running", body = HealthInfo)),
    tag = "Health"
)]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let mut details = BTreeMap::new();
    details.insert(
        "backend".to_string(),
        detail(HealthStatus::Up, state.config.backend.kind.clone()),
    );
    details.insert(
        "cache".to_string(),
        detail(
            HealthStatus::Up,
            format!(
                "{} requests, {} suppliers",
                state.store.request_count().await,
                state.store.suppliers().await.len()
            ),
        ),
    );
    Json(HealthInfo::new(HealthStatus::Up, details))
}

/// Readiness probe; fails with 503 when the backend cannot be reached
#[utoipa::path(
    get,
    path = "/health/ready",
    responses(
        (status = 200, description = "Backend reachable", body = HealthInfo),
        (status = 503, description = "Backend unreachable", body = HealthInfo)
    ),
    tag = "Health"
)]
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let mut details = BTreeMap::new();
    let (code, status) = match state.store.refresh_suppliers().await {
        Ok(suppliers) => {
            details.insert(
                "backend".to_string(),
                detail(HealthStatus::Up, format!("{} suppliers", suppliers.len())),
            );
            (StatusCode::OK, HealthStatus::Up)
        }
        Err(err) => {
            warn!(error = %err, "readiness check failed");
            details.insert(
                "backend".to_string(),
                detail(HealthStatus::Down, err.response_message()),
            );
            (StatusCode::SERVICE_UNAVAILABLE, HealthStatus::Down)
        }
    };
    (code, Json(HealthInfo::new(status, details)))
}
