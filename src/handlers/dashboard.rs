use super::common::{map_service_error, success_response};
use crate::{
    errors::ApiError,
    services::{dashboard_summary, DashboardSummary},
    ApiResponse, AppState,
};
use axum::{extract::State, response::IntoResponse};

/// Request counts by status and department
#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses(
        (status = 200, description = "Dashboard counters", body = ApiResponse<DashboardSummary>),
        (status = 502, description = "Backend unavailable", body = crate::errors::ErrorResponse)
    ),
    tag = "Dashboard"
)]
pub async fn get_dashboard(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let requests = state
        .store
        .refresh_requests()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(dashboard_summary(&requests)))
}
