use super::common::{
    attachment_response, created_response, map_service_error, optional_json, required_json,
    success_response, validate_input,
};
use crate::{
    errors::ApiError,
    export,
    models::{MaterialRequest, NewMaterialRequest, RequestKey, RequestStatus},
    services::ApprovalOutcome,
    ApiResponse, AppState,
};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct RequestFilter {
    /// Pending, Approved or Rejected
    pub status: Option<RequestStatus>,
    pub department: Option<String>,
}

impl RequestFilter {
    fn accepts(&self, request: &MaterialRequest) -> bool {
        self.status.map_or(true, |s| request.status == s)
            && self
                .department
                .as_deref()
                .map_or(true, |d| request.department.eq_ignore_ascii_case(d))
    }
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
    pub mrf_number: Option<String>,
    pub status: Option<RequestStatus>,
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequestBody {
    pub mrf_number: Option<String>,
    pub id: Option<Uuid>,
}

impl DeleteRequestBody {
    fn key(self) -> Option<RequestKey> {
        match (self.mrf_number, self.id) {
            (Some(number), _) if !number.trim().is_empty() => {
                Some(RequestKey::Number(number.trim().to_string()))
            }
            (_, Some(id)) => Some(RequestKey::Id(id)),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApproveRequestBody {
    /// Narrows the supplier audience to these subdepartments.
    pub subdepartments: Option<Vec<String>>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeletedRequest {
    pub mrf_number: String,
}

/// List material requests, refreshed from the backend
#[utoipa::path(
    get,
    path = "/api/material-request",
    params(RequestFilter),
    responses(
        (status = 200, description = "Material requests", body = ApiResponse<Vec<MaterialRequest>>),
        (status = 502, description = "Backend unavailable", body = crate::errors::ErrorResponse)
    ),
    tag = "Material Requests"
)]
pub async fn list_requests(
    State(state): State<AppState>,
    Query(filter): Query<RequestFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let requests = state
        .store
        .refresh_requests()
        .await
        .map_err(map_service_error)?;
    let filtered: Vec<MaterialRequest> =
        requests.into_iter().filter(|r| filter.accepts(r)).collect();
    Ok(success_response(filtered))
}

/// Submit a new material request
#[utoipa::path(
    post,
    path = "/api/material-request",
    request_body = NewMaterialRequest,
    responses(
        (status = 201, description = "Request stored as Pending", body = ApiResponse<MaterialRequest>),
        (status = 400, description = "Missing or invalid fields", body = crate::errors::ErrorResponse),
        (status = 409, description = "No unique request number available", body = crate::errors::ErrorResponse),
        (status = 502, description = "Backend write failed", body = crate::errors::ErrorResponse)
    ),
    tag = "Material Requests"
)]
pub async fn create_request(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let payload: NewMaterialRequest = required_json(&body)?;
    validate_input(&payload)?;
    let stored = state
        .lifecycle
        .submit(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(stored))
}

/// Change a request's status
#[utoipa::path(
    patch,
    path = "/api/material-request",
    request_body = StatusUpdateRequest,
    responses(
        (status = 200, description = "Updated request", body = ApiResponse<MaterialRequest>),
        (status = 400, description = "mrfNumber or status missing", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Transition not allowed", body = crate::errors::ErrorResponse)
    ),
    tag = "Material Requests"
)]
pub async fn update_status(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let payload: StatusUpdateRequest = optional_json(&body)?;
    let (Some(mrf_number), Some(status)) = (payload.mrf_number, payload.status) else {
        return Err(ApiError::BadRequest(
            "mrfNumber and status are required".to_string(),
        ));
    };

    let updated = state
        .lifecycle
        .set_status(&RequestKey::Number(mrf_number), status)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(updated))
}

/// Delete a request by number or id
#[utoipa::path(
    delete,
    path = "/api/material-request",
    request_body = DeleteRequestBody,
    responses(
        (status = 200, description = "Request deleted", body = ApiResponse<DeletedRequest>),
        (status = 400, description = "Neither mrfNumber nor id given", body = crate::errors::ErrorResponse),
        (status = 404, description = "Nothing deleted", body = crate::errors::ErrorResponse)
    ),
    tag = "Material Requests"
)]
pub async fn delete_request(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let payload: DeleteRequestBody = optional_json(&body)?;
    let key = payload
        .key()
        .ok_or_else(|| ApiError::BadRequest("mrfNumber or id is required".to_string()))?;

    let mrf_number = state
        .lifecycle
        .delete(&key)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(DeletedRequest { mrf_number }))
}

/// Approve a pending request and notify matching suppliers
#[utoipa::path(
    post,
    path = "/api/material-request/{mrf_number}/approve",
    params(("mrf_number" = String, Path, description = "Request number, e.g. MRF-2508-0042")),
    request_body(content = ApproveRequestBody, description = "Optional subdepartment filter"),
    responses(
        (status = 200, description = "Approved", body = ApiResponse<ApprovalOutcome>),
        (status = 404, description = "Unknown request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Request is not Pending", body = crate::errors::ErrorResponse),
        (status = 502, description = "Backend or notification failure", body = crate::errors::ErrorResponse)
    ),
    tag = "Material Requests"
)]
pub async fn approve_request(
    State(state): State<AppState>,
    Path(mrf_number): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let payload: ApproveRequestBody = optional_json(&body)?;
    let outcome = state
        .lifecycle
        .approve(
            &RequestKey::Number(mrf_number),
            payload.subdepartments.as_deref(),
        )
        .await
        .map_err(map_service_error)?;
    Ok(success_response(outcome))
}

/// Reject a pending request
#[utoipa::path(
    post,
    path = "/api/material-request/{mrf_number}/reject",
    params(("mrf_number" = String, Path, description = "Request number")),
    responses(
        (status = 200, description = "Rejected", body = ApiResponse<MaterialRequest>),
        (status = 404, description = "Unknown request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Request is not Pending", body = crate::errors::ErrorResponse)
    ),
    tag = "Material Requests"
)]
pub async fn reject_request(
    State(state): State<AppState>,
    Path(mrf_number): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let rejected = state
        .lifecycle
        .reject(&RequestKey::Number(mrf_number))
        .await
        .map_err(map_service_error)?;
    Ok(success_response(rejected))
}

/// Download every request as CSV
#[utoipa::path(
    get,
    path = "/api/material-request/export.csv",
    params(RequestFilter),
    responses(
        (status = 200, description = "CSV attachment", content_type = "text/csv"),
        (status = 502, description = "Backend unavailable", body = crate::errors::ErrorResponse)
    ),
    tag = "Material Requests"
)]
pub async fn export_requests(
    State(state): State<AppState>,
    Query(filter): Query<RequestFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let requests: Vec<MaterialRequest> = state
        .store
        .refresh_requests()
        .await
        .map_err(map_service_error)?
        .into_iter()
        .filter(|r| filter.accepts(r))
        .collect();
    let csv = export::requests_to_csv(&requests).map_err(map_service_error)?;
    let file_name = export::export_file_name();
    info!(rows = requests.len(), file = %file_name, "material requests exported");
    Ok(attachment_response(
        "text/csv; charset=utf-8",
        &file_name,
        csv.into_bytes(),
    ))
}
