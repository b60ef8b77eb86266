use super::common::{
    created_response, map_service_error, optional_json, required_json, success_response,
    validate_input,
};
use crate::{
    errors::ApiError,
    models::{NewSupplier, Supplier},
    ApiResponse, AppState,
};
use axum::{
    body::Bytes,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct SupplierFilter {
    /// Main department; suppliers registered under its subdepartments match too.
    pub department: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct DeleteSupplierBody {
    pub id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeletedSupplier {
    pub id: String,
}

/// List suppliers
#[utoipa::path(
    get,
    path = "/api/supplier",
    params(SupplierFilter),
    responses(
        (status = 200, description = "Supplier directory", body = ApiResponse<Vec<Supplier>>),
        (status = 502, description = "Backend unavailable", body = crate::errors::ErrorResponse)
    ),
    tag = "Suppliers"
)]
pub async fn list_suppliers(
    State(state): State<AppState>,
    Query(filter): Query<SupplierFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let suppliers = state
        .store
        .refresh_suppliers()
        .await
        .map_err(map_service_error)?;
    let filtered: Vec<Supplier> = match filter.department.as_deref() {
        Some(department) if !department.is_empty() => suppliers
            .into_iter()
            .filter(|s| s.main_department().eq_ignore_ascii_case(department))
            .collect(),
        _ => suppliers,
    };
    Ok(success_response(filtered))
}

/// Register a supplier
#[utoipa::path(
    post,
    path = "/api/supplier",
    request_body = NewSupplier,
    responses(
        (status = 201, description = "Supplier created", body = ApiResponse<Supplier>),
        (status = 400, description = "Missing name, bad email or unknown department", body = crate::errors::ErrorResponse),
        (status = 502, description = "Backend write failed", body = crate::errors::ErrorResponse)
    ),
    tag = "Suppliers"
)]
pub async fn create_supplier(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let payload: NewSupplier = required_json(&body)?;
    validate_input(&payload)?;

    let created = state
        .store
        .add_supplier(payload)
        .await
        .map_err(map_service_error)?;
    info!(supplier_id = %created.id, department = %created.department, "supplier created");
    Ok(created_response(created))
}

/// Remove a supplier
#[utoipa::path(
    delete,
    path = "/api/supplier",
    request_body = DeleteSupplierBody,
    responses(
        (status = 200, description = "Supplier deleted", body = ApiResponse<DeletedSupplier>),
        (status = 400, description = "id missing", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown supplier", body = crate::errors::ErrorResponse)
    ),
    tag = "Suppliers"
)]
pub async fn delete_supplier(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let payload: DeleteSupplierBody = optional_json(&body)?;
    let id = payload
        .id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Supplier ID is required".to_string()))?;

    let deleted = state
        .store
        .delete_supplier(id.trim())
        .await
        .map_err(map_service_error)?;
    info!(supplier_id = %deleted, "supplier deleted");
    Ok(success_response(DeletedSupplier { id: deleted }))
}
