use super::common::success_response;
use crate::catalog;
use axum::response::IntoResponse;

/// Departments with their subdepartments
#[utoipa::path(
    get,
    path = "/api/catalog/departments",
    responses((status = 200, description = "Trade taxonomy in catalog order")),
    tag = "Catalog"
)]
pub async fn list_departments() -> impl IntoResponse {
    success_response(catalog::department_tree())
}
