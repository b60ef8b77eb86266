use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "MRF Portal API",
        version = "0.1.0",
        description = r#"
# Material Request Portal

Site engineers raise material requests (MRFs) against a trade department.
Approvers move a request from `Pending` to `Approved` or `Rejected`; approval
emails every supplier registered for the department. Approved requests can
seed a Local Purchase Order, previewed as JSON or downloaded as PDF.

## Error Handling

Every error uses the same body:

```json
{
  "error": "Conflict",
  "message": "Invalid status: MRF-2508-0042 is Approved and cannot become Rejected",
  "request_id": "0b6f...",
  "timestamp": "2025-08-05T10:30:00Z"
}
```

Send `x-request-id` to correlate logs; it is echoed on every response.
        "#
    ),
    servers((url = "http://localhost:8080", description = "Local development")),
    tags(
        (name = "Material Requests", description = "Submission, approval and export"),
        (name = "Suppliers", description = "Supplier directory"),
        (name = "Notifications", description = "Approval notices"),
        (name = "LPO", description = "Local Purchase Order preview and PDF"),
        (name = "Catalog", description = "Department taxonomy"),
        (name = "Dashboard", description = "Request counters"),
        (name = "Health", description = "Health check endpoints")
    ),
    paths(
        crate::handlers::material_requests::list_requests,
        crate::handlers::material_requests::create_request,
        crate::handlers::material_requests::update_status,
        crate::handlers::material_requests::delete_request,
        crate::handlers::material_requests::approve_request,
        crate::handlers::material_requests::reject_request,
        crate::handlers::material_requests::export_requests,
        crate::handlers::suppliers::list_suppliers,
        crate::handlers::suppliers::create_supplier,
        crate::handlers::suppliers::delete_supplier,
        crate::handlers::notifications::send_notice,
        crate::handlers::catalog::list_departments,
        crate::handlers::lpo::preview_lpo,
        crate::handlers::lpo::render_lpo,
        crate::handlers::dashboard::get_dashboard,
        crate::health::health,
        crate::health::readiness,
    ),
    components(
        schemas(
            crate::models::MaterialRequest,
            crate::models::MaterialLine,
            crate::models::NewMaterialRequest,
            crate::models::RequestStatus,
            crate::models::Supplier,
            crate::models::NewSupplier,
            crate::services::ApprovalOutcome,
            crate::services::NotificationStatus,
            crate::services::DashboardSummary,
            crate::services::StatusCounts,
            crate::notifications::ApprovalNotice,
            crate::notifications::DeliveryReceipt,
            crate::lpo::LpoDraft,
            crate::lpo::LineItem,
            crate::lpo::SupplierBlock,
            crate::lpo::LpoPreview,
            crate::lpo::PreviewLine,
            crate::handlers::material_requests::StatusUpdateRequest,
            crate::handlers::material_requests::DeleteRequestBody,
            crate::handlers::material_requests::ApproveRequestBody,
            crate::handlers::material_requests::DeletedRequest,
            crate::handlers::suppliers::DeleteSupplierBody,
            crate::handlers::suppliers::DeletedSupplier,
            crate::handlers::lpo::LpoRequest,
            crate::health::HealthInfo,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
