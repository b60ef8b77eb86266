use super::common::{attachment_response, map_service_error, required_json, success_response, validate_input};
use crate::{
    errors::{ApiError, ServiceError},
    lpo::{self, layout, LayoutOptions, LpoDraft, LpoPreview},
    metrics::WorkflowMetrics,
    models::RequestKey,
    ApiResponse, AppState,
};
use axum::{body::Bytes, extract::State, response::IntoResponse};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

/// Draft fields plus an optional approved request to seed the items from.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LpoRequest {
    #[serde(flatten)]
    pub draft: LpoDraft,
    pub mrf_number: Option<String>,
}

async fn prepare_draft(state: &AppState, request: LpoRequest) -> Result<LpoDraft, ApiError> {
    let mut draft = request.draft;
    if let Some(number) = request.mrf_number.filter(|n| !n.trim().is_empty()) {
        let source = state
            .store
            .find(&RequestKey::Number(number.trim().to_string()))
            .await
            .map_err(map_service_error)?;
        draft.import_request(&source).map_err(map_service_error)?;
    }
    validate_input(&draft)?;
    Ok(draft)
}

async fn load_logo(path: Option<&str>) -> Option<Vec<u8>> {
    let path = path?;
    match tokio::fs::read(path).await {
        Ok(bytes) => Some(bytes),
        Err(err) => {
            warn!(path, error = %err, "company logo unreadable; rendering without it");
            None
        }
    }
}

/// Compute line totals, VAT and the amount in words
#[utoipa::path(
    post,
    path = "/api/lpo/preview",
    request_body = LpoRequest,
    responses(
        (status = 200, description = "Computed draft", body = ApiResponse<LpoPreview>),
        (status = 400, description = "Invalid line items", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown mrfNumber", body = crate::errors::ErrorResponse),
        (status = 409, description = "Request is not Approved", body = crate::errors::ErrorResponse)
    ),
    tag = "LPO"
)]
pub async fn preview_lpo(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let request: LpoRequest = required_json(&body)?;
    let draft = prepare_draft(&state, request).await?;
    Ok(success_response(draft.preview(&state.config.currency)))
}

/// Render the LPO as a PDF download
#[utoipa::path(
    post,
    path = "/api/lpo/pdf",
    request_body = LpoRequest,
    responses(
        (status = 200, description = "PDF attachment LPO-<number>.pdf", content_type = "application/pdf"),
        (status = 400, description = "Invalid line items", body = crate::errors::ErrorResponse),
        (status = 409, description = "Request is not Approved", body = crate::errors::ErrorResponse),
        (status = 500, description = "Rendering failed", body = crate::errors::ErrorResponse)
    ),
    tag = "LPO"
)]
pub async fn render_lpo(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let request: LpoRequest = required_json(&body)?;
    let draft = prepare_draft(&state, request).await?;

    let company = state.config.company.clone();
    let logo = load_logo(company.logo_path.as_deref()).await;
    let options = LayoutOptions {
        currency: state.config.currency.clone(),
        include_logo: logo.is_some(),
    };
    let file_name = draft.file_name();

    let (pages, bytes) = tokio::task::spawn_blocking(move || {
        let document = layout::build(&draft, &company, &options);
        lpo::render_pdf(&document, logo.as_deref()).map(|bytes| (document.page_count(), bytes))
    })
    .await
    .map_err(|e| ServiceError::InternalError(format!("render task failed: {}", e)))?
    .map_err(ServiceError::from)?;

    WorkflowMetrics::record_document_rendered(pages);
    info!(file = %file_name, pages, bytes = bytes.len(), "LPO rendered");
    Ok(attachment_response("application/pdf", &file_name, bytes))
}
