use super::common::{map_service_error, required_json, success_response, validate_input};
use crate::{
    errors::ApiError,
    notifications::{ApprovalNotice, DeliveryReceipt},
    ApiResponse, AppState,
};
use axum::{body::Bytes, extract::State, response::IntoResponse};
use tracing::info;

/// Send an approval notice to an explicit recipient list
#[utoipa::path(
    post,
    path = "/api/send",
    request_body = ApprovalNotice,
    responses(
        (status = 200, description = "Notice accepted by the provider", body = ApiResponse<DeliveryReceipt>),
        (status = 400, description = "Recipients missing or empty", body = crate::errors::ErrorResponse),
        (status = 502, description = "Provider rejected the message", body = crate::errors::ErrorResponse)
    ),
    tag = "Notifications"
)]
pub async fn send_notice(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let notice: ApprovalNotice = required_json(&body)?;
    if notice.recipients.is_empty() {
        return Err(ApiError::BadRequest(
            "Recipients array is required and cannot be empty".to_string(),
        ));
    }
    validate_input(&notice)?;

    let receipt = state
        .lifecycle
        .send_notice(&notice)
        .await
        .map_err(map_service_error)?;
    info!(mrf_number = %notice.mrf_number, recipients = receipt.recipients, "notice sent");
    Ok(success_response(receipt))
}
