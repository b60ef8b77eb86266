use crate::tracing::RequestId;
use axum::{
    extract::Request,
    http::{header::HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_INBOUND_ID_LEN: usize = 128;

/// Accept a caller supplied id only when it is short printable ASCII.
fn inbound_request_id(request: &Request) -> Option<RequestId> {
    let raw = request.headers().get(REQUEST_ID_HEADER)?.to_str().ok()?;
    let trimmed = raw.trim();
    let usable = !trimmed.is_empty()
        && trimmed.len() <= MAX_INBOUND_ID_LEN
        && trimmed
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b':'));
    usable.then(|| RequestId::new(trimmed))
}

/// Tags every request with an id, exposes it to handlers as an extension and
/// task-local, and echoes it on the response.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = inbound_request_id(&request).unwrap_or_default();
    let header_value = HeaderValue::from_str(request_id.as_str()).ok();

    if let Some(value) = header_value.clone() {
        request
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    request.extensions_mut().insert(request_id.clone());

    crate::metrics::increment_counter("http_requests_total");

    let mut response =
        crate::tracing::scope_request_id(request_id, async move { next.run(request).await }).await;

    if response.status().is_server_error() {
        crate::metrics::increment_counter("http_responses_5xx_total");
    } else if response.status().is_client_error() {
        crate::metrics::increment_counter("http_responses_4xx_total");
    }

    if let Some(value) = header_value {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }

    response
}
