//! Material request approval portal.
//!
//! Engineers submit material requests, approvers move them from Pending to
//! Approved or Rejected, matching suppliers are notified by email and approved
//! requests can seed a Local Purchase Order rendered as PDF.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod backend;
pub mod catalog;
pub mod config;
pub mod errors;
pub mod export;
pub mod handlers;
pub mod health;
pub mod lpo;
pub mod metrics;
pub mod middleware_helpers;
pub mod models;
pub mod notifications;
pub mod openapi;
pub mod services;
pub mod store;
pub mod tracing;

use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::ToSchema;

use crate::backend::{ContentBackend, GraphQlBackend, InMemoryBackend};
use crate::config::AppConfig;
use crate::errors::ServiceError;
use crate::notifications::{LogNotifier, NoticeTemplate, Notifier, ResendNotifier};
use crate::services::{RequestLifecycle, RequestNumbering, SerialStrategy};
use crate::store::RequestStore;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<RequestStore>,
    pub lifecycle: Arc<RequestLifecycle>,
}

impl AppState {
    /// Wires the store and lifecycle over explicit collaborators.
    pub fn new(
        config: AppConfig,
        backend: Arc<dyn ContentBackend>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ServiceError> {
        let strategy: SerialStrategy = config.numbering.serial.parse().map_err(|_| {
            ServiceError::ValidationError(format!(
                "unknown numbering.serial '{}'",
                config.numbering.serial
            ))
        })?;
        let store = Arc::new(RequestStore::new(backend));
        let lifecycle = Arc::new(RequestLifecycle::new(
            store.clone(),
            notifier,
            RequestNumbering::new(strategy),
            config.lifecycle.require_notification,
        ));
        Ok(Self {
            config: Arc::new(config),
            store,
            lifecycle,
        })
    }
}

/// Content backend selected by `backend.kind`.
pub fn build_backend(config: &AppConfig) -> Result<Arc<dyn ContentBackend>, ServiceError> {
    if !config.backend.is_graphql() {
        ::tracing::warn!("using in-memory content backend; data is lost on restart");
        return Ok(Arc::new(InMemoryBackend::new()));
    }
    let endpoint = config.backend.endpoint.clone().ok_or_else(|| {
        ServiceError::ValidationError("backend.endpoint is required for graphql".into())
    })?;
    let token = config.backend.auth_token.clone().ok_or_else(|| {
        ServiceError::ValidationError("backend.auth_token is required for graphql".into())
    })?;
    let backend = GraphQlBackend::new(endpoint, token, config.http_timeout())?;
    Ok(Arc::new(backend))
}

/// Email provider selected by `email.provider`.
pub fn build_notifier(config: &AppConfig) -> Result<Arc<dyn Notifier>, ServiceError> {
    let template = NoticeTemplate::new(config.email.signature.clone())?;
    if !config.email.is_resend() {
        ::tracing::info!("approval notices are logged, not sent");
        return Ok(Arc::new(LogNotifier::new(template)));
    }
    let api_key = config.email.api_key.clone().ok_or_else(|| {
        ServiceError::ValidationError("email.api_key is required for resend".into())
    })?;
    let notifier = ResendNotifier::new(
        config.email.api_base.clone(),
        api_key,
        config.email.from.clone(),
        config.email.reply_to.clone(),
        template,
        config.http_timeout(),
    )?;
    Ok(Arc::new(notifier))
}

pub fn build_state(config: AppConfig) -> Result<AppState, ServiceError> {
    let backend = build_backend(&config)?;
    let notifier = build_notifier(&config)?;
    AppState::new(config, backend, notifier)
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            meta: Some(ResponseMeta::capture()),
        }
    }
}


/// JSON API routes
pub fn api_routes() -> Router<AppState> {
    use handlers::{catalog, dashboard, lpo, material_requests, notifications, suppliers};

    Router::new()
        .route(
            "/material-request",
            get(material_requests::list_requests)
                .post(material_requests::create_request)
                .patch(material_requests::update_status)
                .delete(material_requests::delete_request),
        )
        .route(
            "/material-request/export.csv",
            get(material_requests::export_requests),
        )
        .route(
            "/material-request/:mrf_number/approve",
            post(material_requests::approve_request),
        )
        .route(
            "/material-request/:mrf_number/reject",
            post(material_requests::reject_request),
        )
        .route(
            "/supplier",
            get(suppliers::list_suppliers)
                .post(suppliers::create_supplier)
                .delete(suppliers::delete_supplier),
        )
        .route("/send", post(notifications::send_notice))
        .route("/catalog/departments", get(catalog::list_departments))
        .route("/lpo/preview", post(lpo::preview_lpo))
        .route("/lpo/pdf", post(lpo::render_lpo))
        .route("/dashboard", get(dashboard::get_dashboard))
}

/// CORS from configuration: explicit origins, else permissive where allowed,
/// else same-origin only.
pub fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if !origins.is_empty() {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    } else if config.should_allow_permissive_cors() {
        CorsLayer::permissive()
    } else {
        ::tracing::warn!("no CORS origins configured; cross-origin requests are refused");
        CorsLayer::new()
    }
}

async fn metrics_json() -> impl IntoResponse {
    Json(metrics::METRICS.export_metrics_json())
}

async fn metrics_text() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::METRICS.export_metrics(),
    )
}

/// Full application router: API, health, metrics and Swagger UI.
pub fn app_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    Router::new()
        .route("/", get(|| async { "mrf-portal up" }))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route("/metrics", get(metrics_json))
        .route("/metrics/prometheus", get(metrics_text))
        .nest("/api", api_routes())
        .merge(openapi::swagger_ui())
        .layer(crate::tracing::configure_http_tracing())
        .layer(cors)
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}
