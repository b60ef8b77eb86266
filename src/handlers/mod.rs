//! HTTP handlers. Each returns `Result<impl IntoResponse, ApiError>` and wraps
//! JSON payloads in [`crate::ApiResponse`].

pub mod catalog;
pub mod common;
pub mod dashboard;
pub mod lpo;
pub mod material_requests;
pub mod notifications;
pub mod suppliers;
