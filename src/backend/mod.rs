/*!
 * Content backend seam.
 *
 * The hosted content store is authoritative for material requests and
 * suppliers. [`GraphQlBackend`] talks to it over HTTP; [`InMemoryBackend`]
 * stands in for local runs and tests.
 */

pub mod graphql;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::errors::ServiceError;
use crate::models::{MaterialRequest, NewSupplier, RequestKey, RequestStatus, Supplier};

pub use graphql::GraphQlBackend;
pub use memory::InMemoryBackend;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("backend reported errors: {0}")]
    GraphQl(String),

    #[error("backend response is missing `{0}`")]
    MissingField(&'static str),

    #[error("could not decode backend response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("backend write refused: {0}")]
    Unavailable(String),
}

impl From<BackendError> for ServiceError {
    fn from(err: BackendError) -> Self {
        ServiceError::ExternalServiceError(err.to_string())
    }
}

/// Remote operations on the content store.
#[async_trait]
pub trait ContentBackend: Send + Sync {
    async fn list_material_requests(&self) -> Result<Vec<MaterialRequest>, BackendError>;

    async fn create_material_request(&self, request: &MaterialRequest) -> Result<(), BackendError>;

    async fn update_material_request_status(
        &self,
        mrf_number: &str,
        status: RequestStatus,
    ) -> Result<(), BackendError>;

    /// Returns the deleted request number, or `None` when nothing matched.
    async fn delete_material_request(&self, key: &RequestKey)
        -> Result<Option<String>, BackendError>;

    async fn list_suppliers(&self) -> Result<Vec<Supplier>, BackendError>;

    async fn create_supplier(&self, supplier: &NewSupplier) -> Result<Supplier, BackendError>;

    /// Returns the deleted id, or `None` when nothing matched.
    async fn delete_supplier(&self, id: &str) -> Result<Option<String>, BackendError>;
}
