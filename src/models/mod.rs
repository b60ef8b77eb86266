pub mod material_request;
pub mod supplier;

pub use material_request::{
    MaterialLine, MaterialRequest, NewMaterialRequest, RequestKey, RequestStatus,
};
pub use supplier::{NewSupplier, Supplier};

use validator::ValidationError;

/// Rejects empty and whitespace-only text.
pub(crate) fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be blank".into());
        return Err(err);
    }
    Ok(())
}
