use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::validate_not_blank;
use crate::catalog;

/// Approval state of a material request.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum RequestStatus {
    #[default]
    #[serde(alias = "pending", alias = "PENDING")]
    Pending,
    #[serde(alias = "approved", alias = "APPROVED")]
    Approved,
    #[serde(alias = "rejected", alias = "REJECTED")]
    Rejected,
}

impl RequestStatus {
    /// Approved and Rejected are final.
    pub fn is_terminal(self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }

    pub fn can_transition_to(self, next: RequestStatus) -> bool {
        matches!(
            (self, next),
            (RequestStatus::Pending, RequestStatus::Approved)
                | (RequestStatus::Pending, RequestStatus::Rejected)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "Pending",
            RequestStatus::Approved => "Approved",
            RequestStatus::Rejected => "Rejected",
        }
    }
}

/// One line of a material request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaterialLine {
    #[validate(custom = "validate_not_blank")]
    pub description: String,

    #[validate(custom = "validate_positive_quantity")]
    #[schema(value_type = String, example = "12")]
    pub quantity: Decimal,

    #[serde(default)]
    pub unit: String,

    #[serde(default)]
    pub remarks: String,
}

fn validate_positive_quantity(quantity: &Decimal) -> Result<(), ValidationError> {
    if quantity.is_sign_negative() || quantity.is_zero() {
        let mut err = ValidationError::new("quantity_not_positive");
        err.message = Some("quantity must be greater than zero".into());
        return Err(err);
    }
    Ok(())
}

fn validate_material_lines(lines: &Vec<MaterialLine>) -> Result<(), ValidationError> {
    if lines.is_empty() {
        let mut err = ValidationError::new("materials_empty");
        err.message = Some("at least one material line is required".into());
        return Err(err);
    }
    for (index, line) in lines.iter().enumerate() {
        if line.validate().is_err() {
            let mut err = ValidationError::new("material_line_invalid");
            err.message = Some(
                format!(
                    "material line {} needs a description and a positive quantity",
                    index + 1
                )
                .into(),
            );
            err.add_param("line".into(), &(index + 1));
            return Err(err);
        }
    }
    Ok(())
}

fn validate_request_department(department: &str) -> Result<(), ValidationError> {
    if catalog::is_known_department(department) {
        return Ok(());
    }
    let mut err = ValidationError::new("unknown_department");
    err.message = Some(format!("unknown department '{}'", department).into());
    Err(err)
}

/// A submitted material request form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaterialRequest {
    pub id: Uuid,
    pub request_date: NaiveDate,
    /// `MRF-YYMM-NNNN`, assigned at creation and never changed
    pub mrf_number: String,
    pub engineer_name: String,
    pub project_name: String,
    pub site_location: String,
    pub department: String,
    #[serde(default)]
    pub status: RequestStatus,
    #[serde(default)]
    pub materials: Vec<MaterialLine>,
}

/// Submission body for a new material request.
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewMaterialRequest {
    pub request_date: NaiveDate,

    #[validate(custom = "validate_not_blank")]
    pub engineer_name: String,

    #[validate(custom = "validate_not_blank")]
    pub project_name: String,

    #[validate(custom = "validate_not_blank")]
    pub site_location: String,

    #[validate(custom = "validate_request_department")]
    pub department: String,

    /// Ignored; every submission starts Pending.
    #[serde(default)]
    pub status: Option<RequestStatus>,

    #[validate(custom = "validate_material_lines")]
    pub materials: Vec<MaterialLine>,
}

impl NewMaterialRequest {
    pub fn into_request(self, id: Uuid, mrf_number: String) -> MaterialRequest {
        MaterialRequest {
            id,
            request_date: self.request_date,
            mrf_number,
            engineer_name: self.engineer_name.trim().to_string(),
            project_name: self.project_name.trim().to_string(),
            site_location: self.site_location.trim().to_string(),
            department: self.department,
            status: RequestStatus::Pending,
            materials: self.materials,
        }
    }
}

/// Either identifier a request can be addressed by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestKey {
    Id(Uuid),
    Number(String),
}

impl RequestKey {
    pub fn matches(&self, request: &MaterialRequest) -> bool {
        match self {
            RequestKey::Id(id) => request.id == *id,
            RequestKey::Number(number) => request.mrf_number == *number,
        }
    }

    /// The bare identifier, without the `id` prefix used in messages.
    pub fn value(&self) -> String {
        match self {
            RequestKey::Id(id) => id.to_string(),
            RequestKey::Number(number) => number.clone(),
        }
    }
}

impl std::fmt::Display for RequestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestKey::Id(id) => write!(f, "id {}", id),
            RequestKey::Number(number) => write!(f, "{}", number),
        }
    }
}
