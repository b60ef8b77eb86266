use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use super::validate_not_blank;
use crate::catalog;

/// A directory entry. `department` is either a bare department or a
/// `"<Department> - <Sub>"` subdepartment string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub id: String,
    pub name: String,
    pub email: String,
    pub department: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

impl Supplier {
    pub fn main_department(&self) -> &str {
        catalog::department_from_subdepartment(Some(&self.department))
    }
}

fn validate_supplier_department(department: &str) -> Result<(), ValidationError> {
    if catalog::is_known_department(department) || catalog::is_known_subdepartment(department) {
        return Ok(());
    }
    let mut err = ValidationError::new("unknown_department");
    err.message = Some(format!("unknown department or subdepartment '{}'", department).into());
    Err(err)
}

fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    let allowed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')'));
    if allowed && (7..=20).contains(&digits) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_phone_number"))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewSupplier {
    #[validate(custom = "validate_not_blank")]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(custom = "validate_supplier_department")]
    pub department: String,

    #[serde(default)]
    pub location: Option<String>,

    #[serde(default)]
    #[validate(custom = "validate_phone")]
    pub phone_number: Option<String>,
}

impl NewSupplier {
    pub fn into_supplier(self, id: String) -> Supplier {
        Supplier {
            id,
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            department: self.department,
            location: self.location.filter(|l| !l.trim().is_empty()),
            phone_number: self.phone_number.filter(|p| !p.trim().is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> NewSupplier {
        NewSupplier {
            name: "Gulf Cables".into(),
            email: "sales@gulfcables.ae".into(),
            department: "Electrical - Cables and single".into(),
            location: Some("Sharjah".into()),
            phone_number: Some("+971 6 555 0101".into()),
        }
    }

    #[test]
    fn accepts_department_or_subdepartment() {
        assert!(form().validate().is_ok());
        let mut bare = form();
        bare.department = "Plumbing".into();
        assert!(bare.validate().is_ok());
    }

    #[test]
    fn rejects_bad_email_and_department() {
        let mut bad = form();
        bad.email = "not-an-email".into();
        bad.department = "Electrical - Solar".into();
        let errors = bad.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
        assert!(errors.field_errors().contains_key("department"));
    }

    #[test]
    fn main_department_strips_sub_trade() {
        let supplier = form().into_supplier("s1".into());
        assert_eq!(supplier.main_department(), "Electrical");
    }

    #[test]
    fn blank_optionals_are_dropped() {
        let mut input = form();
        input.location = Some("  ".into());
        let supplier = input.into_supplier("s2".into());
        assert_eq!(supplier.location, None);
    }
}
