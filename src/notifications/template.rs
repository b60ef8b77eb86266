use serde_json::json;
use tera::{Context, Tera};
use tracing::debug;

use super::{ApprovalNotice, NotificationError};

const APPROVAL_TEMPLATE: &str = "approval_notice.html";
const APPROVAL_SOURCE: &str = include_str!("templates/approval_notice.html");

/// HTML body for approval notices. Values are HTML-escaped.
#[derive(Clone)]
pub struct NoticeTemplate {
    tera: Tera,
    signature: String,
}

impl NoticeTemplate {
    pub fn new(signature: impl Into<String>) -> Result<Self, NotificationError> {
        let mut tera = Tera::default();
        tera.add_raw_template(APPROVAL_TEMPLATE, APPROVAL_SOURCE)
            .map_err(|e| NotificationError::Template(e.to_string()))?;
        debug!(template = APPROVAL_TEMPLATE, "notice template loaded");
        Ok(Self {
            tera,
            signature: signature.into(),
        })
    }

    pub fn render(&self, notice: &ApprovalNotice) -> Result<String, NotificationError> {
        let materials: Vec<_> = notice
            .materials
            .iter()
            .map(|line| {
                json!({
                    "description": line.description,
                    "quantity": line.quantity.normalize().to_string(),
                    "unit": line.unit,
                    "remarks": line.remarks.trim(),
                })
            })
            .collect();

        let context = Context::from_serialize(json!({
            "mrf_number": notice.mrf_number,
            "engineer_name": notice.engineer_name,
            "project_name": notice.project_name,
            "site_location": notice.site_location,
            "department": notice.department,
            "request_date": notice.request_date.format("%Y-%m-%d").to_string(),
            "materials": materials,
            "signature": self.signature,
        }))
        .map_err(|e| NotificationError::Template(e.to_string()))?;

        self.tera
            .render(APPROVAL_TEMPLATE, &context)
            .map_err(|e| NotificationError::Template(e.to_string()))
    }
}
