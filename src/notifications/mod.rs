/*!
 * Supplier notifications.
 *
 * Approving a request sends one [`ApprovalNotice`] addressed to every
 * matching supplier through a [`Notifier`]. The production notifier posts to a
 * Resend-compatible HTTP API; [`LogNotifier`] only records the message.
 */

pub mod resend;
pub mod template;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use utoipa::ToSchema;
use validator::Validate;

use crate::errors::ServiceError;
use crate::models::{MaterialLine, MaterialRequest};

pub use resend::ResendNotifier;
pub use template::NoticeTemplate;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("no recipients")]
    NoRecipients,

    #[error("template error: {0}")]
    Template(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned HTTP {status}: {body}")]
    Provider { status: u16, body: String },
}

impl From<NotificationError> for ServiceError {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::NoRecipients => {
                ServiceError::BadRequest("Recipients array is required and cannot be empty".into())
            }
            other => ServiceError::NotificationError(other.to_string()),
        }
    }
}

/// Approval email content: request metadata, full material list and the
/// recipients it goes to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalNotice {
    #[validate(length(min = 1, message = "mrfNumber is required"))]
    pub mrf_number: String,
    #[serde(default)]
    pub engineer_name: String,
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub site_location: String,
    #[serde(default)]
    pub department: String,
    pub request_date: NaiveDate,
    #[serde(default)]
    pub materials: Vec<MaterialLine>,
    #[serde(default)]
    pub recipients: Vec<String>,
}

impl ApprovalNotice {
    pub fn for_request(request: &MaterialRequest, recipients: Vec<String>) -> Self {
        Self {
            mrf_number: request.mrf_number.clone(),
            engineer_name: request.engineer_name.clone(),
            project_name: request.project_name.clone(),
            site_location: request.site_location.clone(),
            department: request.department.clone(),
            request_date: request.request_date,
            materials: request.materials.clone(),
            recipients,
        }
    }

    pub fn subject(&self) -> String {
        format!("Material Request Approved: MRF #{}", self.mrf_number)
    }
}

/// Provider acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryReceipt {
    pub id: Option<String>,
    pub recipients: usize,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends one message addressed to every recipient of the notice.
    async fn send_approval(&self, notice: &ApprovalNotice) -> Result<DeliveryReceipt, NotificationError>;
}

/// Renders the notice and logs it instead of sending.
pub struct LogNotifier {
    template: NoticeTemplate,
}

impl LogNotifier {
    pub fn new(template: NoticeTemplate) -> Self {
        Self { template }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_approval(&self, notice: &ApprovalNotice) -> Result<DeliveryReceipt, NotificationError> {
        if notice.recipients.is_empty() {
            return Err(NotificationError::NoRecipients);
        }
        let html = self.template.render(notice)?;
        info!(
            mrf_number = %notice.mrf_number,
            recipients = ?notice.recipients,
            subject = %notice.subject(),
            html_bytes = html.len(),
            "approval notice (log provider)"
        );
        Ok(DeliveryReceipt {
            id: None,
            recipients: notice.recipients.len(),
        })
    }
}
