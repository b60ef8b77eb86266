use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::{ApprovalNotice, DeliveryReceipt, NotificationError, NoticeTemplate, Notifier};

/// Sends notices through a Resend-compatible `POST {api_base}/emails` API.
#[derive(Clone)]
pub struct ResendNotifier {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    from: String,
    reply_to: Option<String>,
    template: NoticeTemplate,
}

#[derive(Serialize)]
struct SendEmail<'a> {
    from: &'a str,
    to: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
    subject: String,
    html: String,
}

#[derive(Deserialize)]
struct SendEmailResponse {
    #[serde(default)]
    id: Option<String>,
}

impl ResendNotifier {
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        from: impl Into<String>,
        reply_to: Option<String>,
        template: NoticeTemplate,
        timeout: Duration,
    ) -> Result<Self, NotificationError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            from: from.into(),
            reply_to,
            template,
        })
    }
}

#[async_trait]
impl Notifier for ResendNotifier {
    #[instrument(skip(self, notice), fields(mrf_number = %notice.mrf_number, recipients = notice.recipients.len()))]
    async fn send_approval(&self, notice: &ApprovalNotice) -> Result<DeliveryReceipt, NotificationError> {
        if notice.recipients.is_empty() {
            return Err(NotificationError::NoRecipients);
        }

        let body = SendEmail {
            from: &self.from,
            to: &notice.recipients,
            reply_to: self.reply_to.as_deref(),
            subject: notice.subject(),
            html: self.template.render(notice)?,
        };

        let response = self
            .client
            .post(format!("{}/emails", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "email provider rejected the notice");
            return Err(NotificationError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: SendEmailResponse = response.json().await?;
        info!(message_id = ?parsed.id, "approval notice sent");
        Ok(DeliveryReceipt {
            id: parsed.id,
            recipients: notice.recipients.len(),
        })
    }
}
