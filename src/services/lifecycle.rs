use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::numbering::RequestNumbering;
use crate::catalog;
use crate::errors::ServiceError;
use crate::metrics::WorkflowMetrics;
use crate::models::{MaterialRequest, NewMaterialRequest, RequestKey, RequestStatus, Supplier};
use crate::notifications::{ApprovalNotice, DeliveryReceipt, Notifier};
use crate::store::RequestStore;

/// What happened to the supplier notice during an approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NotificationStatus {
    Sent {
        recipients: Vec<String>,
        message_id: Option<String>,
    },
    Skipped {
        reason: String,
    },
    Failed {
        reason: String,
    },
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalOutcome {
    pub request: MaterialRequest,
    pub notification: NotificationStatus,
}

/// Pending -> Approved/Rejected state machine with supplier notification.
///
/// Transitions of one request run one at a time; the status is re-read
/// once the request's transition lock is held.
pub struct RequestLifecycle {
    store: Arc<RequestStore>,
    notifier: Arc<dyn Notifier>,
    numbering: RequestNumbering,
    require_notification: bool,
    transitions: DashMap<String, Arc<Mutex<()>>>,
}

/// Emails of every supplier that covers the request, deduplicated, in
/// directory order.
pub fn recipients_for(
    request: &MaterialRequest,
    suppliers: &[Supplier],
    subdepartments: Option<&[String]>,
) -> Vec<String> {
    let mut seen = BTreeSet::new();
    suppliers
        .iter()
        .filter(|s| catalog::supplier_covers(&s.department, &request.department, subdepartments))
        .map(|s| s.email.trim().to_string())
        .filter(|email| !email.is_empty() && seen.insert(email.to_ascii_lowercase()))
        .collect()
}

impl RequestLifecycle {
    pub fn new(
        store: Arc<RequestStore>,
        notifier: Arc<dyn Notifier>,
        numbering: RequestNumbering,
        require_notification: bool,
    ) -> Self {
        Self {
            store,
            notifier,
            numbering,
            require_notification,
            transitions: DashMap::new(),
        }
    }

    pub fn store(&self) -> &Arc<RequestStore> {
        &self.store
    }

    pub async fn submit(&self, input: NewMaterialRequest) -> Result<MaterialRequest, ServiceError> {
        self.submit_on(input, chrono::Local::now().date_naive()).await
    }

    /// Validates, numbers and stores a new request. Status is always Pending.
    #[instrument(skip(self, input), fields(department = %input.department))]
    pub async fn submit_on(
        &self,
        input: NewMaterialRequest,
        today: NaiveDate,
    ) -> Result<MaterialRequest, ServiceError> {
        input.validate()?;
        let mrf_number = self.numbering.assign(&self.store, today).await?;
        let request = input.into_request(Uuid::new_v4(), mrf_number);
        let stored = self.store.submit(request).await?;
        WorkflowMetrics::record_submitted();
        info!(mrf_number = %stored.mrf_number, "material request submitted");
        Ok(stored)
    }

    fn guard(request: &MaterialRequest, next: RequestStatus) -> Result<(), ServiceError> {
        if request.status.can_transition_to(next) {
            return Ok(());
        }
        warn!(
            mrf_number = %request.mrf_number,
            from = %request.status,
            to = %next,
            "refused status transition"
        );
        Err(ServiceError::InvalidStatus(format!(
            "{} is {} and cannot become {}",
            request.mrf_number, request.status, next
        )))
    }

    async fn lock_transitions(&self, mrf_number: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .transitions
            .entry(mrf_number.to_string())
            .or_default()
            .clone();
        lock.lock_owned().await
    }

    fn release_transitions(&self, mrf_number: &str, guard: OwnedMutexGuard<()>) {
        drop(guard);
        self.transitions
            .remove_if(mrf_number, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Finds the request and waits for its transition lock, returning the
    /// status as it stands once the lock is held.
    async fn claim(
        &self,
        key: &RequestKey,
    ) -> Result<(MaterialRequest, OwnedMutexGuard<()>), ServiceError> {
        let found = self.store.find(key).await?;
        let guard = self.lock_transitions(&found.mrf_number).await;
        match self.store.find(&RequestKey::Number(found.mrf_number.clone())).await {
            Ok(current) => Ok((current, guard)),
            Err(err) => {
                self.release_transitions(&found.mrf_number, guard);
                Err(err)
            }
        }
    }

    async fn directory(&self) -> Result<Vec<Supplier>, ServiceError> {
        let cached = self.store.suppliers().await;
        if cached.is_empty() {
            return self.store.refresh_suppliers().await;
        }
        Ok(cached)
    }

    /// Notifies matching suppliers, then marks the request Approved.
    #[instrument(skip(self, subdepartments), fields(key = %key))]
    pub async fn approve(
        &self,
        key: &RequestKey,
        subdepartments: Option<&[String]>,
    ) -> Result<ApprovalOutcome, ServiceError> {
        let (request, guard) = self.claim(key).await?;
        let result = self.approve_claimed(request.clone(), subdepartments).await;
        self.release_transitions(&request.mrf_number, guard);
        result
    }

    async fn approve_claimed(
        &self,
        request: MaterialRequest,
        subdepartments: Option<&[String]>,
    ) -> Result<ApprovalOutcome, ServiceError> {
        Self::guard(&request, RequestStatus::Approved)?;

        let suppliers = self.directory().await?;
        let recipients = recipients_for(&request, &suppliers, subdepartments);

        let notification = if recipients.is_empty() {
            info!(mrf_number = %request.mrf_number, "no supplier covers this department; notice skipped");
            NotificationStatus::Skipped {
                reason: format!("no suppliers registered for {}", request.department),
            }
        } else {
            let notice = ApprovalNotice::for_request(&request, recipients.clone());
            match self.notifier.send_approval(&notice).await {
                Ok(receipt) => {
                    WorkflowMetrics::record_notification_sent(receipt.recipients);
                    NotificationStatus::Sent {
                        recipients,
                        message_id: receipt.id,
                    }
                }
                Err(err) => {
                    WorkflowMetrics::record_notification_failed();
                    warn!(mrf_number = %request.mrf_number, error = %err, "supplier notice failed");
                    if self.require_notification {
                        return Err(err.into());
                    }
                    NotificationStatus::Failed {
                        reason: "supplier notification could not be delivered".to_string(),
                    }
                }
            }
        };

        let updated = self
            .store
            .set_status(
                &request.mrf_number,
                RequestStatus::Pending,
                RequestStatus::Approved,
            )
            .await?;
        WorkflowMetrics::record_approved();
        info!(mrf_number = %updated.mrf_number, "material request approved");
        Ok(ApprovalOutcome {
            request: updated,
            notification,
        })
    }

    #[instrument(skip(self), fields(key = %key))]
    pub async fn reject(&self, key: &RequestKey) -> Result<MaterialRequest, ServiceError> {
        let (request, guard) = self.claim(key).await?;
        let result = self.reject_claimed(&request).await;
        self.release_transitions(&request.mrf_number, guard);
        result
    }

    async fn reject_claimed(&self, request: &MaterialRequest) -> Result<MaterialRequest, ServiceError> {
        Self::guard(request, RequestStatus::Rejected)?;
        let updated = self
            .store
            .set_status(
                &request.mrf_number,
                RequestStatus::Pending,
                RequestStatus::Rejected,
            )
            .await?;
        WorkflowMetrics::record_rejected();
        info!(mrf_number = %updated.mrf_number, "material request rejected");
        Ok(updated)
    }

    /// Status change through the state machine.
    pub async fn set_status(
        &self,
        key: &RequestKey,
        status: RequestStatus,
    ) -> Result<MaterialRequest, ServiceError> {
        match status {
            RequestStatus::Approved => Ok(self.approve(key, None).await?.request),
            RequestStatus::Rejected => self.reject(key).await,
            RequestStatus::Pending => {
                let request = self.store.find(key).await?;
                Self::guard(&request, RequestStatus::Pending)?;
                Ok(request)
            }
        }
    }

    #[instrument(skip(self), fields(key = %key))]
    pub async fn delete(&self, key: &RequestKey) -> Result<String, ServiceError> {
        let deleted = self.store.delete(key).await?;
        WorkflowMetrics::record_deleted();
        info!(mrf_number = %deleted, "material request deleted");
        Ok(deleted)
    }

    /// Sends a notice to an explicit recipient list.
    #[instrument(skip(self, notice), fields(mrf_number = %notice.mrf_number))]
    pub async fn send_notice(&self, notice: &ApprovalNotice) -> Result<DeliveryReceipt, ServiceError> {
        if notice.recipients.iter().all(|r| r.trim().is_empty()) {
            return Err(ServiceError::BadRequest(
                "Recipients array is required and cannot be empty".into(),
            ));
        }
        match self.notifier.send_approval(notice).await {
            Ok(receipt) => {
                WorkflowMetrics::record_notification_sent(receipt.recipients);
                Ok(receipt)
            }
            Err(err) => {
                WorkflowMetrics::record_notification_failed();
                Err(err.into())
            }
        }
    }
}
