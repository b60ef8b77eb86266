/*!
 * Session copy of material requests and suppliers.
 *
 * Collections are fetched from the [`ContentBackend`] on load and refreshed on
 * demand. Mutations are applied locally first, then persisted; a failed
 * persist restores the previous collection. Every collection update replaces
 * the whole vector under the write lock.
 */

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;

use crate::backend::ContentBackend;
use crate::errors::ServiceError;
use crate::metrics::WorkflowMetrics;
use crate::models::{MaterialRequest, NewSupplier, RequestKey, RequestStatus, Supplier};

const JOURNAL_CAPACITY: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    SubmitRequest,
    SetStatus,
    DeleteRequest,
    AddSupplier,
    DeleteSupplier,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum MutationState {
    Pending,
    Confirmed,
    Failed(String),
}

/// One optimistic change and how it ended.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MutationRecord {
    pub sequence: u64,
    pub kind: MutationKind,
    pub target: String,
    pub state: MutationState,
    pub at: DateTime<Utc>,
}

#[derive(Default)]
struct Journal {
    next: u64,
    records: VecDeque<MutationRecord>,
}

impl Journal {
    fn open(&mut self, kind: MutationKind, target: String) -> u64 {
        self.next += 1;
        if self.records.len() == JOURNAL_CAPACITY {
            self.records.pop_front();
        }
        self.records.push_back(MutationRecord {
            sequence: self.next,
            kind,
            target,
            state: MutationState::Pending,
            at: Utc::now(),
        });
        self.next
    }

    fn close(&mut self, sequence: u64, state: MutationState) {
        if let Some(record) = self.records.iter_mut().find(|r| r.sequence == sequence) {
            record.state = state;
            record.at = Utc::now();
        }
    }
}

pub struct RequestStore {
    backend: Arc<dyn ContentBackend>,
    requests: RwLock<Vec<MaterialRequest>>,
    suppliers: RwLock<Vec<Supplier>>,
    journal: RwLock<Journal>,
}

impl RequestStore {
    pub fn new(backend: Arc<dyn ContentBackend>) -> Self {
        Self {
            backend,
            requests: RwLock::new(Vec::new()),
            suppliers: RwLock::new(Vec::new()),
            journal: RwLock::new(Journal::default()),
        }
    }

    /// Fetches both collections.
    pub async fn load(&self) -> Result<(), ServiceError> {
        self.refresh_requests().await?;
        self.refresh_suppliers().await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn refresh_requests(&self) -> Result<Vec<MaterialRequest>, ServiceError> {
        let fetched = self.backend.list_material_requests().await?;
        debug!(count = fetched.len(), "material requests refreshed");
        WorkflowMetrics::set_cached_requests(fetched.len());
        *self.requests.write().await = fetched.clone();
        Ok(fetched)
    }

    #[instrument(skip(self))]
    pub async fn refresh_suppliers(&self) -> Result<Vec<Supplier>, ServiceError> {
        let fetched = self.backend.list_suppliers().await?;
        debug!(count = fetched.len(), "suppliers refreshed");
        WorkflowMetrics::set_cached_suppliers(fetched.len());
        *self.suppliers.write().await = fetched.clone();
        Ok(fetched)
    }

    pub async fn requests(&self) -> Vec<MaterialRequest> {
        self.requests.read().await.clone()
    }

    pub async fn suppliers(&self) -> Vec<Supplier> {
        self.suppliers.read().await.clone()
    }

    pub async fn request_count(&self) -> usize {
        self.requests.read().await.len()
    }

    pub async fn contains_number(&self, mrf_number: &str) -> bool {
        self.requests
            .read()
            .await
            .iter()
            .any(|r| r.mrf_number == mrf_number)
    }

    /// Local lookup, falling back to one refresh from the backend.
    pub async fn find(&self, key: &RequestKey) -> Result<MaterialRequest, ServiceError> {
        if let Some(found) = self.find_local(key).await {
            return Ok(found);
        }
        self.refresh_requests().await?;
        self.find_local(key)
            .await
            .ok_or_else(|| ServiceError::NotFound(format!("material request {}", key)))
    }

    async fn find_local(&self, key: &RequestKey) -> Option<MaterialRequest> {
        self.requests
            .read()
            .await
            .iter()
            .find(|r| key.matches(r))
            .cloned()
    }

    pub async fn journal(&self) -> Vec<MutationRecord> {
        self.journal.read().await.records.iter().cloned().collect()
    }

    async fn open(&self, kind: MutationKind, target: impl Into<String>) -> u64 {
        self.journal.write().await.open(kind, target.into())
    }

    async fn settle<T, E>(&self, sequence: u64, result: &Result<T, E>)
    where
        E: std::fmt::Display,
    {
        let state = match result {
            Ok(_) => MutationState::Confirmed,
            Err(err) => MutationState::Failed(err.to_string()),
        };
        self.journal.write().await.close(sequence, state);
    }

    /// Adds the request locally, then persists it.
    #[instrument(skip(self, request), fields(mrf_number = %request.mrf_number))]
    pub async fn submit(&self, request: MaterialRequest) -> Result<MaterialRequest, ServiceError> {
        let sequence = self.open(MutationKind::SubmitRequest, &request.mrf_number).await;
        let snapshot = {
            let mut requests = self.requests.write().await;
            let snapshot = requests.clone();
            let mut next = snapshot.clone();
            next.push(request.clone());
            *requests = next;
            snapshot
        };

        let result = self.backend.create_material_request(&request).await;
        self.settle(sequence, &result).await;
        if let Err(err) = result {
            self.rollback_requests(snapshot).await;
            return Err(err.into());
        }
        info!("material request stored");
        Ok(request)
    }

    /// Moves the request from `expected` to `status` locally, then persists it.
    ///
    /// The current status is compared under the write lock; a request that is
    /// no longer in `expected` is left untouched and yields `InvalidStatus`.
    #[instrument(skip(self))]
    pub async fn set_status(
        &self,
        mrf_number: &str,
        expected: RequestStatus,
        status: RequestStatus,
    ) -> Result<MaterialRequest, ServiceError> {
        let sequence = self.open(MutationKind::SetStatus, mrf_number).await;
        let (snapshot, updated) = {
            let mut requests = self.requests.write().await;
            let snapshot = requests.clone();
            let mut next = snapshot.clone();
            let checked = match next.iter_mut().find(|r| r.mrf_number == mrf_number) {
                None => Err(ServiceError::NotFound(format!(
                    "material request {}",
                    mrf_number
                ))),
                Some(entry) if entry.status != expected => Err(ServiceError::InvalidStatus(
                    format!("{} is {} and cannot become {}", mrf_number, entry.status, status),
                )),
                Some(entry) => Ok(entry),
            };
            let entry = match checked {
                Ok(entry) => entry,
                Err(err) => {
                    drop(requests);
                    self.journal
                        .write()
                        .await
                        .close(sequence, MutationState::Failed(err.to_string()));
                    return Err(err);
                }
            };
            entry.status = status;
            let updated = entry.clone();
            *requests = next;
            (snapshot, updated)
        };

        let result = self
            .backend
            .update_material_request_status(mrf_number, status)
            .await;
        self.settle(sequence, &result).await;
        if let Err(err) = result {
            self.rollback_requests(snapshot).await;
            return Err(err.into());
        }
        Ok(updated)
    }

    /// Removes the request locally, then deletes it remotely.
    ///
    /// A backend that reports nothing deleted yields `NotFound`; the local
    /// entry stays removed since the backend no longer has it either.
    #[instrument(skip(self))]
    pub async fn delete(&self, key: &RequestKey) -> Result<String, ServiceError> {
        let sequence = self.open(MutationKind::DeleteRequest, key.to_string()).await;
        let (snapshot, local_number) = {
            let mut requests = self.requests.write().await;
            let snapshot = requests.clone();
            let local_number = snapshot
                .iter()
                .find(|r| key.matches(r))
                .map(|r| r.mrf_number.clone());
            *requests = snapshot.iter().filter(|r| !key.matches(r)).cloned().collect();
            (snapshot, local_number)
        };

        let result = self.backend.delete_material_request(key).await;
        self.settle(sequence, &result).await;
        match result {
            Ok(Some(number)) => {
                WorkflowMetrics::set_cached_requests(self.request_count().await);
                Ok(local_number.unwrap_or(number))
            }
            Ok(None) => Err(ServiceError::NotFound(format!("material request {}", key))),
            Err(err) => {
                self.rollback_requests(snapshot).await;
                Err(err.into())
            }
        }
    }

    #[instrument(skip(self, supplier), fields(department = %supplier.department))]
    pub async fn add_supplier(&self, supplier: NewSupplier) -> Result<Supplier, ServiceError> {
        let sequence = self.open(MutationKind::AddSupplier, &supplier.email).await;
        let result = self.backend.create_supplier(&supplier).await;
        self.settle(sequence, &result).await;
        let created = result?;

        let mut suppliers = self.suppliers.write().await;
        let mut next = suppliers.clone();
        next.push(created.clone());
        *suppliers = next;
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn delete_supplier(&self, id: &str) -> Result<String, ServiceError> {
        let sequence = self.open(MutationKind::DeleteSupplier, id).await;
        let snapshot = {
            let mut suppliers = self.suppliers.write().await;
            let snapshot = suppliers.clone();
            *suppliers = snapshot.iter().filter(|s| s.id != id).cloned().collect();
            snapshot
        };

        let result = self.backend.delete_supplier(id).await;
        self.settle(sequence, &result).await;
        match result {
            Ok(Some(deleted)) => Ok(deleted),
            Ok(None) => Err(ServiceError::NotFound(format!("supplier {}", id))),
            Err(err) => {
                warn!(error = %err, "supplier delete failed; restoring local copy");
                *self.suppliers.write().await = snapshot;
                WorkflowMetrics::record_rollback();
                Err(err.into())
            }
        }
    }

    async fn rollback_requests(&self, snapshot: Vec<MaterialRequest>) {
        warn!("backend write failed; restoring local material requests");
        *self.requests.write().await = snapshot;
        WorkflowMetrics::record_rollback();
    }
}
