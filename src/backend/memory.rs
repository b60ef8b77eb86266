use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{BackendError, ContentBackend};
use crate::models::{MaterialRequest, NewSupplier, RequestKey, RequestStatus, Supplier};

/// Process-local backend. Data lives as long as the value.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    requests: RwLock<Vec<MaterialRequest>>,
    suppliers: RwLock<Vec<Supplier>>,
    next_supplier_id: AtomicU64,
    fail_writes: AtomicBool,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(requests: Vec<MaterialRequest>, suppliers: Vec<Supplier>) -> Self {
        Self {
            next_supplier_id: AtomicU64::new(suppliers.len() as u64),
            requests: RwLock::new(requests),
            suppliers: RwLock::new(suppliers),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Makes every subsequent write fail, to exercise rollback paths.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), BackendError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("writes are disabled".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ContentBackend for InMemoryBackend {
    async fn list_material_requests(&self) -> Result<Vec<MaterialRequest>, BackendError> {
        Ok(self.requests.read().await.clone())
    }

    async fn create_material_request(&self, request: &MaterialRequest) -> Result<(), BackendError> {
        self.check_writable()?;
        let mut requests = self.requests.write().await;
        if requests.iter().any(|r| r.mrf_number == request.mrf_number) {
            return Err(BackendError::GraphQl(format!(
                "value is not unique for field mrfNumber: {}",
                request.mrf_number
            )));
        }
        requests.push(request.clone());
        Ok(())
    }

    async fn update_material_request_status(
        &self,
        mrf_number: &str,
        status: RequestStatus,
    ) -> Result<(), BackendError> {
        self.check_writable()?;
        let mut requests = self.requests.write().await;
        let request = requests
            .iter_mut()
            .find(|r| r.mrf_number == mrf_number)
            .ok_or(BackendError::MissingField("publishMaterialRequest"))?;
        request.status = status;
        Ok(())
    }

    async fn delete_material_request(
        &self,
        key: &RequestKey,
    ) -> Result<Option<String>, BackendError> {
        self.check_writable()?;
        let mut requests = self.requests.write().await;
        match requests.iter().position(|r| key.matches(r)) {
            Some(index) => Ok(Some(requests.remove(index).mrf_number)),
            None => Ok(None),
        }
    }

    async fn list_suppliers(&self) -> Result<Vec<Supplier>, BackendError> {
        Ok(self.suppliers.read().await.clone())
    }

    async fn create_supplier(&self, supplier: &NewSupplier) -> Result<Supplier, BackendError> {
        self.check_writable()?;
        let id = self.next_supplier_id.fetch_add(1, Ordering::SeqCst) + 1;
        let created = supplier.clone().into_supplier(format!("supplier-{}", id));
        self.suppliers.write().await.push(created.clone());
        Ok(created)
    }

    async fn delete_supplier(&self, id: &str) -> Result<Option<String>, BackendError> {
        self.check_writable()?;
        let mut suppliers = self.suppliers.write().await;
        match suppliers.iter().position(|s| s.id == id) {
            Some(index) => Ok(Some(suppliers.remove(index).id)),
            None => Ok(None),
        }
    }
}
