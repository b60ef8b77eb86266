#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use chrono::NaiveDate;
use mrf_portal::{
    backend::InMemoryBackend,
    config::AppConfig,
    models::{MaterialLine, MaterialRequest, RequestStatus, Supplier},
    notifications::{ApprovalNotice, DeliveryReceipt, NotificationError, Notifier},
    AppState,
};
use rust_decimal_macros::dec;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

/// Notifier double that keeps every notice it is asked to send.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<ApprovalNotice>>,
    fail: Mutex<bool>,
    delay: Mutex<Option<Duration>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<ApprovalNotice> {
        self.sent.lock().unwrap().clone()
    }

    pub fn set_fail(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    /// Holds every send for `delay` before answering.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_approval(&self, notice: &ApprovalNotice) -> Result<DeliveryReceipt, NotificationError> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if *self.fail.lock().unwrap() {
            return Err(NotificationError::Provider {
                status: 503,
                body: "provider unavailable".into(),
            });
        }
        self.sent.lock().unwrap().push(notice.clone());
        Ok(DeliveryReceipt {
            id: Some(format!("msg-{}", self.sent.lock().unwrap().len())),
            recipients: notice.recipients.len(),
        })
    }
}

/// Router over the in-memory backend and a recording notifier.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub backend: Arc<InMemoryBackend>,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_data(Vec::new(), Vec::new()).await
    }

    pub async fn with_data(requests: Vec<MaterialRequest>, suppliers: Vec<Supplier>) -> Self {
        Self::with_config(test_config(), requests, suppliers).await
    }

    pub async fn with_config(
        config: AppConfig,
        requests: Vec<MaterialRequest>,
        suppliers: Vec<Supplier>,
    ) -> Self {
        let backend = Arc::new(InMemoryBackend::with_data(requests, suppliers));
        let notifier = Arc::new(RecordingNotifier::default());
        let state = AppState::new(config, backend.clone(), notifier.clone())
            .expect("test state should build");
        state.store.load().await.expect("in-memory load cannot fail");
        let router = mrf_portal::app_router(state.clone());
        Self {
            router,
            state,
            backend,
            notifier,
        }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.numbering.serial = "sequential".to_string();
    config
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    serde_json::from_slice(&bytes).expect("response body is not JSON")
}

pub async fn response_bytes(response: Response) -> Vec<u8> {
    body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read body")
        .to_vec()
}

pub fn material_request(number: &str, department: &str, status: RequestStatus) -> MaterialRequest {
    MaterialRequest {
        id: Uuid::new_v4(),
        request_date: NaiveDate::from_ymd_opt(2025, 8, 5).unwrap(),
        mrf_number: number.to_string(),
        engineer_name: "Sara Khan".to_string(),
        project_name: "Tower B".to_string(),
        site_location: "JVC Plot 12".to_string(),
        department: department.to_string(),
        status,
        materials: vec![
            MaterialLine {
                description: "GI conduit 20mm".to_string(),
                quantity: dec!(40),
                unit: "pcs".to_string(),
                remarks: String::new(),
            },
            MaterialLine {
                description: "Junction box".to_string(),
                quantity: dec!(12),
                unit: "nos".to_string(),
                remarks: "with covers".to_string(),
            },
        ],
    }
}

pub fn supplier(id: &str, email: &str, department: &str) -> Supplier {
    Supplier {
        id: id.to_string(),
        name: format!("Supplier {}", id),
        email: email.to_string(),
        department: department.to_string(),
        location: Some("Dubai".to_string()),
        phone_number: None,
    }
}

pub fn directory() -> Vec<Supplier> {
    vec![
        supplier("s1", "sales@volt.ae", "Electrical"),
        supplier("s2", "gibox@boxes.ae", "Electrical - GIBox"),
        supplier("s3", "wires@core.ae", "Electrical - Core Wires"),
        supplier("s4", "pipes@flow.ae", "Plumbing"),
    ]
}
