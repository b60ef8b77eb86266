mod common;

use std::time::Duration;

use assert_matches::assert_matches;
use axum::http::{Method, StatusCode};
use common::{directory, material_request, response_json, test_config, TestApp};
use mrf_portal::backend::ContentBackend;
use mrf_portal::errors::ServiceError;
use mrf_portal::models::{RequestKey, RequestStatus};
use serde_json::json;

async fn stored_status(app: &TestApp, number: &str) -> RequestStatus {
    app.backend
        .list_material_requests()
        .await
        .unwrap()
        .into_iter()
        .find(|r| r.mrf_number == number)
        .map(|r| r.status)
        .unwrap()
}

#[tokio::test]
async fn approve_notifies_every_matching_supplier_once() {
    let app = TestApp::with_data(
        vec![material_request("MRF-2508-0042", "Electrical", RequestStatus::Pending)],
        directory(),
    )
    .await;

    let response = app
        .request(Method::POST, "/api/material-request/MRF-2508-0042/approve", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["request"]["status"], "Approved");
    assert_eq!(body["data"]["notification"]["outcome"], "sent");

    let sent = app.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].recipients,
        vec!["sales@volt.ae", "gibox@boxes.ae", "wires@core.ae"]
    );
    assert_eq!(sent[0].subject(), "Material Request Approved: MRF #MRF-2508-0042");
    assert_eq!(sent[0].materials.len(), 2);
    assert_eq!(stored_status(&app, "MRF-2508-0042").await, RequestStatus::Approved);
}

#[tokio::test]
async fn approve_with_subdepartments_narrows_recipients() {
    let app = TestApp::with_data(
        vec![material_request("MRF-2508-0043", "Electrical", RequestStatus::Pending)],
        directory(),
    )
    .await;

    let response = app
        .request(
            Method::POST,
            "/api/material-request/MRF-2508-0043/approve",
            Some(json!({ "subdepartments": ["Electrical - GIBox"] })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let sent = app.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipients, vec!["sales@volt.ae", "gibox@boxes.ae"]);
}

#[tokio::test]
async fn approve_without_matching_suppliers_still_approves() {
    let app = TestApp::with_data(
        vec![material_request("MRF-2508-0044", "Fire Fighting", RequestStatus::Pending)],
        directory(),
    )
    .await;

    let response = app
        .request(Method::POST, "/api/material-request/MRF-2508-0044/approve", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["notification"]["outcome"], "skipped");
    assert!(app.notifier.sent().is_empty());
}

#[tokio::test]
async fn reject_sends_nothing() {
    let app = TestApp::with_data(
        vec![material_request("MRF-2508-0045", "Electrical", RequestStatus::Pending)],
        directory(),
    )
    .await;

    let response = app
        .request(Method::POST, "/api/material-request/MRF-2508-0045/reject", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "Rejected");

    assert!(app.notifier.sent().is_empty());
    assert_eq!(stored_status(&app, "MRF-2508-0045").await, RequestStatus::Rejected);
}

#[tokio::test]
async fn terminal_requests_cannot_change() {
    let app = TestApp::with_data(
        vec![material_request("MRF-2508-0046", "Electrical", RequestStatus::Rejected)],
        directory(),
    )
    .await;

    let response = app
        .request(Method::POST, "/api/material-request/MRF-2508-0046/approve", None)
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert!(app.notifier.sent().is_empty());
    assert_eq!(stored_status(&app, "MRF-2508-0046").await, RequestStatus::Rejected);
}

#[tokio::test]
async fn unknown_request_is_not_found() {
    let app = TestApp::new().await;
    let response = app
        .request(Method::POST, "/api/material-request/MRF-0000-0000/reject", None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn failed_notice_is_reported_but_approval_stands() {
    let app = TestApp::with_data(
        vec![material_request("MRF-2508-0047", "Plumbing", RequestStatus::Pending)],
        directory(),
    )
    .await;
    app.notifier.set_fail(true);

    let response = app
        .request(Method::POST, "/api/material-request/MRF-2508-0047/approve", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["notification"]["outcome"], "failed");
    assert_eq!(stored_status(&app, "MRF-2508-0047").await, RequestStatus::Approved);
}

#[tokio::test]
async fn required_notice_failure_keeps_request_pending() {
    let mut config = test_config();
    config.lifecycle.require_notification = true;
    let app = TestApp::with_config(
        config,
        vec![material_request("MRF-2508-0048", "Plumbing", RequestStatus::Pending)],
        directory(),
    )
    .await;
    app.notifier.set_fail(true);

    let response = app
        .request(Method::POST, "/api/material-request/MRF-2508-0048/approve", None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = response_json(response).await;
    assert_eq!(body["message"], "Failed to send notification");
    assert_eq!(stored_status(&app, "MRF-2508-0048").await, RequestStatus::Pending);
}

#[tokio::test]
async fn backend_write_failure_rolls_back_status() {
    let app = TestApp::with_data(
        vec![material_request("MRF-2508-0049", "Hardware", RequestStatus::Pending)],
        Vec::new(),
    )
    .await;
    app.backend.set_fail_writes(true);

    let response = app
        .request(Method::POST, "/api/material-request/MRF-2508-0049/reject", None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let cached = app.state.store.requests().await;
    assert_eq!(cached[0].status, RequestStatus::Pending);
}

#[tokio::test]
async fn explicit_send_requires_recipients() {
    let app = TestApp::new().await;
    let notice = json!({
        "mrfNumber": "MRF-2508-0050",
        "engineerName": "Sara Khan",
        "projectName": "Tower B",
        "siteLocation": "JVC",
        "department": "HVAC",
        "requestDate": "2025-08-05",
        "materials": [],
        "recipients": []
    });

    let response = app.request(Method::POST, "/api/send", Some(notice.clone())).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["message"], "Recipients array is required and cannot be empty");

    let mut addressed = notice;
    addressed["recipients"] = json!(["duct@air.ae"]);
    let response = app.request(Method::POST, "/api/send", Some(addressed)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["recipients"], 1);
    assert_eq!(app.notifier.sent().len(), 1);
}

#[tokio::test]
async fn dashboard_counts_statuses() {
    let app = TestApp::with_data(
        vec![
            material_request("MRF-2508-0001", "Electrical", RequestStatus::Pending),
            material_request("MRF-2508-0002", "Electrical", RequestStatus::Approved),
            material_request("MRF-2508-0003", "HVAC", RequestStatus::Rejected),
        ],
        Vec::new(),
    )
    .await;

    let body = response_json(app.request(Method::GET, "/api/dashboard", None).await).await;
    let data = &body["data"];
    assert_eq!(data["total"], 3);
    assert_eq!(data["pending"], 1);
    assert_eq!(data["approved"], 1);
    assert_eq!(data["rejected"], 1);
    assert_eq!(data["byDepartment"]["Electrical"]["total"], 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn reject_during_slow_approval_never_reopens_the_request() {
    let app = TestApp::with_data(
        vec![material_request("MRF-2508-0050", "Electrical", RequestStatus::Pending)],
        directory(),
    )
    .await;
    app.notifier.set_delay(Duration::from_millis(200));
    let key = RequestKey::Number("MRF-2508-0050".into());

    let lifecycle = app.state.lifecycle.clone();
    let approve_key = key.clone();
    let approval = tokio::spawn(async move { lifecycle.approve(&approve_key, None).await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    let rejected = app.state.lifecycle.reject(&key).await;
    let approved = approval.await.unwrap();

    assert!(approved.is_ok());
    assert_matches!(rejected, Err(ServiceError::InvalidStatus(_)));
    assert_eq!(app.notifier.sent().len(), 1);
    let cached = app.state.store.find(&key).await.unwrap();
    assert_eq!(cached.status, RequestStatus::Approved);
    assert_eq!(stored_status(&app, "MRF-2508-0050").await, RequestStatus::Approved);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_approvals_send_one_notice() {
    let app = TestApp::with_data(
        vec![material_request("MRF-2508-0051", "Plumbing", RequestStatus::Pending)],
        directory(),
    )
    .await;
    app.notifier.set_delay(Duration::from_millis(100));
    let key = RequestKey::Number("MRF-2508-0051".into());

    let attempts: Vec<_> = (0..3)
        .map(|_| {
            let lifecycle = app.state.lifecycle.clone();
            let key = key.clone();
            tokio::spawn(async move { lifecycle.approve(&key, None).await })
        })
        .collect();
    let mut succeeded = 0;
    for attempt in attempts {
        match attempt.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(err) => assert_matches!(err, ServiceError::InvalidStatus(_)),
        }
    }

    assert_eq!(succeeded, 1);
    assert_eq!(app.notifier.sent().len(), 1);
    assert_eq!(stored_status(&app, "MRF-2508-0051").await, RequestStatus::Approved);
}
