use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use mrf_portal::backend::{BackendError, ContentBackend, GraphQlBackend};
use mrf_portal::errors::ServiceError;
use mrf_portal::models::{NewSupplier, RequestKey, RequestStatus};
use mrf_portal::store::RequestStore;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "content-token";

async fn backend(server: &MockServer) -> GraphQlBackend {
    GraphQlBackend::new(
        format!("{}/graphql", server.uri()),
        TOKEN,
        Duration::from_secs(5),
    )
    .unwrap()
}

fn graphql() -> wiremock::MockBuilder {
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(header("authorization", format!("Bearer {}", TOKEN).as_str()))
}

#[tokio::test]
async fn lists_requests_and_skips_unusable_records() {
    let server = MockServer::start().await;
    graphql()
        .and(body_string_contains("materialRequests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "materialRequests": [
                    {
                        "mrf_id": "5b0e7a52-4f0e-4d4b-9a43-1f0f3c1d2e11",
                        "mrfNumber": "MRF-2508-0042",
                        "mrf_status": "Approved",
                        "engineerName": "Sara Khan",
                        "projectName": "Tower B",
                        "siteLocation": "JVC",
                        "department": "Electrical",
                        "requestDate": "2025-08-05T00:00:00.000Z",
                        "materials": [
                            { "description": "GI conduit", "quantity": "40", "unit": "pcs" }
                        ]
                    },
                    {
                        "mrf_id": null,
                        "mrfNumber": "MRF-2508-0043",
                        "requestDate": "2025-08-05"
                    },
                    {
                        "mrf_id": "0d1c3a5e-8d2b-4b4e-9c58-3a8b7f6e5d44",
                        "mrfNumber": "MRF-2508-0044",
                        "mrf_status": "archived",
                        "department": "HVAC",
                        "requestDate": "2025-08-06",
                        "materials": null
                    }
                ]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let requests = backend(&server).await.list_material_requests().await.unwrap();

    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].mrf_number, "MRF-2508-0042");
    assert_eq!(requests[0].status, RequestStatus::Approved);
    assert_eq!(requests[0].materials.len(), 1);
    assert_eq!(requests[1].status, RequestStatus::Pending);
    assert!(requests[1].materials.is_empty());
}

#[tokio::test]
async fn status_update_uses_variables() {
    let server = MockServer::start().await;
    graphql()
        .and(body_partial_json(json!({
            "variables": {
                "where": { "mrfNumber": "MRF-2508-0042" },
                "status": "Rejected"
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "updateMaterialRequest": { "mrfNumber": "MRF-2508-0042", "mrf_status": "Rejected" },
                "publishMaterialRequest": { "mrfNumber": "MRF-2508-0042", "mrf_status": "Rejected" }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    backend(&server)
        .await
        .update_material_request_status("MRF-2508-0042", RequestStatus::Rejected)
        .await
        .unwrap();
}

#[tokio::test]
async fn graphql_errors_are_backend_failures() {
    let server = MockServer::start().await;
    graphql()
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": null,
            "errors": [{ "message": "value is not unique for field mrfNumber" }]
        })))
        .mount(&server)
        .await;

    let err = backend(&server)
        .await
        .update_material_request_status("MRF-2508-0042", RequestStatus::Approved)
        .await
        .unwrap_err();
    assert_matches!(err, BackendError::GraphQl(message) if message.contains("not unique"));
}

#[tokio::test]
async fn http_failure_surfaces_as_upstream_error() {
    let server = MockServer::start().await;
    graphql()
        .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
        .mount(&server)
        .await;

    let store = RequestStore::new(Arc::new(backend(&server).await));
    let err = store.refresh_requests().await.unwrap_err();

    assert_matches!(err, ServiceError::ExternalServiceError(_));
    assert_eq!(err.response_message(), "Upstream service request failed");
}

#[tokio::test]
async fn missing_data_field_is_an_error() {
    let server = MockServer::start().await;
    graphql()
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {} })))
        .mount(&server)
        .await;

    let err = backend(&server).await.list_suppliers().await.unwrap_err();
    assert_matches!(err, BackendError::MissingField("suppliers"));
}

#[tokio::test]
async fn delete_with_null_result_reports_nothing_deleted() {
    let server = MockServer::start().await;
    graphql()
        .and(body_partial_json(json!({
            "variables": { "where": { "mrfNumber": "MRF-2508-9999" } }
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": { "deleteMaterialRequest": null } })),
        )
        .mount(&server)
        .await;

    let deleted = backend(&server)
        .await
        .delete_material_request(&RequestKey::Number("MRF-2508-9999".into()))
        .await
        .unwrap();
    assert_eq!(deleted, None);
}

const REQUEST_ID: &str = "5b0e7a52-4f0e-4d4b-9a43-1f0f3c1d2e11";

async fn mount_empty_delete_by_id(server: &MockServer) {
    graphql()
        .and(body_partial_json(json!({
            "variables": { "where": { "mrf_id": REQUEST_ID } }
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": { "deleteMaterialRequest": { "mrf_id": REQUEST_ID } } })),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn delete_by_id_without_echoed_number_returns_bare_id() {
    let server = MockServer::start().await;
    mount_empty_delete_by_id(&server).await;

    let key = RequestKey::Id(Uuid::parse_str(REQUEST_ID).unwrap());
    let deleted = backend(&server)
        .await
        .delete_material_request(&key)
        .await
        .unwrap();
    assert_eq!(deleted.as_deref(), Some(REQUEST_ID));
}

#[tokio::test]
async fn store_delete_by_id_reports_cached_request_number() {
    let server = MockServer::start().await;
    graphql()
        .and(body_string_contains("materialRequests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "materialRequests": [{
                    "mrf_id": REQUEST_ID,
                    "mrfNumber": "MRF-2508-0042",
                    "mrf_status": "Pending",
                    "department": "Electrical",
                    "requestDate": "2025-08-05",
                    "materials": []
                }]
            }
        })))
        .mount(&server)
        .await;
    mount_empty_delete_by_id(&server).await;

    let store = RequestStore::new(Arc::new(backend(&server).await));
    store.refresh_requests().await.unwrap();
    let key = RequestKey::Id(Uuid::parse_str(REQUEST_ID).unwrap());

    assert_eq!(store.delete(&key).await.unwrap(), "MRF-2508-0042");
    assert_eq!(store.request_count().await, 0);
}

#[tokio::test]
async fn create_supplier_returns_backend_record() {
    let server = MockServer::start().await;
    graphql()
        .and(body_partial_json(json!({
            "variables": {
                "data": {
                    "name": "Volt Trading",
                    "email": "sales@volt.ae",
                    "department": "Electrical",
                    "phoneNumber": "+971 50 123 4567"
                }
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "createSupplier": {
                    "id": "clx9supplier",
                    "name": "Volt Trading",
                    "email": "sales@volt.ae",
                    "department": "Electrical",
                    "location": null,
                    "phoneNumber": "+971 50 123 4567"
                },
                "publishManySuppliers": { "count": 1 }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let created = backend(&server)
        .await
        .create_supplier(&NewSupplier {
            name: "Volt Trading".into(),
            email: "sales@volt.ae".into(),
            department: "Electrical".into(),
            location: None,
            phone_number: Some("+971 50 123 4567".into()),
        })
        .await
        .unwrap();

    assert_eq!(created.id, "clx9supplier");
    assert_eq!(created.location, None);
}
