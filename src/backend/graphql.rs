use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::{BackendError, ContentBackend};
use crate::metrics::WorkflowMetrics;
use crate::models::{
    MaterialLine, MaterialRequest, NewSupplier, RequestKey, RequestStatus, Supplier,
};

const LIST_MATERIAL_REQUESTS: &str = r#"
query MaterialRequests {
  materialRequests(first: 1000) {
    mrf_id
    mrfNumber
    mrf_status
    engineerName
    projectName
    siteLocation
    department
    requestDate
    materials
  }
}"#;

const CREATE_MATERIAL_REQUEST: &str = r#"
mutation CreateMaterialRequest($data: MaterialRequestCreateInput!, $where: MaterialRequestWhereUniqueInput!) {
  createMaterialRequest(data: $data) {
    mrf_id
    mrfNumber
  }
  publishMaterialRequest(where: $where, to: PUBLISHED) {
    mrfNumber
  }
}"#;

const UPDATE_MATERIAL_REQUEST_STATUS: &str = r#"
mutation UpdateMaterialRequest($where: MaterialRequestWhereUniqueInput!, $status: String!) {
  updateMaterialRequest(where: $where, data: { mrf_status: $status }) {
    mrfNumber
    mrf_status
  }
  publishMaterialRequest(where: $where, to: PUBLISHED) {
    mrfNumber
    mrf_status
  }
}"#;

const DELETE_MATERIAL_REQUEST: &str = r#"
mutation DeleteMaterialRequest($where: MaterialRequestWhereUniqueInput!) {
  deleteMaterialRequest(where: $where) {
    mrfNumber
  }
}"#;

const LIST_SUPPLIERS: &str = r#"
query Suppliers {
  suppliers(first: 1000) {
    id
    name
    email
    department
    location
    phoneNumber
  }
}"#;

const CREATE_SUPPLIER: &str = r#"
mutation CreateSupplier($data: SupplierCreateInput!) {
  createSupplier(data: $data) {
    id
    name
    email
    department
    location
    phoneNumber
  }
  publishManySuppliers(to: PUBLISHED) {
    count
  }
}"#;

const DELETE_SUPPLIER: &str = r#"
mutation DeleteSupplier($where: SupplierWhereUniqueInput!) {
  deleteSupplier(where: $where) {
    id
  }
}"#;

/// Client for a GraphQL content API authenticated with a bearer token.
#[derive(Clone)]
pub struct GraphQlBackend {
    client: reqwest::Client,
    endpoint: String,
    auth_token: String,
}

#[derive(Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: Value,
}

#[derive(Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<GraphQlErrorEntry>>,
}

#[derive(Deserialize)]
struct GraphQlErrorEntry {
    #[serde(default)]
    message: String,
}

/// Material request as stored by the content backend.
#[derive(Debug, Serialize, Deserialize)]
struct WireMaterialRequest {
    mrf_id: Option<String>,
    #[serde(rename = "mrfNumber")]
    mrf_number: Option<String>,
    #[serde(default)]
    mrf_status: Option<String>,
    #[serde(rename = "engineerName", default)]
    engineer_name: Option<String>,
    #[serde(rename = "projectName", default)]
    project_name: Option<String>,
    #[serde(rename = "siteLocation", default)]
    site_location: Option<String>,
    #[serde(default)]
    department: Option<String>,
    #[serde(rename = "requestDate", default)]
    request_date: Option<String>,
    #[serde(default)]
    materials: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct WireSupplier {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    department: String,
    #[serde(default)]
    location: Option<String>,
    #[serde(rename = "phoneNumber", default)]
    phone_number: Option<String>,
}

impl From<WireSupplier> for Supplier {
    fn from(wire: WireSupplier) -> Self {
        Supplier {
            id: wire.id,
            name: wire.name,
            email: wire.email,
            department: wire.department,
            location: wire.location,
            phone_number: wire.phone_number,
        }
    }
}

fn parse_status(raw: Option<&str>, mrf_number: &str) -> RequestStatus {
    match raw.map(str::parse::<RequestStatus>) {
        Some(Ok(status)) => status,
        Some(Err(_)) => {
            warn!(mrf_number, status = ?raw, "unknown request status; treating as Pending");
            RequestStatus::Pending
        }
        None => RequestStatus::Pending,
    }
}

impl WireMaterialRequest {
    fn into_model(self) -> Option<MaterialRequest> {
        let mrf_number = self.mrf_number?;
        let id = match self.mrf_id.as_deref().map(Uuid::parse_str) {
            Some(Ok(id)) => id,
            _ => {
                warn!(%mrf_number, "skipping material request without a usable mrf_id");
                return None;
            }
        };
        let request_date = match self
            .request_date
            .as_deref()
            .map(|d| NaiveDate::parse_from_str(d.get(..10).unwrap_or(d), "%Y-%m-%d"))
        {
            Some(Ok(date)) => date,
            _ => {
                warn!(%mrf_number, "skipping material request without a usable requestDate");
                return None;
            }
        };
        let materials = match self.materials {
            Some(Value::Null) | None => Vec::new(),
            Some(value) => serde_json::from_value::<Vec<MaterialLine>>(value).unwrap_or_else(|err| {
                warn!(%mrf_number, error = %err, "material lines could not be decoded");
                Vec::new()
            }),
        };
        let status = parse_status(self.mrf_status.as_deref(), &mrf_number);

        Some(MaterialRequest {
            id,
            request_date,
            mrf_number,
            engineer_name: self.engineer_name.unwrap_or_default(),
            project_name: self.project_name.unwrap_or_default(),
            site_location: self.site_location.unwrap_or_default(),
            department: self.department.unwrap_or_default(),
            status,
            materials,
        })
    }

    fn from_model(request: &MaterialRequest) -> Result<Self, BackendError> {
        Ok(Self {
            mrf_id: Some(request.id.to_string()),
            mrf_number: Some(request.mrf_number.clone()),
            mrf_status: Some(request.status.as_str().to_string()),
            engineer_name: Some(request.engineer_name.clone()),
            project_name: Some(request.project_name.clone()),
            site_location: Some(request.site_location.clone()),
            department: Some(request.department.clone()),
            request_date: Some(request.request_date.format("%Y-%m-%d").to_string()),
            materials: Some(serde_json::to_value(&request.materials)?),
        })
    }
}

fn request_where(key: &RequestKey) -> Value {
    match key {
        RequestKey::Id(id) => json!({ "mrf_id": id.to_string() }),
        RequestKey::Number(number) => json!({ "mrfNumber": number }),
    }
}

impl GraphQlBackend {
    pub fn new(
        endpoint: impl Into<String>,
        auth_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            auth_token: auth_token.into(),
        })
    }

    /// Runs one document and returns its `data` object.
    async fn execute(&self, operation: &str, query: &str, variables: Value) -> Result<Value, BackendError> {
        let started = Instant::now();
        let result = self.execute_inner(query, variables).await;
        WorkflowMetrics::record_backend_call(started.elapsed());
        if let Err(err) = &result {
            WorkflowMetrics::record_backend_error();
            warn!(operation, error = %err, "content backend call failed");
        } else {
            debug!(operation, elapsed_ms = started.elapsed().as_millis() as u64, "content backend call");
        }
        result
    }

    async fn execute_inner(&self, query: &str, variables: Value) -> Result<Value, BackendError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.auth_token)
            .json(&GraphQlRequest { query, variables })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GraphQlResponse = serde_json::from_str(&body)?;
        if let Some(errors) = parsed.errors.filter(|e| !e.is_empty()) {
            let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
            return Err(BackendError::GraphQl(messages.join("; ")));
        }
        parsed.data.ok_or(BackendError::MissingField("data"))
    }
}

fn take_field<T: DeserializeOwned>(data: &mut Value, field: &'static str) -> Result<T, BackendError> {
    match data.get_mut(field).map(Value::take) {
        Some(Value::Null) | None => Err(BackendError::MissingField(field)),
        Some(value) => Ok(serde_json::from_value(value)?),
    }
}

#[async_trait]
impl ContentBackend for GraphQlBackend {
    #[instrument(skip(self))]
    async fn list_material_requests(&self) -> Result<Vec<MaterialRequest>, BackendError> {
        let mut data = self
            .execute("list_material_requests", LIST_MATERIAL_REQUESTS, json!({}))
            .await?;
        let wire: Vec<WireMaterialRequest> = take_field(&mut data, "materialRequests")?;
        Ok(wire.into_iter().filter_map(WireMaterialRequest::into_model).collect())
    }

    #[instrument(skip(self, request), fields(mrf_number = %request.mrf_number))]
    async fn create_material_request(&self, request: &MaterialRequest) -> Result<(), BackendError> {
        let data = serde_json::to_value(WireMaterialRequest::from_model(request)?)?;
        let variables = json!({
            "data": data,
            "where": request_where(&RequestKey::Id(request.id)),
        });
        let mut data = self
            .execute("create_material_request", CREATE_MATERIAL_REQUEST, variables)
            .await?;
        let _: Value = take_field(&mut data, "createMaterialRequest")?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn update_material_request_status(
        &self,
        mrf_number: &str,
        status: RequestStatus,
    ) -> Result<(), BackendError> {
        let variables = json!({
            "where": request_where(&RequestKey::Number(mrf_number.to_string())),
            "status": status.as_str(),
        });
        let mut data = self
            .execute("update_material_request_status", UPDATE_MATERIAL_REQUEST_STATUS, variables)
            .await?;
        let _: Value = take_field(&mut data, "publishMaterialRequest")?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_material_request(
        &self,
        key: &RequestKey,
    ) -> Result<Option<String>, BackendError> {
        let mut data = self
            .execute(
                "delete_material_request",
                DELETE_MATERIAL_REQUEST,
                json!({ "where": request_where(key) }),
            )
            .await?;
        match take_field::<Value>(&mut data, "deleteMaterialRequest") {
            Ok(deleted) => Ok(deleted
                .get("mrfNumber")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| Some(key.value()))),
            Err(BackendError::MissingField(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    #[instrument(skip(self))]
    async fn list_suppliers(&self) -> Result<Vec<Supplier>, BackendError> {
        let mut data = self.execute("list_suppliers", LIST_SUPPLIERS, json!({})).await?;
        let wire: Vec<WireSupplier> = take_field(&mut data, "suppliers")?;
        Ok(wire.into_iter().map(Supplier::from).collect())
    }

    #[instrument(skip(self, supplier), fields(department = %supplier.department))]
    async fn create_supplier(&self, supplier: &NewSupplier) -> Result<Supplier, BackendError> {
        let variables = json!({
            "data": {
                "name": supplier.name,
                "email": supplier.email,
                "department": supplier.department,
                "location": supplier.location,
                "phoneNumber": supplier.phone_number,
            }
        });
        let mut data = self
            .execute("create_supplier", CREATE_SUPPLIER, variables)
            .await?;
        let created: WireSupplier = take_field(&mut data, "createSupplier")?;
        Ok(created.into())
    }

    #[instrument(skip(self))]
    async fn delete_supplier(&self, id: &str) -> Result<Option<String>, BackendError> {
        let mut data = self
            .execute(
                "delete_supplier",
                DELETE_SUPPLIER,
                json!({ "where": { "id": id } }),
            )
            .await?;
        match take_field::<Value>(&mut data, "deleteSupplier") {
            Ok(deleted) => Ok(deleted
                .get("id")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| Some(id.to_string()))),
            Err(BackendError::MissingField(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_record_maps_to_model() {
        let wire: WireMaterialRequest = serde_json::from_value(json!({
            "mrf_id": "6f1c2b9e-6a4b-4c39-9d7e-0d1f1b0c2a11",
            "mrfNumber": "MRF-2508-1234",
            "mrf_status": "Approved",
            "engineerName": "Sara",
            "projectName": "Tower B",
            "siteLocation": "JVC",
            "department": "HVAC",
            "requestDate": "2025-08-05",
            "materials": [{"description": "Flexible duct", "quantity": 3, "unit": "roll", "remarks": ""}]
        }))
        .unwrap();
        let model = wire.into_model().unwrap();
        assert_eq!(model.status, RequestStatus::Approved);
        assert_eq!(model.materials.len(), 1);
        assert_eq!(model.request_date, NaiveDate::from_ymd_opt(2025, 8, 5).unwrap());
    }

    #[test]
    fn missing_or_unknown_status_reads_as_pending() {
        assert_eq!(parse_status(None, "x"), RequestStatus::Pending);
        assert_eq!(parse_status(Some("Archived"), "x"), RequestStatus::Pending);
        assert_eq!(parse_status(Some("rejected"), "x"), RequestStatus::Rejected);
    }

    #[test]
    fn record_without_id_is_skipped() {
        let wire: WireMaterialRequest = serde_json::from_value(json!({
            "mrfNumber": "MRF-2508-0001",
            "requestDate": "2025-08-05"
        }))
        .unwrap();
        assert!(wire.into_model().is_none());
    }

    #[test]
    fn where_clause_follows_key() {
        assert_eq!(
            request_where(&RequestKey::Number("MRF-1".into())),
            json!({"mrfNumber": "MRF-1"})
        );
        let id = Uuid::nil();
        assert_eq!(
            request_where(&RequestKey::Id(id)),
            json!({"mrf_id": id.to_string()})
        );
    }
}
