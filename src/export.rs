//! CSV export of material requests.

use chrono::Utc;
use csv::{QuoteStyle, Terminator, WriterBuilder};

use crate::errors::ServiceError;
use crate::models::MaterialRequest;

pub const CSV_HEADERS: [&str; 7] = [
    "MRF Number",
    "Engineer Name",
    "Project Name",
    "Site Location",
    "Department",
    "Request Date",
    "Status",
];

/// `material_requests_<unix millis>.csv`
pub fn export_file_name() -> String {
    format!("material_requests_{}.csv", Utc::now().timestamp_millis())
}

/// Header line plus one fully quoted line per request.
pub fn requests_to_csv(requests: &[MaterialRequest]) -> Result<String, ServiceError> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    let csv_error = |e: csv::Error| ServiceError::SerializationError(e.to_string());

    writer.write_record(CSV_HEADERS).map_err(csv_error)?;
    for request in requests {
        let date = request.request_date.format("%Y-%m-%d").to_string();
        writer
            .write_record([
                request.mrf_number.as_str(),
                request.engineer_name.as_str(),
                request.project_name.as_str(),
                request.site_location.as_str(),
                request.department.as_str(),
                date.as_str(),
                request.status.as_str(),
            ])
            .map_err(csv_error)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ServiceError::SerializationError(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ServiceError::SerializationError(e.to_string()))
}
