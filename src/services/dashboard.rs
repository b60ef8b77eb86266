use std::collections::BTreeMap;

use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{MaterialRequest, RequestStatus};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
}

impl StatusCounts {
    fn record(&mut self, status: RequestStatus) {
        self.total += 1;
        match status {
            RequestStatus::Pending => self.pending += 1,
            RequestStatus::Approved => self.approved += 1,
            RequestStatus::Rejected => self.rejected += 1,
        }
    }
}

/// Request counts for the approver dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    #[serde(flatten)]
    pub counts: StatusCounts,
    pub by_department: BTreeMap<String, StatusCounts>,
}

pub fn dashboard_summary(requests: &[MaterialRequest]) -> DashboardSummary {
    requests
        .iter()
        .fold(DashboardSummary::default(), |mut summary, request| {
            summary.counts.record(request.status);
            summary
                .by_department
                .entry(request.department.clone())
                .or_default()
                .record(request.status);
            summary
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn request(department: &str, status: RequestStatus) -> MaterialRequest {
        MaterialRequest {
            id: Uuid::new_v4(),
            request_date: NaiveDate::from_ymd_opt(2025, 8, 5).unwrap(),
            mrf_number: format!("MRF-{}", Uuid::new_v4()),
            engineer_name: "Sara".into(),
            project_name: "Tower B".into(),
            site_location: "JVC".into(),
            department: department.into(),
            status,
            materials: Vec::new(),
        }
    }

    #[test]
    fn counts_by_status_and_department() {
        let summary = dashboard_summary(&[
            request("Electrical", RequestStatus::Pending),
            request("Electrical", RequestStatus::Approved),
            request("HVAC", RequestStatus::Rejected),
        ]);

        assert_eq!(summary.counts.total, 3);
        assert_eq!(summary.counts.pending, 1);
        assert_eq!(summary.counts.approved, 1);
        assert_eq!(summary.counts.rejected, 1);
        assert_eq!(summary.by_department["Electrical"].total, 2);
        assert_eq!(summary.by_department["HVAC"].rejected, 1);
    }

    #[test]
    fn empty_list_is_all_zero() {
        assert_eq!(dashboard_summary(&[]), DashboardSummary::default());
    }
}
