pub mod dashboard;
pub mod lifecycle;
pub mod numbering;

pub use dashboard::{dashboard_summary, DashboardSummary, StatusCounts};
pub use lifecycle::{ApprovalOutcome, NotificationStatus, RequestLifecycle};
pub use numbering::{RequestNumbering, SerialStrategy};
