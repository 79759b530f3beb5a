pub mod report;
pub mod user;

pub use report::{NewReport, Report, ReportStatus, StatusHistoryEntry, TrackedReport};
pub use user::{BackendUser, ProfileUpdate, Session, SignUpOutcome, SignUpRequest};
