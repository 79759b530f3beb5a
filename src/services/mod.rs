pub mod auth;
pub mod generation;
pub mod report;

pub use auth::AuthService;
pub use generation::{GenerationTicket, RequestGenerations};
pub use report::ReportService;
