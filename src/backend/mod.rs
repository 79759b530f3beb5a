//! The hosted backend this portal is a client of.
//!
//! Authentication, row storage, row-level policies and tracking-token
//! generation all live behind [`Backend`]. The portal only orchestrates
//! calls to it.

pub mod memory;
pub mod supabase;

use crate::models::{NewReport, ProfileUpdate, Report, Session, SignUpOutcome, SignUpRequest, TrackedReport};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

pub use memory::MemoryBackend;
pub use supabase::SupabaseBackend;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with an error payload. `message` is the raw
    /// text it sent, which callers may show or translate.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Record not found")]
    NotFound,

    #[error("Unexpected backend response: {0}")]
    Unexpected(String),
}

impl BackendError {
    /// HTTP status reported by the backend, if it answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Api { status, .. } => Some(*status),
            BackendError::Http(e) => e.status().map(|s| s.as_u16()),
            BackendError::NotFound => Some(404),
            BackendError::Unexpected(_) => None,
        }
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Operations consumed from the hosted backend.
///
/// `access_token` arguments carry the caller's session token; when absent
/// the request runs with the project's anonymous key.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn sign_up(&self, request: &SignUpRequest) -> BackendResult<SignUpOutcome>;

    async fn sign_in(&self, email: &str, password: &str) -> BackendResult<Session>;

    async fn refresh_session(&self, refresh_token: &str) -> BackendResult<Session>;

    async fn sign_out(&self, access_token: &str) -> BackendResult<()>;

    async fn update_profile(
        &self,
        access_token: Option<&str>,
        user_id: Uuid,
        profile: &ProfileUpdate,
    ) -> BackendResult<()>;

    /// Ask the token RPC for a fresh, unique tracking token.
    async fn generate_tracking_token(&self) -> BackendResult<String>;

    /// Single atomic insert returning the stored row.
    async fn insert_report(
        &self,
        access_token: Option<&str>,
        report: &NewReport,
    ) -> BackendResult<Report>;

    /// Reports owned by `user_id`, newest first.
    async fn reports_by_owner(
        &self,
        access_token: &str,
        user_id: Uuid,
    ) -> BackendResult<Vec<Report>>;

    /// The single report carrying `token`, with its status history.
    /// Zero or several matches yield [`BackendError::NotFound`].
    async fn report_by_token(&self, token: &str) -> BackendResult<TrackedReport>;

    fn name(&self) -> &'static str;
}

pub type SharedBackend = Arc<dyn Backend>;
