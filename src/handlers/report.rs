use crate::backend::SharedBackend;
use crate::error::{AppError, AppResult};
use crate::handlers::begin_view_request;
use crate::middleware::auth::MaybeAuthUser;
use crate::models::{Report, ReportStatus, StatusHistoryEntry, TrackedReport};
use crate::response::ApiResponse;
use crate::services::generation::RequestGenerations;
use crate::services::report::{ReportService, NO_REPORTS};
use crate::validation::ReportForm;
use axum::{extract::Query, http::HeaderMap, response::IntoResponse, Extension, Json};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportRequest {
    #[serde(flatten)]
    pub form: ReportForm,
    /// Submit without linking the report to the account
    #[serde(default)]
    pub is_anonymous: bool,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct TrackQuery {
    /// Tracking token, case-insensitive
    pub token: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReportResponse {
    /// Report ID
    pub id: Uuid,
    /// Company responsible for the leak
    pub company_name: String,
    /// When the incident happened
    pub incident_date: NaiveDate,
    pub description: String,
    pub evidence_details: Option<String>,
    pub is_anonymous: bool,
    /// Only set on anonymous reports
    pub tracking_token: Option<String>,
    pub status: ReportStatus,
    /// Localized status label
    pub status_label: String,
    /// Badge tone for the status
    pub status_tone: String,
    pub created_at: DateTime<Utc>,
}

impl From<Report> for ReportResponse {
    fn from(r: Report) -> Self {
        Self {
            id: r.id,
            company_name: r.company_name,
            incident_date: r.incident_date,
            description: r.description,
            evidence_details: r.evidence_details,
            tracking_token: if r.is_anonymous { r.tracking_token } else { None },
            is_anonymous: r.is_anonymous,
            status: r.status,
            status_label: r.status.label().to_string(),
            status_tone: r.status.tone().to_string(),
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusHistoryResponse {
    pub status: ReportStatus,
    pub status_label: String,
    /// Investigator notes
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<StatusHistoryEntry> for StatusHistoryResponse {
    fn from(h: StatusHistoryEntry) -> Self {
        Self {
            status: h.status,
            status_label: h.status.label().to_string(),
            notes: h.notes,
            created_at: h.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TrackedReportResponse {
    pub report: ReportResponse,
    /// Oldest first
    pub history: Vec<StatusHistoryResponse>,
}

impl From<TrackedReport> for TrackedReportResponse {
    fn from(t: TrackedReport) -> Self {
        Self {
            report: ReportResponse::from(t.report),
            history: t
                .report_status_history
                .into_iter()
                .map(StatusHistoryResponse::from)
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubmissionResponse {
    pub report: ReportResponse,
    /// The only way to follow an anonymous report; shown once
    pub tracking_token: Option<String>,
    pub notice: Option<String>,
    /// Where the front-end goes next
    pub redirect: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReportListResponse {
    /// Newest first
    pub reports: Vec<ReportResponse>,
    /// Text for the empty state
    pub empty_message: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/v1/reports",
    request_body = CreateReportRequest,
    params(
        ("X-View-Id" = Option<String>, Header, description = "Identifies the submitting view; a newer request from the same view supersedes this one"),
    ),
    responses(
        (status = 200, description = "Report submitted", body = SubmissionResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 409, description = "Superseded by a newer request", body = AppError),
        (status = 502, description = "Backend unavailable", body = AppError),
    ),
    tag = "reports"
)]
pub async fn create_report(
    Extension(backend): Extension<SharedBackend>,
    Extension(generations): Extension<RequestGenerations>,
    MaybeAuthUser(caller): MaybeAuthUser,
    headers: HeaderMap,
    Json(payload): Json<CreateReportRequest>,
) -> AppResult<impl IntoResponse> {
    let ticket = begin_view_request(&headers, &generations);

    let service = ReportService::new(backend);
    let outcome = service
        .submit(
            caller.as_ref(),
            &payload.form,
            payload.is_anonymous,
            ticket.as_ref(),
        )
        .await?;

    let message = outcome.message.to_string();
    let response = SubmissionResponse {
        report: ReportResponse::from(outcome.report),
        tracking_token: outcome.tracking_token,
        notice: outcome.notice.map(str::to_string),
        redirect: outcome.redirect.path().to_string(),
    };

    Ok(ApiResponse::with_message(response, message))
}

#[utoipa::path(
    get,
    path = "/api/v1/reports/mine",
    security(("jwt_token" = [])),
    params(
        ("X-View-Id" = Option<String>, Header, description = "Identifies the requesting view"),
    ),
    responses(
        (status = 200, description = "The caller's reports", body = ReportListResponse),
        (status = 409, description = "Superseded by a newer request", body = AppError),
    ),
    tag = "reports"
)]
pub async fn list_my_reports(
    Extension(backend): Extension<SharedBackend>,
    Extension(generations): Extension<RequestGenerations>,
    MaybeAuthUser(caller): MaybeAuthUser,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let ticket = begin_view_request(&headers, &generations);

    let service = ReportService::new(backend);
    let reports = service.list_for_owner(caller.as_ref()).await;

    if ticket.as_ref().is_some_and(|t| !t.is_current()) {
        return Err(AppError::Stale);
    }

    let empty_message = reports.is_empty().then(|| NO_REPORTS.to_string());
    Ok(ApiResponse::ok(ReportListResponse {
        reports: reports.into_iter().map(ReportResponse::from).collect(),
        empty_message,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/reports/track",
    params(
        TrackQuery,
        ("X-View-Id" = Option<String>, Header, description = "Identifies the requesting view"),
    ),
    responses(
        (status = 200, description = "Report and its status history", body = TrackedReportResponse),
        (status = 404, description = "Token not found", body = AppError),
        (status = 409, description = "Superseded by a newer request", body = AppError),
    ),
    tag = "reports"
)]
pub async fn track_report(
    Extension(backend): Extension<SharedBackend>,
    Extension(generations): Extension<RequestGenerations>,
    headers: HeaderMap,
    Query(query): Query<TrackQuery>,
) -> AppResult<impl IntoResponse> {
    let ticket = begin_view_request(&headers, &generations);

    let service = ReportService::new(backend);
    let result = service.track(query.token.as_deref().unwrap_or_default()).await;

    if ticket.as_ref().is_some_and(|t| !t.is_current()) {
        return Err(AppError::Stale);
    }

    Ok(ApiResponse::ok(TrackedReportResponse::from(result?)))
}
