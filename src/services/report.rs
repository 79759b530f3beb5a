use crate::{
    backend::SharedBackend,
    error::{AppError, AppResult, TOKEN_NOT_FOUND},
    middleware::auth::AuthUser,
    models::{NewReport, Report, ReportStatus, TrackedReport},
    navigation::Screen,
    services::generation::GenerationTicket,
    validation::{normalize_tracking_token, ReportForm},
};

pub const SUBMITTED: &str = "Denúncia registrada com sucesso!";
pub const SUBMITTED_ANONYMOUSLY: &str = "Denúncia registrada!";
pub const KEEP_TOKEN_NOTICE: &str = "Guarde este código para acompanhar sua denúncia";
pub const NO_REPORTS: &str = "Você ainda não tem denúncias registradas";

/// What the submitter sees once a report is stored.
#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub report: Report,
    /// Present only for anonymous reports; the sole handle the submitter
    /// keeps on the report.
    pub tracking_token: Option<String>,
    pub message: &'static str,
    pub notice: Option<&'static str>,
    pub redirect: Screen,
}

pub struct ReportService {
    backend: SharedBackend,
}

impl ReportService {
    pub fn new(backend: SharedBackend) -> Self {
        Self { backend }
    }

    /// Validate and store a new report.
    ///
    /// A report is anonymous when the submitter asks for it or has no
    /// session. Anonymous reports get a tracking token from the backend
    /// and no owner. If `ticket` was superseded by the time the insert is
    /// due, nothing is stored.
    pub async fn submit(
        &self,
        caller: Option<&AuthUser>,
        form: &ReportForm,
        wants_anonymous: bool,
        ticket: Option<&GenerationTicket>,
    ) -> AppResult<SubmissionOutcome> {
        let valid = form.validate().map_err(AppError::Validation)?;
        let anonymous = wants_anonymous || caller.is_none();

        let tracking_token = if anonymous {
            let token = self
                .backend
                .generate_tracking_token()
                .await
                .map_err(|e| AppError::rejected(&e, submission_failed(&e.to_string())))?;
            if token.trim().is_empty() {
                return Err(AppError::Rejected {
                    status: 502,
                    message: submission_failed("token de acompanhamento vazio"),
                });
            }
            Some(token)
        } else {
            None
        };

        if ticket.is_some_and(|t| !t.is_current()) {
            tracing::debug!("Dropping superseded report submission before insert");
            return Err(AppError::Stale);
        }

        let new_report = NewReport {
            user_id: if anonymous { None } else { caller.map(|c| c.user_id) },
            company_name: valid.company_name,
            incident_date: valid.incident_date,
            description: valid.description,
            evidence_details: valid.evidence_details,
            is_anonymous: anonymous,
            tracking_token: tracking_token.clone(),
            status: ReportStatus::Pending,
        };

        // Anonymous rows are written with the anon key so the session never
        // links the submitter to the report.
        let access_token = if anonymous {
            None
        } else {
            caller.map(|c| c.access_token.as_str())
        };

        let report = self
            .backend
            .insert_report(access_token, &new_report)
            .await
            .map_err(|e| {
                tracing::warn!("Report insert failed: {}", e);
                AppError::rejected(&e, submission_failed(&e.to_string()))
            })?;

        tracing::info!(report_id = %report.id, anonymous, "Report submitted");

        Ok(if anonymous {
            SubmissionOutcome {
                report,
                tracking_token,
                message: SUBMITTED_ANONYMOUSLY,
                notice: Some(KEEP_TOKEN_NOTICE),
                redirect: Screen::Track,
            }
        } else {
            SubmissionOutcome {
                report,
                tracking_token: None,
                message: SUBMITTED,
                notice: None,
                redirect: Screen::Dashboard,
            }
        })
    }

    /// The caller's own reports, newest first.
    ///
    /// Without a session nothing is fetched. A failed fetch is logged and
    /// reads as an empty list.
    pub async fn list_for_owner(&self, caller: Option<&AuthUser>) -> Vec<Report> {
        let Some(caller) = caller else {
            return Vec::new();
        };

        match self
            .backend
            .reports_by_owner(&caller.access_token, caller.user_id)
            .await
        {
            Ok(mut reports) => {
                reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                reports
            }
            Err(e) => {
                tracing::warn!(user_id = %caller.user_id, "Failed to load reports: {}", e);
                Vec::new()
            }
        }
    }

    /// Look a report up by its tracking token. Every failure reads the same
    /// so a token's existence is not leaked through error detail.
    pub async fn track(&self, raw_token: &str) -> AppResult<TrackedReport> {
        let token = normalize_tracking_token(raw_token);
        if token.is_empty() {
            return Err(AppError::NotFound(TOKEN_NOT_FOUND.to_string()));
        }

        let mut tracked = self.backend.report_by_token(&token).await.map_err(|e| {
            tracing::debug!("Tracking lookup failed: {}", e);
            AppError::NotFound(TOKEN_NOT_FOUND.to_string())
        })?;

        tracked
            .report_status_history
            .sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(tracked)
    }
}

fn submission_failed(raw: &str) -> String {
    format!("Erro ao registrar denúncia: {}", raw)
}
