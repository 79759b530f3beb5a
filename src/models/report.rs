use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Workflow status of a report. Only an investigator outside this service
/// moves a report between states; the portal displays the current value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    InReview,
    Investigating,
    Resolved,
    Dismissed,
}

impl ReportStatus {
    pub const ALL: [ReportStatus; 5] = [
        ReportStatus::Pending,
        ReportStatus::InReview,
        ReportStatus::Investigating,
        ReportStatus::Resolved,
        ReportStatus::Dismissed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::InReview => "in_review",
            ReportStatus::Investigating => "investigating",
            ReportStatus::Resolved => "resolved",
            ReportStatus::Dismissed => "dismissed",
        }
    }

    /// Localized label shown on the status badge.
    pub fn label(self) -> &'static str {
        match self {
            ReportStatus::Pending => "Pendente",
            ReportStatus::InReview => "Em Análise",
            ReportStatus::Investigating => "Investigando",
            ReportStatus::Resolved => "Resolvida",
            ReportStatus::Dismissed => "Arquivada",
        }
    }

    /// Badge tone used by the front-end theme.
    pub fn tone(self) -> &'static str {
        match self {
            ReportStatus::Pending => "warning",
            ReportStatus::InReview => "accent",
            ReportStatus::Investigating => "primary",
            ReportStatus::Resolved => "success",
            ReportStatus::Dismissed => "muted",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ReportStatus::Resolved | ReportStatus::Dismissed)
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored report row, as returned by the row store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub company_name: String,
    pub incident_date: NaiveDate,
    pub description: String,
    pub evidence_details: Option<String>,
    pub is_anonymous: bool,
    pub tracking_token: Option<String>,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
}

/// Fields sent on insert. `id`, `created_at` are assigned by storage.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NewReport {
    pub user_id: Option<Uuid>,
    pub company_name: String,
    pub incident_date: NaiveDate,
    pub description: String,
    pub evidence_details: Option<String>,
    pub is_anonymous: bool,
    pub tracking_token: Option<String>,
    pub status: ReportStatus,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub id: Uuid,
    pub report_id: Uuid,
    pub status: ReportStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A report fetched by tracking token, joined with its audit trail.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackedReport {
    #[serde(flatten)]
    pub report: Report,
    #[serde(default)]
    pub report_status_history: Vec<StatusHistoryEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_labels_are_localized() {
        assert_eq!(ReportStatus::Pending.label(), "Pendente");
        assert_eq!(ReportStatus::InReview.label(), "Em Análise");
        assert_eq!(ReportStatus::Dismissed.label(), "Arquivada");
    }

    #[test]
    fn only_resolved_and_dismissed_are_terminal() {
        let terminal: Vec<_> = ReportStatus::ALL
            .into_iter()
            .filter(|s| s.is_terminal())
            .collect();
        assert_eq!(
            terminal,
            vec![ReportStatus::Resolved, ReportStatus::Dismissed]
        );
    }

    #[test]
    fn status_uses_snake_case_on_the_wire() {
        let json = serde_json::to_string(&ReportStatus::InReview).unwrap();
        assert_eq!(json, "\"in_review\"");
        let parsed: ReportStatus = serde_json::from_str("\"investigating\"").unwrap();
        assert_eq!(parsed, ReportStatus::Investigating);
    }

    #[test]
    fn tracked_report_decodes_joined_history() {
        let raw = serde_json::json!({
            "id": "6f1c2a3e-1111-4a4a-9a9a-000000000001",
            "user_id": null,
            "company_name": "ACME Ltda",
            "incident_date": "2024-01-01",
            "description": "Vazamento de dados de clientes em planilha pública",
            "evidence_details": null,
            "is_anonymous": true,
            "tracking_token": "AB12CD34-EF56AB78",
            "status": "in_review",
            "created_at": "2024-01-02T10:00:00Z",
            "report_status_history": [{
                "id": "6f1c2a3e-1111-4a4a-9a9a-000000000002",
                "report_id": "6f1c2a3e-1111-4a4a-9a9a-000000000001",
                "status": "in_review",
                "notes": "Recebida pela equipe",
                "created_at": "2024-01-03T10:00:00Z"
            }]
        });

        let tracked: TrackedReport = serde_json::from_value(raw).unwrap();
        assert!(tracked.report.is_anonymous);
        assert_eq!(tracked.report.status, ReportStatus::InReview);
        assert_eq!(tracked.report_status_history.len(), 1);
        assert_eq!(
            tracked.report_status_history[0].notes.as_deref(),
            Some("Recebida pela equipe")
        );
    }
}
