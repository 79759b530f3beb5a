//! In-process stand-in for the hosted backend.
//!
//! Used by the test suite and by `BACKEND_MODE=memory` to run the portal
//! without a hosted project. It mirrors the observable behavior the portal
//! depends on: error texts of the auth service, row-level checks on
//! inserts, single-object lookups by token.

use super::{Backend, BackendError, BackendResult};
use crate::models::{
    BackendUser, NewReport, ProfileUpdate, Report, ReportStatus, Session, SignUpOutcome,
    SignUpRequest, StatusHistoryEntry, TrackedReport,
};
use crate::utils::jwt::{decode_session_token, encode_session_token};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use uuid::Uuid;

// Cheap hashing keeps the test suite fast; these accounts never leave the process.
const PASSWORD_HASH_COST: u32 = 4;

struct Account {
    id: Uuid,
    email: String,
    password_hash: String,
    profile: Option<ProfileUpdate>,
}

#[derive(Default)]
struct State {
    accounts: Vec<Account>,
    refresh_tokens: HashMap<String, Uuid>,
    reports: Vec<Report>,
    history: Vec<StatusHistoryEntry>,
    offline: bool,
    read_latency: Duration,
}

#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make every subsequent call fail as if the network were down.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Delay owner listings and token lookups, so a request can still be
    /// in flight when the same view issues a newer one.
    pub fn set_read_latency(&self, latency: Duration) {
        self.lock().read_latency = latency;
    }

    pub fn report_count(&self) -> usize {
        self.lock().reports.len()
    }

    pub fn reports(&self) -> Vec<Report> {
        self.lock().reports.clone()
    }

    pub fn profile_of(&self, user_id: Uuid) -> Option<ProfileUpdate> {
        self.lock()
            .accounts
            .iter()
            .find(|a| a.id == user_id)
            .and_then(|a| a.profile.clone())
    }

    /// Move a report to `status` the way an investigator would: update the
    /// row and append a history entry.
    pub fn record_status(
        &self,
        report_id: Uuid,
        status: ReportStatus,
        notes: Option<&str>,
    ) -> BackendResult<()> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let report = state
            .reports
            .iter_mut()
            .find(|r| r.id == report_id)
            .ok_or(BackendError::NotFound)?;
        report.status = status;
        state.history.push(StatusHistoryEntry {
            id: Uuid::new_v4(),
            report_id,
            status,
            notes: notes.map(str::to_string),
            created_at: Utc::now(),
        });
        Ok(())
    }

    /// Store a report row as-is, bypassing the portal. Lets tests set up
    /// states the portal itself never produces, such as duplicate tokens.
    pub fn seed_report(&self, report: Report) {
        self.lock().reports.push(report);
    }

    async fn simulate_read_latency(&self) {
        let latency = self.lock().read_latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }

    fn check_online(state: &State) -> BackendResult<()> {
        if state.offline {
            return Err(BackendError::Api {
                status: 503,
                message: "Service unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn issue_session(state: &mut State, user: BackendUser) -> BackendResult<Session> {
        let access_token = encode_session_token(user.id, user.email.as_deref())
            .map_err(|e| BackendError::Unexpected(e.to_string()))?;
        let refresh_token = Uuid::new_v4().simple().to_string();
        state.refresh_tokens.insert(refresh_token.clone(), user.id);

        Ok(Session {
            access_token,
            refresh_token,
            expires_in: crate::utils::jwt::access_token_expiry_seconds(),
            user,
        })
    }

    fn caller_id(access_token: Option<&str>) -> Option<Uuid> {
        access_token
            .and_then(|token| decode_session_token(token).ok())
            .and_then(|claims| claims.user_id())
    }

    fn new_tracking_token(state: &State) -> String {
        loop {
            let raw = Uuid::new_v4().simple().to_string().to_uppercase();
            let token = format!("{}-{}", &raw[..8], &raw[8..16]);
            let taken = state
                .reports
                .iter()
                .any(|r| r.tracking_token.as_deref() == Some(token.as_str()));
            if !taken {
                return token;
            }
        }
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn sign_up(&self, request: &SignUpRequest) -> BackendResult<SignUpOutcome> {
        let password_hash = bcrypt::hash(&request.password, PASSWORD_HASH_COST)
            .map_err(|e| BackendError::Unexpected(e.to_string()))?;

        let mut state = self.lock();
        Self::check_online(&state)?;

        let email = request.email.to_lowercase();
        if state.accounts.iter().any(|a| a.email == email) {
            return Err(BackendError::Api {
                status: 422,
                message: "User already registered".to_string(),
            });
        }

        let user = BackendUser {
            id: Uuid::new_v4(),
            email: Some(email.clone()),
        };
        state.accounts.push(Account {
            id: user.id,
            email,
            password_hash,
            profile: None,
        });

        let session = Self::issue_session(&mut state, user.clone())?;
        Ok(SignUpOutcome {
            user,
            session: Some(session),
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> BackendResult<Session> {
        let (user, password_hash) = {
            let state = self.lock();
            Self::check_online(&state)?;
            let email = email.to_lowercase();
            let account = state.accounts.iter().find(|a| a.email == email);
            match account {
                Some(a) => (
                    BackendUser {
                        id: a.id,
                        email: Some(a.email.clone()),
                    },
                    a.password_hash.clone(),
                ),
                None => return Err(invalid_credentials()),
            }
        };

        if !bcrypt::verify(password, &password_hash).unwrap_or(false) {
            return Err(invalid_credentials());
        }

        let mut state = self.lock();
        Self::check_online(&state)?;
        Self::issue_session(&mut state, user)
    }

    async fn refresh_session(&self, refresh_token: &str) -> BackendResult<Session> {
        let mut state = self.lock();
        Self::check_online(&state)?;

        let user_id = state
            .refresh_tokens
            .remove(refresh_token)
            .ok_or_else(|| BackendError::Api {
                status: 400,
                message: "Invalid Refresh Token: Refresh Token Not Found".to_string(),
            })?;
        let email = state
            .accounts
            .iter()
            .find(|a| a.id == user_id)
            .map(|a| a.email.clone());

        Self::issue_session(&mut state, BackendUser { id: user_id, email })
    }

    async fn sign_out(&self, access_token: &str) -> BackendResult<()> {
        let mut state = self.lock();
        Self::check_online(&state)?;

        let user_id = Self::caller_id(Some(access_token)).ok_or(BackendError::Api {
            status: 401,
            message: "invalid JWT".to_string(),
        })?;
        state.refresh_tokens.retain(|_, owner| *owner != user_id);
        Ok(())
    }

    async fn update_profile(
        &self,
        access_token: Option<&str>,
        user_id: Uuid,
        profile: &ProfileUpdate,
    ) -> BackendResult<()> {
        let mut state = self.lock();
        Self::check_online(&state)?;

        // Profiles are only writable by their owner; others match no rows.
        if Self::caller_id(access_token) != Some(user_id) {
            return Ok(());
        }
        if let Some(account) = state.accounts.iter_mut().find(|a| a.id == user_id) {
            account.profile = Some(profile.clone());
        }
        Ok(())
    }

    async fn generate_tracking_token(&self) -> BackendResult<String> {
        let state = self.lock();
        Self::check_online(&state)?;
        Ok(Self::new_tracking_token(&state))
    }

    async fn insert_report(
        &self,
        access_token: Option<&str>,
        report: &NewReport,
    ) -> BackendResult<Report> {
        let mut state = self.lock();
        Self::check_online(&state)?;

        if let Some(owner) = report.user_id {
            if Self::caller_id(access_token) != Some(owner) {
                return Err(BackendError::Api {
                    status: 403,
                    message: "new row violates row-level security policy for table \"reports\""
                        .to_string(),
                });
            }
        }

        if let Some(token) = report.tracking_token.as_deref() {
            if state
                .reports
                .iter()
                .any(|r| r.tracking_token.as_deref() == Some(token))
            {
                return Err(BackendError::Api {
                    status: 409,
                    message: "duplicate key value violates unique constraint \"reports_tracking_token_key\""
                        .to_string(),
                });
            }
        }

        let stored = Report {
            id: Uuid::new_v4(),
            user_id: report.user_id,
            company_name: report.company_name.clone(),
            incident_date: report.incident_date,
            description: report.description.clone(),
            evidence_details: report.evidence_details.clone(),
            is_anonymous: report.is_anonymous,
            tracking_token: report.tracking_token.clone(),
            status: report.status,
            created_at: Utc::now(),
        };
        state.reports.push(stored.clone());
        Ok(stored)
    }

    async fn reports_by_owner(
        &self,
        access_token: &str,
        user_id: Uuid,
    ) -> BackendResult<Vec<Report>> {
        self.simulate_read_latency().await;
        let state = self.lock();
        Self::check_online(&state)?;

        if Self::caller_id(Some(access_token)) != Some(user_id) {
            return Ok(Vec::new());
        }

        let mut reports: Vec<Report> = state
            .reports
            .iter()
            .filter(|r| r.user_id == Some(user_id))
            .cloned()
            .collect();
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reports)
    }

    async fn report_by_token(&self, token: &str) -> BackendResult<TrackedReport> {
        self.simulate_read_latency().await;
        let state = self.lock();
        Self::check_online(&state)?;

        let mut matches = state
            .reports
            .iter()
            .filter(|r| r.tracking_token.as_deref() == Some(token));
        let report = match (matches.next(), matches.next()) {
            (Some(report), None) => report.clone(),
            _ => return Err(BackendError::NotFound),
        };

        let mut history: Vec<StatusHistoryEntry> = state
            .history
            .iter()
            .filter(|h| h.report_id == report.id)
            .cloned()
            .collect();
        history.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        Ok(TrackedReport {
            report,
            report_status_history: history,
        })
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

fn invalid_credentials() -> BackendError {
    BackendError::Api {
        status: 400,
        message: "Invalid login credentials".to_string(),
    }
}
