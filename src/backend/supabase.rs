//! HTTP client for a Supabase project (GoTrue auth + PostgREST).

use super::{Backend, BackendError, BackendResult};
use crate::config::backend::SupabaseConfig;
use crate::models::{
    BackendUser, NewReport, ProfileUpdate, Report, Session, SignUpOutcome, SignUpRequest,
    TrackedReport,
};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

#[derive(Clone)]
pub struct SupabaseBackend {
    client: Client,
    base_url: String,
    anon_key: String,
}

/// GoTrue answers a sign-up with a full session when confirmation is off,
/// and with the bare user object when the email must be confirmed first.
#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    WithSession(Session),
    UserOnly(BackendUser),
}

impl SupabaseBackend {
    pub fn new(config: &SupabaseConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("securereport/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            client,
            base_url: config.url.clone(),
            anon_key: config.anon_key.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn rest_url(&self, path: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, path)
    }

    /// Every call carries the project key; the bearer is the caller's
    /// session token, or the anon key for unauthenticated calls.
    fn request(&self, method: Method, url: String, access_token: Option<&str>) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token.unwrap_or(self.anon_key.as_str()))
    }

    async fn send(&self, builder: RequestBuilder) -> BackendResult<Response> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        // PostgREST answers 406 when a single-object request matched 0 or >1 rows.
        if status == StatusCode::NOT_ACCEPTABLE {
            return Err(BackendError::NotFound);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string()
        });
        warn!(status = %status, message = %message, "Backend request failed");

        Err(BackendError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

/// Pull the human-readable message out of a GoTrue or PostgREST error body.
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["msg", "message", "error_description", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

#[async_trait]
impl Backend for SupabaseBackend {
    async fn sign_up(&self, request: &SignUpRequest) -> BackendResult<SignUpOutcome> {
        let body = json!({
            "email": request.email,
            "password": request.password,
            "data": {
                "full_name": request.profile.full_name,
                "phone": request.profile.phone,
            },
        });

        let response = self
            .send(
                self.request(Method::POST, self.auth_url("signup"), None)
                    .json(&body),
            )
            .await?;

        let parsed: SignUpResponse = response.json().await?;
        Ok(match parsed {
            SignUpResponse::WithSession(session) => SignUpOutcome {
                user: session.user.clone(),
                session: Some(session),
            },
            SignUpResponse::UserOnly(user) => SignUpOutcome {
                user,
                session: None,
            },
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> BackendResult<Session> {
        let response = self
            .send(
                self.request(Method::POST, self.auth_url("token"), None)
                    .query(&[("grant_type", "password")])
                    .json(&json!({ "email": email, "password": password })),
            )
            .await?;
        Ok(response.json().await?)
    }

    async fn refresh_session(&self, refresh_token: &str) -> BackendResult<Session> {
        let response = self
            .send(
                self.request(Method::POST, self.auth_url("token"), None)
                    .query(&[("grant_type", "refresh_token")])
                    .json(&json!({ "refresh_token": refresh_token })),
            )
            .await?;
        Ok(response.json().await?)
    }

    async fn sign_out(&self, access_token: &str) -> BackendResult<()> {
        self.send(self.request(Method::POST, self.auth_url("logout"), Some(access_token)))
            .await?;
        Ok(())
    }

    async fn update_profile(
        &self,
        access_token: Option<&str>,
        user_id: Uuid,
        profile: &ProfileUpdate,
    ) -> BackendResult<()> {
        self.send(
            self.request(Method::PATCH, self.rest_url("profiles"), access_token)
                .query(&[("id", format!("eq.{}", user_id))])
                .header("Prefer", "return=minimal")
                .json(profile),
        )
        .await?;
        Ok(())
    }

    async fn generate_tracking_token(&self) -> BackendResult<String> {
        let response = self
            .send(
                self.request(
                    Method::POST,
                    self.rest_url("rpc/generate_tracking_token"),
                    None,
                )
                .json(&json!({})),
            )
            .await?;

        let token: Option<String> = response.json().await?;
        token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| BackendError::Unexpected("token generator returned no token".to_string()))
    }

    async fn insert_report(
        &self,
        access_token: Option<&str>,
        report: &NewReport,
    ) -> BackendResult<Report> {
        debug!(anonymous = report.is_anonymous, "Inserting report");
        let response = self
            .send(
                self.request(Method::POST, self.rest_url("reports"), access_token)
                    .header("Prefer", "return=representation")
                    .header("Accept", SINGLE_OBJECT)
                    .json(report),
            )
            .await?;
        Ok(response.json().await?)
    }

    async fn reports_by_owner(
        &self,
        access_token: &str,
        user_id: Uuid,
    ) -> BackendResult<Vec<Report>> {
        let response = self
            .send(
                self.request(Method::GET, self.rest_url("reports"), Some(access_token))
                    .query(&[
                        ("select", "*".to_string()),
                        ("user_id", format!("eq.{}", user_id)),
                        ("order", "created_at.desc".to_string()),
                    ]),
            )
            .await?;
        Ok(response.json().await?)
    }

    async fn report_by_token(&self, token: &str) -> BackendResult<TrackedReport> {
        let response = self
            .send(
                self.request(Method::GET, self.rest_url("reports"), None)
                    .header("Accept", SINGLE_OBJECT)
                    .query(&[
                        ("select", "*,report_status_history(*)".to_string()),
                        ("tracking_token", format!("eq.{}", token)),
                        ("report_status_history.order", "created_at.asc".to_string()),
                    ]),
            )
            .await?;
        Ok(response.json().await?)
    }

    fn name(&self) -> &'static str {
        "supabase"
    }
}
