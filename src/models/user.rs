use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity as reported by the hosted auth service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BackendUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

/// A live session issued by the auth service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime of the access token in seconds
    pub expires_in: u64,
    pub user: BackendUser,
}

/// Result of a sign-up. The session is absent when the project requires
/// email confirmation before the first login.
#[derive(Clone, Debug, PartialEq)]
pub struct SignUpOutcome {
    pub user: BackendUser,
    pub session: Option<Session>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProfileUpdate {
    pub full_name: String,
    pub phone: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub profile: ProfileUpdate,
}
