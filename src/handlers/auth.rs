use crate::backend::SharedBackend;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::MaybeAuthUser;
use crate::models::Session;
use crate::navigation::{guard, Screen};
use crate::response::ApiResponse;
use crate::services::auth::{AuthOutcome, AuthService};
use crate::utils::cookie::{
    build_clear_cookie, build_session_cookie, extract_cookie, ACCESS_TOKEN_COOKIE,
    REFRESH_TOKEN_COOKIE,
};
use crate::validation::{LoginForm, SignUpForm};
use crate::websocket::hub::SessionHub;
use anyhow::anyhow;
use axum::{
    extract::Query,
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    /// Account ID
    pub user_id: Uuid,
    /// Account email
    pub email: Option<String>,
    /// Access token, absent while the account awaits email confirmation
    pub access_token: Option<String>,
    /// Refresh token
    pub refresh_token: Option<String>,
    /// Access token lifetime in seconds
    pub expires_in: Option<u64>,
    /// Where the front-end goes next
    pub redirect: String,
}

impl From<AuthOutcome> for AuthResponse {
    fn from(outcome: AuthOutcome) -> Self {
        let session = outcome.session;
        Self {
            user_id: outcome.user.id,
            email: outcome.user.email,
            access_token: session.as_ref().map(|s| s.access_token.clone()),
            refresh_token: session.as_ref().map(|s| s.refresh_token.clone()),
            expires_in: session.as_ref().map(|s| s.expires_in),
            redirect: outcome.redirect.path().to_string(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshTokenRequest {
    /// Refresh token; read from the cookie when omitted
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LogoutResponse {
    pub redirect: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SessionQuery {
    /// Screen the front-end is about to show, by name or path
    pub screen: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub authenticated: bool,
    pub user_id: Option<Uuid>,
    pub email: Option<String>,
    /// The screen that was asked about
    pub screen: Option<Screen>,
    /// Path to go to instead, when the screen is off-limits
    pub redirect: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/signup",
    request_body = SignUpForm,
    responses(
        (status = 200, description = "Account created", body = AuthResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 422, description = "Email already registered", body = AppError),
    ),
    tag = "auth"
)]
pub async fn signup(
    Extension(backend): Extension<SharedBackend>,
    Extension(hub): Extension<SessionHub>,
    Json(payload): Json<SignUpForm>,
) -> AppResult<impl IntoResponse> {
    let service = AuthService::new(backend, hub);
    let outcome = service.sign_up(&payload).await?;

    let message = outcome.message.to_string();
    let session = outcome.session.clone();
    let mut http_response =
        ApiResponse::with_message(AuthResponse::from(outcome), message).into_response();
    if let Some(session) = session {
        set_auth_cookies(&mut http_response, &session)?;
    }
    Ok(http_response)
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginForm,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Invalid credentials", body = AppError),
    ),
    tag = "auth"
)]
pub async fn login(
    Extension(backend): Extension<SharedBackend>,
    Extension(hub): Extension<SessionHub>,
    Json(payload): Json<LoginForm>,
) -> AppResult<impl IntoResponse> {
    let service = AuthService::new(backend, hub);
    let outcome = service.sign_in(&payload).await?;

    let message = outcome.message.to_string();
    let session = outcome
        .session
        .clone()
        .ok_or_else(|| AppError::Internal(anyhow!("Sign-in returned no session")))?;
    let mut http_response =
        ApiResponse::with_message(AuthResponse::from(outcome), message).into_response();
    set_auth_cookies(&mut http_response, &session)?;
    Ok(http_response)
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    request_body(content = RefreshTokenRequest, description = "Optional; the refresh cookie is used when omitted"),
    responses(
        (status = 200, description = "Session refreshed", body = TokenResponse),
        (status = 401, description = "Missing or invalid refresh token", body = AppError),
    ),
    tag = "auth"
)]
pub async fn refresh_token(
    Extension(backend): Extension<SharedBackend>,
    Extension(hub): Extension<SessionHub>,
    headers: HeaderMap,
    payload: Option<Json<RefreshTokenRequest>>,
) -> AppResult<impl IntoResponse> {
    let refresh_token = payload
        .and_then(|Json(body)| body.refresh_token)
        .or_else(|| extract_cookie(&headers, REFRESH_TOKEN_COOKIE))
        .ok_or(AppError::Unauthorized)?;

    let service = AuthService::new(backend, hub);
    let session = service.refresh(&refresh_token).await?;

    let response = TokenResponse {
        access_token: session.access_token.clone(),
        refresh_token: session.refresh_token.clone(),
        expires_in: session.expires_in,
    };

    let mut http_response = ApiResponse::ok(response).into_response();
    set_auth_cookies(&mut http_response, &session)?;
    Ok(http_response)
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses(
        (status = 200, description = "Logged out", body = LogoutResponse),
    ),
    tag = "auth"
)]
pub async fn logout(
    Extension(backend): Extension<SharedBackend>,
    Extension(hub): Extension<SessionHub>,
    MaybeAuthUser(caller): MaybeAuthUser,
) -> AppResult<impl IntoResponse> {
    let service = AuthService::new(backend, hub);
    let (message, redirect) = service.sign_out(caller.as_ref()).await;

    let response = LogoutResponse {
        redirect: redirect.path().to_string(),
    };
    let mut http_response =
        ApiResponse::with_message(response, message.to_string()).into_response();
    clear_auth_cookies(&mut http_response)?;
    Ok(http_response)
}

/// Current session, and whether `screen` may be shown with it.
#[utoipa::path(
    get,
    path = "/api/v1/auth/session",
    params(SessionQuery),
    responses(
        (status = 200, description = "Session state", body = SessionResponse),
        (status = 400, description = "Unknown screen", body = AppError),
    ),
    tag = "auth"
)]
pub async fn session(
    MaybeAuthUser(caller): MaybeAuthUser,
    Query(query): Query<SessionQuery>,
) -> AppResult<impl IntoResponse> {
    let screen = query
        .screen
        .as_deref()
        .map(str::parse::<Screen>)
        .transpose()
        .map_err(AppError::Validation)?;

    let redirect = screen
        .and_then(|s| guard(s, caller.is_some()))
        .map(|s| s.path().to_string());

    Ok(ApiResponse::ok(SessionResponse {
        authenticated: caller.is_some(),
        user_id: caller.as_ref().map(|c| c.user_id),
        email: caller.and_then(|c| c.email),
        screen,
        redirect,
    }))
}

fn set_auth_cookies(response: &mut Response, session: &Session) -> AppResult<()> {
    let access_cookie = build_session_cookie(
        ACCESS_TOKEN_COOKIE,
        &session.access_token,
        session.expires_in,
    );
    let refresh_cookie = build_session_cookie(
        REFRESH_TOKEN_COOKIE,
        &session.refresh_token,
        crate::utils::jwt::refresh_token_expiry_seconds(),
    );

    append_set_cookie(response, &access_cookie)?;
    append_set_cookie(response, &refresh_cookie)?;
    Ok(())
}

fn clear_auth_cookies(response: &mut Response) -> AppResult<()> {
    append_set_cookie(response, &build_clear_cookie(ACCESS_TOKEN_COOKIE))?;
    append_set_cookie(response, &build_clear_cookie(REFRESH_TOKEN_COOKIE))?;
    Ok(())
}

fn append_set_cookie(response: &mut Response, cookie_value: &str) -> AppResult<()> {
    let value = HeaderValue::from_str(cookie_value).map_err(|e| {
        AppError::Internal(anyhow!("Failed to build Set-Cookie header value: {}", e))
    })?;
    response.headers_mut().append(header::SET_COOKIE, value);
    Ok(())
}
