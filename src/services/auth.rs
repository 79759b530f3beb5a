use crate::{
    backend::{BackendError, SharedBackend},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{BackendUser, Session},
    navigation::Screen,
    validation::{LoginForm, SignUpForm},
    websocket::hub::{SessionEvent, SessionHub},
};

pub const SIGNED_UP: &str = "Conta criada com sucesso!";
pub const SIGNED_IN: &str = "Login realizado com sucesso!";
pub const SIGNED_OUT: &str = "Logout realizado com sucesso";

/// Result of a sign-up or sign-in.
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    pub user: BackendUser,
    /// Absent after a sign-up that still awaits email confirmation.
    pub session: Option<Session>,
    pub message: &'static str,
    pub redirect: Screen,
}

pub struct AuthService {
    backend: SharedBackend,
    hub: SessionHub,
}

impl AuthService {
    pub fn new(backend: SharedBackend, hub: SessionHub) -> Self {
        Self { backend, hub }
    }

    /// Create an account, then fill in its profile row.
    pub async fn sign_up(&self, form: &SignUpForm) -> AppResult<AuthOutcome> {
        let request = form.validate().map_err(AppError::Validation)?;

        let outcome = self.backend.sign_up(&request).await.map_err(|e| {
            tracing::warn!("Sign-up rejected: {}", e);
            AppError::rejected(&e, translate_sign_up_error(&e))
        })?;

        let access_token = outcome.session.as_ref().map(|s| s.access_token.as_str());
        if let Err(e) = self
            .backend
            .update_profile(access_token, outcome.user.id, &request.profile)
            .await
        {
            tracing::warn!(user_id = %outcome.user.id, "Profile update after sign-up failed: {}", e);
        }

        if outcome.session.is_some() {
            self.hub.publish(outcome.user.id, SessionEvent::SignedIn);
        }
        tracing::info!(user_id = %outcome.user.id, "Account created");

        Ok(AuthOutcome {
            user: outcome.user,
            session: outcome.session,
            message: SIGNED_UP,
            redirect: Screen::Dashboard,
        })
    }

    pub async fn sign_in(&self, form: &LoginForm) -> AppResult<AuthOutcome> {
        form.validate().map_err(AppError::Validation)?;

        let session = self
            .backend
            .sign_in(&form.email, &form.password)
            .await
            .map_err(|e| {
                tracing::debug!("Sign-in rejected: {}", e);
                AppError::rejected(&e, translate_sign_in_error(&e))
            })?;

        self.hub.publish(session.user.id, SessionEvent::SignedIn);

        Ok(AuthOutcome {
            user: session.user.clone(),
            session: Some(session),
            message: SIGNED_IN,
            redirect: Screen::Dashboard,
        })
    }

    /// Trade a refresh token for a new session. Any rejection means the
    /// caller has to sign in again.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<Session> {
        if refresh_token.trim().is_empty() {
            return Err(AppError::Unauthorized);
        }

        let session = self
            .backend
            .refresh_session(refresh_token)
            .await
            .map_err(|e| match e.status() {
                Some(status) if (400..500).contains(&status) => {
                    tracing::debug!("Refresh token rejected: {}", e);
                    AppError::Unauthorized
                }
                _ => AppError::Backend(e),
            })?;

        self.hub.publish(session.user.id, SessionEvent::TokenRefreshed);
        Ok(session)
    }

    /// End the caller's session. The backend call is best effort: the
    /// local session ends regardless.
    pub async fn sign_out(&self, caller: Option<&AuthUser>) -> (&'static str, Screen) {
        if let Some(caller) = caller {
            if let Err(e) = self.backend.sign_out(&caller.access_token).await {
                tracing::warn!(user_id = %caller.user_id, "Backend sign-out failed: {}", e);
            }
            self.hub.publish(caller.user_id, SessionEvent::SignedOut);
        }
        (SIGNED_OUT, Screen::Landing)
    }
}

pub fn translate_sign_up_error(err: &BackendError) -> String {
    let raw = err.to_string();
    if raw.contains("already registered") {
        "Este email já está cadastrado".to_string()
    } else {
        format!("Erro ao criar conta: {}", raw)
    }
}

pub fn translate_sign_in_error(err: &BackendError) -> String {
    let raw = err.to_string();
    if raw.contains("Invalid login") {
        "Email ou senha incorretos".to_string()
    } else {
        format!("Erro ao fazer login: {}", raw)
    }
}
