use crate::backend::BackendError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

pub const TOKEN_NOT_FOUND: &str = "Token não encontrado";
pub const STALE_REQUEST: &str = "Requisição substituída por uma mais recente";
pub const BACKEND_UNAVAILABLE: &str = "Erro ao comunicar com o serviço";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// The hosted backend refused the request. `message` is already the
    /// text to show the user.
    #[error("Rejected by backend ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// A newer request from the same view superseded this one.
    #[error("Stale request")]
    Stale,

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Wrap a backend failure with a user-facing message, keeping the
    /// backend's 4xx status and reporting anything else as a gateway error.
    pub fn rejected(err: &BackendError, message: String) -> Self {
        let status = err
            .status()
            .filter(|s| (400..500).contains(s))
            .unwrap_or(StatusCode::BAD_GATEWAY.as_u16());
        AppError::Rejected { status, message }
    }
}

#[derive(serde::Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

impl utoipa::ToSchema for AppError {
    fn name() -> std::borrow::Cow<'static, str> {
        "ErrorResponse".into()
    }
}

impl utoipa::PartialSchema for AppError {
    fn schema() -> utoipa::openapi::RefOr<utoipa::openapi::schema::Schema> {
        <ErrorResponse as utoipa::PartialSchema>::schema()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Rejected { status, message } => (
                StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                message,
            ),
            AppError::Backend(e) => {
                tracing::error!("Backend error: {:?}", e);
                (StatusCode::BAD_GATEWAY, BACKEND_UNAVAILABLE.to_string())
            }
            AppError::Stale => (StatusCode::CONFLICT, STALE_REQUEST.to_string()),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = json!({
            "error": error_message,
        });

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
