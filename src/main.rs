use axum::{extract::Extension, response::IntoResponse, routing::get, Json, Router};
use securereport::{
    backend::{MemoryBackend, SharedBackend, SupabaseBackend},
    config::{
        self,
        backend::{BackendMode, SupabaseConfig},
    },
    middleware::security::privacy_headers_middleware,
    routes,
    services::generation::RequestGenerations,
    utils,
    websocket::hub::SessionHub,
};
use serde_json::json;
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        // Auth routes
        securereport::handlers::auth::signup,
        securereport::handlers::auth::login,
        securereport::handlers::auth::refresh_token,
        securereport::handlers::auth::logout,
        securereport::handlers::auth::session,
        // Report routes
        securereport::handlers::report::create_report,
        securereport::handlers::report::list_my_reports,
        securereport::handlers::report::track_report,
    ),
    components(
        schemas(
            securereport::response::ApiResponse<serde_json::Value>,
            securereport::error::AppError,
            securereport::navigation::Screen,
            securereport::models::ReportStatus,
            // Auth
            securereport::validation::SignUpForm,
            securereport::validation::LoginForm,
            securereport::handlers::auth::AuthResponse,
            securereport::handlers::auth::RefreshTokenRequest,
            securereport::handlers::auth::TokenResponse,
            securereport::handlers::auth::LogoutResponse,
            securereport::handlers::auth::SessionResponse,
            // Report
            securereport::validation::ReportForm,
            securereport::handlers::report::CreateReportRequest,
            securereport::handlers::report::ReportResponse,
            securereport::handlers::report::StatusHistoryResponse,
            securereport::handlers::report::TrackedReportResponse,
            securereport::handlers::report::SubmissionResponse,
            securereport::handlers::report::ReportListResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Account and session operations"),
        (name = "reports", description = "Data-leak report operations"),
    )
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "jwt_token",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    // Validate configuration before doing anything else
    let (jwt_config, backend_mode) = validate_config()?;

    // Initialize JWT config
    utils::jwt::init_jwt_config(jwt_config)?;

    tracing::info!("Starting SecureReport v{}...", env!("CARGO_PKG_VERSION"));

    let backend: SharedBackend = match backend_mode {
        BackendMode::Supabase => {
            let supabase = SupabaseBackend::new(&SupabaseConfig::from_env()?)?;
            tracing::info!("Using hosted backend at {}", supabase.base_url());
            Arc::new(supabase)
        }
        BackendMode::Memory => {
            tracing::warn!("Using in-memory backend, data is lost on shutdown");
            Arc::new(MemoryBackend::new())
        }
    };

    let app = create_app()?
        .layer(Extension(backend))
        .layer(Extension(SessionHub::new()))
        .layer(Extension(RequestGenerations::new()));

    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "securereport=debug,tower_http=debug,axum=debug".into());

    let json = env::var("LOG_FORMAT")
        .map(|v| v.trim().eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Validate all required configuration at startup (fail-fast).
fn validate_config() -> anyhow::Result<(config::jwt::JwtConfig, BackendMode)> {
    // JWT config — validated and cached
    let jwt_config = config::jwt::JwtConfig::from_env()?;

    let backend_mode = BackendMode::from_env()?;
    if backend_mode == BackendMode::Supabase {
        // Checked here for early error; the client is built later
        SupabaseConfig::from_env()?;
    }

    Ok((jwt_config, backend_mode))
}

fn build_cors_layer() -> CorsLayer {
    use axum::http::{header, HeaderName, HeaderValue, Method};

    let origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(securereport::handlers::VIEW_ID_HEADER),
        ]);

    if origins_str == "*" {
        cors.allow_origin(tower_http::cors::Any)
    } else {
        let origins: Vec<HeaderValue> = origins_str
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        // Cookies only flow to explicitly listed origins.
        cors.allow_origin(origins).allow_credentials(true)
    }
}

fn create_app() -> anyhow::Result<Router> {
    Ok(Router::new()
        .route("/", get(health_check))
        .merge(routes::create_routes()?)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors_layer())
                .layer(axum::middleware::from_fn(privacy_headers_middleware)),
        ))
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Health check successful", body = serde_json::Value)
    )
)]
async fn health_check(Extension(backend): Extension<SharedBackend>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "SecureReport",
        "version": env!("CARGO_PKG_VERSION"),
        "backend": backend.name(),
    }))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, gracefully shutting down...");
}
