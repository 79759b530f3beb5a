#![allow(dead_code)]

use reqwest::Client;
use securereport::backend::{MemoryBackend, SharedBackend};
use securereport::services::generation::RequestGenerations;
use securereport::websocket::hub::SessionHub;
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Once,
};

static INIT: Once = Once::new();
static USER_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn init_env() {
    INIT.call_once(|| {
        dotenv::dotenv().ok();
        std::env::set_var(
            "SUPABASE_JWT_SECRET",
            "integration_test_secret_that_is_at_least_32_characters_long",
        );
        std::env::set_var("RATE_LIMIT_ENABLED", "false");
        let config = securereport::config::jwt::JwtConfig::from_env().unwrap();
        let _ = securereport::utils::jwt::init_jwt_config(config);
    });
}

pub struct TestApp {
    pub addr: String,
    pub backend: Arc<MemoryBackend>,
    pub hub: SessionHub,
    pub client: Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.addr, path)
    }
}

pub async fn spawn_app() -> TestApp {
    init_env();

    let backend = Arc::new(MemoryBackend::new());
    let shared: SharedBackend = backend.clone();
    let hub = SessionHub::new();

    let app = axum::Router::new()
        .route("/", axum::routing::get(|| async { "ok" }))
        .merge(securereport::routes::create_routes().unwrap())
        .layer(axum::middleware::from_fn(
            securereport::middleware::security::privacy_headers_middleware,
        ))
        .layer(axum::extract::Extension(shared))
        .layer(axum::extract::Extension(hub.clone()))
        .layer(axum::extract::Extension(RequestGenerations::new()));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    TestApp {
        addr: format!("http://{}", addr),
        backend,
        hub,
        client: Client::new(),
    }
}

pub struct TestUser {
    pub user_id: String,
    pub email: String,
    pub access_token: String,
    pub refresh_token: String,
}

/// Sign up a fresh account and return its session.
pub async fn create_test_user(app: &TestApp, prefix: &str) -> TestUser {
    let counter = USER_COUNTER.fetch_add(1, Ordering::SeqCst);
    let email = format!("{}_{}@example.com", prefix, counter);

    let resp = app
        .client
        .post(app.url("/auth/signup"))
        .json(&serde_json::json!({
            "email": email,
            "password": "senha_segura_123",
            "fullName": "Pessoa de Teste",
        }))
        .send()
        .await
        .expect("Failed to sign up user");

    let status = resp.status();
    let body: serde_json::Value = resp.json().await.expect("Failed to parse signup response");
    if !body["success"].as_bool().unwrap_or(false) {
        panic!("Failed to sign up '{}': status={}, body={}", email, status, body);
    }

    let data = &body["data"];
    TestUser {
        user_id: data["user_id"].as_str().unwrap().to_string(),
        email,
        access_token: data["access_token"].as_str().unwrap().to_string(),
        refresh_token: data["refresh_token"].as_str().unwrap().to_string(),
    }
}

pub fn report_payload(company: &str) -> serde_json::Value {
    serde_json::json!({
        "companyName": company,
        "incidentDate": "2024-03-15",
        "description": "Dados pessoais de clientes expostos em um bucket público",
        "evidenceDetails": "Print do bucket aberto",
    })
}

/// Submit a report, optionally as `token`'s owner, and return the body.
pub async fn submit_report(
    app: &TestApp,
    token: Option<&str>,
    mut payload: serde_json::Value,
    anonymous: bool,
) -> serde_json::Value {
    payload["isAnonymous"] = serde_json::Value::Bool(anonymous);
    let mut request = app.client.post(app.url("/reports")).json(&payload);
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }

    let resp = request.send().await.expect("Failed to submit report");
    let status = resp.status();
    let body: serde_json::Value = resp.json().await.expect("Failed to parse report response");
    assert_eq!(status, 200, "report submission failed: {}", body);
    body
}
