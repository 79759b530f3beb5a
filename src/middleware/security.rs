use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use std::{env, sync::OnceLock};

use crate::config::parse_bool_env;

const DEFAULT_CSP_POLICY: &str = "default-src 'none'; frame-ancestors 'none'; base-uri 'none'";
const HSTS_VALUE: &str = "max-age=31536000; includeSubDomains";

#[derive(Debug, Clone)]
struct PrivacyHeadersConfig {
    csp: HeaderValue,
    enable_hsts: bool,
}

impl PrivacyHeadersConfig {
    fn from_env() -> Self {
        let raw_csp = env::var("CSP_POLICY").unwrap_or_else(|_| DEFAULT_CSP_POLICY.to_string());
        let csp = HeaderValue::from_str(&raw_csp).unwrap_or_else(|err| {
            tracing::warn!(
                "Invalid CSP_POLICY value ({}), falling back to default policy",
                err
            );
            HeaderValue::from_static(DEFAULT_CSP_POLICY)
        });

        Self {
            csp,
            enable_hsts: parse_bool_env("ENABLE_HSTS", true),
        }
    }
}

fn privacy_headers_config() -> &'static PrivacyHeadersConfig {
    static CONFIG: OnceLock<PrivacyHeadersConfig> = OnceLock::new();
    CONFIG.get_or_init(PrivacyHeadersConfig::from_env)
}

/// Responses carry report contents and tracking tokens: keep them out of
/// caches and referrers.
pub async fn privacy_headers_middleware(request: Request, next: Next) -> Response {
    let config = privacy_headers_config();
    // Swagger UI loads its own scripts and styles.
    let is_docs = request.uri().path().starts_with("/swagger-ui");
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    if !is_docs {
        headers.insert("content-security-policy", config.csp.clone());
    }
    headers.insert("cache-control", HeaderValue::from_static("no-store"));
    headers.insert("referrer-policy", HeaderValue::from_static("no-referrer"));
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "cross-origin-resource-policy",
        HeaderValue::from_static("same-origin"),
    );

    if config.enable_hsts {
        headers.insert(
            "strict-transport-security",
            HeaderValue::from_static(HSTS_VALUE),
        );
    }

    response
}
