use axum::http::{header, HeaderMap};
use std::{env, sync::OnceLock};

pub const ACCESS_TOKEN_COOKIE: &str = "sb-access-token";
pub const REFRESH_TOKEN_COOKIE: &str = "sb-refresh-token";

#[derive(Debug, Clone, PartialEq, Eq)]
struct CookieAttributes {
    secure: bool,
    same_site: &'static str,
    domain: Option<String>,
}

impl CookieAttributes {
    fn from_env() -> Self {
        let same_site = env::var("AUTH_COOKIE_SAMESITE")
            .map(|v| parse_same_site(&v))
            .unwrap_or("Lax");
        let domain = env::var("AUTH_COOKIE_DOMAIN")
            .ok()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        Self {
            // Browsers drop SameSite=None cookies that are not Secure.
            secure: same_site == "None" || crate::config::parse_bool_env("AUTH_COOKIE_SECURE", false),
            same_site,
            domain,
        }
    }

    /// `name=value` followed by the shared attribute list.
    fn render(&self, name: &str, value: &str, max_age: u64, expire_now: bool) -> String {
        let mut parts = vec![
            format!("{name}={value}"),
            "Path=/".to_string(),
            format!("Max-Age={max_age}"),
        ];
        if expire_now {
            parts.push("Expires=Thu, 01 Jan 1970 00:00:00 GMT".to_string());
        }
        parts.push("HttpOnly".to_string());
        parts.push(format!("SameSite={}", self.same_site));
        if self.secure {
            parts.push("Secure".to_string());
        }
        if let Some(domain) = &self.domain {
            parts.push(format!("Domain={domain}"));
        }
        parts.join("; ")
    }
}

fn attributes() -> &'static CookieAttributes {
    static ATTRIBUTES: OnceLock<CookieAttributes> = OnceLock::new();
    ATTRIBUTES.get_or_init(CookieAttributes::from_env)
}

fn parse_same_site(value: &str) -> &'static str {
    match value.trim().to_ascii_lowercase().as_str() {
        "strict" => "Strict",
        "none" => "None",
        _ => "Lax",
    }
}

pub fn build_session_cookie(name: &str, value: &str, max_age_seconds: u64) -> String {
    attributes().render(name, value, max_age_seconds, false)
}

pub fn build_clear_cookie(name: &str) -> String {
    attributes().render(name, "", 0, true)
}

pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookie_header| cookie_header.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn lax() -> CookieAttributes {
        CookieAttributes {
            secure: false,
            same_site: "Lax",
            domain: None,
        }
    }

    #[test]
    fn session_cookie_is_http_only() {
        let cookie = lax().render(ACCESS_TOKEN_COOKIE, "abc", 3600, false);
        assert_eq!(
            cookie,
            "sb-access-token=abc; Path=/; Max-Age=3600; HttpOnly; SameSite=Lax"
        );
    }

    #[test]
    fn clearing_cookie_expires_it() {
        let attrs = CookieAttributes {
            secure: true,
            same_site: "None",
            domain: Some("example.com".to_string()),
        };
        let cookie = attrs.render(REFRESH_TOKEN_COOKIE, "", 0, true);
        assert!(cookie.starts_with("sb-refresh-token=; Path=/; Max-Age=0; Expires="));
        assert!(cookie.ends_with("SameSite=None; Secure; Domain=example.com"));
    }

    #[test]
    fn same_site_parsing_defaults_to_lax() {
        assert_eq!(parse_same_site("STRICT"), "Strict");
        assert_eq!(parse_same_site(" none "), "None");
        assert_eq!(parse_same_site("whatever"), "Lax");
    }

    #[test]
    fn extract_cookie_finds_named_value() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("a=1; sb-access-token=tok"));
        headers.append(header::COOKIE, HeaderValue::from_static("sb-refresh-token=ref"));
        assert_eq!(
            extract_cookie(&headers, ACCESS_TOKEN_COOKIE).as_deref(),
            Some("tok")
        );
        assert_eq!(
            extract_cookie(&headers, REFRESH_TOKEN_COOKIE).as_deref(),
            Some("ref")
        );
        assert_eq!(extract_cookie(&headers, "missing"), None);
    }

    #[test]
    fn cleared_cookie_reads_as_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("sb-access-token="));
        assert_eq!(extract_cookie(&headers, ACCESS_TOKEN_COOKIE), None);
    }
}
