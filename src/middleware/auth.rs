use crate::utils::{
    cookie::{extract_cookie, ACCESS_TOKEN_COOKIE},
    jwt::decode_session_token,
};
use axum::{
    extract::{FromRequestParts, Request},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

/// The signed-in caller, resolved from the auth service's access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: Option<String>,
    /// Forwarded to the backend so row-level policies see the caller.
    pub access_token: String,
}

/// The caller if signed in. Never rejects.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

/// Session resolution middleware
///
/// Reads the access token from `Authorization: Bearer` or the session
/// cookie and, when it verifies, adds the caller to request extensions.
/// A missing or invalid token leaves the request anonymous. Every route
/// serves guests too, so handlers read the caller through [`MaybeAuthUser`].
pub async fn session_middleware(headers: HeaderMap, mut request: Request, next: Next) -> Response {
    if let Some(auth_user) = resolve_session(&headers) {
        request.extensions_mut().insert(auth_user);
    }
    next.run(request).await
}

pub fn resolve_session(headers: &HeaderMap) -> Option<AuthUser> {
    let token = extract_bearer_token(headers)
        .or_else(|| extract_cookie(headers, ACCESS_TOKEN_COOKIE))?;
    auth_user_from_token(&token)
}

pub fn auth_user_from_token(token: &str) -> Option<AuthUser> {
    let claims = match decode_session_token(token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!("Ignoring unusable session token: {}", e);
            return None;
        }
    };

    Some(AuthUser {
        user_id: claims.user_id()?,
        email: claims.email,
        access_token: token.to_string(),
    })
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())?;

    let token = auth_header.strip_prefix("Bearer ")?;
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuthUser(parts.extensions.get::<AuthUser>().cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderValue};

    #[test]
    fn bearer_header_wins_over_cookie() {
        crate::utils::jwt::init_for_tests();
        let header_user = Uuid::new_v4();
        let cookie_user = Uuid::new_v4();
        let header_token = crate::utils::jwt::encode_session_token(header_user, None).unwrap();
        let cookie_token = crate::utils::jwt::encode_session_token(cookie_user, None).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", header_token)).unwrap(),
        );
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("{}={}", ACCESS_TOKEN_COOKIE, cookie_token)).unwrap(),
        );

        assert_eq!(resolve_session(&headers).unwrap().user_id, header_user);
    }

    #[test]
    fn cookie_session_is_accepted() {
        crate::utils::jwt::init_for_tests();
        let user = Uuid::new_v4();
        let token = crate::utils::jwt::encode_session_token(user, Some("ana@example.com")).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {}={}", ACCESS_TOKEN_COOKIE, token))
                .unwrap(),
        );

        let auth = resolve_session(&headers).unwrap();
        assert_eq!(auth.user_id, user);
        assert_eq!(auth.email.as_deref(), Some("ana@example.com"));
        assert_eq!(auth.access_token, token);
    }

    #[tokio::test]
    async fn maybe_auth_user_reads_the_resolved_session() {
        let (mut parts, _) = Request::new(axum::body::Body::empty()).into_parts();
        let MaybeAuthUser(caller) = MaybeAuthUser::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert!(caller.is_none());

        let user_id = Uuid::new_v4();
        parts.extensions.insert(AuthUser {
            user_id,
            email: None,
            access_token: "token".to_string(),
        });
        let MaybeAuthUser(caller) = MaybeAuthUser::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(caller.map(|c| c.user_id), Some(user_id));
    }

    #[test]
    fn garbage_token_means_anonymous() {
        crate::utils::jwt::init_for_tests();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer not-a-jwt"),
        );
        assert!(resolve_session(&headers).is_none());
        assert!(resolve_session(&HeaderMap::new()).is_none());
    }
}
