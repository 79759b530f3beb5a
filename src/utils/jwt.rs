use anyhow::Result;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use uuid::Uuid;

static JWT_CONFIG: OnceLock<crate::config::jwt::JwtConfig> = OnceLock::new();

/// Initialize JWT config from environment. Must be called once at startup.
pub fn init_jwt_config(config: crate::config::jwt::JwtConfig) -> Result<()> {
    JWT_CONFIG
        .set(config)
        .map_err(|_| anyhow::anyhow!("JWT config already initialized"))?;
    Ok(())
}

fn get_config() -> Result<&'static crate::config::jwt::JwtConfig> {
    JWT_CONFIG
        .get()
        .ok_or_else(|| anyhow::anyhow!("JWT config not initialized, call init_jwt_config() at startup"))
}

/// Claims carried by an auth-service access token.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String, // user id (uuid)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub aud: String,
    #[serde(default)]
    pub role: String,
    pub exp: usize,
    pub iat: usize,
}

impl SessionClaims {
    pub fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }
}

/// Sign an access token the same way the auth service does. Only the
/// in-process backend issues tokens; the hosted one signs its own.
pub fn encode_session_token(user_id: Uuid, email: Option<&str>) -> Result<String> {
    let config = get_config()?;
    let now = chrono::Utc::now().timestamp() as usize;
    let claims = SessionClaims {
        sub: user_id.to_string(),
        email: email.map(str::to_owned),
        aud: config.audience.clone(),
        role: "authenticated".to_string(),
        exp: now + config.access_token_expiry as usize,
        iat: now,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| anyhow::anyhow!("Failed to encode session token: {}", e))
}

pub fn decode_session_token(token: &str) -> Result<SessionClaims> {
    let config = get_config()?;

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[config.audience.as_str()]);

    decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| anyhow::anyhow!("Failed to decode session token: {}", e))
}

pub fn access_token_expiry_seconds() -> u64 {
    get_config().map(|c| c.access_token_expiry).unwrap_or(3600)
}

pub fn refresh_token_expiry_seconds() -> u64 {
    get_config().map(|c| c.refresh_token_expiry).unwrap_or(604800)
}

#[cfg(test)]
pub(crate) fn init_for_tests() {
    let _ = init_jwt_config(crate::config::jwt::JwtConfig {
        secret: "a_very_long_secret_key_that_is_at_least_32_chars".to_string(),
        audience: "authenticated".to_string(),
        access_token_expiry: 3600,
        refresh_token_expiry: 604800,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ensure_config() {
        init_for_tests();
    }

    #[test]
    fn encode_decode_round_trip() {
        ensure_config();
        let id = Uuid::new_v4();
        let token = encode_session_token(id, Some("ana@example.com")).unwrap();
        let claims = decode_session_token(&token).unwrap();
        assert_eq!(claims.user_id(), Some(id));
        assert_eq!(claims.email.as_deref(), Some("ana@example.com"));
        assert_eq!(claims.aud, "authenticated");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn tampered_token_fails() {
        ensure_config();
        let token = encode_session_token(Uuid::new_v4(), None).unwrap();
        let mut chars: Vec<char> = token.chars().collect();
        let mid = chars.len() / 2;
        chars[mid] = if chars[mid] == 'A' { 'B' } else { 'A' };
        let tampered: String = chars.into_iter().collect();
        assert!(decode_session_token(&tampered).is_err());
    }

    #[test]
    fn expired_token_fails() {
        ensure_config();
        let config = get_config().unwrap();
        let now = chrono::Utc::now().timestamp() as usize;
        let claims = SessionClaims {
            sub: Uuid::new_v4().to_string(),
            email: None,
            aud: config.audience.clone(),
            role: "authenticated".to_string(),
            exp: now - 3600,
            iat: now - 7200,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .unwrap();
        assert!(decode_session_token(&token).is_err());
    }

    #[test]
    fn wrong_audience_fails() {
        ensure_config();
        let config = get_config().unwrap();
        let now = chrono::Utc::now().timestamp() as usize;
        let claims = SessionClaims {
            sub: Uuid::new_v4().to_string(),
            email: None,
            aud: "service_role".to_string(),
            role: "service_role".to_string(),
            exp: now + 3600,
            iat: now,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .unwrap();
        assert!(decode_session_token(&token).is_err());
    }

    #[test]
    fn empty_token_fails() {
        ensure_config();
        assert!(decode_session_token("").is_err());
    }
}
