use anyhow::Result;
use std::env;

/// Verification settings for the access tokens the auth service issues.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub audience: String,
    pub access_token_expiry: u64,  // 1 hour
    pub refresh_token_expiry: u64, // 7 days
}

impl JwtConfig {
    pub fn from_env() -> Result<Self> {
        let secret = env::var("SUPABASE_JWT_SECRET").map_err(|_| {
            anyhow::anyhow!("SUPABASE_JWT_SECRET environment variable must be set")
        })?;

        if secret.len() < 32 {
            return Err(anyhow::anyhow!(
                "SUPABASE_JWT_SECRET must be at least 32 characters"
            ));
        }

        let audience = env::var("SESSION_AUDIENCE")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "authenticated".to_string());

        let access_token_expiry = env::var("SESSION_ACCESS_EXPIRATION")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3600);

        let refresh_token_expiry = env::var("SESSION_REFRESH_EXPIRATION")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(604800);

        Ok(Self {
            secret,
            audience,
            access_token_expiry,
            refresh_token_expiry,
        })
    }
}
