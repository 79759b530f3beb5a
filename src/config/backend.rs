use anyhow::Result;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMode {
    Supabase,
    Memory,
}

impl BackendMode {
    pub fn from_env() -> Result<Self> {
        let raw = env::var("BACKEND_MODE").unwrap_or_else(|_| "supabase".to_string());
        match raw.trim().to_ascii_lowercase().as_str() {
            "supabase" => Ok(Self::Supabase),
            "memory" => Ok(Self::Memory),
            other => Err(anyhow::anyhow!(
                "BACKEND_MODE must be 'supabase' or 'memory', got '{}'",
                other
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
    pub timeout: Duration,
}

impl SupabaseConfig {
    pub fn from_env() -> Result<Self> {
        let url = env::var("SUPABASE_URL")
            .map_err(|_| anyhow::anyhow!("SUPABASE_URL environment variable must be set"))?;
        let url = url.trim().trim_end_matches('/').to_string();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(anyhow::anyhow!(
                "SUPABASE_URL must start with http:// or https://"
            ));
        }

        let anon_key = env::var("SUPABASE_ANON_KEY")
            .map_err(|_| anyhow::anyhow!("SUPABASE_ANON_KEY environment variable must be set"))?;
        if anon_key.trim().is_empty() {
            return Err(anyhow::anyhow!("SUPABASE_ANON_KEY must not be empty"));
        }

        let timeout_secs = env::var("SUPABASE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(15);

        Ok(Self {
            url,
            anon_key: anon_key.trim().to_string(),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}
