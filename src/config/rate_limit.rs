use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRule {
    pub per_second: u64,
    pub burst_size: u32,
}

impl RateLimitRule {
    const fn new(per_second: u64, burst_size: u32) -> Self {
        Self {
            per_second,
            burst_size,
        }
    }
}

impl FromStr for RateLimitRule {
    type Err = String;

    /// Parses `per_second:burst`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (per_second, burst) = raw
            .split_once(':')
            .ok_or_else(|| format!("invalid rule '{}', expected per:burst", raw))?;

        let per_second: u64 = per_second
            .trim()
            .parse()
            .map_err(|_| format!("invalid per_second '{}'", per_second.trim()))?;
        let burst_size: u32 = burst
            .trim()
            .parse()
            .map_err(|_| format!("invalid burst_size '{}'", burst.trim()))?;

        if per_second == 0 || burst_size == 0 {
            return Err("per_second and burst_size must be > 0".to_string());
        }

        Ok(Self::new(per_second, burst_size))
    }
}

/// Route groups that get their own limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitGroup {
    /// sign-up, login, refresh
    Auth,
    /// report submission, tracking lookups, session checks
    Public,
    /// routes that need a session
    Protected,
}

impl FromStr for RateLimitGroup {
    type Err = String;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "auth" => Ok(Self::Auth),
            "public" | "public_read" | "public-read" => Ok(Self::Public),
            "protected" => Ok(Self::Protected),
            other => Err(format!(
                "unknown group '{}', expected auth/public/protected",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub auth: RateLimitRule,
    pub public: RateLimitRule,
    pub protected: RateLimitRule,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auth: RateLimitRule::new(5, 10),
            public: RateLimitRule::new(20, 40),
            protected: RateLimitRule::new(10, 20),
        }
    }
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.enabled = super::parse_bool_env("RATE_LIMIT_ENABLED", cfg.enabled);

        if let Ok(raw) = env::var("RATE_LIMIT_CONFIG") {
            if let Err(err) = cfg.apply(&raw) {
                tracing::warn!("Invalid RATE_LIMIT_CONFIG '{}': {}", raw, err);
            }
        }

        cfg
    }

    pub fn rule(&self, group: RateLimitGroup) -> RateLimitRule {
        match group {
            RateLimitGroup::Auth => self.auth,
            RateLimitGroup::Public => self.public,
            RateLimitGroup::Protected => self.protected,
        }
    }

    fn set(&mut self, group: RateLimitGroup, rule: RateLimitRule) {
        match group {
            RateLimitGroup::Auth => self.auth = rule,
            RateLimitGroup::Public => self.public = rule,
            RateLimitGroup::Protected => self.protected = rule,
        }
    }

    /// Accepts either one rule for every group (`10:20`) or a list of
    /// `group=per:burst` items. Nothing is applied if any item is invalid.
    fn apply(&mut self, raw: &str) -> Result<(), String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err("empty value".to_string());
        }

        let mut updated = *self;
        if !trimmed.contains('=') {
            let rule: RateLimitRule = trimmed.parse()?;
            for group in [
                RateLimitGroup::Auth,
                RateLimitGroup::Public,
                RateLimitGroup::Protected,
            ] {
                updated.set(group, rule);
            }
        } else {
            for item in trimmed.split(',').map(str::trim).filter(|i| !i.is_empty()) {
                let (name, rule) = item
                    .split_once('=')
                    .ok_or_else(|| format!("invalid item '{}', expected name=per:burst", item))?;
                updated.set(name.parse()?, rule.trim().parse()?);
            }
        }

        *self = updated;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_rule_applies_to_every_group() {
        let mut cfg = RateLimitConfig::default();
        cfg.apply("12:24").unwrap();
        assert_eq!(cfg.rule(RateLimitGroup::Auth), RateLimitRule::new(12, 24));
        assert_eq!(cfg.rule(RateLimitGroup::Public), RateLimitRule::new(12, 24));
        assert_eq!(
            cfg.rule(RateLimitGroup::Protected),
            RateLimitRule::new(12, 24)
        );
    }

    #[test]
    fn grouped_rules_override_individually() {
        let mut cfg = RateLimitConfig::default();
        cfg.apply("auth=1:2, public-read=3:4").unwrap();
        assert_eq!(cfg.auth, RateLimitRule::new(1, 2));
        assert_eq!(cfg.public, RateLimitRule::new(3, 4));
        assert_eq!(cfg.protected, RateLimitConfig::default().protected);
    }

    #[test]
    fn invalid_item_leaves_config_untouched() {
        let mut cfg = RateLimitConfig::default();
        let err = cfg.apply("auth=1:2,public=abc").unwrap_err();
        assert!(err.contains("invalid rule"));
        assert_eq!(cfg.auth, RateLimitConfig::default().auth);
    }

    #[test]
    fn zero_rates_are_rejected() {
        assert!("0:10".parse::<RateLimitRule>().is_err());
        assert!("10:0".parse::<RateLimitRule>().is_err());
        assert!("nope=1:1".parse::<RateLimitGroup>().is_err());
    }
}
