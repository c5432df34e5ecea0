//! Configuration loaded from the environment at startup.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default cache key holding the pending-transaction list.
pub const DEFAULT_CACHE_KEY: &str = "unsaved-transactions";

/// Default timeout for every outbound HTTP request.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Runtime configuration.
///
/// Secrets are held as `SecretString` so `Debug` output never leaks them.
#[derive(Debug)]
pub struct TriageConfig {
    /// Telegram bot credential.
    pub bot_token: SecretString,
    /// Chat the prompts are posted to.
    pub chat_id: String,
    /// Usernames or numeric ids allowed to act on prompts (`*` = everyone).
    pub allowed_users: Vec<String>,
    /// Shared bearer token for the cache and the commit webhook.
    pub auth_token: SecretString,
    /// Downstream automation endpoint receiving finalized transactions.
    pub webhook_url: String,
    /// Endpoint returning the pending list.
    pub cache_url: String,
    /// Endpoint accepting pending-list overwrites.
    pub cache_write_url: String,
    /// Key the pending list is stored under.
    pub cache_key: String,
    /// Sleep between sync cycles.
    pub poll_interval: Duration,
    /// Timeout for each remote call.
    pub request_timeout: Duration,
}

impl TriageConfig {
    /// Build config from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String, ConfigError> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
        };

        let bot_token = SecretString::from(required("TELEGRAM_BOT_TOKEN")?);
        let chat_id = required("TELEGRAM_CHAT_ID")?;
        let auth_token = SecretString::from(required("AUTH_TOKEN")?);
        let webhook_url = required("ADD_TRANSACTION_WEBHOOK_URL")?;
        let cache_url = required("EDGE_CACHE_URL")?;

        let sleep_minutes = required("SLEEP_TIME_IN_MINUTES")?;
        let minutes: u64 = sleep_minutes
            .parse()
            .map_err(|e: std::num::ParseIntError| ConfigError::InvalidValue {
                key: "SLEEP_TIME_IN_MINUTES".into(),
                message: e.to_string(),
            })?;
        if minutes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "SLEEP_TIME_IN_MINUTES".into(),
                message: "must be at least 1".into(),
            });
        }
        let poll_secs = minutes
            .checked_mul(60)
            .ok_or_else(|| ConfigError::InvalidValue {
                key: "SLEEP_TIME_IN_MINUTES".into(),
                message: "interval is too large".into(),
            })?;

        let cache_write_url = lookup("EDGE_CACHE_WRITE_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| cache_url.clone());

        let cache_key = lookup("EDGE_CACHE_KEY")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CACHE_KEY.to_string());

        let allowed_users: Vec<String> = lookup("TELEGRAM_ALLOWED_USERS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs = match lookup("REQUEST_TIMEOUT_SECS")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
        {
            Some(raw) => raw.parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::InvalidValue {
                    key: "REQUEST_TIMEOUT_SECS".into(),
                    message: e.to_string(),
                }
            })?,
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };
        if request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "REQUEST_TIMEOUT_SECS".into(),
                message: "must be at least 1".into(),
            });
        }

        Ok(Self {
            bot_token,
            chat_id,
            allowed_users,
            auth_token,
            webhook_url,
            cache_url,
            cache_write_url,
            cache_key,
            poll_interval: Duration::from_secs(poll_secs),
            request_timeout: Duration::from_secs(request_timeout_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("TELEGRAM_BOT_TOKEN", "123:ABC"),
            ("TELEGRAM_CHAT_ID", "-10042"),
            ("AUTH_TOKEN", "s3cret"),
            ("ADD_TRANSACTION_WEBHOOK_URL", "https://hooks.example.com/add"),
            ("EDGE_CACHE_URL", "https://edge.example.com/cache/unsaved-transactions"),
            ("SLEEP_TIME_IN_MINUTES", "5"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> Result<TriageConfig, ConfigError> {
        TriageConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()))
    }

    #[test]
    fn loads_required_values_and_defaults() {
        let config = load(&base_env()).unwrap();
        assert_eq!(config.chat_id, "-10042");
        assert_eq!(config.auth_token.expose_secret(), "s3cret");
        assert_eq!(config.poll_interval, Duration::from_secs(300));
        assert_eq!(config.cache_write_url, config.cache_url);
        assert_eq!(config.cache_key, DEFAULT_CACHE_KEY);
        assert_eq!(config.allowed_users, vec!["*".to_string()]);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn every_required_variable_is_enforced() {
        for key in base_env().keys() {
            let mut env = base_env();
            env.remove(key);
            match load(&env) {
                Err(ConfigError::MissingEnvVar(missing)) => assert_eq!(missing, *key),
                other => panic!("expected MissingEnvVar for {key}, got {other:?}"),
            }
        }
    }

    #[test]
    fn blank_value_counts_as_missing() {
        let mut env = base_env();
        env.insert("AUTH_TOKEN", "   ");
        assert!(matches!(load(&env), Err(ConfigError::MissingEnvVar(k)) if k == "AUTH_TOKEN"));
    }

    #[test]
    fn rejects_non_numeric_interval() {
        let mut env = base_env();
        env.insert("SLEEP_TIME_IN_MINUTES", "soon");
        assert!(matches!(
            load(&env),
            Err(ConfigError::InvalidValue { key, .. }) if key == "SLEEP_TIME_IN_MINUTES"
        ));
    }

    #[test]
    fn rejects_zero_interval() {
        let mut env = base_env();
        env.insert("SLEEP_TIME_IN_MINUTES", "0");
        assert!(load(&env).is_err());
    }

    #[test]
    fn rejects_interval_that_overflows_seconds() {
        let mut env = base_env();
        env.insert("SLEEP_TIME_IN_MINUTES", "307445734561825861");
        assert!(matches!(
            load(&env),
            Err(ConfigError::InvalidValue { key, .. }) if key == "SLEEP_TIME_IN_MINUTES"
        ));
    }

    #[test]
    fn rejects_zero_request_timeout() {
        let mut env = base_env();
        env.insert("REQUEST_TIMEOUT_SECS", "0");
        assert!(matches!(
            load(&env),
            Err(ConfigError::InvalidValue { key, .. }) if key == "REQUEST_TIMEOUT_SECS"
        ));
    }

    #[test]
    fn blank_request_timeout_uses_default() {
        let mut env = base_env();
        env.insert("REQUEST_TIMEOUT_SECS", "  ");
        let config = load(&env).unwrap();
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn optional_overrides() {
        let mut env = base_env();
        env.insert("EDGE_CACHE_WRITE_URL", "https://edge.example.com/cache");
        env.insert("EDGE_CACHE_KEY", "pending");
        env.insert("TELEGRAM_ALLOWED_USERS", "alice, 12345,");
        env.insert("REQUEST_TIMEOUT_SECS", "5");
        let config = load(&env).unwrap();
        assert_eq!(config.cache_write_url, "https://edge.example.com/cache");
        assert_eq!(config.cache_key, "pending");
        assert_eq!(config.allowed_users, vec!["alice", "12345"]);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn debug_does_not_leak_secrets() {
        let config = load(&base_env()).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("s3cret"));
        assert!(!debug.contains("123:ABC"));
    }
}
