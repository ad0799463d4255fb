//! Backend connection settings, read from the environment.

use std::fmt;
use std::time::Duration;

use tracing::warn;

use crate::error::{RemoteError, Result};

pub const BASE_URL_ENV: &str = "VARMAP_API_BASE_URL";
pub const TOKEN_ENV: &str = "VARMAP_API_TOKEN";
pub const CLIENT_ID_ENV: &str = "VARMAP_CLIENT_ID";
pub const TIMEOUT_ENV: &str = "VARMAP_API_TIMEOUT_SECS";

pub const DEFAULT_CLIENT_ID: &str = "varmap-cli";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    /// Without trailing slash.
    pub base_url: String,
    pub token: String,
    pub client_id: String,
    pub timeout: Duration,
}

impl RemoteConfig {
    pub fn new(base_url: impl AsRef<str>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.as_ref().trim().trim_end_matches('/').to_string(),
            token: token.into(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Read the configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through `lookup`. Base URL and token are
    /// required; blank values count as absent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let base_url = read(BASE_URL_ENV)
            .ok_or_else(|| RemoteError::NotConfigured(format!("{BASE_URL_ENV} is not set")))?;
        let token = read(TOKEN_ENV)
            .ok_or_else(|| RemoteError::NotConfigured(format!("{TOKEN_ENV} is not set")))?;

        let mut config = Self::new(base_url, token);
        if let Some(client_id) = read(CLIENT_ID_ENV) {
            config.client_id = client_id;
        }
        if let Some(raw) = read(TIMEOUT_ENV) {
            match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => config.timeout = Duration::from_secs(secs),
                _ => warn!(value = %raw, "ignoring invalid {TIMEOUT_ENV}"),
            }
        }
        Ok(config)
    }
}

impl fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .field("client_id", &self.client_id)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_and_slash_is_trimmed() {
        let config = RemoteConfig::from_lookup(lookup(&[
            (BASE_URL_ENV, "https://api.example.org/"),
            (TOKEN_ENV, "secret"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "https://api.example.org");
        assert_eq!(config.client_id, "varmap-cli");
        assert_eq!(config.timeout, Duration::from_secs(20));
    }

    #[test]
    fn missing_token_is_not_configured() {
        let err = RemoteConfig::from_lookup(lookup(&[(BASE_URL_ENV, "https://api.example.org")]))
            .unwrap_err();
        assert!(matches!(err, RemoteError::NotConfigured(_)));
        assert!(err.to_string().contains(TOKEN_ENV));
    }

    #[test]
    fn overrides_are_read() {
        let config = RemoteConfig::from_lookup(lookup(&[
            (BASE_URL_ENV, "http://localhost:8080"),
            (TOKEN_ENV, "t"),
            (CLIENT_ID_ENV, "icu-team"),
            (TIMEOUT_ENV, "5"),
        ]))
        .unwrap();
        assert_eq!(config.client_id, "icu-team");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn debug_output_hides_token() {
        let config = RemoteConfig::new("http://localhost", "very-secret");
        assert!(!format!("{config:?}").contains("very-secret"));
    }
}
