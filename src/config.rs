//! Runtime configuration read from the environment (and `.env`).

use anyhow::{Context, Result};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_LOG_FILE: &str = "logs/school_metrics.log";
/// Polling period for the live dashboard.
pub const DEFAULT_REFRESH_SECS: u64 = 30;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub api_base_url: String,
    pub api_token: Option<String>,
    pub log_file_path: String,
    pub refresh_interval: Duration,
    pub request_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let secs = |key: &str, default: u64| -> Result<Duration> {
            match get(key) {
                Some(raw) => {
                    let secs: u64 = raw
                        .trim()
                        .parse()
                        .with_context(|| format!("{key} must be a whole number of seconds, got '{raw}'"))?;
                    anyhow::ensure!(secs > 0, "{key} must be greater than zero");
                    Ok(Duration::from_secs(secs))
                }
                None => Ok(Duration::from_secs(default)),
            }
        };

        Ok(Self {
            api_base_url: get("SCHOOL_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            api_token: get("SCHOOL_API_TOKEN"),
            log_file_path: get("LOG_FILE_PATH").unwrap_or_else(|| DEFAULT_LOG_FILE.to_string()),
            refresh_interval: secs("REFRESH_INTERVAL_SECS", DEFAULT_REFRESH_SECS)?,
            request_timeout: secs("REQUEST_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.api_base_url, DEFAULT_API_URL);
        assert_eq!(config.api_token, None);
        assert_eq!(config.refresh_interval, Duration::from_secs(30));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("SCHOOL_API_URL", "https://school.example/api"),
            ("SCHOOL_API_TOKEN", "abc"),
            ("REFRESH_INTERVAL_SECS", " 10 "),
        ])
        .unwrap();
        assert_eq!(config.api_base_url, "https://school.example/api");
        assert_eq!(config.api_token.as_deref(), Some("abc"));
        assert_eq!(config.refresh_interval, Duration::from_secs(10));
    }

    #[test]
    fn test_empty_token_is_unset() {
        assert_eq!(config(&[("SCHOOL_API_TOKEN", "")]).unwrap().api_token, None);
    }

    #[test]
    fn test_invalid_interval() {
        let err = config(&[("REFRESH_INTERVAL_SECS", "soon")]).unwrap_err();
        assert!(err.to_string().contains("REFRESH_INTERVAL_SECS"));
        assert!(config(&[("REQUEST_TIMEOUT_SECS", "0")]).is_err());
    }
}
