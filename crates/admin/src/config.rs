//! Environment-driven configuration for the admin console.

use std::time::Duration;

use cashper_auth::DEFAULT_TOKEN_KEY;
use cashper_observability::LogFormat;

use crate::error::ClientError;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const DEFAULT_CLOSE_DELAY: Duration = Duration::from_millis(800);

/// Settings shared by every browser instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminConfig {
    pub api_url: String,
    /// Token override; when unset the session reads the persisted token.
    pub auth_token: Option<String>,
    pub token_key: String,
    pub page_size: usize,
    /// Delay between a successful status change and the detail overlay closing.
    pub close_delay: Duration,
    /// `None` keeps the HTTP client's defaults.
    pub request_timeout: Option<Duration>,
    pub log_format: LogFormat,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            auth_token: None,
            token_key: DEFAULT_TOKEN_KEY.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            close_delay: DEFAULT_CLOSE_DELAY,
            request_timeout: None,
            log_format: LogFormat::Pretty,
        }
    }
}

impl AdminConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let page_size = match get("CASHPER_PAGE_SIZE") {
            Some(raw) => parse_number::<usize>("CASHPER_PAGE_SIZE", &raw)?,
            None => defaults.page_size,
        };
        if page_size == 0 {
            return Err(ClientError::Config(
                "CASHPER_PAGE_SIZE must be at least 1".to_string(),
            ));
        }

        let close_delay = match get("CASHPER_CLOSE_DELAY_MS") {
            Some(raw) => Duration::from_millis(parse_number::<u64>("CASHPER_CLOSE_DELAY_MS", &raw)?),
            None => defaults.close_delay,
        };

        let request_timeout = get("CASHPER_REQUEST_TIMEOUT_SECS")
            .map(|raw| parse_number::<u64>("CASHPER_REQUEST_TIMEOUT_SECS", &raw))
            .transpose()?
            .map(Duration::from_secs);

        let log_format = match get("CASHPER_LOG_FORMAT") {
            Some(raw) => LogFormat::parse(&raw).ok_or_else(|| {
                ClientError::Config(format!("CASHPER_LOG_FORMAT: unknown format '{raw}'"))
            })?,
            None => defaults.log_format,
        };

        Ok(Self {
            api_url: get("CASHPER_API_URL").unwrap_or(defaults.api_url),
            auth_token: get("CASHPER_AUTH_TOKEN"),
            token_key: get("CASHPER_TOKEN_KEY").unwrap_or(defaults.token_key),
            page_size,
            close_delay,
            request_timeout,
            log_format,
        })
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ClientError> {
    raw.parse::<T>()
        .map_err(|_| ClientError::Config(format!("{key}: '{raw}' is not a valid number")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = AdminConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, AdminConfig::default());
        assert_eq!(config.page_size, 10);
        assert_eq!(config.close_delay, Duration::from_millis(800));
    }

    #[test]
    fn variables_override_defaults() {
        let config = AdminConfig::from_lookup(lookup(&[
            ("CASHPER_API_URL", "https://api.cashper.ai"),
            ("CASHPER_AUTH_TOKEN", "tok"),
            ("CASHPER_TOKEN_KEY", "adminToken"),
            ("CASHPER_PAGE_SIZE", "25"),
            ("CASHPER_CLOSE_DELAY_MS", "0"),
            ("CASHPER_REQUEST_TIMEOUT_SECS", "30"),
            ("CASHPER_LOG_FORMAT", "json"),
        ]))
        .unwrap();

        assert_eq!(config.api_url, "https://api.cashper.ai");
        assert_eq!(config.auth_token.as_deref(), Some("tok"));
        assert_eq!(config.token_key, "adminToken");
        assert_eq!(config.page_size, 25);
        assert_eq!(config.close_delay, Duration::ZERO);
        assert_eq!(config.request_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let err = AdminConfig::from_lookup(lookup(&[("CASHPER_PAGE_SIZE", "ten")])).unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));

        let err = AdminConfig::from_lookup(lookup(&[("CASHPER_PAGE_SIZE", "0")])).unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = AdminConfig::from_lookup(lookup(&[("CASHPER_AUTH_TOKEN", "  ")])).unwrap();
        assert!(config.auth_token.is_none());
    }
}
