//! CLI configuration.

use std::path::PathBuf;

use chrono::Duration;
use exchange_common::constants;
use exchange_fx::{HttpFetcherConfig, DEFAULT_ENDPOINT};

/// Main CLI configuration.
#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    /// openexchangerates.org application ID.
    pub app_id: String,
    /// Latest-rates endpoint.
    pub endpoint: String,
    /// Cache directory; the user cache directory when unset.
    pub cache_directory: Option<PathBuf>,
    /// How long cached rates stay fresh.
    pub time_to_live: Duration,
    /// HTTP request timeout.
    pub request_timeout: Duration,
    /// Log filter directive.
    pub log_level: String,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            cache_directory: None,
            time_to_live: constants::default_time_to_live(),
            request_timeout: constants::default_request_timeout(),
            log_level: "warn".to_string(),
        }
    }
}

impl ExchangeConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from a variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(app_id) = lookup("EXCHANGE_APP_ID") {
            config.app_id = app_id;
        }

        if let Some(endpoint) = lookup("EXCHANGE_ENDPOINT") {
            config.endpoint = endpoint;
        }

        if let Some(dir) = lookup("EXCHANGE_CACHE_DIR") {
            config.cache_directory = Some(PathBuf::from(dir));
        }

        if let Some(ttl) = lookup("EXCHANGE_TTL_SECS").and_then(|v| parse_seconds(&v)) {
            config.time_to_live = ttl;
        }

        if let Some(timeout) = lookup("EXCHANGE_TIMEOUT_SECS").and_then(|v| parse_seconds(&v)) {
            config.request_timeout = timeout;
        }

        if let Some(level) = lookup("RUST_LOG") {
            config.log_level = level;
        }

        config
    }

    /// Apply command-line overrides.
    ///
    /// Fails when `ttl_secs` does not fit in a duration.
    pub fn with_overrides(
        mut self,
        endpoint: Option<String>,
        cache_directory: Option<PathBuf>,
        ttl_secs: Option<i64>,
    ) -> Result<Self, String> {
        if let Some(endpoint) = endpoint {
            self.endpoint = endpoint;
        }

        if let Some(dir) = cache_directory {
            self.cache_directory = Some(dir);
        }

        if let Some(secs) = ttl_secs {
            self.time_to_live = Duration::try_seconds(secs)
                .ok_or_else(|| format!("Time to live of {secs} seconds is out of range"))?;
        }

        Ok(self)
    }

    /// Fetcher configuration derived from this configuration.
    pub fn fetcher_config(&self) -> HttpFetcherConfig {
        HttpFetcherConfig::new(self.app_id.clone())
            .with_endpoint(self.endpoint.clone())
            .with_request_timeout(self.request_timeout)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.app_id.trim().is_empty() {
            return Err("app id is required (environment variable `EXCHANGE_APP_ID`)".to_string());
        }

        if self.endpoint.is_empty() {
            return Err("Endpoint cannot be empty".to_string());
        }

        if self.time_to_live <= Duration::zero() {
            return Err("Time to live must be positive".to_string());
        }

        if self.request_timeout <= Duration::zero() {
            return Err("Request timeout must be positive".to_string());
        }

        Ok(())
    }
}

/// Whole seconds as a duration; `None` when unparsable or out of range.
fn parse_seconds(value: &str) -> Option<Duration> {
    value.trim().parse().ok().and_then(Duration::try_seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config_requires_app_id() {
        let config = ExchangeConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_lookup() {
        let config = ExchangeConfig::from_lookup(lookup_from(&[
            ("EXCHANGE_APP_ID", "abc"),
            ("EXCHANGE_CACHE_DIR", "/tmp/rates"),
            ("EXCHANGE_TTL_SECS", "60"),
            ("EXCHANGE_TIMEOUT_SECS", "not a number"),
        ]));

        assert!(config.validate().is_ok());
        assert_eq!(config.app_id, "abc");
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.cache_directory, Some(PathBuf::from("/tmp/rates")));
        assert_eq!(config.time_to_live, Duration::seconds(60));
        assert_eq!(config.request_timeout, Duration::seconds(10));
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_overrides_win() {
        let config = ExchangeConfig::from_lookup(lookup_from(&[
            ("EXCHANGE_APP_ID", "abc"),
            ("EXCHANGE_ENDPOINT", "https://example.com/latest.json"),
        ]))
        .with_overrides(Some("http://127.0.0.1:8080/latest.json".to_string()), None, Some(0))
        .unwrap();

        assert_eq!(config.endpoint, "http://127.0.0.1:8080/latest.json");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_out_of_range_env_seconds_are_ignored() {
        let huge = i64::MAX.to_string();
        let config = ExchangeConfig::from_lookup(lookup_from(&[
            ("EXCHANGE_APP_ID", "abc"),
            ("EXCHANGE_TTL_SECS", huge.as_str()),
            ("EXCHANGE_TIMEOUT_SECS", huge.as_str()),
        ]));

        assert_eq!(config.time_to_live, constants::default_time_to_live());
        assert_eq!(config.request_timeout, constants::default_request_timeout());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_out_of_range_ttl_flag_rejected() {
        let result = ExchangeConfig::default().with_overrides(None, None, Some(i64::MAX));
        assert!(result.is_err());

        let config = ExchangeConfig::default()
            .with_overrides(None, Some(PathBuf::from("/tmp/rates")), Some(30))
            .unwrap();
        assert_eq!(config.time_to_live, Duration::seconds(30));
        assert_eq!(config.cache_directory, Some(PathBuf::from("/tmp/rates")));
    }

    #[test]
    fn test_fetcher_config() {
        let config = ExchangeConfig {
            app_id: "abc".to_string(),
            ..Default::default()
        };

        let fetcher = config.fetcher_config();

        assert_eq!(fetcher.app_id, "abc");
        assert_eq!(fetcher.endpoint, DEFAULT_ENDPOINT);
        assert!(fetcher.validate().is_ok());
    }
}
