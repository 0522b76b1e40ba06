//! Configuration settings
//!
//! Settings load from a TOML file and from environment variables. The client
//! never reads them implicitly: callers resolve a [`Settings`] and hand it to
//! [`crate::Rustmaps::from_settings`].

use serde::{Deserialize, Serialize};
use std::time::Duration;

// Helper functions for serde defaults
fn default_base_url() -> String {
    "https://rustmaps.com/api/v2".to_string()
}

fn default_base_delay_ms() -> u64 {
    2000
}

fn default_multiplier() -> f64 {
    1.5
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_max_attempts() -> u32 {
    120
}

fn default_max_wait_secs() -> u64 {
    600
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_user_agent() -> String {
    crate::utils::user_agent()
}

fn default_true() -> bool {
    true
}

fn default_per_minute() -> u32 {
    80
}

fn default_per_hour() -> u32 {
    3600
}

/// Main configuration settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// API credentials and endpoint
    #[serde(default)]
    pub api: ApiSettings,
    /// Poll session tuning
    #[serde(default)]
    pub polling: PollSettings,
    /// Network configuration
    #[serde(default)]
    pub network: NetworkSettings,
    /// Client-side request budget
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
}

/// API credentials and endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    /// API key issued by rustmaps.com
    #[serde(default)]
    pub api_key: String,
    /// API root URL
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Use the staging map pool by default
    #[serde(default)]
    pub staging: bool,
}

/// Poll session tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollSettings {
    /// Delay before the second poll, in milliseconds
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Growth factor applied after each non-terminal poll
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    /// Upper bound of the computed delay, in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Maximum number of polls per session
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Maximum wall-clock duration of a session, in seconds
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,
}

/// Network and proxy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSettings {
    /// HTTPS proxy URL
    #[serde(default)]
    pub https_proxy: Option<String>,
    /// HTTP proxy URL
    #[serde(default)]
    pub http_proxy: Option<String>,
    /// All protocols proxy URL
    #[serde(default)]
    pub all_proxy: Option<String>,
    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
    /// Per-request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// User agent string
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Client-side request budget
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    /// Enforce the budget before sending requests
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Requests allowed in any rolling minute
    #[serde(default = "default_per_minute")]
    pub per_minute: u32,
    /// Requests allowed in any rolling hour
    #[serde(default = "default_per_hour")]
    pub per_hour: u32,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            staging: false,
        }
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            multiplier: default_multiplier(),
            max_delay_ms: default_max_delay_ms(),
            max_attempts: default_max_attempts(),
            max_wait_secs: default_max_wait_secs(),
        }
    }
}

impl PollSettings {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            https_proxy: None,
            http_proxy: None,
            all_proxy: None,
            connect_timeout: default_connect_timeout(),
            request_timeout_ms: default_request_timeout_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl NetworkSettings {
    /// Get effective proxy URL based on priority
    pub fn proxy_url(&self) -> Option<String> {
        self.https_proxy
            .as_ref()
            .or(self.http_proxy.as_ref())
            .or(self.all_proxy.as_ref())
            .cloned()
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            per_minute: default_per_minute(),
            per_hour: default_per_hour(),
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> crate::Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| crate::Error::config(name, &format!("Invalid value '{}': {}", value, e)))
}

impl Settings {
    /// Create new settings with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create settings with defaults and the given API key
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        let mut settings = Self::default();
        settings.api.api_key = api_key.into();
        settings
    }

    /// Load settings from environment variables
    pub fn from_env() -> crate::Result<Self> {
        Self::default().merge_with_env()
    }

    /// Load settings from configuration file
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Override settings with the environment variables that are set
    pub fn merge_with_env(mut self) -> crate::Result<Self> {
        if let Ok(key) = std::env::var("RUSTMAPS_API_KEY") {
            self.api.api_key = key;
        }
        if let Ok(url) = std::env::var("RUSTMAPS_BASE_URL") {
            self.api.base_url = url;
        }
        if let Ok(staging) = std::env::var("RUSTMAPS_STAGING") {
            self.api.staging = parse_env("RUSTMAPS_STAGING", &staging)?;
        }

        if let Ok(interval) = std::env::var("RUSTMAPS_POLL_INTERVAL_MS") {
            self.polling.base_delay_ms = parse_env("RUSTMAPS_POLL_INTERVAL_MS", &interval)?;
        }
        if let Ok(attempts) = std::env::var("RUSTMAPS_MAX_ATTEMPTS") {
            self.polling.max_attempts = parse_env("RUSTMAPS_MAX_ATTEMPTS", &attempts)?;
        }
        if let Ok(wait) = std::env::var("RUSTMAPS_MAX_WAIT") {
            self.polling.max_wait_secs = parse_env("RUSTMAPS_MAX_WAIT", &wait)?;
        }

        // Proxy variables always override when present
        if let Ok(proxy) = std::env::var("HTTPS_PROXY") {
            self.network.https_proxy = Some(proxy);
        }
        if let Ok(proxy) = std::env::var("HTTP_PROXY") {
            self.network.http_proxy = Some(proxy);
        }
        if let Ok(proxy) = std::env::var("ALL_PROXY") {
            self.network.all_proxy = Some(proxy);
        }

        Ok(self)
    }

    /// Validate configuration settings
    pub fn validate(&self) -> crate::Result<()> {
        if self.api.api_key.trim().is_empty() {
            return Err(crate::Error::config(
                "api_key",
                "API key is empty; set api.api_key or RUSTMAPS_API_KEY",
            ));
        }

        let base_url = url::Url::parse(&self.api.base_url).map_err(|e| {
            crate::Error::config(
                "base_url",
                &format!("Invalid base URL '{}': {}", self.api.base_url, e),
            )
        })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(crate::Error::config(
                "base_url",
                "Base URL must use http or https",
            ));
        }

        let polling = &self.polling;
        if polling.base_delay_ms == 0 {
            return Err(crate::Error::config(
                "base_delay_ms",
                "Poll interval cannot be 0",
            ));
        }
        if !(polling.multiplier.is_finite() && polling.multiplier >= 1.0) {
            return Err(crate::Error::config(
                "multiplier",
                &format!("Backoff multiplier must be >= 1.0, got {}", polling.multiplier),
            ));
        }
        if polling.max_delay_ms < polling.base_delay_ms {
            return Err(crate::Error::config(
                "max_delay_ms",
                "Maximum delay cannot be smaller than the poll interval",
            ));
        }
        if polling.max_attempts == 0 {
            return Err(crate::Error::config(
                "max_attempts",
                "Maximum attempts cannot be 0",
            ));
        }
        if polling.max_wait_secs == 0 {
            return Err(crate::Error::config(
                "max_wait_secs",
                "Maximum wait cannot be 0",
            ));
        }

        if self.rate_limit.enabled && (self.rate_limit.per_minute == 0 || self.rate_limit.per_hour == 0)
        {
            return Err(crate::Error::config(
                "rate_limit",
                "Request budget cannot be 0 while enabled",
            ));
        }

        // Validate proxy URLs if present
        for (name, proxy_url) in [
            ("https_proxy", &self.network.https_proxy),
            ("http_proxy", &self.network.http_proxy),
            ("all_proxy", &self.network.all_proxy),
        ]
        .iter()
        {
            if let Some(url_str) = proxy_url
                && let Err(e) = url::Url::parse(url_str)
            {
                return Err(crate::Error::config(
                    *name,
                    &format!("Invalid proxy URL '{}': {}", url_str, e),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ENV_TEST_MUTEX;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.api.base_url, "https://rustmaps.com/api/v2");
        assert!(settings.api.api_key.is_empty());
        assert!(!settings.api.staging);
        assert_eq!(settings.polling.base_delay(), Duration::from_secs(2));
        assert_eq!(settings.polling.max_delay(), Duration::from_secs(30));
        assert_eq!(settings.polling.max_wait(), Duration::from_secs(600));
        assert_eq!(settings.rate_limit.per_minute, 80);
        assert_eq!(settings.rate_limit.per_hour, 3600);
        assert!(settings.network.user_agent.starts_with("rustmaps-rs/"));
    }

    #[test]
    fn test_load_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[api]
api_key = "00000000-0000-0000-0000-000000000000"
staging = true

[polling]
base_delay_ms = 500
max_attempts = 10
        "#
        )
        .unwrap();

        let settings = Settings::from_file(temp_file.path()).unwrap();
        assert_eq!(settings.api.api_key, "00000000-0000-0000-0000-000000000000");
        assert!(settings.api.staging);
        assert_eq!(settings.polling.base_delay_ms, 500);
        assert_eq!(settings.polling.max_attempts, 10);
        // untouched sections keep their defaults
        assert_eq!(settings.polling.max_delay_ms, 30_000);
        assert!(settings.rate_limit.enabled);
    }

    #[test]
    fn test_env_var_override() {
        let _lock = ENV_TEST_MUTEX.lock().unwrap();

        unsafe {
            std::env::set_var("RUSTMAPS_API_KEY", "env-key");
            std::env::set_var("RUSTMAPS_MAX_ATTEMPTS", "7");
        }

        let settings = Settings::from_env().unwrap();
        assert_eq!(settings.api.api_key, "env-key");
        assert_eq!(settings.polling.max_attempts, 7);

        unsafe {
            std::env::remove_var("RUSTMAPS_API_KEY");
            std::env::remove_var("RUSTMAPS_MAX_ATTEMPTS");
        }
    }

    #[test]
    fn test_invalid_env_value() {
        let _lock = ENV_TEST_MUTEX.lock().unwrap();

        unsafe {
            std::env::set_var("RUSTMAPS_MAX_WAIT", "soon");
        }

        let result = Settings::from_env();
        assert!(matches!(result, Err(crate::Error::Config { .. })));

        unsafe {
            std::env::remove_var("RUSTMAPS_MAX_WAIT");
        }
    }

    #[test]
    fn test_proxy_priority() {
        let mut settings = Settings::default();
        settings.network.https_proxy = Some("https://proxy1:8080".to_string());
        settings.network.http_proxy = Some("http://proxy2:8080".to_string());
        settings.network.all_proxy = Some("socks5://proxy3:1080".to_string());

        // HTTPS proxy should have highest priority
        assert_eq!(settings.network.proxy_url().unwrap(), "https://proxy1:8080");

        settings.network.https_proxy = None;
        assert_eq!(settings.network.proxy_url().unwrap(), "http://proxy2:8080");

        settings.network.http_proxy = None;
        assert_eq!(settings.network.proxy_url().unwrap(), "socks5://proxy3:1080");
    }

    #[test]
    fn test_validation_success() {
        let settings = Settings::with_api_key("key");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_blank_api_key() {
        for key in ["", "   "] {
            let err = Settings::with_api_key(key).validate().unwrap_err();
            assert!(matches!(err, crate::Error::Config { ref field, .. } if field == "api_key"));
        }
    }

    #[test]
    fn test_validation_rejects_shrinking_backoff() {
        let mut settings = Settings::with_api_key("key");
        settings.polling.multiplier = 0.5;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_max_delay_below_base() {
        let mut settings = Settings::with_api_key("key");
        settings.polling.base_delay_ms = 5000;
        settings.polling.max_delay_ms = 1000;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_base_url() {
        let mut settings = Settings::with_api_key("key");
        settings.api.base_url = "ftp://rustmaps.com".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_proxy_url() {
        let mut settings = Settings::with_api_key("key");
        settings.network.https_proxy = Some("invalid-url".to_string());
        assert!(settings.validate().is_err());
    }
}
