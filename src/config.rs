use envconfig::Envconfig;
use std::net::SocketAddr;
use std::time::Duration;

use crate::config_validator::ConfigValidator;
use crate::error::AppError;
use crate::key_generator::KeyStrategy;
use crate::rate_limit_config::ThrottleSettings;

#[derive(Debug, Envconfig, Clone)]
pub struct Config {
    /// Server bind address
    #[envconfig(from = "BIND_ADDR", default = "0.0.0.0:5000")]
    pub bind_addr: SocketAddr,

    /// Redis connection URL; in-memory storage when unset
    #[envconfig(from = "REDIS_URL")]
    pub redis_url: Option<String>,

    /// Max requests per client key within one window
    #[envconfig(from = "THROTTLE_LIMIT", default = "10")]
    pub throttle_limit: u32,

    /// Window length in milliseconds
    #[envconfig(from = "THROTTLE_TTL", default = "60000")]
    pub throttle_ttl_ms: u64,

    /// Penalty box length in milliseconds
    #[envconfig(from = "PENALTY_TTL", default = "10000")]
    pub penalty_ttl_ms: u64,

    /// One of `ip`, `device`, `route`
    #[envconfig(from = "THROTTLE_KEY_STRATEGY", default = "route")]
    pub throttle_key_strategy: String,

    /// Throttle sweep interval in seconds
    #[envconfig(from = "SWEEP_INTERVAL", default = "30")]
    pub sweep_interval_secs: u64,

    /// Stats cache TTL in seconds, 0 disables expiry
    #[envconfig(from = "CACHE_TTL", default = "3600")]
    pub cache_ttl_secs: u64,

    /// Comma separated `token=userId` pairs
    #[envconfig(from = "API_TOKENS")]
    pub api_tokens: Option<String>,

    #[envconfig(from = "LOG_LEVEL", default = "info")]
    pub log_level: String,

    /// Enable request tracing
    #[envconfig(from = "ENABLE_TRACING", default = "true")]
    pub enable_tracing: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
            redis_url: None,
            throttle_limit: 10,
            throttle_ttl_ms: 60_000,
            penalty_ttl_ms: 10_000,
            throttle_key_strategy: "route".to_string(),
            sweep_interval_secs: 30,
            cache_ttl_secs: 3600,
            api_tokens: None,
            log_level: "info".to_string(),
            enable_tracing: true,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, envconfig::Error> {
        Config::init_from_env()
    }

    pub fn validate(&self) -> Result<(), AppError> {
        ConfigValidator::validate_config(self)
    }

    pub fn throttle_settings(&self) -> ThrottleSettings {
        ThrottleSettings::new(self.throttle_limit, self.throttle_ttl_ms, self.penalty_ttl_ms)
    }

    pub fn key_strategy(&self) -> Result<KeyStrategy, AppError> {
        ConfigValidator::validate_key_strategy(&self.throttle_key_strategy)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        (self.cache_ttl_secs > 0).then(|| Duration::from_secs(self.cache_ttl_secs))
    }

    /// `REDIS_URL` with blank values treated as unset.
    pub fn redis_url(&self) -> Option<&str> {
        self.redis_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.throttle_settings(), ThrottleSettings::default());
        assert_eq!(config.key_strategy().unwrap(), KeyStrategy::Route);
        assert_eq!(config.cache_ttl(), Some(Duration::from_secs(3600)));
        assert_eq!(config.redis_url(), None);
    }

    #[test]
    fn test_zero_cache_ttl_means_no_expiry() {
        let config = Config {
            cache_ttl_secs: 0,
            ..Config::default()
        };
        assert_eq!(config.cache_ttl(), None);
    }

    #[test]
    fn test_blank_redis_url_is_unset() {
        let config = Config {
            redis_url: Some("  ".to_string()),
            ..Config::default()
        };
        assert_eq!(config.redis_url(), None);
    }
}
