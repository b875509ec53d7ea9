use crate::config::Config;
use crate::error::AppError;
use crate::key_generator::KeyStrategy;

/// Validates configuration objects for consistency and correctness
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates a Redis URL
    pub fn validate_redis_url(url: &str) -> Result<(), AppError> {
        if url.is_empty() {
            return Err(AppError::Configuration(
                "Redis URL cannot be empty".to_string(),
            ));
        }

        if !url.starts_with("redis://") && !url.starts_with("rediss://") {
            return Err(AppError::Configuration(
                "Redis URL must start with 'redis://' or 'rediss://'".to_string(),
            ));
        }

        Ok(())
    }

    pub fn validate_key_strategy(strategy: &str) -> Result<KeyStrategy, AppError> {
        strategy.parse().map_err(AppError::Configuration)
    }

    pub fn validate_sweep_interval(secs: u64) -> Result<(), AppError> {
        if secs == 0 {
            return Err(AppError::Configuration(
                "SWEEP_INTERVAL must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Validates the whole service configuration
    pub fn validate_config(config: &Config) -> Result<(), AppError> {
        config
            .throttle_settings()
            .validate()
            .map_err(AppError::Configuration)?;
        Self::validate_key_strategy(&config.throttle_key_strategy)?;
        Self::validate_sweep_interval(config.sweep_interval_secs)?;

        if let Some(url) = config.redis_url() {
            Self::validate_redis_url(url)?;
        }

        Ok(())
    }
}
