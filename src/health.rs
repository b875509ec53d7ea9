use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use crate::rate_limit_config::ThrottleSettings;
use crate::rate_limiter::RateLimiter;
use crate::redis::RedisClient;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub dependencies: DependencyStatus,
    pub throttle: ThrottleStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DependencyStatus {
    pub redis: ServiceStatus,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    pub status: String,
    pub response_time_ms: u64,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThrottleStatus {
    pub tracked_clients: usize,
    pub settings: ThrottleSettings,
}

static START_TIME: std::sync::LazyLock<SystemTime> = std::sync::LazyLock::new(SystemTime::now);

#[derive(Clone)]
pub struct HealthChecker {
    redis: Option<RedisClient>,
    limiter: Arc<RateLimiter>,
}

impl HealthChecker {
    pub fn new(redis: Option<RedisClient>, limiter: Arc<RateLimiter>) -> Self {
        // Pin the uptime origin to service construction.
        let _ = *START_TIME;
        Self { redis, limiter }
    }

    pub async fn check_health(&self) -> HealthStatus {
        let now = SystemTime::now();
        let uptime = now.duration_since(*START_TIME).unwrap_or_default().as_secs();

        let redis_status = self.check_redis().await;

        let overall_status = match redis_status.status.as_str() {
            "healthy" | "disabled" => "healthy",
            _ => "degraded",
        };

        HealthStatus {
            status: overall_status.to_string(),
            timestamp: now
                .duration_since(SystemTime::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: uptime,
            dependencies: DependencyStatus {
                redis: redis_status,
            },
            throttle: ThrottleStatus {
                tracked_clients: self.limiter.tracked_keys(),
                settings: *self.limiter.settings(),
            },
        }
    }

    async fn check_redis(&self) -> ServiceStatus {
        let Some(redis) = &self.redis else {
            return ServiceStatus {
                status: "disabled".to_string(),
                response_time_ms: 0,
                error: None,
            };
        };

        let start = Instant::now();
        match redis.ping().await {
            Ok(_) => ServiceStatus {
                status: "healthy".to_string(),
                response_time_ms: start.elapsed().as_millis() as u64,
                error: None,
            },
            Err(err) => ServiceStatus {
                status: "unavailable".to_string(),
                response_time_ms: start.elapsed().as_millis() as u64,
                error: Some(err.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_mode_is_healthy() {
        let limiter = Arc::new(RateLimiter::new(ThrottleSettings::default()));
        limiter.check_and_record("client").unwrap();

        let status = HealthChecker::new(None, limiter).check_health().await;
        assert_eq!(status.status, "healthy");
        assert_eq!(status.dependencies.redis.status, "disabled");
        assert_eq!(status.throttle.tracked_clients, 1);
    }

    #[test]
    fn test_health_status_serialization() {
        let status = HealthStatus {
            status: "healthy".to_string(),
            timestamp: 1234567890,
            version: "1.0.0".to_string(),
            uptime_seconds: 3600,
            dependencies: DependencyStatus {
                redis: ServiceStatus {
                    status: "healthy".to_string(),
                    response_time_ms: 5,
                    error: None,
                },
            },
            throttle: ThrottleStatus {
                tracked_clients: 2,
                settings: ThrottleSettings::default(),
            },
        };

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["uptimeSeconds"], 3600);
        assert_eq!(json["dependencies"]["redis"]["responseTimeMs"], 5);
        assert_eq!(json["throttle"]["settings"]["window"], "1m");
    }
}
