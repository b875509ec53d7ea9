use crate::error::AppError;
use redis::aio::MultiplexedConnection;
use redis::{Client, FromRedisValue, RedisResult};

/// Thin async wrapper around a multiplexed Redis connection.
///
/// Cloning is cheap; every clone shares the same underlying connection.
#[derive(Clone)]
pub struct RedisClient {
    connection: MultiplexedConnection,
}

impl RedisClient {
    pub async fn connect(redis_url: &str) -> Result<Self, AppError> {
        let client = Client::open(redis_url)
            .map_err(|e| AppError::Upstream(format!("Failed to create Redis client: {}", e)))?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to connect to Redis: {}", e)))?;

        tracing::info!("Connected to Redis");
        Ok(Self { connection })
    }

    async fn query<T: FromRedisValue>(&self, cmd: &redis::Cmd, name: &str) -> Result<T, AppError> {
        let mut conn = self.connection.clone();
        let result: RedisResult<T> = cmd.query_async(&mut conn).await;
        result.map_err(|e| AppError::Upstream(format!("{} failed: {}", name, e)))
    }

    pub async fn ping(&self) -> Result<String, AppError> {
        self.query(&redis::cmd("PING"), "PING").await
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let mut cmd = redis::cmd("GET");
        cmd.arg(key);
        self.query(&cmd, "GET").await
    }

    pub async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>, AppError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut cmd = redis::cmd("MGET");
        for key in keys {
            cmd.arg(key);
        }
        self.query(&cmd, "MGET").await
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        self.query(&cmd, "SET").await
    }

    pub async fn set_with_expiry(
        &self,
        key: &str,
        value: &str,
        expiry_seconds: u64,
    ) -> Result<(), AppError> {
        let mut cmd = redis::cmd("SETEX");
        cmd.arg(key).arg(expiry_seconds).arg(value);
        self.query(&cmd, "SETEX").await
    }

    pub async fn delete(&self, key: &str) -> Result<bool, AppError> {
        let mut cmd = redis::cmd("DEL");
        cmd.arg(key);
        let deleted: i64 = self.query(&cmd, "DEL").await?;
        Ok(deleted > 0)
    }

    pub async fn rpush(&self, key: &str, value: &str) -> Result<(), AppError> {
        let mut cmd = redis::cmd("RPUSH");
        cmd.arg(key).arg(value);
        let _length: i64 = self.query(&cmd, "RPUSH").await?;
        Ok(())
    }

    pub async fn lrange_all(&self, key: &str) -> Result<Vec<String>, AppError> {
        let mut cmd = redis::cmd("LRANGE");
        cmd.arg(key).arg(0).arg(-1);
        self.query(&cmd, "LRANGE").await
    }

    pub async fn lrem(&self, key: &str, value: &str) -> Result<(), AppError> {
        let mut cmd = redis::cmd("LREM");
        cmd.arg(key).arg(0).arg(value);
        let _removed: i64 = self.query(&cmd, "LREM").await?;
        Ok(())
    }
}
