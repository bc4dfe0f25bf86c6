mod jobs;

use deadpool_redis::{Config, Pool, Runtime};

pub use jobs::{keys, queues, EvaluateResponseJob, JobResult, QueueJobStatus};

pub type RedisPool = Pool;

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Redis pool error: {0}")]
    Pool(String),
    #[error("Redis error: {0}")]
    Redis(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Builds a lazy pool; no connection is made until first use.
pub fn create_pool(redis_url: &str) -> Result<RedisPool, QueueError> {
    Config::from_url(redis_url)
        .create_pool(Some(Runtime::Tokio1))
        .map_err(|e| QueueError::Pool(e.to_string()))
}
