/// Low-level store errors (backend I/O, serialization, lease contention).
/// This is the error type for the `Store` trait — store operations can only
/// fail with infrastructure errors, never domain errors: "no eligible
/// message" and "unknown receipt" are ordinary `Ok` outcomes.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// Every claim attempt lost the lease race to a concurrent consumer.
    /// Transient; the caller may retry the pull.
    #[error("lease contention: gave up after {attempts} claim attempts")]
    Contended { attempts: u32 },
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<deadpool_redis::redis::RedisError> for StoreError {
    fn from(err: deadpool_redis::redis::RedisError) -> Self {
        StoreError::Backend(err.to_string())
    }
}

impl From<deadpool_redis::PoolError> for StoreError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Application-level errors for configuration and service wiring.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<deadpool_redis::CreatePoolError> for QueueError {
    fn from(err: deadpool_redis::CreatePoolError) -> Self {
        QueueError::InvalidConfig(err.to_string())
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
pub type Result<T> = std::result::Result<T, QueueError>;
