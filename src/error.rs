use thiserror::Error;

/// 引擎及其协作方的错误类型
///
/// 瞬时 I/O 错误由上游投递层重试，非法定位直接丢弃不重试，
/// 状态损坏由引擎自愈，都不会导致进程退出。
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("worker unavailable for user {0}")]
    WorkerUnavailable(String),
}
