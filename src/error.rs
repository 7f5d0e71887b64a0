use std::time::Duration;
use thiserror::Error;

/// 数据层错误：后端访问失败、模拟数据不可用、模型不存在
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataSourceError {
    #[error("backend unreachable: {0}")]
    Network(String),

    #[error("backend responded with status {0}")]
    Status(u16),

    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("mock data unavailable: {0}")]
    MockUnavailable(String),

    #[error("model {0} does not exist")]
    ModelNotFound(String),
}

pub type Result<T> = std::result::Result<T, DataSourceError>;
