// ==========================================
// 高校排课系统 - API层错误类型
// ==========================================
// 职责: 转换校验/仓储错误为用户可读的错误消息
// 约定: 所有错误信息必须包含显式原因
// ==========================================

use crate::domain::error::ValidationError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ===== 业务校验错误 =====
    #[error("校验失败: {0}")]
    Validation(#[from] ValidationError),

    // ===== 资源错误 =====
    #[error("资源未找到: {0}")]
    NotFound(String),

    // ===== 基础设施错误 =====
    #[error("存储层错误: {0}")]
    Repository(String),

    #[error("配置错误: {0}")]
    Config(String),
}

/// API层结果别名
pub type ApiResult<T> = Result<T, ApiError>;

impl From<RepositoryError> for ApiError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::Validation(v) => ApiError::Validation(v),
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{} id={}", entity, id))
            }
            other => ApiError::Repository(other.to_string()),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Config(e.to_string())
    }
}
