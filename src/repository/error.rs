// ==========================================
// 高校排课系统 - 仓储层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 约定: SQLite 约束错误在此统一归类，唯一索引/外键是校验链的最后防线
// ==========================================

use crate::domain::error::ValidationError;
use thiserror::Error;

/// 仓储层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    // ===== 数据库错误 =====
    #[error("记录未找到: {entity} with id={id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    #[error("唯一约束违反: {0}")]
    UniqueConstraintViolation(String),

    #[error("外键约束违反: {0}")]
    ForeignKeyViolation(String),

    // ===== 数据质量错误 =====
    #[error("存储数据损坏: {0}")]
    DataCorruption(String),

    // ===== 领域校验错误 =====
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// 仓储层结果别名
pub type RepositoryResult<T> = Result<T, RepositoryError>;

impl From<rusqlite::Error> for RepositoryError {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::SqliteFailure(err, msg)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                let message = msg.clone().unwrap_or_else(|| err.to_string());
                // 扩展码: 787=FOREIGNKEY 1555=PRIMARYKEY 2067=UNIQUE
                match err.extended_code {
                    787 => RepositoryError::ForeignKeyViolation(message),
                    1555 | 2067 => RepositoryError::UniqueConstraintViolation(message),
                    _ => RepositoryError::DatabaseQueryError(message),
                }
            }
            _ => RepositoryError::DatabaseQueryError(e.to_string()),
        }
    }
}
