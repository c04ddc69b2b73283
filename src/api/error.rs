// ==========================================
// 烘焙生产计划系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换引擎/仓储错误为用户友好的错误消息
// ==========================================

use crate::engine::error::AllocationError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    /// 产品已确认锁定
    #[error("产品已确认锁定: plan={plan_id}, sku={product_sku}")]
    ProductLocked { plan_id: String, product_sku: String },

    /// strict 模式下超出产能上限
    #[error("超出产能上限: store={store_id}, sku={product_sku}, quantity={quantity}, max={max_quantity}")]
    CapacityExceeded {
        store_id: String,
        product_sku: String,
        quantity: u32,
        max_quantity: u32,
    },

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 导出错误
    // ==========================================
    #[error("导出失败: {0}")]
    ExportError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 AllocationError 转换
// ==========================================
impl From<AllocationError> for ApiError {
    fn from(err: AllocationError) -> Self {
        match err {
            AllocationError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            AllocationError::Locked {
                plan_id,
                product_sku,
            } => ApiError::ProductLocked {
                plan_id,
                product_sku,
            },
            AllocationError::InvalidArgument(msg) => ApiError::InvalidInput(msg),
            AllocationError::CapacityExceeded {
                store_id,
                product_sku,
                quantity,
                max_quantity,
            } => ApiError::CapacityExceeded {
                store_id,
                product_sku,
                quantity,
                max_quantity,
            },
            AllocationError::Persistence(repo_err) => repo_err.into(),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_conversion() {
        let repo_err = RepositoryError::NotFound {
            entity: "ProductionPlan".to_string(),
            id: "2025-01-10".to_string(),
        };
        let api_err: ApiError = repo_err.into();
        match api_err {
            ApiError::NotFound(msg) => {
                assert!(msg.contains("ProductionPlan"));
                assert!(msg.contains("2025-01-10"));
            }
            _ => panic!("Expected NotFound"),
        }

        let api_err: ApiError = RepositoryError::LockError("poisoned".to_string()).into();
        assert!(matches!(api_err, ApiError::DatabaseConnectionError(_)));
    }

    #[test]
    fn test_allocation_error_conversion() {
        let api_err: ApiError = AllocationError::locked("P1", "BAGEL").into();
        match api_err {
            ApiError::ProductLocked { product_sku, .. } => assert_eq!(product_sku, "BAGEL"),
            _ => panic!("Expected ProductLocked"),
        }

        let api_err: ApiError = AllocationError::Persistence(RepositoryError::DatabaseQueryError(
            "disk I/O error".to_string(),
        ))
        .into();
        assert!(matches!(api_err, ApiError::DatabaseError(_)));

        let api_err: ApiError = AllocationError::InvalidArgument("percent".to_string()).into();
        assert!(matches!(api_err, ApiError::InvalidInput(_)));
    }
}
