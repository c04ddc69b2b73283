// ==========================================
// 烘焙生产计划系统 - 分配引擎错误类型
// ==========================================
// 分类: NotFound / Locked / InvalidArgument / CapacityExceeded / Persistence
// 约束: Persistence 错误发生时库内状态不变
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 分配引擎错误类型
#[derive(Error, Debug)]
pub enum AllocationError {
    #[error("资源未找到: {entity} {id}")]
    NotFound { entity: String, id: String },

    #[error("产品已确认锁定, 不可修改: plan={plan_id}, sku={product_sku}")]
    Locked { plan_id: String, product_sku: String },

    #[error("无效参数: {0}")]
    InvalidArgument(String),

    #[error("超出产能上限: store={store_id}, sku={product_sku}, quantity={quantity}, max={max_quantity}")]
    CapacityExceeded {
        store_id: String,
        product_sku: String,
        quantity: u32,
        max_quantity: u32,
    },

    #[error("持久化失败: {0}")]
    Persistence(#[source] RepositoryError),
}

impl AllocationError {
    pub fn not_found(entity: &str, id: impl Into<String>) -> Self {
        AllocationError::NotFound {
            entity: entity.to_string(),
            id: id.into(),
        }
    }

    pub fn locked(plan_id: &str, product_sku: &str) -> Self {
        AllocationError::Locked {
            plan_id: plan_id.to_string(),
            product_sku: product_sku.to_string(),
        }
    }
}

impl From<RepositoryError> for AllocationError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => AllocationError::NotFound { entity, id },
            other => AllocationError::Persistence(other),
        }
    }
}

/// Result 类型别名
pub type AllocationResult<T> = Result<T, AllocationError>;
