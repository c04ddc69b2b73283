// ==========================================
// 烘焙生产计划系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod action_log_repo;
pub mod allocation_repo;
pub mod capacity_repo;
pub mod catalog_repo;
pub mod error;
pub mod product_state_repo;
pub mod production_plan_repo;
mod row_mapping;

// 重导出核心仓储
pub use action_log_repo::ActionLogRepository;
pub use allocation_repo::{AllocationRepository, AllocationWriteSet};
pub use capacity_repo::CapacityBoundRepository;
pub use catalog_repo::CatalogRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use product_state_repo::ProductStateRepository;
pub use production_plan_repo::ProductionPlanRepository;
