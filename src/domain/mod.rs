// ==========================================
// 烘焙生产计划系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod action_log;
pub mod aggregate;
pub mod allocation;
pub mod capacity;
pub mod catalog;
pub mod plan;
pub mod types;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType};
pub use aggregate::{
    AggregatedAllocation, ProductStoreAllocation, ProductView, StoreView, StoreViewItem,
    AGGREGATE_STORE_ID, UNCATEGORIZED,
};
pub use allocation::{AllocationKey, AllocationLine, AllocationSelection, ManufacturedQuantity};
pub use capacity::CapacityBound;
pub use catalog::{Product, Store};
pub use plan::{ProductAllocationState, ProductionPlan};
pub use types::{
    AdjustDirection, AdjustField, CapacityEnforcement, CapacityStatus, DistributionMode,
    PlanStatus, StoreCluster,
};
