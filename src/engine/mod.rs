// ==========================================
// 烘焙生产计划系统 - 引擎层
// ==========================================
// 职责: 实现分配规则, 不拼 SQL
// 红线: Engine 是计划与明细的唯一写入方
// ==========================================

pub mod allocation;
pub mod capacity;
pub mod distribution;
pub mod error;
pub mod plan_lock;
pub mod ports;
pub mod projection;

// 重导出核心引擎
pub use allocation::{
    AdjustOutcome, AllocationEngine, AutoAllocateOutcome, BulkAdjustOutcome, EngineConfig,
    PlanSnapshot, ProductAdjustOutcome, SeedOutcome,
};
pub use capacity::{CapacityAssessment, CapacityEvaluator};
pub use distribution::{ApplyToAll, DistributionPolicy, SplitProportionally};
pub use error::{AllocationError, AllocationResult};
pub use plan_lock::PlanLockRegistry;
pub use ports::{CapacityLookup, CatalogLookup, FixedBaseForecast, ForecastStrategy, SeedForecast};
pub use projection::PlanProjector;
