// ==========================================
// 烘焙生产计划系统 - 生产分配引擎
// ==========================================
// 职责: 计划解析 / 初始分配 / 人工增量 / 批量百分比 / 自动均分 / 确认锁定
// 输入: 生产日期 + 操作参数
// 输出: 落库后的分配明细 + 计划状态 + 产能提示
// ==========================================
// 红线: 同一计划的 读-校验-写 串行 (计划级互斥锁)
// 红线: 每次变更单事务提交, 失败不留部分写入
// 红线: 已确认产品拒绝任何数量修改
// ==========================================

use crate::domain::allocation::AllocationLine;
use crate::domain::plan::{ProductAllocationState, ProductionPlan};
use crate::domain::types::{CapacityEnforcement, DistributionMode, PlanStatus};
use crate::engine::capacity::{CapacityAssessment, CapacityEvaluator};
use crate::engine::distribution::{policy_for, DistributionPolicy};
use crate::engine::error::{AllocationError, AllocationResult};
use crate::engine::plan_lock::PlanLockRegistry;
use crate::engine::ports::{CapacityLookup, CatalogLookup, FixedBaseForecast, ForecastStrategy};
use crate::repository::{AllocationRepository, ProductStateRepository, ProductionPlanRepository};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, MutexGuard};

mod adjust;
mod auto_allocate;
mod confirm;
mod seeding;
mod views;

// ==========================================
// EngineConfig - 引擎配置快照
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub seed_base_quantity: u32,                     // 默认初始分配数量: 20
    pub distribution_mode: DistributionMode,         // 汇总视图增量分摊: apply_to_all
    pub capacity_enforcement: CapacityEnforcement,   // 产能约束: advisory
    pub default_day_part: String,                    // 默认时段: morning
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed_base_quantity: 20,
            distribution_mode: DistributionMode::ApplyToAll,
            capacity_enforcement: CapacityEnforcement::Advisory,
            default_day_part: "morning".to_string(),
        }
    }
}

// ==========================================
// 结果类型
// ==========================================

/// 计划快照: 计划 + 全部明细 + 单品状态
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanSnapshot {
    pub plan: ProductionPlan,
    pub lines: Vec<AllocationLine>,
    pub product_states: Vec<ProductAllocationState>,
}

/// 初始分配结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedOutcome {
    pub plan: ProductionPlan,
    pub created: Vec<AllocationLine>,    // 本次新建的明细
    pub lines: Vec<AllocationLine>,      // 计划当前全部明细
    pub skipped_store_ids: Vec<String>,  // 已有明细而跳过的门店
}

/// 单行增量调整结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustOutcome {
    pub line: AllocationLine,
    pub plan_status: PlanStatus,
    pub capacity: CapacityAssessment,
}

/// 汇总视图增量调整结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductAdjustOutcome {
    pub product_sku: String,
    pub distribution_mode: DistributionMode,
    pub lines: Vec<AllocationLine>,
    pub plan_status: PlanStatus,
    pub capacity: Vec<CapacityAssessment>,
}

/// 批量百分比调整结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkAdjustOutcome {
    pub lines: Vec<AllocationLine>,
    pub plan_status: PlanStatus,
    pub capacity: Vec<CapacityAssessment>,
}

/// 自动均分结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoAllocateOutcome {
    pub product_sku: String,
    pub total_produced: u32,
    pub allocations: Vec<AllocationLine>,  // 按调用方门店顺序
    pub zeroed: Vec<AllocationLine>,       // 不在门店列表内而被清零的明细
    pub plan_status: PlanStatus,
}

// ==========================================
// AllocationEngine - 生产分配引擎
// ==========================================
pub struct AllocationEngine {
    plan_repo: Arc<ProductionPlanRepository>,
    allocation_repo: Arc<AllocationRepository>,
    product_state_repo: Arc<ProductStateRepository>,
    catalog: Arc<dyn CatalogLookup>,
    capacity: CapacityEvaluator,
    forecast: Arc<dyn ForecastStrategy>,
    policy: Box<dyn DistributionPolicy>,
    config: EngineConfig,
    plan_locks: PlanLockRegistry,
}

impl AllocationEngine {
    /// 创建引擎
    ///
    /// 默认使用固定基数预测策略与配置指定的分摊策略
    pub fn new(
        plan_repo: Arc<ProductionPlanRepository>,
        allocation_repo: Arc<AllocationRepository>,
        product_state_repo: Arc<ProductStateRepository>,
        catalog: Arc<dyn CatalogLookup>,
        capacity_lookup: Arc<dyn CapacityLookup>,
        config: EngineConfig,
    ) -> Self {
        Self {
            plan_repo,
            allocation_repo,
            product_state_repo,
            catalog,
            capacity: CapacityEvaluator::new(capacity_lookup),
            forecast: Arc::new(FixedBaseForecast::new(config.seed_base_quantity)),
            policy: policy_for(config.distribution_mode),
            config,
            plan_locks: PlanLockRegistry::new(),
        }
    }

    /// 替换初始分配数量策略
    pub fn with_forecast(mut self, forecast: Arc<dyn ForecastStrategy>) -> Self {
        self.forecast = forecast;
        self
    }

    /// 替换汇总视图增量分摊策略
    pub fn with_distribution_policy(mut self, policy: Box<dyn DistributionPolicy>) -> Self {
        self.config.distribution_mode = policy.mode();
        self.policy = policy;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ==========================================
    // 计划解析
    // ==========================================

    /// 解析生产日期的计划, 不存在时创建 pending 计划（不生成明细）
    pub fn resolve_plan(&self, production_date: NaiveDate) -> AllocationResult<ProductionPlan> {
        let lock = self.plan_locks.lock_for(&plan_lock_key(production_date))?;
        let _guard = acquire(&lock)?;
        self.resolve_plan_locked(production_date)
    }

    /// 加载计划快照（计划不存在时创建）
    pub fn get_plan_snapshot(&self, production_date: NaiveDate) -> AllocationResult<PlanSnapshot> {
        let plan = self.resolve_plan(production_date)?;
        let lines = self.allocation_repo.find_by_plan(&plan.plan_id)?;
        let product_states = self.product_state_repo.find_by_plan(&plan.plan_id)?;
        Ok(PlanSnapshot {
            plan,
            lines,
            product_states,
        })
    }

    /// 查询计划（不创建）
    pub fn find_plan(&self, production_date: NaiveDate) -> AllocationResult<Option<ProductionPlan>> {
        Ok(self.plan_repo.find_by_date(production_date)?)
    }

    // ==========================================
    // 内部工具
    // ==========================================

    /// 调用方需已持有计划锁
    fn resolve_plan_locked(&self, production_date: NaiveDate) -> AllocationResult<ProductionPlan> {
        let (plan, created) = self.plan_repo.find_or_create(production_date, now())?;
        if created {
            tracing::info!(
                plan_id = %plan.plan_id,
                production_date = %production_date,
                "创建生产计划"
            );
        }
        Ok(plan)
    }

    /// 变更类操作要求计划已存在
    fn require_plan(&self, production_date: NaiveDate) -> AllocationResult<ProductionPlan> {
        self.plan_repo
            .find_by_date(production_date)?
            .ok_or_else(|| AllocationError::not_found("ProductionPlan", production_date.to_string()))
    }

    /// 已锁定产品拒绝修改
    fn ensure_unlocked(
        &self,
        plan_id: &str,
        product_sku: &str,
    ) -> AllocationResult<ProductAllocationState> {
        let state = self.product_state_repo.find_or_default(plan_id, product_sku)?;
        if state.locked {
            tracing::warn!(plan_id = %plan_id, product_sku = %product_sku, "产品已确认锁定, 拒绝修改");
            return Err(AllocationError::locked(plan_id, product_sku));
        }
        Ok(state)
    }

    /// strict 模式下, 上调后超出上限则拒绝
    fn enforce_capacity(&self, assessment: &CapacityAssessment, increased: bool) -> AllocationResult<()> {
        if !assessment.status.is_at_or_over() {
            return Ok(());
        }
        if assessment.quantity > assessment.max_quantity
            && increased
            && self.config.capacity_enforcement == CapacityEnforcement::Strict
        {
            return Err(AllocationError::CapacityExceeded {
                store_id: assessment.store_id.clone(),
                product_sku: assessment.product_sku.clone(),
                quantity: assessment.quantity,
                max_quantity: assessment.max_quantity,
            });
        }
        tracing::warn!(
            store_id = %assessment.store_id,
            product_sku = %assessment.product_sku,
            quantity = assessment.quantity,
            max_quantity = assessment.max_quantity,
            "数量已达产能上限"
        );
        Ok(())
    }
}

/// 计划级锁的键（按生产日期, 计划与日期一一对应）
fn plan_lock_key(production_date: NaiveDate) -> String {
    format!("date:{}", production_date.format("%Y-%m-%d"))
}

fn acquire(lock: &std::sync::Mutex<()>) -> AllocationResult<MutexGuard<'_, ()>> {
    lock.lock().map_err(|e| {
        AllocationError::Persistence(crate::repository::error::RepositoryError::LockError(
            e.to_string(),
        ))
    })
}

fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}
