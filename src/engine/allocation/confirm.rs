use super::{acquire, now, plan_lock_key, AllocationEngine};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::plan::{ProductAllocationState, ProductionPlan};
use crate::domain::types::PlanStatus;
use crate::engine::error::{AllocationError, AllocationResult};
use crate::repository::AllocationWriteSet;
use chrono::NaiveDate;
use serde_json::json;
use tracing::instrument;

impl AllocationEngine {
    // ==========================================
    // 确认锁定
    // ==========================================

    /// 确认产品: unconfirmed -> confirmed(locked)
    ///
    /// 单向迁移, 无解锁操作; 已锁定时原样返回
    #[instrument(skip(self), fields(production_date = %production_date, product_sku = %product_sku))]
    pub fn confirm_product(
        &self,
        production_date: NaiveDate,
        product_sku: &str,
        operator: &str,
    ) -> AllocationResult<ProductAllocationState> {
        if product_sku.trim().is_empty() {
            return Err(AllocationError::InvalidArgument("产品SKU不能为空".to_string()));
        }

        let lock = self.plan_locks.lock_for(&plan_lock_key(production_date))?;
        let _guard = acquire(&lock)?;

        let plan = self.require_plan(production_date)?;
        let mut state = self
            .product_state_repo
            .find_or_default(&plan.plan_id, product_sku)?;
        if state.locked {
            tracing::debug!(plan_id = %plan.plan_id, "产品已确认, 忽略重复确认");
            return Ok(state);
        }

        let timestamp = now();
        state.locked = true;
        state.locked_by = Some(operator_or_system(operator));
        state.locked_at = Some(timestamp);

        let mut write_set = AllocationWriteSet::new(&plan.plan_id, timestamp);
        write_set.product_states.push(state.clone());
        write_set.action_log = Some(ActionLog::new(
            &plan.plan_id,
            ActionType::ConfirmProduct,
            operator,
            json!({ "product_sku": product_sku }),
            format!("确认产品 {}", product_sku),
            timestamp,
        ));
        self.allocation_repo.commit(&write_set)?;

        tracing::info!(plan_id = %plan.plan_id, product_sku = %product_sku, "产品已确认锁定");
        Ok(state)
    }

    /// 确认计划: pending -> confirmed
    ///
    /// 已确认时原样返回
    #[instrument(skip(self), fields(production_date = %production_date))]
    pub fn confirm_plan(
        &self,
        production_date: NaiveDate,
        operator: &str,
    ) -> AllocationResult<ProductionPlan> {
        let lock = self.plan_locks.lock_for(&plan_lock_key(production_date))?;
        let _guard = acquire(&lock)?;

        let plan = self.require_plan(production_date)?;
        if plan.is_confirmed() {
            return Ok(plan);
        }

        let timestamp = now();
        let mut write_set = AllocationWriteSet::new(&plan.plan_id, timestamp);
        write_set.plan_status = Some(PlanStatus::Confirmed);
        write_set.action_log = Some(ActionLog::new(
            &plan.plan_id,
            ActionType::ConfirmPlan,
            operator,
            json!({ "production_date": production_date.to_string() }),
            format!("确认计划 {}", production_date),
            timestamp,
        ));
        self.allocation_repo.commit(&write_set)?;

        tracing::info!(plan_id = %plan.plan_id, "计划已确认");
        self.require_plan(production_date)
    }
}

fn operator_or_system(operator: &str) -> String {
    let trimmed = operator.trim();
    if trimmed.is_empty() {
        "system".to_string()
    } else {
        trimmed.to_string()
    }
}
