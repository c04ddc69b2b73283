use super::{
    acquire, now, plan_lock_key, AdjustOutcome, AllocationEngine, BulkAdjustOutcome,
    ProductAdjustOutcome,
};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::allocation::{AllocationKey, AllocationLine, ManufacturedQuantity};
use crate::domain::plan::{ProductAllocationState, ProductionPlan};
use crate::domain::types::{AdjustDirection, AdjustField};
use crate::engine::distribution::{apply_delta, is_valid_bulk_percent, scale_quantity};
use crate::engine::error::{AllocationError, AllocationResult};
use crate::repository::AllocationWriteSet;
use chrono::NaiveDate;
use serde_json::json;
use std::collections::{BTreeSet, HashMap};
use tracing::instrument;

impl AllocationEngine {
    // ==========================================
    // 单行增量调整
    // ==========================================

    /// 对单行施加增量
    ///
    /// # 参数
    /// - `day_part`: None 时要求 (门店, SKU) 在计划内只有一条明细
    /// - `field`: 最终订货量 / 实际生产量
    ///
    /// # 规则
    /// - new = max(0, old + delta)
    /// - 生产量未录入时以订货量为基数
    /// - 修改订货量时计划 pending -> confirmed, 产品标记为人工覆盖
    /// - 产品已锁定返回 Locked, 不写入（先于明细定位检查）
    #[instrument(skip(self), fields(production_date = %production_date, store_id = %store_id, product_sku = %product_sku))]
    #[allow(clippy::too_many_arguments)]
    pub fn adjust_line(
        &self,
        production_date: NaiveDate,
        store_id: &str,
        product_sku: &str,
        day_part: Option<&str>,
        field: AdjustField,
        delta: i64,
        operator: &str,
    ) -> AllocationResult<AdjustOutcome> {
        let lock = self.plan_locks.lock_for(&plan_lock_key(production_date))?;
        let _guard = acquire(&lock)?;

        let plan = self.require_plan(production_date)?;
        let state = self.ensure_unlocked(&plan.plan_id, product_sku)?;
        let mut line = self.find_single_line(&plan, store_id, product_sku, day_part)?;

        let old_value = field_value(&line, field);
        set_field(&mut line, field, apply_delta(old_value, delta));
        let new_value = field_value(&line, field);

        let assessment = self.capacity.assess(product_sku, store_id, new_value);
        self.enforce_capacity(&assessment, new_value > old_value)?;

        let timestamp = now();
        line.updated_at = timestamp;
        let mut write_set = AllocationWriteSet::new(&plan.plan_id, timestamp);
        apply_manual_edit(&mut write_set, &plan, state, field);
        write_set.action_log = Some(ActionLog::new(
            &plan.plan_id,
            ActionType::AdjustLine,
            operator,
            json!({
                "key": line.key(),
                "field": field.to_string(),
                "delta": delta,
                "old_value": old_value,
                "new_value": new_value,
            }),
            format!("{} {}: {} -> {}", line.key(), field, old_value, new_value),
            timestamp,
        ));
        let plan_status = write_set.plan_status.unwrap_or(plan.status);
        write_set.lines.push(line);

        let mut stored = self.allocation_repo.commit(&write_set)?;
        let line = stored
            .pop()
            .ok_or_else(|| AllocationError::not_found("AllocationLine", format!("{}/{}", store_id, product_sku)))?;

        tracing::info!(
            plan_id = %plan.plan_id,
            field = %field,
            old_value,
            new_value,
            "单行调整完成"
        );

        Ok(AdjustOutcome {
            line,
            plan_status,
            capacity: assessment,
        })
    }

    // ==========================================
    // 汇总视图增量调整
    // ==========================================

    /// 对产品在全部门店的明细施加增量
    ///
    /// 增量按 DistributionPolicy 分摊; ApplyToAll 时每行施加相同增量。
    #[instrument(skip(self), fields(production_date = %production_date, product_sku = %product_sku))]
    pub fn adjust_product(
        &self,
        production_date: NaiveDate,
        product_sku: &str,
        field: AdjustField,
        delta: i64,
        operator: &str,
    ) -> AllocationResult<ProductAdjustOutcome> {
        let lock = self.plan_locks.lock_for(&plan_lock_key(production_date))?;
        let _guard = acquire(&lock)?;

        let plan = self.require_plan(production_date)?;
        let mut lines = self
            .allocation_repo
            .find_by_plan_and_sku(&plan.plan_id, product_sku)?;
        if lines.is_empty() {
            return Err(AllocationError::not_found(
                "AllocationLine",
                format!("{}/{}", plan.plan_id, product_sku),
            ));
        }
        let state = self.ensure_unlocked(&plan.plan_id, product_sku)?;

        let current: Vec<u32> = lines.iter().map(|l| field_value(l, field)).collect();
        let deltas = self.policy.distribute(delta, &current);

        let timestamp = now();
        let mut assessments = Vec::with_capacity(lines.len());
        for ((line, old_value), line_delta) in lines.iter_mut().zip(current.iter()).zip(deltas) {
            let new_value = apply_delta(*old_value, line_delta);
            set_field(line, field, new_value);
            line.updated_at = timestamp;

            let assessment = self.capacity.assess(product_sku, &line.store_id, new_value);
            self.enforce_capacity(&assessment, new_value > *old_value)?;
            assessments.push(assessment);
        }

        let mut write_set = AllocationWriteSet::new(&plan.plan_id, timestamp);
        apply_manual_edit(&mut write_set, &plan, state, field);
        write_set.action_log = Some(ActionLog::new(
            &plan.plan_id,
            ActionType::AdjustProduct,
            operator,
            json!({
                "product_sku": product_sku,
                "field": field.to_string(),
                "delta": delta,
                "distribution_mode": self.policy.mode(),
                "line_count": lines.len(),
            }),
            format!("{} {} 汇总调整 {:+} ({}条)", product_sku, field, delta, lines.len()),
            timestamp,
        ));
        let plan_status = write_set.plan_status.unwrap_or(plan.status);
        write_set.lines = lines;

        let stored = self.allocation_repo.commit(&write_set)?;
        tracing::info!(plan_id = %plan.plan_id, lines = stored.len(), "汇总调整完成");

        Ok(ProductAdjustOutcome {
            product_sku: product_sku.to_string(),
            distribution_mode: self.policy.mode(),
            lines: stored,
            plan_status,
            capacity: assessments,
        })
    }

    // ==========================================
    // 批量百分比调整
    // ==========================================

    /// 对选中明细按百分比调整最终订货量
    ///
    /// # 规则
    /// - 百分比须在 [1, 100], 超出返回 InvalidArgument（不钳制）
    /// - new = max(0, round(old * factor)), 四舍五入远离 0
    /// - 只修改订货量, 不修改生产量
    /// - 任一明细所属产品已锁定则整批拒绝
    #[instrument(skip(self, keys), fields(production_date = %production_date, key_count = keys.len(), percent = %percent, direction = %direction))]
    pub fn bulk_adjust(
        &self,
        production_date: NaiveDate,
        keys: &BTreeSet<AllocationKey>,
        percent: f64,
        direction: AdjustDirection,
        operator: &str,
    ) -> AllocationResult<BulkAdjustOutcome> {
        if !is_valid_bulk_percent(percent) {
            return Err(AllocationError::InvalidArgument(format!(
                "百分比必须在1到100之间: {}",
                percent
            )));
        }
        if keys.is_empty() {
            return Err(AllocationError::InvalidArgument("未选择任何明细".to_string()));
        }
        if let Some(bad) = keys.iter().find(|k| !k.is_well_formed()) {
            return Err(AllocationError::InvalidArgument(format!("明细键格式错误: {}", bad)));
        }

        let lock = self.plan_locks.lock_for(&plan_lock_key(production_date))?;
        let _guard = acquire(&lock)?;

        let plan = self.require_plan(production_date)?;
        let mut by_key: HashMap<AllocationKey, AllocationLine> = self
            .allocation_repo
            .find_by_plan(&plan.plan_id)?
            .into_iter()
            .map(|l| (l.key(), l))
            .collect();

        let mut selected = Vec::with_capacity(keys.len());
        for key in keys {
            let line = by_key
                .remove(key)
                .ok_or_else(|| AllocationError::not_found("AllocationLine", key.to_string()))?;
            selected.push(line);
        }

        let skus: BTreeSet<String> = selected.iter().map(|l| l.product_sku.clone()).collect();
        let mut states = Vec::with_capacity(skus.len());
        for sku in &skus {
            states.push(self.ensure_unlocked(&plan.plan_id, sku)?);
        }

        let timestamp = now();
        let increased = direction == AdjustDirection::Increase;
        let mut assessments = Vec::with_capacity(selected.len());
        for line in selected.iter_mut() {
            line.quantity = scale_quantity(line.quantity, percent, direction);
            line.updated_at = timestamp;
            let assessment = self
                .capacity
                .assess(&line.product_sku, &line.store_id, line.quantity);
            self.enforce_capacity(&assessment, increased)?;
            assessments.push(assessment);
        }

        let mut write_set = AllocationWriteSet::new(&plan.plan_id, timestamp);
        write_set.plan_status = plan.confirmed_status();
        write_set.product_states = states
            .into_iter()
            .filter(|s| !s.overridden)
            .map(mark_overridden)
            .collect();
        write_set.action_log = Some(ActionLog::new(
            &plan.plan_id,
            ActionType::BulkAdjust,
            operator,
            json!({
                "keys": keys,
                "percent": percent,
                "direction": direction.to_string(),
            }),
            format!("批量{} {}% ({}条)", direction, percent, selected.len()),
            timestamp,
        ));
        let plan_status = write_set.plan_status.unwrap_or(plan.status);
        write_set.lines = selected;

        let stored = self.allocation_repo.commit(&write_set)?;
        tracing::info!(plan_id = %plan.plan_id, lines = stored.len(), "批量调整完成");

        Ok(BulkAdjustOutcome {
            lines: stored,
            plan_status,
            capacity: assessments,
        })
    }

    // ==========================================
    // 内部工具
    // ==========================================

    fn find_single_line(
        &self,
        plan: &ProductionPlan,
        store_id: &str,
        product_sku: &str,
        day_part: Option<&str>,
    ) -> AllocationResult<AllocationLine> {
        let mut candidates: Vec<AllocationLine> = self
            .allocation_repo
            .find_by_plan_and_sku(&plan.plan_id, product_sku)?
            .into_iter()
            .filter(|l| l.store_id == store_id)
            .filter(|l| day_part.map_or(true, |dp| l.day_part == dp))
            .collect();

        match candidates.len() {
            0 => Err(AllocationError::not_found(
                "AllocationLine",
                format!("{}/{}/{}", store_id, product_sku, day_part.unwrap_or("*")),
            )),
            1 => Ok(candidates.remove(0)),
            n => Err(AllocationError::InvalidArgument(format!(
                "{}/{} 存在{}个时段, 需指定 day_part",
                store_id, product_sku, n
            ))),
        }
    }
}

fn field_value(line: &AllocationLine, field: AdjustField) -> u32 {
    match field {
        AdjustField::FinalQuantity => line.quantity,
        AdjustField::ManufacturedQuantity => line.effective_manufactured(),
    }
}

fn set_field(line: &mut AllocationLine, field: AdjustField, value: u32) {
    match field {
        AdjustField::FinalQuantity => line.quantity = value,
        AdjustField::ManufacturedQuantity => {
            line.manufactured_quantity = ManufacturedQuantity::Value(value)
        }
    }
}

/// 订货量人工修改: 计划确认 + 产品标记人工覆盖
fn apply_manual_edit(
    write_set: &mut AllocationWriteSet,
    plan: &ProductionPlan,
    state: ProductAllocationState,
    field: AdjustField,
) {
    if field != AdjustField::FinalQuantity {
        return;
    }
    write_set.plan_status = plan.confirmed_status();
    if !state.overridden {
        write_set.product_states.push(mark_overridden(state));
    }
}

fn mark_overridden(mut state: ProductAllocationState) -> ProductAllocationState {
    state.overridden = true;
    state
}

