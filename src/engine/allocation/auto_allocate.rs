use super::{acquire, now, plan_lock_key, AllocationEngine, AutoAllocateOutcome};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::allocation::{AllocationKey, AllocationLine};
use crate::engine::distribution::even_split;
use crate::engine::error::{AllocationError, AllocationResult};
use crate::repository::AllocationWriteSet;
use chrono::NaiveDate;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use tracing::instrument;

impl AllocationEngine {
    // ==========================================
    // 自动均分
    // ==========================================

    /// 将产品总产量在门店间均分
    ///
    /// # 规则
    /// - base = total / n, 前 total % n 个门店（按调用方顺序）得到 base + 1
    /// - 结果之和严格等于 total
    /// - 完全替换该产品在计划内的分配: 列表外门店的明细清零
    /// - 清除产品的人工覆盖标记, 不改变计划状态
    #[instrument(skip(self, store_ids), fields(production_date = %production_date, product_sku = %product_sku, store_count = store_ids.len()))]
    pub fn auto_allocate(
        &self,
        production_date: NaiveDate,
        product_sku: &str,
        total_produced: u32,
        store_ids: &[String],
        operator: &str,
    ) -> AllocationResult<AutoAllocateOutcome> {
        if product_sku.trim().is_empty() {
            return Err(AllocationError::InvalidArgument("产品SKU不能为空".to_string()));
        }
        if store_ids.is_empty() {
            return Err(AllocationError::InvalidArgument("门店列表不能为空".to_string()));
        }
        let mut seen = HashSet::with_capacity(store_ids.len());
        for id in store_ids {
            if id.trim().is_empty() {
                return Err(AllocationError::InvalidArgument("门店ID不能为空".to_string()));
            }
            if !seen.insert(id.as_str()) {
                return Err(AllocationError::InvalidArgument(format!("门店重复: {}", id)));
            }
        }

        let product = self
            .catalog
            .find_product(product_sku)?
            .ok_or_else(|| AllocationError::not_found("Product", product_sku))?;
        for id in store_ids {
            if self.catalog.find_store(id)?.is_none() {
                return Err(AllocationError::not_found("Store", id.clone()));
            }
        }
        let day_part = product.day_part_or(&self.config.default_day_part).to_string();

        let lock = self.plan_locks.lock_for(&plan_lock_key(production_date))?;
        let _guard = acquire(&lock)?;

        let plan = self.resolve_plan_locked(production_date)?;
        let mut state = self.ensure_unlocked(&plan.plan_id, product_sku)?;

        let mut existing: HashMap<AllocationKey, AllocationLine> = self
            .allocation_repo
            .find_by_plan_and_sku(&plan.plan_id, product_sku)?
            .into_iter()
            .map(|l| (l.key(), l))
            .collect();

        let timestamp = now();
        let shares = even_split(total_produced, store_ids.len());

        let mut allocations = Vec::with_capacity(store_ids.len());
        for (store_id, share) in store_ids.iter().zip(shares.iter().copied()) {
            let key = AllocationKey::new(store_id, product_sku, &day_part);
            let line = match existing.remove(&key) {
                Some(mut line) => {
                    line.quantity = share;
                    line.updated_at = timestamp;
                    line
                }
                None => AllocationLine::new(&plan.plan_id, &key, share, timestamp),
            };
            allocations.push(line);
        }

        // 列表外的明细清零（不删除）
        let mut zeroed: Vec<AllocationLine> = existing
            .into_values()
            .filter(|l| l.quantity > 0)
            .map(|mut l| {
                l.quantity = 0;
                l.updated_at = timestamp;
                l
            })
            .collect();
        zeroed.sort_by(|a, b| a.key().cmp(&b.key()));

        let mut write_set = AllocationWriteSet::new(&plan.plan_id, timestamp);
        if state.overridden {
            state.overridden = false;
            write_set.product_states.push(state);
        }
        write_set.action_log = Some(ActionLog::new(
            &plan.plan_id,
            ActionType::AutoAllocate,
            operator,
            json!({
                "product_sku": product_sku,
                "total_produced": total_produced,
                "store_ids": store_ids,
                "quantities": shares,
                "zeroed": zeroed.len(),
            }),
            format!(
                "{} 自动均分 {} 到 {}个门店",
                product_sku,
                total_produced,
                store_ids.len()
            ),
            timestamp,
        ));
        write_set.lines = allocations.iter().chain(zeroed.iter()).cloned().collect();

        let mut stored = self.allocation_repo.commit(&write_set)?;
        let zeroed = stored.split_off(allocations.len());
        let allocations = stored;

        tracing::info!(
            plan_id = %plan.plan_id,
            stores = allocations.len(),
            zeroed = zeroed.len(),
            "自动均分完成"
        );

        Ok(AutoAllocateOutcome {
            product_sku: product_sku.to_string(),
            total_produced,
            allocations,
            zeroed,
            plan_status: plan.status,
        })
    }
}
