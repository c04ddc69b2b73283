use super::{acquire, now, plan_lock_key, AllocationEngine, SeedOutcome};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::allocation::{AllocationKey, AllocationLine};
use crate::domain::catalog::Store;
use crate::engine::error::{AllocationError, AllocationResult};
use crate::repository::AllocationWriteSet;
use chrono::NaiveDate;
use serde_json::json;
use std::collections::HashSet;
use tracing::instrument;

impl AllocationEngine {
    // ==========================================
    // 初始分配
    // ==========================================

    /// 为尚无明细的门店生成初始分配
    ///
    /// # 参数
    /// - `store_ids`: 指定门店; None 表示目录内全部门店
    ///
    /// # 规则
    /// - 每个门店按集群范围生成每个产品一条明细, 数量来自 ForecastStrategy
    /// - 已有明细的门店跳过（不覆盖人工归零的明细）
    /// - 未指定门店且计划已初始分配过时直接返回已有明细
    /// - 全部新明细与 seeded 标记同事务提交
    #[instrument(skip(self, store_ids), fields(production_date = %production_date))]
    pub fn seed_initial_allocations(
        &self,
        production_date: NaiveDate,
        store_ids: Option<&[String]>,
        operator: &str,
    ) -> AllocationResult<SeedOutcome> {
        let lock = self.plan_locks.lock_for(&plan_lock_key(production_date))?;
        let _guard = acquire(&lock)?;

        let plan = self.resolve_plan_locked(production_date)?;

        if store_ids.is_none() && plan.seeded {
            tracing::debug!(plan_id = %plan.plan_id, "计划已初始分配, 返回已有明细");
            let lines = self.allocation_repo.find_by_plan(&plan.plan_id)?;
            return Ok(SeedOutcome {
                plan,
                created: Vec::new(),
                lines,
                skipped_store_ids: Vec::new(),
            });
        }

        let stores = self.resolve_seed_stores(store_ids)?;
        let stores_with_lines: HashSet<String> = self
            .allocation_repo
            .find_store_ids_with_lines(&plan.plan_id)?
            .into_iter()
            .collect();

        let timestamp = now();
        let mut new_lines = Vec::new();
        let mut seeded_store_ids = Vec::new();
        let mut skipped_store_ids = Vec::new();

        for store in &stores {
            if stores_with_lines.contains(&store.store_id) {
                skipped_store_ids.push(store.store_id.clone());
                continue;
            }
            let products = self.catalog.products_for_cluster(store.cluster)?;
            for product in &products {
                let forecast = self.forecast.forecast(production_date, store, product);
                let key = AllocationKey::new(
                    &store.store_id,
                    &product.sku,
                    product.day_part_or(&self.config.default_day_part),
                );
                let mut line = AllocationLine::new(&plan.plan_id, &key, forecast.quantity, timestamp);
                line.historical_sales = forecast.historical_sales;
                line.predicted_sales = forecast.predicted_sales;
                new_lines.push(line);
            }
            seeded_store_ids.push(store.store_id.clone());
        }

        if new_lines.is_empty() {
            tracing::info!(
                plan_id = %plan.plan_id,
                skipped = skipped_store_ids.len(),
                "无需生成初始分配"
            );
            let lines = self.allocation_repo.find_by_plan(&plan.plan_id)?;
            return Ok(SeedOutcome {
                plan,
                created: Vec::new(),
                lines,
                skipped_store_ids,
            });
        }

        let mut write_set = AllocationWriteSet::new(&plan.plan_id, timestamp);
        write_set.mark_seeded = true;
        write_set.action_log = Some(ActionLog::new(
            &plan.plan_id,
            ActionType::Seed,
            operator,
            json!({
                "production_date": production_date.to_string(),
                "store_ids": seeded_store_ids,
                "line_count": new_lines.len(),
            }),
            format!("初始分配: {}个门店, {}条明细", seeded_store_ids.len(), new_lines.len()),
            timestamp,
        ));
        write_set.lines = new_lines;

        let created = self.allocation_repo.commit(&write_set)?;
        tracing::info!(
            plan_id = %plan.plan_id,
            stores = seeded_store_ids.len(),
            lines = created.len(),
            "初始分配完成"
        );

        let plan = self.require_plan(production_date)?;
        let lines = self.allocation_repo.find_by_plan(&plan.plan_id)?;
        Ok(SeedOutcome {
            plan,
            created,
            lines,
            skipped_store_ids,
        })
    }

    fn resolve_seed_stores(&self, store_ids: Option<&[String]>) -> AllocationResult<Vec<Store>> {
        let Some(ids) = store_ids else {
            return Ok(self.catalog.list_stores()?);
        };

        let mut seen = HashSet::new();
        let mut stores = Vec::with_capacity(ids.len());
        for id in ids {
            if !seen.insert(id.as_str()) {
                continue;
            }
            let store = self
                .catalog
                .find_store(id)?
                .ok_or_else(|| AllocationError::not_found("Store", id.clone()))?;
            stores.push(store);
        }
        Ok(stores)
    }
}
