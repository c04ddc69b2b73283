use super::AllocationEngine;
use crate::domain::aggregate::{AggregatedAllocation, ProductView, StoreView};
use crate::domain::allocation::AllocationLine;
use crate::domain::plan::ProductionPlan;
use crate::engine::error::AllocationResult;
use crate::engine::projection::PlanProjector;
use chrono::NaiveDate;

impl AllocationEngine {
    // ==========================================
    // 只读视图
    // ==========================================
    // 计划不存在时返回空结果, 不创建计划

    /// 按产品汇总
    pub fn aggregate_by_product(
        &self,
        production_date: NaiveDate,
    ) -> AllocationResult<Vec<AggregatedAllocation>> {
        let lines = self.lines_for_date(production_date)?;
        Ok(PlanProjector::new().aggregate_by_product(&lines))
    }

    /// 按品类汇总
    pub fn aggregate_by_category(
        &self,
        production_date: NaiveDate,
    ) -> AllocationResult<Vec<AggregatedAllocation>> {
        let lines = self.lines_for_date(production_date)?;
        if lines.is_empty() {
            return Ok(Vec::new());
        }
        let catalog = self.catalog.list_products()?;
        Ok(PlanProjector::new().aggregate_by_category(&lines, &catalog))
    }

    /// 按门店投影（含产能区间）
    pub fn project_by_store(&self, production_date: NaiveDate) -> AllocationResult<Vec<StoreView>> {
        let stores = self.catalog.list_stores()?;
        let products = self.catalog.list_products()?;
        let (lines, states) = match self.find_plan(production_date)? {
            Some(plan) => (
                self.allocation_repo.find_by_plan(&plan.plan_id)?,
                self.product_state_repo.find_by_plan(&plan.plan_id)?,
            ),
            None => (Vec::new(), Vec::new()),
        };

        let mut pairs: Vec<(&str, &str)> = Vec::new();
        for store in &stores {
            for product in products.iter().filter(|p| p.is_available_for(store.cluster)) {
                pairs.push((product.sku.as_str(), store.store_id.as_str()));
            }
        }
        for line in &lines {
            pairs.push((line.product_sku.as_str(), line.store_id.as_str()));
        }
        let bounds = self.capacity.bounds_for_pairs(pairs);

        Ok(PlanProjector::new().project_by_store(
            &stores,
            &products,
            &lines,
            &states,
            &bounds,
            &self.config.default_day_part,
        ))
    }

    /// 按产品投影（含门店明细与锁定状态）
    pub fn project_by_product(&self, production_date: NaiveDate) -> AllocationResult<Vec<ProductView>> {
        let Some(plan) = self.find_plan(production_date)? else {
            return Ok(Vec::new());
        };
        let lines = self.allocation_repo.find_by_plan(&plan.plan_id)?;
        let states = self.product_state_repo.find_by_plan(&plan.plan_id)?;
        let products = self.catalog.list_products()?;
        let stores = self.catalog.list_stores()?;
        Ok(PlanProjector::new().project_by_product(&products, &stores, &lines, &states))
    }

    /// 计划明细（可按门店过滤）, 计划不存在时返回 None
    pub fn plan_lines(
        &self,
        production_date: NaiveDate,
        store_id: Option<&str>,
    ) -> AllocationResult<Option<(ProductionPlan, Vec<AllocationLine>)>> {
        let Some(plan) = self.find_plan(production_date)? else {
            return Ok(None);
        };
        let lines = self
            .allocation_repo
            .find_by_plan(&plan.plan_id)?
            .into_iter()
            .filter(|l| store_id.map_or(true, |s| l.store_id == s))
            .collect();
        Ok(Some((plan, lines)))
    }

    fn lines_for_date(&self, production_date: NaiveDate) -> AllocationResult<Vec<AllocationLine>> {
        match self.find_plan(production_date)? {
            Some(plan) => Ok(self.allocation_repo.find_by_plan(&plan.plan_id)?),
            None => Ok(Vec::new()),
        }
    }
}
