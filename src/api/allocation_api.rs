// ==========================================
// 烘焙生产计划系统 - 生产分配 API
// ==========================================
// 职责: 参数校验 + 调用分配引擎 + 错误映射
// 路由对应:
//   GET   /plans/{date}                         -> get_plan
//   POST  /plans/{date}/seed                    -> seed_plan
//   PATCH /plans/{date}/allocations/{store}/{sku} -> adjust_allocation
//   POST  /plans/{date}/allocations/bulk        -> bulk_adjust
//   POST  /plans/{date}/allocations/{sku}/auto  -> auto_allocate
//   POST  /plans/{date}/allocations/{sku}/confirm -> confirm_product
//   GET   /plans/{date}/by-product|by-category|by-store
// ==========================================

use std::sync::Arc;

use crate::api::dto::{
    AdjustLineRequest, AdjustProductRequest, AutoAllocateRequest, BulkAdjustRequest,
    CapacityBoundRequest, PlanResponse, ProductUpsertRequest, StoreUpsertRequest,
};
use crate::api::error::{ApiError, ApiResult};
use crate::api::export::{build_export_rows, render_csv};
use crate::api::validator::{
    collect_keys, parse_adjust_field, parse_cluster, parse_date, parse_direction,
    require_non_empty,
};
use crate::domain::action_log::ActionLog;
use crate::domain::aggregate::{AggregatedAllocation, ProductView, StoreView};
use crate::domain::allocation::AllocationSelection;
use crate::domain::capacity::CapacityBound;
use crate::domain::catalog::{Product, Store};
use crate::domain::plan::{ProductAllocationState, ProductionPlan};
use crate::domain::types::AdjustDirection;
use crate::engine::{
    AdjustOutcome, AllocationEngine, AutoAllocateOutcome, BulkAdjustOutcome,
    ProductAdjustOutcome, SeedOutcome,
};
use crate::repository::{ActionLogRepository, CapacityBoundRepository, CatalogRepository};

/// 审计日志默认返回条数
pub const DEFAULT_ACTION_LOG_LIMIT: usize = 200;

// ==========================================
// AllocationApi - 生产分配 API
// ==========================================
pub struct AllocationApi {
    engine: Arc<AllocationEngine>,
    catalog_repo: Arc<CatalogRepository>,
    capacity_repo: Arc<CapacityBoundRepository>,
    action_log_repo: Arc<ActionLogRepository>,
}

impl AllocationApi {
    /// 创建新的AllocationApi实例
    pub fn new(
        engine: Arc<AllocationEngine>,
        catalog_repo: Arc<CatalogRepository>,
        capacity_repo: Arc<CapacityBoundRepository>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            engine,
            catalog_repo,
            capacity_repo,
            action_log_repo,
        }
    }

    // ==========================================
    // 计划
    // ==========================================

    /// 查询计划（不存在时创建 pending 计划）
    pub fn get_plan(&self, date: &str) -> ApiResult<PlanResponse> {
        let date = parse_date(date)?;
        let snapshot = self.engine.get_plan_snapshot(date)?;
        let total_quantity = snapshot.lines.iter().map(|l| l.quantity as u64).sum();
        Ok(PlanResponse {
            line_count: snapshot.lines.len(),
            total_quantity,
            plan: snapshot.plan,
            lines: snapshot.lines,
            product_states: snapshot.product_states,
        })
    }

    /// 初始分配（幂等）
    pub fn seed_plan(
        &self,
        date: &str,
        store_ids: Option<Vec<String>>,
        operator: &str,
    ) -> ApiResult<SeedOutcome> {
        let date = parse_date(date)?;
        if let Some(ids) = &store_ids {
            if ids.is_empty() {
                return Err(ApiError::InvalidInput("门店列表不能为空".to_string()));
            }
        }
        Ok(self
            .engine
            .seed_initial_allocations(date, store_ids.as_deref(), operator)?)
    }

    /// 确认计划
    pub fn confirm_plan(&self, date: &str, operator: &str) -> ApiResult<ProductionPlan> {
        let date = parse_date(date)?;
        Ok(self.engine.confirm_plan(date, operator)?)
    }

    // ==========================================
    // 数量调整
    // ==========================================

    /// 单行增量调整
    pub fn adjust_allocation(
        &self,
        date: &str,
        request: AdjustLineRequest,
        operator: &str,
    ) -> ApiResult<AdjustOutcome> {
        let date = parse_date(date)?;
        require_non_empty("门店ID", &request.store_id)?;
        require_non_empty("产品SKU", &request.product_sku)?;
        let field = parse_adjust_field(&request.field)?;

        Ok(self.engine.adjust_line(
            date,
            &request.store_id,
            &request.product_sku,
            request.day_part.as_deref(),
            field,
            request.delta,
            operator,
        )?)
    }

    /// 汇总视图增量调整（按产品跨门店）
    pub fn adjust_product(
        &self,
        date: &str,
        request: AdjustProductRequest,
        operator: &str,
    ) -> ApiResult<ProductAdjustOutcome> {
        let date = parse_date(date)?;
        require_non_empty("产品SKU", &request.product_sku)?;
        let field = parse_adjust_field(&request.field)?;
        Ok(self
            .engine
            .adjust_product(date, &request.product_sku, field, request.delta, operator)?)
    }

    /// 批量百分比调整
    pub fn bulk_adjust(
        &self,
        date: &str,
        request: BulkAdjustRequest,
        operator: &str,
    ) -> ApiResult<BulkAdjustOutcome> {
        let date = parse_date(date)?;
        let direction = parse_direction(&request.direction)?;
        let keys = collect_keys(request.keys)?;
        Ok(self
            .engine
            .bulk_adjust(date, &keys, request.percent, direction, operator)?)
    }

    /// 按会话选择集批量调整, 成功后清空选择集
    pub fn bulk_adjust_selection(
        &self,
        date: &str,
        selection: &mut AllocationSelection,
        percent: f64,
        direction: AdjustDirection,
        operator: &str,
    ) -> ApiResult<BulkAdjustOutcome> {
        let date = parse_date(date)?;
        let outcome = self
            .engine
            .bulk_adjust(date, selection.keys(), percent, direction, operator)?;
        selection.clear();
        Ok(outcome)
    }

    /// 自动均分
    pub fn auto_allocate(
        &self,
        date: &str,
        request: AutoAllocateRequest,
        operator: &str,
    ) -> ApiResult<AutoAllocateOutcome> {
        let date = parse_date(date)?;
        require_non_empty("产品SKU", &request.product_sku)?;
        Ok(self.engine.auto_allocate(
            date,
            &request.product_sku,
            request.total_produced,
            &request.store_ids,
            operator,
        )?)
    }

    /// 确认产品（锁定）
    pub fn confirm_product(
        &self,
        date: &str,
        product_sku: &str,
        operator: &str,
    ) -> ApiResult<ProductAllocationState> {
        let date = parse_date(date)?;
        require_non_empty("产品SKU", product_sku)?;
        Ok(self.engine.confirm_product(date, product_sku, operator)?)
    }

    // ==========================================
    // 视图
    // ==========================================

    pub fn by_product(&self, date: &str) -> ApiResult<Vec<AggregatedAllocation>> {
        let date = parse_date(date)?;
        Ok(self.engine.aggregate_by_product(date)?)
    }

    pub fn by_category(&self, date: &str) -> ApiResult<Vec<AggregatedAllocation>> {
        let date = parse_date(date)?;
        Ok(self.engine.aggregate_by_category(date)?)
    }

    pub fn by_store(&self, date: &str) -> ApiResult<Vec<StoreView>> {
        let date = parse_date(date)?;
        Ok(self.engine.project_by_store(date)?)
    }

    pub fn product_views(&self, date: &str) -> ApiResult<Vec<ProductView>> {
        let date = parse_date(date)?;
        Ok(self.engine.project_by_product(date)?)
    }

    // ==========================================
    // 导出与审计
    // ==========================================

    /// 导出计划明细 CSV
    ///
    /// 指定门店时仅导出该门店, 且不含 Store 列
    pub fn export_csv(&self, date: &str, store_id: Option<&str>) -> ApiResult<String> {
        let parsed = parse_date(date)?;
        if let Some(id) = store_id {
            require_non_empty("门店ID", id)?;
            if self.catalog_repo.find_store(id)?.is_none() {
                return Err(ApiError::NotFound(format!("Store(id={})不存在", id)));
            }
        }

        let (_, lines) = self
            .engine
            .plan_lines(parsed, store_id)?
            .ok_or_else(|| ApiError::NotFound(format!("ProductionPlan(id={})不存在", date)))?;

        let products = self.catalog_repo.list_products()?;
        let stores = self.catalog_repo.list_stores()?;
        let rows = build_export_rows(&lines, &products, &stores);
        tracing::debug!(date = %parsed, rows = rows.len(), "导出CSV");
        render_csv(&rows, store_id.is_none())
    }

    /// 查询计划的审计日志（新到旧）
    pub fn list_action_logs(&self, date: &str, limit: Option<usize>) -> ApiResult<Vec<ActionLog>> {
        let parsed = parse_date(date)?;
        let Some(plan) = self.engine.find_plan(parsed)? else {
            return Ok(Vec::new());
        };
        let limit = limit.unwrap_or(DEFAULT_ACTION_LOG_LIMIT).max(1);
        Ok(self.action_log_repo.find_by_plan(&plan.plan_id, limit)?)
    }

    // ==========================================
    // 目录与产能维护
    // ==========================================

    pub fn upsert_store(&self, request: StoreUpsertRequest) -> ApiResult<Store> {
        require_non_empty("门店ID", &request.store_id)?;
        require_non_empty("门店名称", &request.store_name)?;
        let store = Store {
            store_id: request.store_id.trim().to_string(),
            store_name: request.store_name.trim().to_string(),
            cluster: parse_cluster(&request.cluster)?,
        };
        self.catalog_repo.upsert_store(&store)?;
        Ok(store)
    }

    pub fn upsert_product(&self, request: ProductUpsertRequest) -> ApiResult<Product> {
        require_non_empty("产品SKU", &request.sku)?;
        require_non_empty("产品名称", &request.product_name)?;
        let mut clusters = Vec::with_capacity(request.clusters.len());
        for raw in &request.clusters {
            let cluster = parse_cluster(raw)?;
            if !clusters.contains(&cluster) {
                clusters.push(cluster);
            }
        }
        let category = request.category.trim();
        let product = Product {
            sku: request.sku.trim().to_string(),
            product_name: request.product_name.trim().to_string(),
            category: if category.is_empty() {
                crate::domain::aggregate::UNCATEGORIZED.to_string()
            } else {
                category.to_string()
            },
            day_part: request
                .day_part
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            clusters,
        };
        self.catalog_repo.upsert_product(&product)?;
        Ok(product)
    }

    pub fn upsert_capacity_bound(&self, request: CapacityBoundRequest) -> ApiResult<CapacityBound> {
        require_non_empty("产品SKU", &request.product_sku)?;
        require_non_empty("门店ID", &request.store_id)?;
        if request.max_quantity > 0 && request.min_quantity > request.max_quantity {
            return Err(ApiError::InvalidInput(format!(
                "产能下限({})不能大于上限({})",
                request.min_quantity, request.max_quantity
            )));
        }
        let bound = CapacityBound {
            product_sku: request.product_sku.trim().to_string(),
            store_id: request.store_id.trim().to_string(),
            min_quantity: request.min_quantity,
            max_quantity: request.max_quantity,
        };
        self.capacity_repo.upsert(&bound)?;
        Ok(bound)
    }
}
