// ==========================================
// 烘焙生产计划系统 - 引擎外部协作接口
// ==========================================
// 职责: 目录查询、产能查询、预测量生成策略
// 说明: Engine 层定义 trait, 仓储/调用方提供实现
// ==========================================

use crate::domain::capacity::CapacityBound;
use crate::domain::catalog::{Product, Store};
use crate::domain::types::StoreCluster;
use crate::repository::capacity_repo::CapacityBoundRepository;
use crate::repository::catalog_repo::CatalogRepository;
use crate::repository::error::RepositoryResult;
use chrono::NaiveDate;

// ==========================================
// CatalogLookup - 门店/产品目录查询
// ==========================================
pub trait CatalogLookup: Send + Sync {
    /// 全部门店（按门店名称稳定排序）
    fn list_stores(&self) -> RepositoryResult<Vec<Store>>;

    /// 全部产品（按SKU稳定排序）
    fn list_products(&self) -> RepositoryResult<Vec<Product>>;

    fn find_store(&self, store_id: &str) -> RepositoryResult<Option<Store>>;

    fn find_product(&self, sku: &str) -> RepositoryResult<Option<Product>>;

    /// 集群范围内的产品
    fn products_for_cluster(&self, cluster: StoreCluster) -> RepositoryResult<Vec<Product>> {
        Ok(self
            .list_products()?
            .into_iter()
            .filter(|p| p.is_available_for(cluster))
            .collect())
    }
}

impl CatalogLookup for CatalogRepository {
    fn list_stores(&self) -> RepositoryResult<Vec<Store>> {
        CatalogRepository::list_stores(self)
    }

    fn list_products(&self) -> RepositoryResult<Vec<Product>> {
        CatalogRepository::list_products(self)
    }

    fn find_store(&self, store_id: &str) -> RepositoryResult<Option<Store>> {
        CatalogRepository::find_store(self, store_id)
    }

    fn find_product(&self, sku: &str) -> RepositoryResult<Option<Product>> {
        CatalogRepository::find_product(self, sku)
    }
}

// ==========================================
// CapacityLookup - 产能区间查询
// ==========================================
pub trait CapacityLookup: Send + Sync {
    /// 未配置时返回 Ok(None)
    fn capacity_bound(&self, product_sku: &str, store_id: &str)
        -> RepositoryResult<Option<CapacityBound>>;
}

impl CapacityLookup for CapacityBoundRepository {
    fn capacity_bound(
        &self,
        product_sku: &str,
        store_id: &str,
    ) -> RepositoryResult<Option<CapacityBound>> {
        self.find(product_sku, store_id)
    }
}

// ==========================================
// ForecastStrategy - 初始分配数量生成策略
// ==========================================
// 数量由外部提供 (预测/推荐), 本引擎不计算

/// 单行初始分配的预测值
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedForecast {
    pub quantity: u32,
    pub historical_sales: Option<u32>,
    pub predicted_sales: Option<u32>,
}

pub trait ForecastStrategy: Send + Sync {
    fn forecast(&self, production_date: NaiveDate, store: &Store, product: &Product) -> SeedForecast;
}

/// 固定基数策略: 每个门店/产品使用相同的基础数量
#[derive(Debug, Clone, Copy)]
pub struct FixedBaseForecast {
    pub base_quantity: u32,
}

impl FixedBaseForecast {
    pub fn new(base_quantity: u32) -> Self {
        Self { base_quantity }
    }
}

impl ForecastStrategy for FixedBaseForecast {
    fn forecast(&self, _production_date: NaiveDate, _store: &Store, _product: &Product) -> SeedForecast {
        SeedForecast {
            quantity: self.base_quantity,
            historical_sales: None,
            predicted_sales: None,
        }
    }
}
