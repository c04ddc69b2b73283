// ==========================================
// 烘焙生产计划系统 - 汇总与投影视图
// ==========================================
// 读时计算, 不落库
// ==========================================

use crate::domain::types::{CapacityStatus, StoreCluster};
use serde::{Deserialize, Serialize};

/// 汇总行使用的占位门店ID（非真实门店）
pub const AGGREGATE_STORE_ID: &str = "ALL_STORES";

/// 目录中找不到产品时的品类
pub const UNCATEGORIZED: &str = "uncategorized";

// ==========================================
// AggregatedAllocation - 按产品/品类汇总
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedAllocation {
    pub group_key: String,             // 分组键 (SKU 或品类)
    pub store_id: String,              // 占位门店 AGGREGATE_STORE_ID
    pub planned_quantity: u64,         // 计划量合计
    pub manufactured_quantity: u64,    // 生产量合计 (未录入按计划量)
    pub historical_sales: Option<u64>, // 历史销量合计 (任一行有值才有)
    pub predicted_sales: Option<u64>,  // 预测销量合计
    pub line_count: usize,             // 参与汇总的明细数
}

impl AggregatedAllocation {
    pub fn empty(group_key: &str) -> Self {
        Self {
            group_key: group_key.to_string(),
            store_id: AGGREGATE_STORE_ID.to_string(),
            planned_quantity: 0,
            manufactured_quantity: 0,
            historical_sales: None,
            predicted_sales: None,
            line_count: 0,
        }
    }
}

// ==========================================
// StoreView - 按门店视图
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreView {
    pub store_id: String,
    pub store_name: String,
    pub cluster: StoreCluster,
    pub items: Vec<StoreViewItem>,
    pub total_quantity: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreViewItem {
    pub product_sku: String,
    pub product_name: String,
    pub category: String,
    pub day_part: String,
    pub has_line: bool,                     // 是否已有分配明细
    pub quantity: u32,
    pub recommended_quantity: u32,
    pub manufactured_quantity: u32,         // 生效值
    pub manufactured_recorded: bool,        // 是否显式录入
    pub received_quantity: Option<u32>,
    pub locked: bool,
    pub capacity_min: u32,
    pub capacity_max: u32,
    pub capacity_status: CapacityStatus,
}

// ==========================================
// ProductView - 按产品视图 (含门店明细)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductView {
    pub product_sku: String,
    pub product_name: String,
    pub category: String,
    pub locked: bool,
    pub overridden: bool,
    pub planned_quantity: u64,
    pub manufactured_quantity: u64,
    pub stores: Vec<ProductStoreAllocation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductStoreAllocation {
    pub store_id: String,
    pub store_name: String,
    pub day_part: String,
    pub quantity: u32,
    pub manufactured_quantity: u32,
}
