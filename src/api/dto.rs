// ==========================================
// 烘焙生产计划系统 - API 请求/响应结构
// ==========================================

use crate::domain::allocation::{AllocationKey, AllocationLine};
use crate::domain::plan::{ProductAllocationState, ProductionPlan};
use serde::{Deserialize, Serialize};

// ==========================================
// 请求
// ==========================================

/// 单行增量调整请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustLineRequest {
    pub store_id: String,
    pub product_sku: String,
    #[serde(default)]
    pub day_part: Option<String>,
    pub field: String,        // final_quantity / manufactured_quantity
    pub delta: i64,
}

/// 汇总视图增量调整请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustProductRequest {
    pub product_sku: String,
    pub field: String,
    pub delta: i64,
}

/// 批量百分比调整请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkAdjustRequest {
    pub keys: Vec<AllocationKey>,
    pub percent: f64,
    pub direction: String,    // increase / decrease
}

/// 自动均分请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoAllocateRequest {
    pub product_sku: String,
    pub total_produced: u32,
    pub store_ids: Vec<String>,
}

/// 门店维护请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreUpsertRequest {
    pub store_id: String,
    pub store_name: String,
    pub cluster: String,
}

/// 产品维护请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductUpsertRequest {
    pub sku: String,
    pub product_name: String,
    pub category: String,
    #[serde(default)]
    pub day_part: Option<String>,
    #[serde(default)]
    pub clusters: Vec<String>,
}

/// 产能区间维护请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapacityBoundRequest {
    pub product_sku: String,
    pub store_id: String,
    #[serde(default)]
    pub min_quantity: u32,
    #[serde(default)]
    pub max_quantity: u32,
}

// ==========================================
// 响应
// ==========================================

/// 计划查询响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanResponse {
    pub plan: ProductionPlan,
    pub lines: Vec<AllocationLine>,
    pub product_states: Vec<ProductAllocationState>,
    pub line_count: usize,
    pub total_quantity: u64,
}
