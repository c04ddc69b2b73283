// ==========================================
// 烘焙生产计划系统 - 门店/产品目录
// ==========================================
// 外部目录的本地镜像, 引擎只读
// ==========================================

use crate::domain::types::StoreCluster;
use serde::{Deserialize, Serialize};

// ==========================================
// Store - 门店
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    pub store_id: String,      // 门店ID
    pub store_name: String,    // 门店名称
    pub cluster: StoreCluster, // 门店集群
}

// ==========================================
// Product - 产品
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub sku: String,                  // SKU
    pub product_name: String,         // 产品名称
    pub category: String,             // 品类
    pub day_part: Option<String>,     // 所属时段 (缺省时取配置)
    pub clusters: Vec<StoreCluster>,  // 可售集群
}

impl Product {
    /// 产品是否在该集群的供货范围内
    pub fn is_available_for(&self, cluster: StoreCluster) -> bool {
        self.clusters.contains(&cluster)
    }

    /// 产品时段, 为空时使用默认时段
    pub fn day_part_or<'a>(&'a self, default_day_part: &'a str) -> &'a str {
        match self.day_part.as_deref().map(str::trim) {
            Some(dp) if !dp.is_empty() => dp,
            _ => default_day_part,
        }
    }
}
