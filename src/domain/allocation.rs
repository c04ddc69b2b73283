// ==========================================
// 烘焙生产计划系统 - 分配明细领域模型
// ==========================================
// 自然键: (plan_id, store_id, product_sku, day_part)
// 约束: quantity >= 0, manufactured_quantity >= 0
// 约束: 明细不物理删除, 只会被置 0
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ==========================================
// ManufacturedQuantity - 实际生产量
// ==========================================
// Unset 与 Value(0) 含义不同: Unset 时回落为 quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<u32>", into = "Option<u32>")]
pub enum ManufacturedQuantity {
    #[default]
    Unset,
    Value(u32),
}

impl ManufacturedQuantity {
    /// 实际生效值（未录入时等于计划量）
    pub fn effective(&self, planned: u32) -> u32 {
        match self {
            ManufacturedQuantity::Unset => planned,
            ManufacturedQuantity::Value(v) => *v,
        }
    }

    pub fn is_set(&self) -> bool {
        matches!(self, ManufacturedQuantity::Value(_))
    }

    pub fn as_option(&self) -> Option<u32> {
        match self {
            ManufacturedQuantity::Unset => None,
            ManufacturedQuantity::Value(v) => Some(*v),
        }
    }
}

impl From<Option<u32>> for ManufacturedQuantity {
    fn from(value: Option<u32>) -> Self {
        match value {
            Some(v) => ManufacturedQuantity::Value(v),
            None => ManufacturedQuantity::Unset,
        }
    }
}

impl From<ManufacturedQuantity> for Option<u32> {
    fn from(value: ManufacturedQuantity) -> Self {
        value.as_option()
    }
}

// ==========================================
// AllocationKey - 计划内明细键
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AllocationKey {
    pub store_id: String,
    pub product_sku: String,
    pub day_part: String,
}

impl AllocationKey {
    pub fn new(store_id: &str, product_sku: &str, day_part: &str) -> Self {
        Self {
            store_id: store_id.to_string(),
            product_sku: product_sku.to_string(),
            day_part: day_part.to_string(),
        }
    }

    /// 键字段均不能为空
    pub fn is_well_formed(&self) -> bool {
        !self.store_id.trim().is_empty()
            && !self.product_sku.trim().is_empty()
            && !self.day_part.trim().is_empty()
    }
}

impl fmt::Display for AllocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.store_id, self.product_sku, self.day_part)
    }
}

// ==========================================
// AllocationLine - 分配明细
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationLine {
    // ===== 主键与自然键 =====
    pub allocation_id: String,     // 明细ID
    pub plan_id: String,           // 关联计划
    pub store_id: String,          // 门店
    pub product_sku: String,       // 产品SKU
    pub day_part: String,          // 时段

    // ===== 数量 =====
    pub quantity: u32,                                  // 最终订货量
    pub recommended_quantity: u32,                      // 建议量 (初始分配/外部推荐)
    pub manufactured_quantity: ManufacturedQuantity,    // 实际生产量
    pub received_quantity: Option<u32>,                 // 到店签收量 (下游对账使用)

    // ===== 预测参考 (可选) =====
    pub historical_sales: Option<u32>,
    pub predicted_sales: Option<u32>,

    pub updated_at: NaiveDateTime,
}

impl AllocationLine {
    /// 新建明细（生产量未录入）
    pub fn new(plan_id: &str, key: &AllocationKey, quantity: u32, now: NaiveDateTime) -> Self {
        Self {
            allocation_id: uuid::Uuid::new_v4().to_string(),
            plan_id: plan_id.to_string(),
            store_id: key.store_id.clone(),
            product_sku: key.product_sku.clone(),
            day_part: key.day_part.clone(),
            quantity,
            recommended_quantity: quantity,
            manufactured_quantity: ManufacturedQuantity::Unset,
            received_quantity: None,
            historical_sales: None,
            predicted_sales: None,
            updated_at: now,
        }
    }

    pub fn key(&self) -> AllocationKey {
        AllocationKey {
            store_id: self.store_id.clone(),
            product_sku: self.product_sku.clone(),
            day_part: self.day_part.clone(),
        }
    }

    /// 生效的生产量
    pub fn effective_manufactured(&self) -> u32 {
        self.manufactured_quantity.effective(self.quantity)
    }
}

// ==========================================
// AllocationSelection - 批量调整选择集
// ==========================================
// 会话态, 不落库; 批量调整成功后清空
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationSelection {
    keys: BTreeSet<AllocationKey>,
}

impl AllocationSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// 切换选中状态, 返回切换后是否选中
    pub fn toggle(&mut self, key: AllocationKey) -> bool {
        if self.keys.remove(&key) {
            false
        } else {
            self.keys.insert(key);
            true
        }
    }

    pub fn insert(&mut self, key: AllocationKey) {
        self.keys.insert(key);
    }

    pub fn contains(&self, key: &AllocationKey) -> bool {
        self.keys.contains(key)
    }

    pub fn keys(&self) -> &BTreeSet<AllocationKey> {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }
}

impl FromIterator<AllocationKey> for AllocationSelection {
    fn from_iter<T: IntoIterator<Item = AllocationKey>>(iter: T) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}
