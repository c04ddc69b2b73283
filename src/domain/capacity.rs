// ==========================================
// 烘焙生产计划系统 - 产能区间
// ==========================================
// (product_sku, store_id) -> {min, max}
// 缺失时为 {0, 0}, 表示未配置/不约束
// ==========================================

use crate::domain::types::CapacityStatus;
use serde::{Deserialize, Serialize};

// ==========================================
// CapacityBound - 产能上下限
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityBound {
    pub product_sku: String,
    pub store_id: String,
    pub min_quantity: u32,
    pub max_quantity: u32,
}

impl CapacityBound {
    /// 未配置时的默认区间 {0, 0}
    pub fn unset(product_sku: &str, store_id: &str) -> Self {
        Self {
            product_sku: product_sku.to_string(),
            store_id: store_id.to_string(),
            min_quantity: 0,
            max_quantity: 0,
        }
    }

    /// max > 0 才构成上限约束
    pub fn is_constrained(&self) -> bool {
        self.max_quantity > 0
    }

    /// 评估数量相对区间的位置
    pub fn status_of(&self, quantity: u32) -> CapacityStatus {
        if !self.is_constrained() {
            return CapacityStatus::Unconstrained;
        }
        if quantity > self.max_quantity {
            CapacityStatus::OverCapacity
        } else if quantity == self.max_quantity {
            CapacityStatus::AtCapacity
        } else if quantity < self.min_quantity {
            CapacityStatus::BelowMinimum
        } else {
            CapacityStatus::WithinBounds
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_bound_is_unconstrained() {
        let bound = CapacityBound::unset("BAGEL", "S1");
        assert_eq!(bound.status_of(10_000), CapacityStatus::Unconstrained);
    }

    #[test]
    fn test_status_of() {
        let bound = CapacityBound {
            product_sku: "BAGEL".to_string(),
            store_id: "S1".to_string(),
            min_quantity: 5,
            max_quantity: 30,
        };
        assert_eq!(bound.status_of(2), CapacityStatus::BelowMinimum);
        assert_eq!(bound.status_of(5), CapacityStatus::WithinBounds);
        assert_eq!(bound.status_of(30), CapacityStatus::AtCapacity);
        assert_eq!(bound.status_of(31), CapacityStatus::OverCapacity);
    }
}
