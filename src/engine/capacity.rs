// ==========================================
// 烘焙生产计划系统 - 产能评估
// ==========================================
// 职责: 查询产能区间并评估数量位置
// 规则: 查询失败/缺失降级为 {0,0}, 不中断读取
// 规则: advisory 模式只提示, strict 模式由引擎拒绝超上限写入
// ==========================================

use crate::domain::capacity::CapacityBound;
use crate::domain::types::CapacityStatus;
use crate::engine::ports::CapacityLookup;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// 单行产能评估结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityAssessment {
    pub product_sku: String,
    pub store_id: String,
    pub quantity: u32,
    pub min_quantity: u32,
    pub max_quantity: u32,
    pub status: CapacityStatus,
}

impl CapacityAssessment {
    pub fn is_at_capacity(&self) -> bool {
        self.status.is_at_or_over()
    }
}

// ==========================================
// CapacityEvaluator - 产能评估器
// ==========================================
pub struct CapacityEvaluator {
    lookup: Arc<dyn CapacityLookup>,
}

impl CapacityEvaluator {
    pub fn new(lookup: Arc<dyn CapacityLookup>) -> Self {
        Self { lookup }
    }

    /// 查询产能区间, 失败或缺失时返回 {0,0}
    pub fn bound_for(&self, product_sku: &str, store_id: &str) -> CapacityBound {
        match self.lookup.capacity_bound(product_sku, store_id) {
            Ok(Some(bound)) => bound,
            Ok(None) => CapacityBound::unset(product_sku, store_id),
            Err(e) => {
                tracing::warn!(
                    "产能区间查询失败, 按未配置处理: sku={}, store={}, error={}",
                    product_sku,
                    store_id,
                    e
                );
                CapacityBound::unset(product_sku, store_id)
            }
        }
    }

    /// 评估数量
    pub fn assess(&self, product_sku: &str, store_id: &str, quantity: u32) -> CapacityAssessment {
        let bound = self.bound_for(product_sku, store_id);
        assess_against(&bound, quantity)
    }

    /// 批量查询 (sku, store) 的产能区间
    pub fn bounds_for_pairs<'a, I>(&self, pairs: I) -> HashMap<(String, String), CapacityBound>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut map = HashMap::new();
        for (sku, store_id) in pairs {
            let key = (sku.to_string(), store_id.to_string());
            if !map.contains_key(&key) {
                map.insert(key, self.bound_for(sku, store_id));
            }
        }
        map
    }
}

/// 按给定区间评估数量
pub fn assess_against(bound: &CapacityBound, quantity: u32) -> CapacityAssessment {
    CapacityAssessment {
        product_sku: bound.product_sku.clone(),
        store_id: bound.store_id.clone(),
        quantity,
        min_quantity: bound.min_quantity,
        max_quantity: bound.max_quantity,
        status: bound.status_of(quantity),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::error::{RepositoryError, RepositoryResult};

    struct FailingLookup;

    impl CapacityLookup for FailingLookup {
        fn capacity_bound(&self, _: &str, _: &str) -> RepositoryResult<Option<CapacityBound>> {
            Err(RepositoryError::DatabaseQueryError("connection reset".to_string()))
        }
    }

    struct FixedLookup(CapacityBound);

    impl CapacityLookup for FixedLookup {
        fn capacity_bound(&self, _: &str, _: &str) -> RepositoryResult<Option<CapacityBound>> {
            Ok(Some(self.0.clone()))
        }
    }

    #[test]
    fn test_lookup_failure_degrades_to_unset() {
        let evaluator = CapacityEvaluator::new(Arc::new(FailingLookup));
        let assessment = evaluator.assess("BAGEL", "S1", 500);
        assert_eq!(assessment.max_quantity, 0);
        assert_eq!(assessment.status, CapacityStatus::Unconstrained);
    }

    #[test]
    fn test_assess_at_capacity() {
        let evaluator = CapacityEvaluator::new(Arc::new(FixedLookup(CapacityBound {
            product_sku: "BAGEL".to_string(),
            store_id: "S1".to_string(),
            min_quantity: 0,
            max_quantity: 25,
        })));
        assert!(evaluator.assess("BAGEL", "S1", 25).is_at_capacity());
        assert!(!evaluator.assess("BAGEL", "S1", 24).is_at_capacity());
    }
}
