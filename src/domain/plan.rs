// ==========================================
// 烘焙生产计划系统 - 生产计划领域模型
// ==========================================
// 约束: 每个生产日期仅有一个计划 (production_date 唯一)
// 约束: 计划不删除, 状态单向 pending -> confirmed
// ==========================================

use crate::domain::types::PlanStatus;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// ProductionPlan - 日生产计划
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionPlan {
    pub plan_id: String,             // 计划ID
    pub production_date: NaiveDate,  // 生产日期 (唯一)
    pub status: PlanStatus,          // 状态
    pub seeded: bool,                // 是否已完成初始分配 (与"全部为0"区分)
    pub created_at: NaiveDateTime,   // 创建时间
    pub updated_at: NaiveDateTime,   // 更新时间
}

impl ProductionPlan {
    /// 新建 pending 状态的计划
    pub fn new_pending(production_date: NaiveDate, now: NaiveDateTime) -> Self {
        Self {
            plan_id: uuid::Uuid::new_v4().to_string(),
            production_date,
            status: PlanStatus::Pending,
            seeded: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.status.is_confirmed()
    }

    /// 计算确认后的状态（已确认保持不变）
    pub fn confirmed_status(&self) -> Option<PlanStatus> {
        if self.is_confirmed() {
            None
        } else {
            Some(PlanStatus::Confirmed)
        }
    }
}

// ==========================================
// ProductAllocationState - 计划内单品确认/覆盖状态
// ==========================================
// locked: HQ/生产确认后锁定, 无解锁操作
// overridden: 人工编辑偏离自动分配的审计标记, 重新自动分配时清除
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductAllocationState {
    pub plan_id: String,
    pub product_sku: String,
    pub locked: bool,
    pub overridden: bool,
    pub locked_by: Option<String>,
    pub locked_at: Option<NaiveDateTime>,
}

impl ProductAllocationState {
    /// 未确认、未覆盖的初始状态
    pub fn unconfirmed(plan_id: &str, product_sku: &str) -> Self {
        Self {
            plan_id: plan_id.to_string(),
            product_sku: product_sku.to_string(),
            locked: false,
            overridden: false,
            locked_by: None,
            locked_at: None,
        }
    }
}
