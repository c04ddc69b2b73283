// ==========================================
// 烘焙生产计划系统 - 操作日志领域模型
// ==========================================
// 红线: 所有写入必须记录, 且与业务写入同事务
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

// ==========================================
// ActionLog - 操作日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,               // 日志ID
    pub plan_id: Option<String>,         // 关联计划
    pub action_type: String,             // 操作类型 (ActionType::as_str)
    pub action_ts: NaiveDateTime,        // 操作时间
    pub actor: String,                   // 操作人
    pub payload_json: Option<JsonValue>, // 操作参数
    pub detail: Option<String>,          // 描述
}

impl ActionLog {
    /// 构造一条日志（操作人为空时记为 system）
    pub fn new(
        plan_id: &str,
        action_type: ActionType,
        actor: &str,
        payload: JsonValue,
        detail: String,
        now: NaiveDateTime,
    ) -> Self {
        let actor = if actor.trim().is_empty() { "system" } else { actor.trim() };
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            plan_id: Some(plan_id.to_string()),
            action_type: action_type.as_str().to_string(),
            action_ts: now,
            actor: actor.to_string(),
            payload_json: Some(payload),
            detail: Some(detail),
        }
    }
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    Seed,           // 初始分配
    AdjustLine,     // 单行增量调整
    AdjustProduct,  // 汇总视图增量调整
    BulkAdjust,     // 批量百分比调整
    AutoAllocate,   // 自动均分
    ConfirmProduct, // 单品确认锁定
    ConfirmPlan,    // 计划确认
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Seed => "SEED",
            ActionType::AdjustLine => "ADJUST_LINE",
            ActionType::AdjustProduct => "ADJUST_PRODUCT",
            ActionType::BulkAdjust => "BULK_ADJUST",
            ActionType::AutoAllocate => "AUTO_ALLOCATE",
            ActionType::ConfirmProduct => "CONFIRM_PRODUCT",
            ActionType::ConfirmPlan => "CONFIRM_PLAN",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
