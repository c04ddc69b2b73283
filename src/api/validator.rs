// ==========================================
// 烘焙生产计划系统 - 请求参数校验
// ==========================================
// 职责: 日期/字段/方向/集群解析, 明细键校验
// 规则: 校验失败返回 InvalidInput, 不做静默修正
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::allocation::AllocationKey;
use crate::domain::types::{AdjustDirection, AdjustField, StoreCluster};
use chrono::NaiveDate;
use std::collections::BTreeSet;

/// 日期格式
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// 解析日期字符串（YYYY-MM-DD）
pub fn parse_date(date_str: &str) -> ApiResult<NaiveDate> {
    NaiveDate::parse_from_str(date_str.trim(), DATE_FORMAT).map_err(|e| {
        ApiError::InvalidInput(format!("日期格式错误（应为YYYY-MM-DD）: {} ({})", date_str, e))
    })
}

/// 非空校验
pub fn require_non_empty(field: &str, value: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::InvalidInput(format!("{}不能为空", field)));
    }
    Ok(())
}

/// 解析调整字段
///
/// 接受 final_quantity / finalQuantity / quantity 与 manufactured_quantity / manufacturedQuantity
pub fn parse_adjust_field(value: &str) -> ApiResult<AdjustField> {
    match value.trim() {
        "final_quantity" | "finalQuantity" | "quantity" => Ok(AdjustField::FinalQuantity),
        "manufactured_quantity" | "manufacturedQuantity" => Ok(AdjustField::ManufacturedQuantity),
        other => Err(ApiError::InvalidInput(format!("未知的调整字段: {}", other))),
    }
}

/// 解析调整方向
pub fn parse_direction(value: &str) -> ApiResult<AdjustDirection> {
    match value.trim().to_lowercase().as_str() {
        "increase" => Ok(AdjustDirection::Increase),
        "decrease" => Ok(AdjustDirection::Decrease),
        other => Err(ApiError::InvalidInput(format!("未知的调整方向: {}", other))),
    }
}

/// 解析门店集群
pub fn parse_cluster(value: &str) -> ApiResult<StoreCluster> {
    StoreCluster::parse(value)
        .ok_or_else(|| ApiError::InvalidInput(format!("未知的门店集群: {}", value)))
}

/// 校验并收集明细键
///
/// 键为空或任一分量为空时返回 InvalidInput
pub fn collect_keys(keys: Vec<AllocationKey>) -> ApiResult<BTreeSet<AllocationKey>> {
    if keys.is_empty() {
        return Err(ApiError::InvalidInput("未选择任何明细".to_string()));
    }
    let mut set = BTreeSet::new();
    for key in keys {
        if !key.is_well_formed() {
            return Err(ApiError::InvalidInput(format!("明细键格式错误: {}", key)));
        }
        set.insert(key);
    }
    Ok(set)
}
