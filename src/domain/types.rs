// ==========================================
// 烘焙生产计划系统 - 领域类型定义
// ==========================================
// 职责: 计划状态、门店集群、调整字段等枚举
// 约定: to_db_str 为数据库存储值, Display 与之保持一致
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 计划状态 (Plan Status)
// ==========================================
// 单向: pending -> confirmed, 同一天内不回退
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Pending,   // 待确认
    Confirmed, // 已确认
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl PlanStatus {
    /// 从数据库字符串解析状态（未知值按 pending 处理）
    pub fn from_db_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "confirmed" => PlanStatus::Confirmed,
            _ => PlanStatus::Pending,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            PlanStatus::Pending => "pending",
            PlanStatus::Confirmed => "confirmed",
        }
    }

    pub fn is_confirmed(&self) -> bool {
        *self == PlanStatus::Confirmed
    }
}

// ==========================================
// 门店集群 (Store Cluster)
// ==========================================
// 决定门店的产品范围
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreCluster {
    TransportHub,     // 交通枢纽
    BusinessDistrict, // 商务区
    Residential,      // 住宅区
    HighStreet,       // 商业街
}

impl fmt::Display for StoreCluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl StoreCluster {
    /// 全部集群（固定集合）
    pub const ALL: [StoreCluster; 4] = [
        StoreCluster::TransportHub,
        StoreCluster::BusinessDistrict,
        StoreCluster::Residential,
        StoreCluster::HighStreet,
    ];

    /// 从字符串解析集群，未知值返回 None
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "transport_hub" => Some(StoreCluster::TransportHub),
            "business_district" => Some(StoreCluster::BusinessDistrict),
            "residential" => Some(StoreCluster::Residential),
            "high_street" => Some(StoreCluster::HighStreet),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            StoreCluster::TransportHub => "transport_hub",
            StoreCluster::BusinessDistrict => "business_district",
            StoreCluster::Residential => "residential",
            StoreCluster::HighStreet => "high_street",
        }
    }
}

// ==========================================
// 调整字段 (Adjust Field)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustField {
    FinalQuantity,        // 最终订货量 (quantity)
    ManufacturedQuantity, // 实际生产量
}

impl fmt::Display for AdjustField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdjustField::FinalQuantity => write!(f, "final_quantity"),
            AdjustField::ManufacturedQuantity => write!(f, "manufactured_quantity"),
        }
    }
}

// ==========================================
// 批量调整方向 (Adjust Direction)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustDirection {
    Increase, // 上调
    Decrease, // 下调
}

impl fmt::Display for AdjustDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdjustDirection::Increase => write!(f, "increase"),
            AdjustDirection::Decrease => write!(f, "decrease"),
        }
    }
}

// ==========================================
// 产能状态 (Capacity Status)
// ==========================================
// 仅用于展示/提示, advisory 模式下不阻断写入
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CapacityStatus {
    Unconstrained, // 未配置上限 (max=0)
    WithinBounds,  // 区间内
    BelowMinimum,  // 低于下限
    AtCapacity,    // 恰好达到上限
    OverCapacity,  // 超出上限
}

impl fmt::Display for CapacityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapacityStatus::Unconstrained => write!(f, "UNCONSTRAINED"),
            CapacityStatus::WithinBounds => write!(f, "WITHIN_BOUNDS"),
            CapacityStatus::BelowMinimum => write!(f, "BELOW_MINIMUM"),
            CapacityStatus::AtCapacity => write!(f, "AT_CAPACITY"),
            CapacityStatus::OverCapacity => write!(f, "OVER_CAPACITY"),
        }
    }
}

impl CapacityStatus {
    /// 是否需要向调用方提示"已达产能"
    pub fn is_at_or_over(&self) -> bool {
        matches!(self, CapacityStatus::AtCapacity | CapacityStatus::OverCapacity)
    }
}

// ==========================================
// 产能约束模式 (Capacity Enforcement)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityEnforcement {
    Advisory, // 仅提示
    Strict,   // 超上限拒绝写入
}

impl CapacityEnforcement {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "advisory" => Some(CapacityEnforcement::Advisory),
            "strict" => Some(CapacityEnforcement::Strict),
            _ => None,
        }
    }
}

// ==========================================
// 汇总视图增量分摊方式 (Distribution Mode)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionMode {
    ApplyToAll,          // 每行施加相同增量
    SplitProportionally, // 按当前数量比例拆分
}

impl DistributionMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "apply_to_all" => Some(DistributionMode::ApplyToAll),
            "split_proportionally" => Some(DistributionMode::SplitProportionally),
            _ => None,
        }
    }
}
