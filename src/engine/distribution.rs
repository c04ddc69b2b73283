// ==========================================
// 烘焙生产计划系统 - 数量分配算法
// ==========================================
// 职责: 均分、增量钳制、百分比缩放、汇总增量分摊
// 红线: 数量为整数单位, 不出现负数
// ==========================================

use crate::domain::types::{AdjustDirection, DistributionMode};

/// 批量调整百分比允许范围（闭区间）
pub const MIN_BULK_PERCENT: f64 = 1.0;
pub const MAX_BULK_PERCENT: f64 = 100.0;

// ==========================================
// 均分 (自动分配)
// ==========================================

/// 将 total 尽量平均地拆给 n 个门店
///
/// base = total / n, remainder = total % n,
/// 前 remainder 个门店（按调用方给定顺序）得到 base + 1。
/// n = 0 时返回空列表。
pub fn even_split(total: u32, n: usize) -> Vec<u32> {
    if n == 0 {
        return Vec::new();
    }
    let n_u64 = n as u64;
    let total_u64 = total as u64;
    let base = (total_u64 / n_u64) as u32;
    let remainder = (total_u64 % n_u64) as usize;

    (0..n)
        .map(|i| if i < remainder { base + 1 } else { base })
        .collect()
}

// ==========================================
// 增量与缩放
// ==========================================

/// new = max(0, old + delta)，上界饱和到 u32::MAX
pub fn apply_delta(old: u32, delta: i64) -> u32 {
    let next = (old as i128) + (delta as i128);
    next.clamp(0, u32::MAX as i128) as u32
}

/// 百分比是否在 [1, 100] 内
pub fn is_valid_bulk_percent(percent: f64) -> bool {
    percent.is_finite() && (MIN_BULK_PERCENT..=MAX_BULK_PERCENT).contains(&percent)
}

/// 百分比定点精度: 百万分之一
const PERCENT_SCALE: i128 = 1_000_000;

/// 按百分比缩放数量, 四舍五入（远离 0 方向）, 结果不小于 0
///
/// 百分比先转为百万分之一的定点整数, 之后全程整数运算,
/// 2.5% 之类的小数百分比在 .5 处同样精确进位。
pub fn scale_quantity(old: u32, percent: f64, direction: AdjustDirection) -> u32 {
    let p = (percent * PERCENT_SCALE as f64).round() as i128;
    let hundred = 100 * PERCENT_SCALE;
    let numerator_factor = match direction {
        AdjustDirection::Increase => hundred + p,
        AdjustDirection::Decrease => hundred - p,
    };
    let numerator = (old as i128) * numerator_factor;
    if numerator <= 0 {
        return 0;
    }
    let rounded = (numerator + hundred / 2) / hundred;
    rounded.clamp(0, u32::MAX as i128) as u32
}

// ==========================================
// DistributionPolicy - 汇总视图增量分摊策略
// ==========================================

/// 将产品级增量分摊到该产品的各门店明细
pub trait DistributionPolicy: Send + Sync {
    fn mode(&self) -> DistributionMode;

    /// 返回与 current 等长的逐行增量
    fn distribute(&self, delta: i64, current: &[u32]) -> Vec<i64>;
}

/// 每行施加相同增量（非拆分）
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyToAll;

impl DistributionPolicy for ApplyToAll {
    fn mode(&self) -> DistributionMode {
        DistributionMode::ApplyToAll
    }

    fn distribute(&self, delta: i64, current: &[u32]) -> Vec<i64> {
        vec![delta; current.len()]
    }
}

/// 按当前数量比例拆分增量, 最大余数法取整
///
/// 各行增量之和等于 delta; 当前数量全为 0 时等分。
#[derive(Debug, Clone, Copy, Default)]
pub struct SplitProportionally;

impl DistributionPolicy for SplitProportionally {
    fn mode(&self) -> DistributionMode {
        DistributionMode::SplitProportionally
    }

    fn distribute(&self, delta: i64, current: &[u32]) -> Vec<i64> {
        let n = current.len();
        if n == 0 {
            return Vec::new();
        }

        let total_weight: u128 = current.iter().map(|&q| q as u128).sum();
        let weights: Vec<u128> = if total_weight == 0 {
            vec![1; n]
        } else {
            current.iter().map(|&q| q as u128).collect()
        };
        let weight_sum: u128 = weights.iter().sum();
        let magnitude = delta.unsigned_abs() as u128;

        let mut shares: Vec<u128> = Vec::with_capacity(n);
        let mut remainders: Vec<(u128, usize)> = Vec::with_capacity(n);
        for (idx, w) in weights.iter().enumerate() {
            let product = magnitude * w;
            shares.push(product / weight_sum);
            remainders.push((product % weight_sum, idx));
        }

        let assigned: u128 = shares.iter().sum();
        let mut leftover = magnitude - assigned;
        // 余数大者优先, 同余数按顺序
        remainders.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        for (_, idx) in remainders {
            if leftover == 0 {
                break;
            }
            shares[idx] += 1;
            leftover -= 1;
        }

        // 单行承接 i64::MIN 时幅度为 2^63, 在 i128 中取符号后再收窄
        let sign: i128 = if delta < 0 { -1 } else { 1 };
        shares
            .into_iter()
            .map(|s| (sign * s as i128).clamp(i64::MIN as i128, i64::MAX as i128) as i64)
            .collect()
    }
}

/// 按模式构造分摊策略
pub fn policy_for(mode: DistributionMode) -> Box<dyn DistributionPolicy> {
    match mode {
        DistributionMode::ApplyToAll => Box::new(ApplyToAll),
        DistributionMode::SplitProportionally => Box::new(SplitProportionally),
    }
}
