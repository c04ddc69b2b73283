// ==========================================
// 烘焙生产计划系统 - 计划级写锁
// ==========================================
// 同一计划的 读-校验-写 串行; 不同计划互不阻塞, 无全局写锁
// ==========================================

use crate::engine::error::{AllocationError, AllocationResult};
use crate::repository::error::RepositoryError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// 计划级互斥锁注册表
///
/// 键为计划ID（解析计划时使用 `date:YYYY-MM-DD`）
#[derive(Debug, Default)]
pub struct PlanLockRegistry {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl PlanLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取某个键对应的互斥锁（不存在则创建）
    ///
    /// 调用方持有返回值并 `lock()`，guard 存活期间同键写入串行。
    /// 无人持有的其他键在此处回收, 注册表大小只随在用计划数增长。
    pub fn lock_for(&self, key: &str) -> AllocationResult<Arc<Mutex<()>>> {
        let mut locks = self.locks.lock().map_err(|e| {
            AllocationError::Persistence(RepositoryError::LockError(e.to_string()))
        })?;
        // 只有注册表自身引用的锁可以回收; 新的持有者必须先经过注册表互斥
        locks.retain(|k, lock| k == key || Arc::strong_count(lock) > 1);
        Ok(locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone())
    }

    /// 已登记的锁数量
    pub fn len(&self) -> usize {
        self.locks.lock().map(|l| l.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
