// ==========================================
// 烘焙生产计划系统 - 产能区间数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 缺失记录由调用方按 {0,0} 处理
// ==========================================

use crate::domain::capacity::CapacityBound;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use std::sync::{Arc, Mutex};

// ==========================================
// CapacityBoundRepository - 产能区间仓储
// ==========================================

/// 产能区间仓储
/// 职责: 管理capacity_bounds表的读写
pub struct CapacityBoundRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CapacityBoundRepository {
    /// 从已有连接创建仓储实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按产品和门店查询产能区间
    ///
    /// # 返回
    /// - Ok(Some(CapacityBound)): 已配置
    /// - Ok(None): 未配置
    pub fn find(&self, product_sku: &str, store_id: &str) -> RepositoryResult<Option<CapacityBound>> {
        let conn = self.get_conn()?;
        let bound = conn
            .query_row(
                r#"SELECT product_sku, store_id, min_quantity, max_quantity
                   FROM capacity_bounds
                   WHERE product_sku = ?1 AND store_id = ?2"#,
                params![product_sku, store_id],
                map_row,
            )
            .optional()?;
        Ok(bound)
    }

    /// 查询产品在全部门店的产能区间
    pub fn find_by_product(&self, product_sku: &str) -> RepositoryResult<Vec<CapacityBound>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT product_sku, store_id, min_quantity, max_quantity
               FROM capacity_bounds
               WHERE product_sku = ?1
               ORDER BY store_id"#,
        )?;
        let bounds = stmt
            .query_map(params![product_sku], map_row)?
            .collect::<SqliteResult<Vec<CapacityBound>>>()?;
        Ok(bounds)
    }

    /// 插入或更新产能区间
    pub fn upsert(&self, bound: &CapacityBound) -> RepositoryResult<()> {
        if bound.max_quantity > 0 && bound.min_quantity > bound.max_quantity {
            return Err(RepositoryError::FieldValueError {
                field: "min_quantity".to_string(),
                message: format!(
                    "下限{}大于上限{}",
                    bound.min_quantity, bound.max_quantity
                ),
            });
        }

        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO capacity_bounds (product_sku, store_id, min_quantity, max_quantity)
               VALUES (?1, ?2, ?3, ?4)
               ON CONFLICT(product_sku, store_id) DO UPDATE SET
                   min_quantity = excluded.min_quantity,
                   max_quantity = excluded.max_quantity"#,
            params![
                &bound.product_sku,
                &bound.store_id,
                bound.min_quantity,
                bound.max_quantity,
            ],
        )?;
        Ok(())
    }
}

fn map_row(row: &rusqlite::Row) -> SqliteResult<CapacityBound> {
    Ok(CapacityBound {
        product_sku: row.get(0)?,
        store_id: row.get(1)?,
        min_quantity: row.get(2)?,
        max_quantity: row.get(3)?,
    })
}
