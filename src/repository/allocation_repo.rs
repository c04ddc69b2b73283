// ==========================================
// 烘焙生产计划系统 - 分配明细数据仓储
// ==========================================
// 表: production_allocations
// 自然键: UNIQUE(production_plan_id, store_id, product_sku, day_part)
// 红线: 批量写入必须整体提交或整体回滚
// ==========================================

use crate::domain::action_log::ActionLog;
use crate::domain::allocation::{AllocationKey, AllocationLine, ManufacturedQuantity};
use crate::domain::plan::ProductAllocationState;
use crate::domain::types::PlanStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_mapping::{datetime_column, format_datetime};
use crate::repository::{action_log_repo, product_state_repo};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

const LINE_COLUMNS: &str = r#"allocation_id, production_plan_id, store_id, product_sku, day_part,
       quantity, recommended_quantity, manufactured_quantity, received_quantity,
       historical_sales, predicted_sales, updated_at"#;

// ==========================================
// AllocationWriteSet - 单次变更的写入集合
// ==========================================
// 一个写入集合对应一次引擎操作, 在同一事务内落库
#[derive(Debug, Clone)]
pub struct AllocationWriteSet {
    pub plan_id: String,
    pub lines: Vec<AllocationLine>,                    // 按自然键 UPSERT
    pub plan_status: Option<PlanStatus>,               // 计划状态变更
    pub mark_seeded: bool,                             // 标记计划已初始分配
    pub product_states: Vec<ProductAllocationState>,   // 单品状态变更
    pub action_log: Option<ActionLog>,                 // 审计日志
    pub updated_at: NaiveDateTime,
}

impl AllocationWriteSet {
    pub fn new(plan_id: &str, updated_at: NaiveDateTime) -> Self {
        Self {
            plan_id: plan_id.to_string(),
            lines: Vec::new(),
            plan_status: None,
            mark_seeded: false,
            product_states: Vec::new(),
            action_log: None,
            updated_at,
        }
    }
}

// ==========================================
// AllocationRepository - 分配明细仓储
// ==========================================
pub struct AllocationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AllocationRepository {
    /// 创建新的AllocationRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 查询计划的全部明细
    ///
    /// 排序: store_id, product_sku, day_part
    pub fn find_by_plan(&self, plan_id: &str) -> RepositoryResult<Vec<AllocationLine>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM production_allocations WHERE production_plan_id = ?1
             ORDER BY store_id, product_sku, day_part",
            LINE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let lines = stmt
            .query_map(params![plan_id], map_row)?
            .collect::<Result<Vec<AllocationLine>, _>>()?;
        Ok(lines)
    }

    /// 查询计划内某产品在全部门店的明细
    pub fn find_by_plan_and_sku(
        &self,
        plan_id: &str,
        product_sku: &str,
    ) -> RepositoryResult<Vec<AllocationLine>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM production_allocations
             WHERE production_plan_id = ?1 AND product_sku = ?2
             ORDER BY store_id, day_part",
            LINE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let lines = stmt
            .query_map(params![plan_id, product_sku], map_row)?
            .collect::<Result<Vec<AllocationLine>, _>>()?;
        Ok(lines)
    }

    /// 按自然键查询单条明细
    pub fn find_by_key(
        &self,
        plan_id: &str,
        key: &AllocationKey,
    ) -> RepositoryResult<Option<AllocationLine>> {
        let conn = self.get_conn()?;
        select_by_key(&conn, plan_id, key)
    }

    /// 查询已有明细的门店ID
    pub fn find_store_ids_with_lines(&self, plan_id: &str) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT store_id FROM production_allocations
             WHERE production_plan_id = ?1 ORDER BY store_id",
        )?;
        let ids = stmt
            .query_map(params![plan_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    /// 统计计划明细数
    pub fn count_by_plan(&self, plan_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM production_allocations WHERE production_plan_id = ?1",
            params![plan_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// 提交写入集合
    ///
    /// # 返回
    /// - `Ok(lines)`: 落库后的明细（allocation_id 以库内为准）
    /// - `Err`: 任一步失败整体回滚, 库内状态不变
    ///
    /// # 红线
    /// - 明细、计划状态、单品状态、审计日志同一事务
    /// - 明细按自然键 UPSERT, 不产生重复行
    pub fn commit(&self, write_set: &AllocationWriteSet) -> RepositoryResult<Vec<AllocationLine>> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let updated_at = format_datetime(write_set.updated_at);

        {
            let mut stmt = tx.prepare(
                r#"INSERT INTO production_allocations (
                        allocation_id, production_plan_id, store_id, product_sku, day_part,
                        quantity, recommended_quantity, manufactured_quantity, received_quantity,
                        historical_sales, predicted_sales, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                    ON CONFLICT(production_plan_id, store_id, product_sku, day_part) DO UPDATE SET
                        quantity = excluded.quantity,
                        recommended_quantity = excluded.recommended_quantity,
                        manufactured_quantity = excluded.manufactured_quantity,
                        received_quantity = excluded.received_quantity,
                        historical_sales = excluded.historical_sales,
                        predicted_sales = excluded.predicted_sales,
                        updated_at = excluded.updated_at"#,
            )?;

            for line in &write_set.lines {
                if line.plan_id != write_set.plan_id {
                    return Err(RepositoryError::FieldValueError {
                        field: "production_plan_id".to_string(),
                        message: format!(
                            "明细{}不属于计划{}",
                            line.allocation_id, write_set.plan_id
                        ),
                    });
                }
                stmt.execute(params![
                    &line.allocation_id,
                    &line.plan_id,
                    &line.store_id,
                    &line.product_sku,
                    &line.day_part,
                    line.quantity,
                    line.recommended_quantity,
                    line.manufactured_quantity.as_option(),
                    line.received_quantity,
                    line.historical_sales,
                    line.predicted_sales,
                    &updated_at,
                ])?;
            }
        }

        if let Some(status) = write_set.plan_status {
            tx.execute(
                "UPDATE production_plans SET status = ?1, updated_at = ?2 WHERE plan_id = ?3",
                params![status.to_db_str(), &updated_at, &write_set.plan_id],
            )?;
        }

        if write_set.mark_seeded {
            tx.execute(
                "UPDATE production_plans SET seeded = 1, updated_at = ?1 WHERE plan_id = ?2",
                params![&updated_at, &write_set.plan_id],
            )?;
        }

        for state in &write_set.product_states {
            product_state_repo::upsert_in_tx(&tx, state)?;
        }

        if let Some(log) = &write_set.action_log {
            action_log_repo::insert_in_tx(&tx, log)?;
        }

        // 回读落库结果
        let mut stored = Vec::with_capacity(write_set.lines.len());
        for line in &write_set.lines {
            let persisted = select_by_key(&tx, &write_set.plan_id, &line.key())?.ok_or_else(|| {
                RepositoryError::NotFound {
                    entity: "AllocationLine".to_string(),
                    id: line.key().to_string(),
                }
            })?;
            stored.push(persisted);
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        Ok(stored)
    }
}

fn select_by_key(
    conn: &Connection,
    plan_id: &str,
    key: &AllocationKey,
) -> RepositoryResult<Option<AllocationLine>> {
    let sql = format!(
        "SELECT {} FROM production_allocations
         WHERE production_plan_id = ?1 AND store_id = ?2 AND product_sku = ?3 AND day_part = ?4",
        LINE_COLUMNS
    );
    let line = conn
        .query_row(
            &sql,
            params![plan_id, &key.store_id, &key.product_sku, &key.day_part],
            map_row,
        )
        .optional()?;
    Ok(line)
}

/// 映射数据库行到AllocationLine对象
fn map_row(row: &rusqlite::Row) -> rusqlite::Result<AllocationLine> {
    Ok(AllocationLine {
        allocation_id: row.get(0)?,
        plan_id: row.get(1)?,
        store_id: row.get(2)?,
        product_sku: row.get(3)?,
        day_part: row.get(4)?,
        quantity: row.get(5)?,
        recommended_quantity: row.get(6)?,
        manufactured_quantity: ManufacturedQuantity::from(row.get::<_, Option<u32>>(7)?),
        received_quantity: row.get(8)?,
        historical_sales: row.get(9)?,
        predicted_sales: row.get(10)?,
        updated_at: datetime_column(row, 11)?,
    })
}
