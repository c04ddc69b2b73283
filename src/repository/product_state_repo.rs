// ==========================================
// 烘焙生产计划系统 - 单品确认状态仓储
// ==========================================
// 表: production_product_states
// 写入只在 AllocationRepository::commit 的事务内发生
// ==========================================

use crate::domain::plan::ProductAllocationState;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_mapping::{format_datetime, optional_datetime_column};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

const STATE_COLUMNS: &str =
    "production_plan_id, product_sku, locked, overridden, locked_by, locked_at";

// ==========================================
// ProductStateRepository - 单品状态仓储
// ==========================================
pub struct ProductStateRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProductStateRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 查询计划内全部单品状态（按SKU排序）
    pub fn find_by_plan(&self, plan_id: &str) -> RepositoryResult<Vec<ProductAllocationState>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM production_product_states WHERE production_plan_id = ?1 ORDER BY product_sku",
            STATE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let states = stmt
            .query_map(params![plan_id], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(states)
    }

    /// 查询单品状态, 未记录时返回未确认状态
    pub fn find_or_default(
        &self,
        plan_id: &str,
        product_sku: &str,
    ) -> RepositoryResult<ProductAllocationState> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM production_product_states WHERE production_plan_id = ?1 AND product_sku = ?2",
            STATE_COLUMNS
        );
        let state = conn
            .query_row(&sql, params![plan_id, product_sku], map_row)
            .optional()?;
        Ok(state.unwrap_or_else(|| ProductAllocationState::unconfirmed(plan_id, product_sku)))
    }
}

/// 在事务内写入单品状态（UPSERT）
pub(crate) fn upsert_in_tx(
    conn: &Connection,
    state: &ProductAllocationState,
) -> RepositoryResult<()> {
    conn.execute(
        r#"INSERT INTO production_product_states (
                production_plan_id, product_sku, locked, overridden, locked_by, locked_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(production_plan_id, product_sku) DO UPDATE SET
                locked = excluded.locked,
                overridden = excluded.overridden,
                locked_by = excluded.locked_by,
                locked_at = excluded.locked_at"#,
        params![
            &state.plan_id,
            &state.product_sku,
            if state.locked { 1 } else { 0 },
            if state.overridden { 1 } else { 0 },
            &state.locked_by,
            state.locked_at.map(format_datetime),
        ],
    )?;
    Ok(())
}

fn map_row(row: &rusqlite::Row) -> rusqlite::Result<ProductAllocationState> {
    Ok(ProductAllocationState {
        plan_id: row.get(0)?,
        product_sku: row.get(1)?,
        locked: row.get::<_, i64>(2)? != 0,
        overridden: row.get::<_, i64>(3)? != 0,
        locked_by: row.get(4)?,
        locked_at: optional_datetime_column(row, 5)?,
    })
}
