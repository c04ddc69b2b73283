// ==========================================
// 烘焙生产计划系统 - 生产计划数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 约束: production_date 唯一, 先查后插, 不依赖插入失败判重
// ==========================================

use crate::domain::plan::ProductionPlan;
use crate::domain::types::PlanStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_mapping::{date_column, datetime_column, format_date, format_datetime};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

const PLAN_COLUMNS: &str = "plan_id, production_date, status, seeded, created_at, updated_at";

// ==========================================
// ProductionPlanRepository - 生产计划仓储
// ==========================================
pub struct ProductionPlanRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProductionPlanRepository {
    /// 创建新的ProductionPlanRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按生产日期查询计划
    ///
    /// # 返回
    /// - `Ok(Some(plan))`: 找到计划
    /// - `Ok(None)`: 该日期尚无计划
    pub fn find_by_date(&self, production_date: NaiveDate) -> RepositoryResult<Option<ProductionPlan>> {
        let conn = self.get_conn()?;
        Self::select_by_date(&conn, production_date)
    }

    /// 查询日期的计划, 不存在则创建 pending 计划
    ///
    /// # 返回
    /// - `Ok((plan, created))`: created=true 表示本次新建
    ///
    /// # 说明
    /// 在同一事务内先查询再插入; 插入使用 ON CONFLICT DO NOTHING,
    /// 其他进程并发插入时回读已有记录, 不会产生重复计划。
    pub fn find_or_create(
        &self,
        production_date: NaiveDate,
        now: NaiveDateTime,
    ) -> RepositoryResult<(ProductionPlan, bool)> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        if let Some(existing) = Self::select_by_date(&tx, production_date)? {
            tx.commit()?;
            return Ok((existing, false));
        }

        let plan = ProductionPlan::new_pending(production_date, now);
        let inserted = tx.execute(
            r#"INSERT INTO production_plans (
                    plan_id, production_date, status, seeded, created_at, updated_at
                ) VALUES (?1, ?2, ?3, 0, ?4, ?5)
                ON CONFLICT(production_date) DO NOTHING"#,
            params![
                &plan.plan_id,
                format_date(plan.production_date),
                plan.status.to_db_str(),
                format_datetime(plan.created_at),
                format_datetime(plan.updated_at),
            ],
        )?;

        let stored = Self::select_by_date(&tx, production_date)?.ok_or_else(|| {
            RepositoryError::NotFound {
                entity: "ProductionPlan".to_string(),
                id: format_date(production_date),
            }
        })?;
        tx.commit()?;

        Ok((stored, inserted > 0))
    }

    fn select_by_date(
        conn: &Connection,
        production_date: NaiveDate,
    ) -> RepositoryResult<Option<ProductionPlan>> {
        let sql = format!(
            "SELECT {} FROM production_plans WHERE production_date = ?1",
            PLAN_COLUMNS
        );
        let plan = conn
            .query_row(&sql, params![format_date(production_date)], map_row)
            .optional()?;
        Ok(plan)
    }
}

/// 映射数据库行到ProductionPlan对象
pub(crate) fn map_row(row: &rusqlite::Row) -> rusqlite::Result<ProductionPlan> {
    Ok(ProductionPlan {
        plan_id: row.get(0)?,
        production_date: date_column(row, 1)?,
        status: PlanStatus::from_db_str(&row.get::<_, String>(2)?),
        seeded: row.get::<_, i64>(3)? != 0,
        created_at: datetime_column(row, 4)?,
        updated_at: datetime_column(row, 5)?,
    })
}
