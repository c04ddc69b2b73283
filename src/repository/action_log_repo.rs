// ==========================================
// 烘焙生产计划系统 - 操作日志数据仓储
// ==========================================
// 红线: 所有写入必须记录
// 写入随业务写入同事务提交 (见 AllocationRepository::commit)
// ==========================================

use crate::domain::action_log::ActionLog;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_mapping::{datetime_column, format_datetime};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// ActionLogRepository - 操作日志仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
pub struct ActionLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ActionLogRepository {
    /// 创建新的操作日志仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入操作日志（独立写入）
    pub fn insert(&self, log: &ActionLog) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        insert_in_tx(&conn, log)?;
        Ok(log.action_id.clone())
    }

    /// 查询计划的操作日志（最新在前）
    ///
    /// # 参数
    /// - `plan_id`: 计划ID
    /// - `limit`: 最多返回条数
    pub fn find_by_plan(&self, plan_id: &str, limit: usize) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT action_id, production_plan_id, action_type, action_ts, actor,
                      payload_json, detail
               FROM action_log
               WHERE production_plan_id = ?1
               ORDER BY action_ts DESC, rowid DESC
               LIMIT ?2"#,
        )?;

        let logs = stmt
            .query_map(params![plan_id, limit as i64], map_row)?
            .collect::<Result<Vec<ActionLog>, _>>()?;
        Ok(logs)
    }
}

/// 在给定连接/事务内插入日志
pub(crate) fn insert_in_tx(conn: &Connection, log: &ActionLog) -> RepositoryResult<()> {
    conn.execute(
        r#"INSERT INTO action_log (
                action_id, production_plan_id, action_type, action_ts, actor,
                payload_json, detail
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
        params![
            &log.action_id,
            &log.plan_id,
            &log.action_type,
            format_datetime(log.action_ts),
            &log.actor,
            log.payload_json.as_ref().map(|v| v.to_string()),
            &log.detail,
        ],
    )?;
    Ok(())
}

fn map_row(row: &rusqlite::Row) -> rusqlite::Result<ActionLog> {
    let payload: Option<String> = row.get(5)?;
    Ok(ActionLog {
        action_id: row.get(0)?,
        plan_id: row.get(1)?,
        action_type: row.get(2)?,
        action_ts: datetime_column(row, 3)?,
        actor: row.get(4)?,
        // 历史脏数据不应阻断查询
        payload_json: payload.and_then(|s| serde_json::from_str(&s).ok()),
        detail: row.get(6)?,
    })
}
