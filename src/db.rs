// ==========================================
// 烘焙生产计划系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 建表幂等 (CREATE TABLE IF NOT EXISTS)
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要"每个连接"单独开启
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 初始化数据库 schema（幂等）
///
/// 表:
/// - production_plans: production_date 唯一
/// - production_allocations: (production_plan_id, store_id, product_sku, day_part) 唯一
/// - production_product_states: 计划内单品锁定/覆盖标记
/// - stores / products / product_clusters: 目录镜像
/// - capacity_bounds: 产能区间
/// - action_log: 操作日志
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS production_plans (
            plan_id TEXT PRIMARY KEY,
            production_date TEXT NOT NULL UNIQUE,
            status TEXT NOT NULL DEFAULT 'pending',
            seeded INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS production_allocations (
            allocation_id TEXT PRIMARY KEY,
            production_plan_id TEXT NOT NULL REFERENCES production_plans(plan_id),
            store_id TEXT NOT NULL,
            product_sku TEXT NOT NULL,
            day_part TEXT NOT NULL,
            quantity INTEGER NOT NULL CHECK (quantity >= 0),
            recommended_quantity INTEGER NOT NULL DEFAULT 0 CHECK (recommended_quantity >= 0),
            manufactured_quantity INTEGER CHECK (manufactured_quantity >= 0),
            received_quantity INTEGER CHECK (received_quantity >= 0),
            historical_sales INTEGER,
            predicted_sales INTEGER,
            updated_at TEXT NOT NULL,
            UNIQUE (production_plan_id, store_id, product_sku, day_part)
        );

        CREATE INDEX IF NOT EXISTS idx_production_allocations_plan_sku
            ON production_allocations (production_plan_id, product_sku);

        CREATE TABLE IF NOT EXISTS production_product_states (
            production_plan_id TEXT NOT NULL REFERENCES production_plans(plan_id),
            product_sku TEXT NOT NULL,
            locked INTEGER NOT NULL DEFAULT 0,
            overridden INTEGER NOT NULL DEFAULT 0,
            locked_by TEXT,
            locked_at TEXT,
            PRIMARY KEY (production_plan_id, product_sku)
        );

        CREATE TABLE IF NOT EXISTS stores (
            store_id TEXT PRIMARY KEY,
            store_name TEXT NOT NULL,
            cluster TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS products (
            sku TEXT PRIMARY KEY,
            product_name TEXT NOT NULL,
            category TEXT NOT NULL,
            day_part TEXT
        );

        CREATE TABLE IF NOT EXISTS product_clusters (
            sku TEXT NOT NULL REFERENCES products(sku) ON DELETE CASCADE,
            cluster TEXT NOT NULL,
            PRIMARY KEY (sku, cluster)
        );

        CREATE TABLE IF NOT EXISTS capacity_bounds (
            product_sku TEXT NOT NULL,
            store_id TEXT NOT NULL,
            min_quantity INTEGER NOT NULL DEFAULT 0,
            max_quantity INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (product_sku, store_id)
        );

        CREATE TABLE IF NOT EXISTS action_log (
            action_id TEXT PRIMARY KEY,
            production_plan_id TEXT,
            action_type TEXT NOT NULL,
            action_ts TEXT NOT NULL,
            actor TEXT NOT NULL,
            payload_json TEXT,
            detail TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_action_log_plan_ts
            ON action_log (production_plan_id, action_ts);
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    Ok(())
}

/// 检查 schema_version 与代码期望是否一致（仅告警，不做自动迁移）
pub fn warn_if_schema_mismatch(conn: &Connection) {
    match read_schema_version(conn) {
        Ok(Some(v)) if v == CURRENT_SCHEMA_VERSION => {}
        Ok(Some(v)) => tracing::warn!(
            "schema_version 不一致: 数据库={}, 代码期望={}",
            v,
            CURRENT_SCHEMA_VERSION
        ),
        Ok(None) => tracing::warn!("未找到 schema_version 表"),
        Err(e) => tracing::warn!("读取 schema_version 失败: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_schema_version_missing_table() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);
    }
}
