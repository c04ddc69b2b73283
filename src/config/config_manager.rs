// ==========================================
// 烘焙生产计划系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// 规则: 配置缺失或格式错误时回退默认值
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::types::{CapacityEnforcement, DistributionMode};
use crate::engine::allocation::EngineConfig;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

const GLOBAL_SCOPE: &str = "global";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
            params![GLOBAL_SCOPE, key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self
            .get_global_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 写入 global scope 配置（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let key = key.trim();
        if key.is_empty() {
            return Err("配置键不能为空".into());
        }

        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at)
             VALUES (?1, ?2, ?3, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at",
            params![GLOBAL_SCOPE, key, value],
        )?;
        tracing::info!(key = %key, value = %value, "配置已更新");
        Ok(())
    }

    /// 获取所有 global 配置的快照（JSON格式, 键有序）
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;
        let rows = stmt.query_map(params![GLOBAL_SCOPE], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    // ===== 分配引擎配置 =====

    /// 初始分配基础数量（默认 20）
    pub fn get_seed_base_quantity(&self) -> Result<u32, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::SEED_BASE_QUANTITY, "20")?;
        Ok(value.trim().parse::<u32>().unwrap_or(20))
    }

    /// 汇总视图增量分摊方式（默认 apply_to_all）
    pub fn get_distribution_mode(&self) -> Result<DistributionMode, Box<dyn Error>> {
        let value =
            self.get_config_or_default(config_keys::AGGREGATE_DISTRIBUTION_POLICY, "apply_to_all")?;
        Ok(DistributionMode::parse(&value).unwrap_or(DistributionMode::ApplyToAll))
    }

    /// 产能约束方式（默认 advisory）
    pub fn get_capacity_enforcement(&self) -> Result<CapacityEnforcement, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::CAPACITY_ENFORCEMENT, "advisory")?;
        Ok(CapacityEnforcement::parse(&value).unwrap_or(CapacityEnforcement::Advisory))
    }

    /// 默认时段（默认 morning）
    pub fn get_default_day_part(&self) -> Result<String, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::DEFAULT_DAY_PART, "morning")?;
        let trimmed = value.trim();
        if trimmed.is_empty() {
            Ok("morning".to_string())
        } else {
            Ok(trimmed.to_string())
        }
    }

    /// 加载引擎配置快照
    ///
    /// 读取失败时记录告警并整体回退默认值
    pub fn load_engine_config(&self) -> EngineConfig {
        match self.try_load_engine_config() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("加载引擎配置失败, 使用默认配置: {}", e);
                EngineConfig::default()
            }
        }
    }

    fn try_load_engine_config(&self) -> Result<EngineConfig, Box<dyn Error>> {
        Ok(EngineConfig {
            seed_base_quantity: self.get_seed_base_quantity()?,
            distribution_mode: self.get_distribution_mode()?,
            capacity_enforcement: self.get_capacity_enforcement()?,
            default_day_part: self.get_default_day_part()?,
        })
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 初始分配
    pub const SEED_BASE_QUANTITY: &str = "seed_base_quantity";
    pub const DEFAULT_DAY_PART: &str = "default_day_part";

    // 汇总视图增量分摊
    pub const AGGREGATE_DISTRIBUTION_POLICY: &str = "aggregate_distribution_policy";

    // 产能约束
    pub const CAPACITY_ENFORCEMENT: &str = "capacity_enforcement";
}
