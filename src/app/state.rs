// ==========================================
// 烘焙生产计划系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::AllocationApi;
use crate::config::config_manager::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection, warn_if_schema_mismatch};
use crate::engine::AllocationEngine;
use crate::repository::{
    ActionLogRepository, AllocationRepository, CapacityBoundRepository, CatalogRepository,
    ProductStateRepository, ProductionPlanRepository,
};

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "BAKERY_PLANNER_DB_PATH";

/// 应用状态
///
/// 包含API实例和共享资源, 所有仓储共用一个连接
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 生产分配API
    pub allocation_api: Arc<AllocationApi>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开数据库并建表（幂等）
    /// 2. 初始化所有Repository
    /// 3. 读取配置并初始化分配引擎
    /// 4. 创建API实例
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("无法初始化数据库结构: {}", e))?;
        warn_if_schema_mismatch(&conn);
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let plan_repo = Arc::new(ProductionPlanRepository::new(conn.clone()));
        let allocation_repo = Arc::new(AllocationRepository::new(conn.clone()));
        let product_state_repo = Arc::new(ProductStateRepository::new(conn.clone()));
        let catalog_repo = Arc::new(CatalogRepository::new(conn.clone()));
        let capacity_repo = Arc::new(CapacityBoundRepository::new(conn.clone()));
        let action_log_repo = Arc::new(ActionLogRepository::new(conn.clone()));

        // ==========================================
        // 初始化Engine层
        // ==========================================
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let engine_config = config_manager.load_engine_config();
        tracing::info!(
            seed_base_quantity = engine_config.seed_base_quantity,
            distribution_mode = ?engine_config.distribution_mode,
            capacity_enforcement = ?engine_config.capacity_enforcement,
            "引擎配置已加载"
        );

        let engine = Arc::new(AllocationEngine::new(
            plan_repo,
            allocation_repo,
            product_state_repo,
            catalog_repo.clone(),
            capacity_repo.clone(),
            engine_config,
        ));

        // ==========================================
        // 初始化API层
        // ==========================================
        let allocation_api = Arc::new(AllocationApi::new(
            engine,
            catalog_repo,
            capacity_repo,
            action_log_repo,
        ));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            allocation_api,
            config_manager,
        })
    }

    /// 获取数据库路径
    pub fn get_db_path(&self) -> &str {
        &self.db_path
    }
}

// ==========================================
// 默认数据库路径辅助函数
// ==========================================

/// 获取默认数据库路径
///
/// # 返回
/// 1. 环境变量 BAKERY_PLANNER_DB_PATH
/// 2. 用户数据目录/bakery-planner/bakery_planner.db
/// 3. ./bakery_planner.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./bakery_planner.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("bakery-planner");
        // 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("bakery_planner.db");
        }
    }

    path.to_string_lossy().to_string()
}
