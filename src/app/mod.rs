// ==========================================
// 烘焙生产计划系统 - 应用层
// ==========================================
// 职责: 状态装配与命令分发, 连接调用方与后端
// ==========================================

pub mod commands;
pub mod state;

// 重导出
pub use commands::{dispatch, map_api_error, ErrorResponse, COMMANDS};
pub use state::{get_default_db_path, AppState};
