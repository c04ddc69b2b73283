// ==========================================
// 烘焙生产计划系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口, 供命令分发调用
// ==========================================

pub mod allocation_api;
pub mod dto;
pub mod error;
pub mod export;
pub mod validator;

// 重导出核心类型
pub use allocation_api::AllocationApi;
pub use error::{ApiError, ApiResult};
