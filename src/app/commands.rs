// ==========================================
// 烘焙生产计划系统 - 命令分发
// ==========================================
// 输入: 命令名 + JSON 参数对象
// 输出: JSON 字符串; 错误为 {code, message, details}
// ==========================================

use crate::api::dto::{
    AdjustLineRequest, AdjustProductRequest, AutoAllocateRequest, BulkAdjustRequest,
    CapacityBoundRequest, ProductUpsertRequest, StoreUpsertRequest,
};
use crate::api::error::ApiError;
use crate::app::state::AppState;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// 支持的命令
pub const COMMANDS: &[&str] = &[
    "get_plan",
    "seed_plan",
    "adjust_allocation",
    "adjust_product",
    "bulk_adjust",
    "auto_allocate",
    "confirm_product",
    "confirm_plan",
    "by_product",
    "by_category",
    "by_store",
    "product_views",
    "export_csv",
    "list_action_logs",
    "upsert_store",
    "upsert_product",
    "upsert_capacity_bound",
    "get_config",
    "set_config",
];

// ==========================================
// 公共工具：错误映射
// ==========================================

/// 错误响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// 错误代码
    pub code: String,

    /// 错误消息
    pub message: String,

    /// 详细信息（可选）
    pub details: Option<serde_json::Value>,
}

/// 将ApiError转换为JSON字符串
pub fn map_api_error(err: ApiError) -> String {
    let error_response = ErrorResponse {
        code: match &err {
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::ProductLocked { .. } => "LOCKED",
            ApiError::CapacityExceeded { .. } => "CAPACITY_EXCEEDED",
            ApiError::BusinessRuleViolation(_) => "BUSINESS_RULE_VIOLATION",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::DatabaseConnectionError(_) => "DATABASE_CONNECTION_ERROR",
            ApiError::DatabaseTransactionError(_) => "DATABASE_TRANSACTION_ERROR",
            ApiError::ExportError(_) => "EXPORT_ERROR",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
            ApiError::Other(_) => "OTHER_ERROR",
        }
        .to_string(),
        message: err.to_string(),
        details: match &err {
            ApiError::ProductLocked {
                plan_id,
                product_sku,
            } => Some(serde_json::json!({
                "plan_id": plan_id,
                "product_sku": product_sku,
            })),
            ApiError::CapacityExceeded {
                store_id,
                product_sku,
                quantity,
                max_quantity,
            } => Some(serde_json::json!({
                "store_id": store_id,
                "product_sku": product_sku,
                "quantity": quantity,
                "max_quantity": max_quantity,
            })),
            _ => None,
        },
    };

    serde_json::to_string(&error_response).unwrap_or_else(|_| err.to_string())
}

// ==========================================
// 命令参数
// ==========================================

#[derive(Debug, Deserialize)]
struct DateArgs {
    date: String,
}

#[derive(Debug, Deserialize)]
struct OperatorArgs {
    date: String,
    #[serde(default)]
    operator: String,
}

#[derive(Debug, Deserialize)]
struct SeedArgs {
    date: String,
    #[serde(default)]
    store_ids: Option<Vec<String>>,
    #[serde(default)]
    operator: String,
}

#[derive(Debug, Deserialize)]
struct WithRequest<T> {
    date: String,
    #[serde(default)]
    operator: String,
    #[serde(flatten)]
    request: T,
}

#[derive(Debug, Deserialize)]
struct ConfirmProductArgs {
    date: String,
    product_sku: String,
    #[serde(default)]
    operator: String,
}

#[derive(Debug, Deserialize)]
struct ExportArgs {
    date: String,
    #[serde(default)]
    store_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ActionLogArgs {
    date: String,
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct SetConfigArgs {
    key: String,
    value: String,
}

fn parse_args<T: DeserializeOwned>(args_json: &str) -> Result<T, String> {
    let raw = if args_json.trim().is_empty() { "{}" } else { args_json };
    serde_json::from_str(raw)
        .map_err(|e| map_api_error(ApiError::InvalidInput(format!("参数解析失败: {}", e))))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value)
        .map_err(|e| map_api_error(ApiError::InternalError(format!("序列化失败: {}", e))))
}

// ==========================================
// 命令分发
// ==========================================

/// 按名称分发命令
pub fn dispatch(state: &AppState, command: &str, args_json: &str) -> Result<String, String> {
    let api = &state.allocation_api;
    tracing::debug!(command = %command, "分发命令");

    match command {
        "get_plan" => {
            let args: DateArgs = parse_args(args_json)?;
            to_json(&api.get_plan(&args.date).map_err(map_api_error)?)
        }
        "seed_plan" => {
            let args: SeedArgs = parse_args(args_json)?;
            to_json(
                &api.seed_plan(&args.date, args.store_ids, &args.operator)
                    .map_err(map_api_error)?,
            )
        }
        "adjust_allocation" => {
            let args: WithRequest<AdjustLineRequest> = parse_args(args_json)?;
            to_json(
                &api.adjust_allocation(&args.date, args.request, &args.operator)
                    .map_err(map_api_error)?,
            )
        }
        "adjust_product" => {
            let args: WithRequest<AdjustProductRequest> = parse_args(args_json)?;
            to_json(
                &api.adjust_product(&args.date, args.request, &args.operator)
                    .map_err(map_api_error)?,
            )
        }
        "bulk_adjust" => {
            let args: WithRequest<BulkAdjustRequest> = parse_args(args_json)?;
            to_json(
                &api.bulk_adjust(&args.date, args.request, &args.operator)
                    .map_err(map_api_error)?,
            )
        }
        "auto_allocate" => {
            let args: WithRequest<AutoAllocateRequest> = parse_args(args_json)?;
            to_json(
                &api.auto_allocate(&args.date, args.request, &args.operator)
                    .map_err(map_api_error)?,
            )
        }
        "confirm_product" => {
            let args: ConfirmProductArgs = parse_args(args_json)?;
            to_json(
                &api.confirm_product(&args.date, &args.product_sku, &args.operator)
                    .map_err(map_api_error)?,
            )
        }
        "confirm_plan" => {
            let args: OperatorArgs = parse_args(args_json)?;
            to_json(
                &api.confirm_plan(&args.date, &args.operator)
                    .map_err(map_api_error)?,
            )
        }
        "by_product" => {
            let args: DateArgs = parse_args(args_json)?;
            to_json(&api.by_product(&args.date).map_err(map_api_error)?)
        }
        "by_category" => {
            let args: DateArgs = parse_args(args_json)?;
            to_json(&api.by_category(&args.date).map_err(map_api_error)?)
        }
        "by_store" => {
            let args: DateArgs = parse_args(args_json)?;
            to_json(&api.by_store(&args.date).map_err(map_api_error)?)
        }
        "product_views" => {
            let args: DateArgs = parse_args(args_json)?;
            to_json(&api.product_views(&args.date).map_err(map_api_error)?)
        }
        "export_csv" => {
            let args: ExportArgs = parse_args(args_json)?;
            api.export_csv(&args.date, args.store_id.as_deref())
                .map_err(map_api_error)
        }
        "list_action_logs" => {
            let args: ActionLogArgs = parse_args(args_json)?;
            to_json(
                &api.list_action_logs(&args.date, args.limit)
                    .map_err(map_api_error)?,
            )
        }
        "upsert_store" => {
            let request: StoreUpsertRequest = parse_args(args_json)?;
            to_json(&api.upsert_store(request).map_err(map_api_error)?)
        }
        "upsert_product" => {
            let request: ProductUpsertRequest = parse_args(args_json)?;
            to_json(&api.upsert_product(request).map_err(map_api_error)?)
        }
        "upsert_capacity_bound" => {
            let request: CapacityBoundRequest = parse_args(args_json)?;
            to_json(&api.upsert_capacity_bound(request).map_err(map_api_error)?)
        }
        "get_config" => state
            .config_manager
            .get_config_snapshot()
            .map_err(|e| map_api_error(ApiError::DatabaseError(e.to_string()))),
        "set_config" => {
            let args: SetConfigArgs = parse_args(args_json)?;
            if args.key.trim().is_empty() {
                return Err(map_api_error(ApiError::InvalidInput(
                    "配置键不能为空".to_string(),
                )));
            }
            state
                .config_manager
                .set_global_config_value(&args.key, &args.value)
                .map_err(|e| map_api_error(ApiError::DatabaseError(e.to_string())))?;
            to_json(&serde_json::json!({ "key": args.key, "value": args.value }))
        }
        other => Err(map_api_error(ApiError::InvalidInput(format!(
            "未知命令: {}",
            other
        )))),
    }
}
