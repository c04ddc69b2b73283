// ==========================================
// 烘焙生产计划系统 - CSV 导出
// ==========================================
// 列: Product, Store, Recommended Qty, Final Qty
// 指定门店导出时不含 Store 列
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::allocation::AllocationLine;
use crate::domain::catalog::{Product, Store};
use std::collections::HashMap;

/// 单行导出数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRow {
    pub product: String,
    pub store: String,
    pub recommended_quantity: u32,
    pub final_quantity: u32,
}

/// 由明细构造导出行
///
/// 产品/门店取目录名称, 目录缺失时用ID; 按产品名、门店名排序
pub fn build_export_rows(
    lines: &[AllocationLine],
    products: &[Product],
    stores: &[Store],
) -> Vec<ExportRow> {
    let product_names: HashMap<&str, &str> = products
        .iter()
        .map(|p| (p.sku.as_str(), p.product_name.as_str()))
        .collect();
    let store_names: HashMap<&str, &str> = stores
        .iter()
        .map(|s| (s.store_id.as_str(), s.store_name.as_str()))
        .collect();

    let mut rows: Vec<ExportRow> = lines
        .iter()
        .map(|line| ExportRow {
            product: product_names
                .get(line.product_sku.as_str())
                .copied()
                .unwrap_or(line.product_sku.as_str())
                .to_string(),
            store: store_names
                .get(line.store_id.as_str())
                .copied()
                .unwrap_or(line.store_id.as_str())
                .to_string(),
            recommended_quantity: line.recommended_quantity,
            final_quantity: line.quantity,
        })
        .collect();
    rows.sort_by(|a, b| a.product.cmp(&b.product).then_with(|| a.store.cmp(&b.store)));
    rows
}

/// 渲染 CSV 文本
pub fn render_csv(rows: &[ExportRow], include_store: bool) -> ApiResult<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let header: Vec<&str> = if include_store {
        vec!["Product", "Store", "Recommended Qty", "Final Qty"]
    } else {
        vec!["Product", "Recommended Qty", "Final Qty"]
    };
    writer.write_record(&header).map_err(export_error)?;

    for row in rows {
        let recommended = row.recommended_quantity.to_string();
        let final_qty = row.final_quantity.to_string();
        let record: Vec<&str> = if include_store {
            vec![row.product.as_str(), row.store.as_str(), recommended.as_str(), final_qty.as_str()]
        } else {
            vec![row.product.as_str(), recommended.as_str(), final_qty.as_str()]
        };
        writer.write_record(&record).map_err(export_error)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ApiError::ExportError(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ApiError::ExportError(e.to_string()))
}

fn export_error(err: csv::Error) -> ApiError {
    ApiError::ExportError(err.to_string())
}
