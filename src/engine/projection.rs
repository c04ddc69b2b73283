// ==========================================
// 烘焙生产计划系统 - 汇总与投影引擎
// ==========================================
// 职责: 按产品/品类汇总, 按门店/产品投影
// 红线: 只读, 不修改任何明细
// 排序: 产品汇总按SKU, 品类汇总按品类名 (字典序), 门店视图按门店名
// ==========================================

use crate::domain::aggregate::{
    AggregatedAllocation, ProductStoreAllocation, ProductView, StoreView, StoreViewItem,
    UNCATEGORIZED,
};
use crate::domain::allocation::AllocationLine;
use crate::domain::capacity::CapacityBound;
use crate::domain::catalog::{Product, Store};
use crate::domain::plan::ProductAllocationState;
use std::collections::{BTreeMap, HashMap, HashSet};

// ==========================================
// PlanProjector - 计划投影引擎
// ==========================================
pub struct PlanProjector {
    // 无状态引擎，不需要注入依赖
}

impl Default for PlanProjector {
    fn default() -> Self {
        Self::new()
    }
}

impl PlanProjector {
    pub fn new() -> Self {
        Self {}
    }

    // ==========================================
    // 汇总
    // ==========================================

    /// 按产品汇总（跨全部门店）
    ///
    /// 分组键为 SKU 精确匹配, store_id 为占位值
    pub fn aggregate_by_product(&self, lines: &[AllocationLine]) -> Vec<AggregatedAllocation> {
        let mut groups: BTreeMap<&str, AggregatedAllocation> = BTreeMap::new();
        for line in lines {
            let entry = groups
                .entry(line.product_sku.as_str())
                .or_insert_with(|| AggregatedAllocation::empty(&line.product_sku));
            accumulate(entry, line);
        }
        groups.into_values().collect()
    }

    /// 按品类汇总（跨全部产品与门店）
    ///
    /// 品类通过目录解析, 目录中不存在的SKU归入 UNCATEGORIZED
    pub fn aggregate_by_category(
        &self,
        lines: &[AllocationLine],
        catalog: &[Product],
    ) -> Vec<AggregatedAllocation> {
        let category_of: HashMap<&str, &str> = catalog
            .iter()
            .map(|p| (p.sku.as_str(), p.category.as_str()))
            .collect();

        let mut groups: BTreeMap<&str, AggregatedAllocation> = BTreeMap::new();
        for line in lines {
            let category = category_of
                .get(line.product_sku.as_str())
                .copied()
                .unwrap_or(UNCATEGORIZED);
            let entry = groups
                .entry(category)
                .or_insert_with(|| AggregatedAllocation::empty(category));
            accumulate(entry, line);
        }
        groups.into_values().collect()
    }

    // ==========================================
    // 投影
    // ==========================================

    /// 按门店投影
    ///
    /// 每个门店列出其集群范围内全部产品（无明细时数量为0）,
    /// 另外附上该门店在范围外但已有明细的产品。
    pub fn project_by_store(
        &self,
        stores: &[Store],
        products: &[Product],
        lines: &[AllocationLine],
        states: &[ProductAllocationState],
        bounds: &HashMap<(String, String), CapacityBound>,
        default_day_part: &str,
    ) -> Vec<StoreView> {
        let product_by_sku: HashMap<&str, &Product> =
            products.iter().map(|p| (p.sku.as_str(), p)).collect();
        let locked: HashSet<&str> = states
            .iter()
            .filter(|s| s.locked)
            .map(|s| s.product_sku.as_str())
            .collect();

        let mut lines_by_store: HashMap<&str, Vec<&AllocationLine>> = HashMap::new();
        for line in lines {
            lines_by_store.entry(line.store_id.as_str()).or_default().push(line);
        }

        stores
            .iter()
            .map(|store| {
                let store_lines = lines_by_store.remove(store.store_id.as_str()).unwrap_or_default();
                let mut items = Vec::new();
                let mut covered: HashSet<&str> = HashSet::new();

                for product in products.iter().filter(|p| p.is_available_for(store.cluster)) {
                    covered.insert(product.sku.as_str());
                    let matching: Vec<&&AllocationLine> = store_lines
                        .iter()
                        .filter(|l| l.product_sku == product.sku)
                        .collect();

                    if matching.is_empty() {
                        let bound = lookup_bound(bounds, &product.sku, &store.store_id);
                        items.push(StoreViewItem {
                            product_sku: product.sku.clone(),
                            product_name: product.product_name.clone(),
                            category: product.category.clone(),
                            day_part: product.day_part_or(default_day_part).to_string(),
                            has_line: false,
                            quantity: 0,
                            recommended_quantity: 0,
                            manufactured_quantity: 0,
                            manufactured_recorded: false,
                            received_quantity: None,
                            locked: locked.contains(product.sku.as_str()),
                            capacity_min: bound.min_quantity,
                            capacity_max: bound.max_quantity,
                            capacity_status: bound.status_of(0),
                        });
                    } else {
                        for line in matching {
                            items.push(store_item(line, Some(product), &locked, bounds));
                        }
                    }
                }

                // 范围外但已有明细的产品
                for line in store_lines.iter().filter(|l| !covered.contains(l.product_sku.as_str())) {
                    let product = product_by_sku.get(line.product_sku.as_str()).copied();
                    items.push(store_item(line, product, &locked, bounds));
                }

                let total_quantity = items.iter().map(|i| i.quantity as u64).sum();
                StoreView {
                    store_id: store.store_id.clone(),
                    store_name: store.store_name.clone(),
                    cluster: store.cluster,
                    items,
                    total_quantity,
                }
            })
            .collect()
    }

    /// 按产品投影（含门店明细）
    ///
    /// 只包含已有明细的产品, 按SKU排序; 门店按门店名排序
    pub fn project_by_product(
        &self,
        products: &[Product],
        stores: &[Store],
        lines: &[AllocationLine],
        states: &[ProductAllocationState],
    ) -> Vec<ProductView> {
        let product_by_sku: HashMap<&str, &Product> =
            products.iter().map(|p| (p.sku.as_str(), p)).collect();
        let store_by_id: HashMap<&str, &Store> =
            stores.iter().map(|s| (s.store_id.as_str(), s)).collect();
        let state_by_sku: HashMap<&str, &ProductAllocationState> =
            states.iter().map(|s| (s.product_sku.as_str(), s)).collect();

        let mut grouped: BTreeMap<&str, Vec<&AllocationLine>> = BTreeMap::new();
        for line in lines {
            grouped.entry(line.product_sku.as_str()).or_default().push(line);
        }

        grouped
            .into_iter()
            .map(|(sku, sku_lines)| {
                let product = product_by_sku.get(sku);
                let state = state_by_sku.get(sku);

                let mut store_rows: Vec<ProductStoreAllocation> = sku_lines
                    .iter()
                    .map(|line| ProductStoreAllocation {
                        store_id: line.store_id.clone(),
                        store_name: store_by_id
                            .get(line.store_id.as_str())
                            .map(|s| s.store_name.clone())
                            .unwrap_or_else(|| line.store_id.clone()),
                        day_part: line.day_part.clone(),
                        quantity: line.quantity,
                        manufactured_quantity: line.effective_manufactured(),
                    })
                    .collect();
                store_rows.sort_by(|a, b| {
                    a.store_name
                        .cmp(&b.store_name)
                        .then_with(|| a.store_id.cmp(&b.store_id))
                        .then_with(|| a.day_part.cmp(&b.day_part))
                });

                ProductView {
                    product_sku: sku.to_string(),
                    product_name: product
                        .map(|p| p.product_name.clone())
                        .unwrap_or_else(|| sku.to_string()),
                    category: product
                        .map(|p| p.category.clone())
                        .unwrap_or_else(|| UNCATEGORIZED.to_string()),
                    locked: state.map(|s| s.locked).unwrap_or(false),
                    overridden: state.map(|s| s.overridden).unwrap_or(false),
                    planned_quantity: sku_lines.iter().map(|l| l.quantity as u64).sum(),
                    manufactured_quantity: sku_lines
                        .iter()
                        .map(|l| l.effective_manufactured() as u64)
                        .sum(),
                    stores: store_rows,
                }
            })
            .collect()
    }
}

fn accumulate(entry: &mut AggregatedAllocation, line: &AllocationLine) {
    entry.planned_quantity += line.quantity as u64;
    entry.manufactured_quantity += line.effective_manufactured() as u64;
    if let Some(h) = line.historical_sales {
        entry.historical_sales = Some(entry.historical_sales.unwrap_or(0) + h as u64);
    }
    if let Some(p) = line.predicted_sales {
        entry.predicted_sales = Some(entry.predicted_sales.unwrap_or(0) + p as u64);
    }
    entry.line_count += 1;
}

fn lookup_bound(
    bounds: &HashMap<(String, String), CapacityBound>,
    sku: &str,
    store_id: &str,
) -> CapacityBound {
    bounds
        .get(&(sku.to_string(), store_id.to_string()))
        .cloned()
        .unwrap_or_else(|| CapacityBound::unset(sku, store_id))
}

fn store_item(
    line: &AllocationLine,
    product: Option<&Product>,
    locked: &HashSet<&str>,
    bounds: &HashMap<(String, String), CapacityBound>,
) -> StoreViewItem {
    let bound = lookup_bound(bounds, &line.product_sku, &line.store_id);
    StoreViewItem {
        product_sku: line.product_sku.clone(),
        product_name: product
            .map(|p| p.product_name.clone())
            .unwrap_or_else(|| line.product_sku.clone()),
        category: product
            .map(|p| p.category.clone())
            .unwrap_or_else(|| UNCATEGORIZED.to_string()),
        day_part: line.day_part.clone(),
        has_line: true,
        quantity: line.quantity,
        recommended_quantity: line.recommended_quantity,
        manufactured_quantity: line.effective_manufactured(),
        manufactured_recorded: line.manufactured_quantity.is_set(),
        received_quantity: line.received_quantity,
        locked: locked.contains(line.product_sku.as_str()),
        capacity_min: bound.min_quantity,
        capacity_max: bound.max_quantity,
        capacity_status: bound.status_of(line.quantity),
    }
}
