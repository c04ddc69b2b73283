// ==========================================
// 烘焙生产计划系统 - 门店/产品目录仓储
// ==========================================
// 外部目录的本地镜像; 引擎通过 CatalogLookup 只读访问
// ==========================================

use crate::domain::catalog::{Product, Store};
use crate::domain::types::StoreCluster;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// ==========================================
// CatalogRepository - 目录仓储
// ==========================================
pub struct CatalogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CatalogRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 门店
    // ==========================================

    /// 查询全部门店（按门店名称排序）
    pub fn list_stores(&self) -> RepositoryResult<Vec<Store>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT store_id, store_name, cluster FROM stores ORDER BY store_name, store_id",
        )?;
        let stores = stmt
            .query_map([], map_store_row)?
            .collect::<Result<Vec<Store>, _>>()?;
        Ok(stores)
    }

    /// 按门店ID查询
    pub fn find_store(&self, store_id: &str) -> RepositoryResult<Option<Store>> {
        let conn = self.get_conn()?;
        let store = conn
            .query_row(
                "SELECT store_id, store_name, cluster FROM stores WHERE store_id = ?1",
                params![store_id],
                map_store_row,
            )
            .optional()?;
        Ok(store)
    }

    /// 插入或更新门店
    pub fn upsert_store(&self, store: &Store) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO stores (store_id, store_name, cluster) VALUES (?1, ?2, ?3)
               ON CONFLICT(store_id) DO UPDATE SET
                   store_name = excluded.store_name,
                   cluster = excluded.cluster"#,
            params![&store.store_id, &store.store_name, store.cluster.to_db_str()],
        )?;
        Ok(())
    }

    // ==========================================
    // 产品
    // ==========================================

    /// 查询全部产品（按SKU排序，含可售集群）
    pub fn list_products(&self) -> RepositoryResult<Vec<Product>> {
        let conn = self.get_conn()?;
        let clusters = load_cluster_map(&conn)?;

        let mut stmt = conn.prepare(
            "SELECT sku, product_name, category, day_part FROM products ORDER BY sku",
        )?;
        let products = stmt
            .query_map([], |row| {
                let sku: String = row.get(0)?;
                Ok(Product {
                    clusters: clusters.get(&sku).cloned().unwrap_or_default(),
                    sku,
                    product_name: row.get(1)?,
                    category: row.get(2)?,
                    day_part: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<Product>, _>>()?;
        Ok(products)
    }

    /// 按SKU查询产品
    pub fn find_product(&self, sku: &str) -> RepositoryResult<Option<Product>> {
        let conn = self.get_conn()?;
        let product = conn
            .query_row(
                "SELECT sku, product_name, category, day_part FROM products WHERE sku = ?1",
                params![sku],
                |row| {
                    Ok(Product {
                        sku: row.get(0)?,
                        product_name: row.get(1)?,
                        category: row.get(2)?,
                        day_part: row.get(3)?,
                        clusters: Vec::new(),
                    })
                },
            )
            .optional()?;

        match product {
            Some(mut p) => {
                p.clusters = load_clusters_for(&conn, &p.sku)?;
                Ok(Some(p))
            }
            None => Ok(None),
        }
    }

    /// 插入或更新产品（可售集群整体替换）
    pub fn upsert_product(&self, product: &Product) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"INSERT INTO products (sku, product_name, category, day_part) VALUES (?1, ?2, ?3, ?4)
               ON CONFLICT(sku) DO UPDATE SET
                   product_name = excluded.product_name,
                   category = excluded.category,
                   day_part = excluded.day_part"#,
            params![
                &product.sku,
                &product.product_name,
                &product.category,
                &product.day_part,
            ],
        )?;
        tx.execute("DELETE FROM product_clusters WHERE sku = ?1", params![&product.sku])?;
        for cluster in &product.clusters {
            tx.execute(
                "INSERT OR IGNORE INTO product_clusters (sku, cluster) VALUES (?1, ?2)",
                params![&product.sku, cluster.to_db_str()],
            )?;
        }

        tx.commit()?;
        Ok(())
    }
}

fn map_store_row(row: &rusqlite::Row) -> rusqlite::Result<Store> {
    let raw_cluster: String = row.get(2)?;
    let cluster = StoreCluster::parse(&raw_cluster).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            Type::Text,
            format!("未知门店集群: {}", raw_cluster).into(),
        )
    })?;
    Ok(Store {
        store_id: row.get(0)?,
        store_name: row.get(1)?,
        cluster,
    })
}

/// 读取 sku -> 集群列表
fn load_cluster_map(conn: &Connection) -> RepositoryResult<HashMap<String, Vec<StoreCluster>>> {
    let mut stmt = conn.prepare("SELECT sku, cluster FROM product_clusters ORDER BY sku, cluster")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut map: HashMap<String, Vec<StoreCluster>> = HashMap::new();
    for (sku, raw) in rows {
        match StoreCluster::parse(&raw) {
            Some(cluster) => map.entry(sku).or_default().push(cluster),
            None => tracing::warn!("忽略未知产品集群: sku={}, cluster={}", sku, raw),
        }
    }
    Ok(map)
}

fn load_clusters_for(conn: &Connection, sku: &str) -> RepositoryResult<Vec<StoreCluster>> {
    let mut stmt = conn.prepare("SELECT cluster FROM product_clusters WHERE sku = ?1 ORDER BY cluster")?;
    let raws = stmt
        .query_map(params![sku], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(raws.iter().filter_map(|raw| StoreCluster::parse(raw)).collect())
}
