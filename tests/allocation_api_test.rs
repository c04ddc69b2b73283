// ==========================================
// AllocationApi / 命令分发 集成测试
// ==========================================
// 职责: 验证参数校验、错误映射、CSV 导出与命令分发
// ==========================================


#[cfg(test)]
mod allocation_api_test {
    use bakery_planner::api::dto::{
        AdjustLineRequest, AutoAllocateRequest, BulkAdjustRequest, CapacityBoundRequest,
        ProductUpsertRequest,
    };
    use bakery_planner::api::ApiError;
    use bakery_planner::app::{dispatch, AppState, ErrorResponse};
    use bakery_planner::domain::allocation::{AllocationKey, AllocationSelection};
    use bakery_planner::domain::types::{AdjustDirection, PlanStatus};
    use serde_json::{json, Value};

    use crate::test_helpers::{TestEnv, BAGEL, CROISSANT};

    const DATE: &str = "2025-01-10";

    fn adjust(store_id: &str, sku: &str, field: &str, delta: i64) -> AdjustLineRequest {
        AdjustLineRequest {
            store_id: store_id.to_string(),
            product_sku: sku.to_string(),
            day_part: None,
            field: field.to_string(),
            delta,
        }
    }

    // ==========================================
    // 参数校验
    // ==========================================

    #[test]
    fn test_invalid_date_is_rejected() {
        let env = TestEnv::new();
        let err = env.api.get_plan("10/01/2025").unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
    }

    #[test]
    fn test_get_plan_creates_pending_plan() {
        let env = TestEnv::new();
        let response = env.api.get_plan(DATE).unwrap();
        assert_eq!(response.plan.status, PlanStatus::Pending);
        assert_eq!(response.line_count, 0);

        let again = env.api.get_plan(DATE).unwrap();
        assert_eq!(again.plan.plan_id, response.plan.plan_id);
    }

    #[test]
    fn test_adjust_field_aliases_and_unknown_field() {
        let env = TestEnv::new();
        env.api.seed_plan(DATE, None, "planner").unwrap();

        let outcome = env
            .api
            .adjust_allocation(DATE, adjust("S1", BAGEL, "finalQuantity", 5), "planner")
            .unwrap();
        assert_eq!(outcome.line.quantity, 25);

        let err = env
            .api
            .adjust_allocation(DATE, adjust("S1", BAGEL, "price", 5), "planner")
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
    }

    #[test]
    fn test_seed_with_empty_store_list_is_invalid() {
        let env = TestEnv::new();
        let err = env.api.seed_plan(DATE, Some(vec![]), "").unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
    }

    #[test]
    fn test_locked_maps_to_product_locked() {
        let env = TestEnv::new();
        env.api.seed_plan(DATE, None, "").unwrap();
        env.api.confirm_product(DATE, BAGEL, "hq").unwrap();

        let err = env
            .api
            .adjust_allocation(DATE, adjust("S2", BAGEL, "final_quantity", 1), "")
            .unwrap_err();
        match err {
            ApiError::ProductLocked { product_sku, .. } => assert_eq!(product_sku, BAGEL),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_bulk_adjust_rejects_malformed_keys() {
        let env = TestEnv::new();
        env.api.seed_plan(DATE, None, "").unwrap();

        let err = env
            .api
            .bulk_adjust(
                DATE,
                BulkAdjustRequest {
                    keys: vec![AllocationKey::new("S1", BAGEL, " ")],
                    percent: 10.0,
                    direction: "increase".to_string(),
                },
                "",
            )
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));

        let err = env
            .api
            .bulk_adjust(
                DATE,
                BulkAdjustRequest {
                    keys: vec![AllocationKey::new("S1", BAGEL, "morning")],
                    percent: 10.0,
                    direction: "sideways".to_string(),
                },
                "",
            )
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
    }

    #[test]
    fn test_bulk_adjust_selection_clears_on_success() {
        let env = TestEnv::new();
        env.api.seed_plan(DATE, None, "").unwrap();

        let mut selection = AllocationSelection::new();
        selection.toggle(AllocationKey::new("S1", CROISSANT, "morning"));
        selection.toggle(AllocationKey::new("S2", CROISSANT, "morning"));

        let outcome = env
            .api
            .bulk_adjust_selection(DATE, &mut selection, 50.0, AdjustDirection::Increase, "")
            .unwrap();
        assert!(outcome.lines.iter().all(|l| l.quantity == 30));
        assert!(selection.is_empty());
    }

    #[test]
    fn test_auto_allocate_via_api() {
        let env = TestEnv::new();
        let outcome = env
            .api
            .auto_allocate(
                DATE,
                AutoAllocateRequest {
                    product_sku: CROISSANT.to_string(),
                    total_produced: 10,
                    store_ids: vec!["S1".to_string(), "S2".to_string(), "S3".to_string()],
                },
                "",
            )
            .unwrap();
        let quantities: Vec<u32> = outcome.allocations.iter().map(|l| l.quantity).collect();
        assert_eq!(quantities, vec![4, 3, 3]);
    }

    // ==========================================
    // CSV 导出
    // ==========================================

    #[test]
    fn test_export_csv_layout() {
        let env = TestEnv::new();
        env.api.seed_plan(DATE, None, "").unwrap();
        env.api
            .adjust_allocation(DATE, adjust("S1", BAGEL, "final_quantity", 5), "")
            .unwrap();

        let csv = env.api.export_csv(DATE, None).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 7);
        assert_eq!(lines[0], "Product,Store,Recommended Qty,Final Qty");
        assert_eq!(lines[1], "Butter Croissant,Central Station,20,20");
        assert_eq!(lines[4], "Sesame Bagel,Central Station,20,25");

        let scoped = env.api.export_csv(DATE, Some("S1")).unwrap();
        let lines: Vec<&str> = scoped.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Product,Recommended Qty,Final Qty",
                "Butter Croissant,20,20",
                "Sesame Bagel,20,25",
            ]
        );
    }

    #[test]
    fn test_export_csv_errors() {
        let env = TestEnv::new();
        let err = env.api.export_csv(DATE, None).unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        env.api.seed_plan(DATE, None, "").unwrap();
        let err = env.api.export_csv(DATE, Some("S404")).unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    // ==========================================
    // 目录维护
    // ==========================================

    #[test]
    fn test_upsert_product_normalizes_input() {
        let env = TestEnv::new();
        let product = env
            .api
            .upsert_product(ProductUpsertRequest {
                sku: " BAGUETTE ".to_string(),
                product_name: "Baguette".to_string(),
                category: "".to_string(),
                day_part: Some("  ".to_string()),
                clusters: vec!["residential".to_string(), "Residential".to_string()],
            })
            .unwrap();
        assert_eq!(product.sku, "BAGUETTE");
        assert_eq!(product.category, "uncategorized");
        assert_eq!(product.day_part, None);
        assert_eq!(product.clusters.len(), 1);

        let stored = env.catalog_repo.find_product("BAGUETTE").unwrap().unwrap();
        assert_eq!(stored, product);
    }

    #[test]
    fn test_upsert_capacity_bound_rejects_inverted_range() {
        let env = TestEnv::new();
        let request = |min_quantity, max_quantity| CapacityBoundRequest {
            product_sku: BAGEL.to_string(),
            store_id: "S1".to_string(),
            min_quantity,
            max_quantity,
        };

        let err = env.api.upsert_capacity_bound(request(40, 30)).unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
        assert!(env.capacity_repo.find(BAGEL, "S1").unwrap().is_none());

        // 上限为 0 表示不约束, 下限任意
        env.api.upsert_capacity_bound(request(40, 0)).unwrap();
        let bound = env.api.upsert_capacity_bound(request(30, 30)).unwrap();
        assert_eq!((bound.min_quantity, bound.max_quantity), (30, 30));
    }

    // ==========================================
    // 命令分发
    // ==========================================

    fn app_state() -> (tempfile::TempDir, AppState) {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("dispatch.db").to_string_lossy().to_string();
        let state = AppState::new(db_path).unwrap();
        (dir, state)
    }

    fn call(state: &AppState, command: &str, args: Value) -> Value {
        let output = dispatch(state, command, &args.to_string()).unwrap();
        serde_json::from_str(&output).unwrap()
    }

    fn call_err(state: &AppState, command: &str, args: Value) -> ErrorResponse {
        let output = dispatch(state, command, &args.to_string()).unwrap_err();
        serde_json::from_str(&output).unwrap()
    }

    #[test]
    fn test_dispatch_full_flow() {
        let (_dir, state) = app_state();

        call(
            &state,
            "upsert_store",
            json!({"store_id": "S1", "store_name": "Central Station", "cluster": "transport_hub"}),
        );
        call(
            &state,
            "upsert_product",
            json!({
                "sku": BAGEL,
                "product_name": "Sesame Bagel",
                "category": "bread",
                "clusters": ["transport_hub"]
            }),
        );

        let seeded = call(&state, "seed_plan", json!({"date": DATE, "operator": "planner"}));
        assert_eq!(seeded["created"].as_array().unwrap().len(), 1);

        let adjusted = call(
            &state,
            "adjust_allocation",
            json!({
                "date": DATE,
                "store_id": "S1",
                "product_sku": BAGEL,
                "field": "final_quantity",
                "delta": -4
            }),
        );
        assert_eq!(adjusted["line"]["quantity"], 16);
        assert_eq!(adjusted["plan_status"], "confirmed");

        let by_product = call(&state, "by_product", json!({"date": DATE}));
        assert_eq!(by_product[0]["planned_quantity"], 16);

        let csv = dispatch(&state, "export_csv", &json!({"date": DATE}).to_string()).unwrap();
        assert!(csv.starts_with("Product,Store,Recommended Qty,Final Qty"));

        call(&state, "confirm_product", json!({"date": DATE, "product_sku": BAGEL}));
        let err = call_err(
            &state,
            "adjust_allocation",
            json!({
                "date": DATE,
                "store_id": "S1",
                "product_sku": BAGEL,
                "field": "final_quantity",
                "delta": 1
            }),
        );
        assert_eq!(err.code, "LOCKED");
        assert_eq!(err.details.unwrap()["product_sku"], BAGEL);

        let logs = call(&state, "list_action_logs", json!({"date": DATE, "limit": 1}));
        assert_eq!(logs.as_array().unwrap().len(), 1);
        assert_eq!(logs[0]["action_type"], "CONFIRM_PRODUCT");
        assert_eq!(logs[0]["actor"], "system");
    }

    #[test]
    fn test_dispatch_error_codes() {
        let (_dir, state) = app_state();

        let err = call_err(&state, "launch_rocket", json!({}));
        assert_eq!(err.code, "INVALID_INPUT");

        let err = call_err(&state, "get_plan", json!({}));
        assert_eq!(err.code, "INVALID_INPUT");

        let err = call_err(
            &state,
            "adjust_allocation",
            json!({
                "date": DATE,
                "store_id": "S1",
                "product_sku": BAGEL,
                "field": "final_quantity",
                "delta": 1
            }),
        );
        assert_eq!(err.code, "NOT_FOUND");

        let err = call_err(
            &state,
            "auto_allocate",
            json!({"date": DATE, "product_sku": BAGEL, "total_produced": 10, "store_ids": []}),
        );
        assert_eq!(err.code, "INVALID_INPUT");
    }

    #[test]
    fn test_dispatch_config_roundtrip() {
        let (_dir, state) = app_state();

        call(
            &state,
            "set_config",
            json!({"key": "seed_base_quantity", "value": "30"}),
        );
        let config = call(&state, "get_config", json!({}));
        assert_eq!(config["seed_base_quantity"], "30");

        let err = call_err(&state, "set_config", json!({"key": " ", "value": "1"}));
        assert_eq!(err.code, "INVALID_INPUT");
    }

    #[test]
    fn test_dispatch_set_config_storage_failure() {
        let (_dir, state) = app_state();
        rusqlite::Connection::open(&state.db_path)
            .unwrap()
            .execute("DROP TABLE config_kv", [])
            .unwrap();

        let err = call_err(
            &state,
            "set_config",
            json!({"key": "seed_base_quantity", "value": "30"}),
        );
        assert_eq!(err.code, "DATABASE_ERROR");
    }
}
