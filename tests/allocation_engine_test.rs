// ==========================================
// 分配引擎集成测试
// ==========================================
// 职责: 验证初始分配 / 增量调整 / 批量调整 / 自动均分 / 确认锁定
// ==========================================


#[cfg(test)]
mod allocation_engine_test {
    use bakery_planner::domain::allocation::{AllocationKey, AllocationLine, ManufacturedQuantity};
    use bakery_planner::domain::types::{
        AdjustDirection, AdjustField, CapacityEnforcement, CapacityStatus, DistributionMode,
        PlanStatus,
    };
    use bakery_planner::engine::{AllocationError, EngineConfig, SplitProportionally};
    use bakery_planner::repository::AllocationWriteSet;
    use chrono::Local;
    use std::collections::BTreeSet;

    use crate::test_helpers::{plan_date, TestEnv, BAGEL, CROISSANT, STORE_IDS};

    fn line_qty(env: &TestEnv, store_id: &str, sku: &str) -> u32 {
        let plan = env.plan_repo.find_by_date(plan_date()).unwrap().unwrap();
        env.allocation_repo
            .find_by_plan(&plan.plan_id)
            .unwrap()
            .into_iter()
            .find(|l| l.store_id == store_id && l.product_sku == sku)
            .map(|l| l.quantity)
            .unwrap()
    }

    fn stores(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    // ==========================================
    // 端到端场景
    // ==========================================

    #[test]
    fn test_end_to_end_scenario() {
        let env = TestEnv::new();
        let date = plan_date();

        // 1. 初始分配: 3 门店 × 2 产品, 每行 20
        let seeded = env
            .engine
            .seed_initial_allocations(date, None, "planner")
            .unwrap();
        assert_eq!(seeded.created.len(), 6);
        assert_eq!(seeded.lines.len(), 6);
        assert!(seeded.lines.iter().all(|l| l.quantity == 20));
        assert_eq!(seeded.plan.status, PlanStatus::Pending);
        assert!(seeded.plan.seeded);

        // 2. 单行 +5 -> 25, 计划转为 confirmed
        let adjusted = env
            .engine
            .adjust_line(date, "S1", BAGEL, None, AdjustField::FinalQuantity, 5, "planner")
            .unwrap();
        assert_eq!(adjusted.line.quantity, 25);
        assert_eq!(adjusted.plan_status, PlanStatus::Confirmed);

        // 3. 其余 5 行上调 10% -> 22
        let keys: BTreeSet<AllocationKey> = seeded
            .lines
            .iter()
            .filter(|l| !(l.store_id == "S1" && l.product_sku == BAGEL))
            .map(|l| l.key())
            .collect();
        assert_eq!(keys.len(), 5);
        let bulk = env
            .engine
            .bulk_adjust(date, &keys, 10.0, AdjustDirection::Increase, "planner")
            .unwrap();
        assert_eq!(bulk.lines.len(), 5);
        assert!(bulk.lines.iter().all(|l| l.quantity == 22));
        assert_eq!(line_qty(&env, "S1", BAGEL), 25);

        // 4. 确认 BAGEL 后, BAGEL 拒绝修改, CROISSANT 可继续调整
        let state = env.engine.confirm_product(date, BAGEL, "hq").unwrap();
        assert!(state.locked);
        assert_eq!(state.locked_by.as_deref(), Some("hq"));

        for store_id in STORE_IDS {
            let err = env
                .engine
                .adjust_line(date, store_id, BAGEL, None, AdjustField::FinalQuantity, 1, "planner")
                .unwrap_err();
            assert!(matches!(err, AllocationError::Locked { .. }));
        }
        let ok = env
            .engine
            .adjust_line(date, "S2", CROISSANT, None, AdjustField::FinalQuantity, -2, "planner")
            .unwrap();
        assert_eq!(ok.line.quantity, 20);

        let logs = env.api.list_action_logs("2025-01-10", None).unwrap();
        let types: Vec<&str> = logs.iter().map(|l| l.action_type.as_str()).collect();
        assert_eq!(
            types,
            vec!["ADJUST_LINE", "CONFIRM_PRODUCT", "BULK_ADJUST", "ADJUST_LINE", "SEED"]
        );
    }

    // ==========================================
    // 初始分配
    // ==========================================

    #[test]
    fn test_seed_is_idempotent() {
        let env = TestEnv::new();
        let date = plan_date();

        env.engine.seed_initial_allocations(date, None, "").unwrap();
        env.engine
            .adjust_line(date, "S3", CROISSANT, None, AdjustField::FinalQuantity, -20, "")
            .unwrap();

        let again = env.engine.seed_initial_allocations(date, None, "").unwrap();
        assert!(again.created.is_empty());
        assert_eq!(again.lines.len(), 6);
        assert_eq!(line_qty(&env, "S3", CROISSANT), 0);

        let plan = env.plan_repo.find_by_date(date).unwrap().unwrap();
        assert_eq!(env.allocation_repo.count_by_plan(&plan.plan_id).unwrap(), 6);
    }

    #[test]
    fn test_seed_subset_then_remaining_stores() {
        let env = TestEnv::new();
        let date = plan_date();

        let first = env
            .engine
            .seed_initial_allocations(date, Some(&stores(&["S1"])), "")
            .unwrap();
        assert_eq!(first.created.len(), 2);

        let second = env
            .engine
            .seed_initial_allocations(date, Some(&stores(&["S1", "S2"])), "")
            .unwrap();
        assert_eq!(second.created.len(), 2);
        assert_eq!(second.skipped_store_ids, vec!["S1".to_string()]);
        assert_eq!(second.lines.len(), 4);
    }

    #[test]
    fn test_seed_unknown_store_is_not_found() {
        let env = TestEnv::new();
        let err = env
            .engine
            .seed_initial_allocations(plan_date(), Some(&stores(&["NOPE"])), "")
            .unwrap_err();
        assert!(matches!(err, AllocationError::NotFound { .. }));
    }

    #[test]
    fn test_seed_uses_configured_base_quantity() {
        let config = EngineConfig {
            seed_base_quantity: 12,
            ..EngineConfig::default()
        };
        let env = TestEnv::with_config(config);
        let seeded = env
            .engine
            .seed_initial_allocations(plan_date(), None, "")
            .unwrap();
        assert!(seeded.lines.iter().all(|l| l.quantity == 12 && l.recommended_quantity == 12));
    }

    // ==========================================
    // 单行调整
    // ==========================================

    #[test]
    fn test_adjust_clamps_at_zero() {
        let env = TestEnv::new();
        let date = plan_date();
        env.engine.seed_initial_allocations(date, None, "").unwrap();

        let outcome = env
            .engine
            .adjust_line(date, "S1", BAGEL, None, AdjustField::FinalQuantity, -1000, "")
            .unwrap();
        assert_eq!(outcome.line.quantity, 0);
    }

    #[test]
    fn test_adjust_manufactured_starts_from_quantity() {
        let env = TestEnv::new();
        let date = plan_date();
        env.engine.seed_initial_allocations(date, None, "").unwrap();

        let outcome = env
            .engine
            .adjust_line(date, "S2", BAGEL, None, AdjustField::ManufacturedQuantity, -3, "")
            .unwrap();
        assert_eq!(outcome.line.manufactured_quantity, ManufacturedQuantity::Value(17));
        assert_eq!(outcome.line.quantity, 20);
        // 生产量调整不确认计划
        assert_eq!(outcome.plan_status, PlanStatus::Pending);
    }

    #[test]
    fn test_adjust_missing_line_is_not_found() {
        let env = TestEnv::new();
        let date = plan_date();
        env.engine.seed_initial_allocations(date, None, "").unwrap();

        let err = env
            .engine
            .adjust_line(date, "S1", "BAGUETTE", None, AdjustField::FinalQuantity, 1, "")
            .unwrap_err();
        assert!(matches!(err, AllocationError::NotFound { .. }));
    }

    #[test]
    fn test_adjust_without_plan_is_not_found() {
        let env = TestEnv::new();
        let err = env
            .engine
            .adjust_line(plan_date(), "S1", BAGEL, None, AdjustField::FinalQuantity, 1, "")
            .unwrap_err();
        assert!(matches!(err, AllocationError::NotFound { .. }));
        assert!(env.plan_repo.find_by_date(plan_date()).unwrap().is_none());
    }

    #[test]
    fn test_adjust_marks_product_overridden() {
        let env = TestEnv::new();
        let date = plan_date();
        env.engine.seed_initial_allocations(date, None, "").unwrap();
        env.engine
            .adjust_line(date, "S1", BAGEL, None, AdjustField::FinalQuantity, 2, "")
            .unwrap();

        let plan = env.plan_repo.find_by_date(date).unwrap().unwrap();
        let state = env
            .product_state_repo
            .find_or_default(&plan.plan_id, BAGEL)
            .unwrap();
        assert!(state.overridden);
        assert!(!state.locked);
    }

    // ==========================================
    // 锁定单调性
    // ==========================================

    #[test]
    fn test_locked_rejection_leaves_values_unchanged() {
        let env = TestEnv::new();
        let date = plan_date();
        env.engine.seed_initial_allocations(date, None, "").unwrap();
        env.engine.confirm_product(date, CROISSANT, "hq").unwrap();

        let keys: BTreeSet<AllocationKey> = STORE_IDS
            .iter()
            .flat_map(|s| {
                [
                    AllocationKey::new(s, BAGEL, "morning"),
                    AllocationKey::new(s, CROISSANT, "morning"),
                ]
            })
            .collect();
        let err = env
            .engine
            .bulk_adjust(date, &keys, 50.0, AdjustDirection::Increase, "")
            .unwrap_err();
        assert!(matches!(err, AllocationError::Locked { .. }));

        let err = env
            .engine
            .auto_allocate(date, CROISSANT, 90, &stores(&["S1"]), "")
            .unwrap_err();
        assert!(matches!(err, AllocationError::Locked { .. }));

        let err = env
            .engine
            .adjust_product(date, CROISSANT, AdjustField::FinalQuantity, 5, "")
            .unwrap_err();
        assert!(matches!(err, AllocationError::Locked { .. }));

        for store_id in STORE_IDS {
            assert_eq!(line_qty(&env, store_id, BAGEL), 20);
            assert_eq!(line_qty(&env, store_id, CROISSANT), 20);
        }
        let plan = env.plan_repo.find_by_date(date).unwrap().unwrap();
        assert_eq!(plan.status, PlanStatus::Pending);
    }

    #[test]
    fn test_locked_wins_over_ambiguous_day_part() {
        let env = TestEnv::new();
        let date = plan_date();
        let seeded = env.engine.seed_initial_allocations(date, None, "").unwrap();

        // 同一 (门店, SKU) 增加下午时段
        let plan_id = seeded.plan.plan_id.clone();
        let now = Local::now().naive_local();
        let mut write_set = AllocationWriteSet::new(&plan_id, now);
        write_set.lines.push(AllocationLine::new(
            &plan_id,
            &AllocationKey::new("S1", BAGEL, "afternoon"),
            12,
            now,
        ));
        env.allocation_repo.commit(&write_set).unwrap();

        let err = env
            .engine
            .adjust_line(date, "S1", BAGEL, None, AdjustField::FinalQuantity, 1, "")
            .unwrap_err();
        assert!(matches!(err, AllocationError::InvalidArgument(_)));

        env.engine.confirm_product(date, BAGEL, "hq").unwrap();
        let err = env
            .engine
            .adjust_line(date, "S1", BAGEL, None, AdjustField::FinalQuantity, 1, "")
            .unwrap_err();
        assert!(matches!(err, AllocationError::Locked { .. }));
        let morning = env
            .allocation_repo
            .find_by_key(&plan_id, &AllocationKey::new("S1", BAGEL, "morning"))
            .unwrap()
            .unwrap();
        assert_eq!(morning.quantity, 20);
    }

    #[test]
    fn test_confirm_product_is_idempotent() {
        let env = TestEnv::new();
        let date = plan_date();
        env.engine.seed_initial_allocations(date, None, "").unwrap();

        let first = env.engine.confirm_product(date, BAGEL, "alice").unwrap();
        let second = env.engine.confirm_product(date, BAGEL, "bob").unwrap();
        assert!(first.locked && second.locked);
        assert_eq!(second.locked_by.as_deref(), Some("alice"));
        assert!(second.locked_at.is_some());

        let logs = env.api.list_action_logs("2025-01-10", None).unwrap();
        let confirms = logs
            .iter()
            .filter(|l| l.action_type == "CONFIRM_PRODUCT")
            .count();
        assert_eq!(confirms, 1);
    }

    // ==========================================
    // 批量调整
    // ==========================================

    #[test]
    fn test_bulk_adjust_rejects_invalid_percent() {
        let env = TestEnv::new();
        let date = plan_date();
        env.engine.seed_initial_allocations(date, None, "").unwrap();
        let keys: BTreeSet<AllocationKey> =
            [AllocationKey::new("S1", BAGEL, "morning")].into_iter().collect();

        for percent in [0.0, 100.5, f64::NAN] {
            let err = env
                .engine
                .bulk_adjust(date, &keys, percent, AdjustDirection::Increase, "")
                .unwrap_err();
            assert!(matches!(err, AllocationError::InvalidArgument(_)));
        }
        assert_eq!(line_qty(&env, "S1", BAGEL), 20);
    }

    #[test]
    fn test_bulk_decrease_rounds_half_away_from_zero() {
        let env = TestEnv::new();
        let date = plan_date();
        env.engine.seed_initial_allocations(date, None, "").unwrap();
        let keys: BTreeSet<AllocationKey> =
            [AllocationKey::new("S2", CROISSANT, "morning")].into_iter().collect();

        // 20 * 0.75 = 15
        let outcome = env
            .engine
            .bulk_adjust(date, &keys, 25.0, AdjustDirection::Decrease, "")
            .unwrap();
        assert_eq!(outcome.lines[0].quantity, 15);

        // 15 * 0.9 = 13.5 -> 14
        let outcome = env
            .engine
            .bulk_adjust(date, &keys, 10.0, AdjustDirection::Decrease, "")
            .unwrap();
        assert_eq!(outcome.lines[0].quantity, 14);
    }

    #[test]
    fn test_bulk_fractional_percent_rounds_half_away_from_zero() {
        let env = TestEnv::new();
        let date = plan_date();
        env.engine.seed_initial_allocations(date, None, "").unwrap();
        let s1: BTreeSet<AllocationKey> =
            [AllocationKey::new("S1", BAGEL, "morning")].into_iter().collect();
        let s2: BTreeSet<AllocationKey> =
            [AllocationKey::new("S2", BAGEL, "morning")].into_iter().collect();

        // 20 * 1.025 = 20.5 -> 21
        let outcome = env
            .engine
            .bulk_adjust(date, &s1, 2.5, AdjustDirection::Increase, "")
            .unwrap();
        assert_eq!(outcome.lines[0].quantity, 21);

        // 20 * 0.975 = 19.5 -> 20
        let outcome = env
            .engine
            .bulk_adjust(date, &s2, 2.5, AdjustDirection::Decrease, "")
            .unwrap();
        assert_eq!(outcome.lines[0].quantity, 20);

        // 20 * 1.075 = 21.5 -> 22
        let outcome = env
            .engine
            .bulk_adjust(date, &s2, 7.5, AdjustDirection::Increase, "")
            .unwrap();
        assert_eq!(outcome.lines[0].quantity, 22);
        assert_eq!(line_qty(&env, "S1", BAGEL), 21);
    }

    #[test]
    fn test_bulk_unknown_key_is_not_found() {
        let env = TestEnv::new();
        let date = plan_date();
        env.engine.seed_initial_allocations(date, None, "").unwrap();
        let keys: BTreeSet<AllocationKey> = [
            AllocationKey::new("S1", BAGEL, "morning"),
            AllocationKey::new("S1", BAGEL, "evening"),
        ]
        .into_iter()
        .collect();

        let err = env
            .engine
            .bulk_adjust(date, &keys, 10.0, AdjustDirection::Increase, "")
            .unwrap_err();
        assert!(matches!(err, AllocationError::NotFound { .. }));
        assert_eq!(line_qty(&env, "S1", BAGEL), 20);
    }

    // ==========================================
    // 自动均分
    // ==========================================

    #[test]
    fn test_auto_allocate_conserves_total() {
        let env = TestEnv::new();
        let date = plan_date();
        env.engine.seed_initial_allocations(date, None, "").unwrap();

        let outcome = env
            .engine
            .auto_allocate(date, BAGEL, 100, &stores(&["S3", "S1", "S2"]), "")
            .unwrap();
        let quantities: Vec<(String, u32)> = outcome
            .allocations
            .iter()
            .map(|l| (l.store_id.clone(), l.quantity))
            .collect();
        assert_eq!(
            quantities,
            vec![
                ("S3".to_string(), 34),
                ("S1".to_string(), 33),
                ("S2".to_string(), 33),
            ]
        );
        let total: u32 = outcome.allocations.iter().map(|l| l.quantity).sum();
        assert_eq!(total, 100);
        assert!(outcome.zeroed.is_empty());
        // 其他产品不受影响
        assert_eq!(line_qty(&env, "S1", CROISSANT), 20);
    }

    #[test]
    fn test_auto_allocate_zeroes_stores_outside_list() {
        let env = TestEnv::new();
        let date = plan_date();
        env.engine.seed_initial_allocations(date, None, "").unwrap();
        env.engine
            .adjust_line(date, "S1", BAGEL, None, AdjustField::FinalQuantity, 3, "")
            .unwrap();

        let outcome = env
            .engine
            .auto_allocate(date, BAGEL, 7, &stores(&["S1", "S2"]), "")
            .unwrap();
        assert_eq!(outcome.allocations[0].quantity, 4);
        assert_eq!(outcome.allocations[1].quantity, 3);
        assert_eq!(outcome.zeroed.len(), 1);
        assert_eq!(line_qty(&env, "S3", BAGEL), 0);

        let plan = env.plan_repo.find_by_date(date).unwrap().unwrap();
        let state = env
            .product_state_repo
            .find_or_default(&plan.plan_id, BAGEL)
            .unwrap();
        assert!(!state.overridden);
    }

    #[test]
    fn test_auto_allocate_creates_plan_and_lines() {
        let env = TestEnv::new();
        let date = plan_date();

        let outcome = env
            .engine
            .auto_allocate(date, CROISSANT, 2, &stores(&["S1", "S2", "S3"]), "")
            .unwrap();
        let quantities: Vec<u32> = outcome.allocations.iter().map(|l| l.quantity).collect();
        assert_eq!(quantities, vec![1, 1, 0]);
        assert_eq!(outcome.plan_status, PlanStatus::Pending);
        assert!(env.plan_repo.find_by_date(date).unwrap().is_some());
    }

    #[test]
    fn test_auto_allocate_rejects_bad_store_lists() {
        let env = TestEnv::new();
        let date = plan_date();

        let err = env.engine.auto_allocate(date, BAGEL, 10, &[], "").unwrap_err();
        assert!(matches!(err, AllocationError::InvalidArgument(_)));

        let err = env
            .engine
            .auto_allocate(date, BAGEL, 10, &stores(&["S1", "S1"]), "")
            .unwrap_err();
        assert!(matches!(err, AllocationError::InvalidArgument(_)));

        let err = env
            .engine
            .auto_allocate(date, BAGEL, 10, &stores(&["S9"]), "")
            .unwrap_err();
        assert!(matches!(err, AllocationError::NotFound { .. }));
    }

    // ==========================================
    // 汇总视图增量分摊
    // ==========================================

    #[test]
    fn test_adjust_product_apply_to_all() {
        let env = TestEnv::new();
        let date = plan_date();
        env.engine.seed_initial_allocations(date, None, "").unwrap();

        let outcome = env
            .engine
            .adjust_product(date, BAGEL, AdjustField::FinalQuantity, 4, "")
            .unwrap();
        assert_eq!(outcome.distribution_mode, DistributionMode::ApplyToAll);
        assert!(outcome.lines.iter().all(|l| l.quantity == 24));
        assert_eq!(outcome.plan_status, PlanStatus::Confirmed);
    }

    #[test]
    fn test_adjust_product_split_proportionally() {
        let env = TestEnv::build(EngineConfig::default(), |engine| {
            engine.with_distribution_policy(Box::new(SplitProportionally))
        });
        let date = plan_date();
        env.engine.seed_initial_allocations(date, None, "").unwrap();

        let outcome = env
            .engine
            .adjust_product(date, CROISSANT, AdjustField::FinalQuantity, 6, "")
            .unwrap();
        assert_eq!(outcome.distribution_mode, DistributionMode::SplitProportionally);
        let total: u32 = outcome.lines.iter().map(|l| l.quantity).sum();
        assert_eq!(total, 66);
        assert!(outcome.lines.iter().all(|l| l.quantity == 22));
    }

    #[test]
    fn test_adjust_product_split_proportionally_extreme_deltas() {
        let env = TestEnv::build(EngineConfig::default(), |engine| {
            engine.with_distribution_policy(Box::new(SplitProportionally))
        });
        let date = plan_date();
        env.engine.seed_initial_allocations(date, None, "").unwrap();

        let outcome = env
            .engine
            .adjust_product(date, CROISSANT, AdjustField::FinalQuantity, i64::MIN, "")
            .unwrap();
        assert!(outcome.lines.iter().all(|l| l.quantity == 0));

        // 全部为 0 时等分, 上界饱和
        let outcome = env
            .engine
            .adjust_product(date, CROISSANT, AdjustField::FinalQuantity, i64::MAX, "")
            .unwrap();
        assert!(outcome.lines.iter().all(|l| l.quantity == u32::MAX));

        let outcome = env
            .engine
            .adjust_product(date, BAGEL, AdjustField::ManufacturedQuantity, i64::MIN, "")
            .unwrap();
        assert!(outcome
            .lines
            .iter()
            .all(|l| l.manufactured_quantity == ManufacturedQuantity::Value(0)));
        for store_id in STORE_IDS {
            assert_eq!(line_qty(&env, store_id, BAGEL), 20);
        }
    }

    // ==========================================
    // 产能区间
    // ==========================================

    #[test]
    fn test_capacity_is_advisory_by_default() {
        let env = TestEnv::new();
        let date = plan_date();
        env.set_capacity(BAGEL, "S1", 5, 22);
        env.engine.seed_initial_allocations(date, None, "").unwrap();

        let outcome = env
            .engine
            .adjust_line(date, "S1", BAGEL, None, AdjustField::FinalQuantity, 2, "")
            .unwrap();
        assert_eq!(outcome.capacity.status, CapacityStatus::AtCapacity);

        let outcome = env
            .engine
            .adjust_line(date, "S1", BAGEL, None, AdjustField::FinalQuantity, 3, "")
            .unwrap();
        assert_eq!(outcome.line.quantity, 25);
        assert_eq!(outcome.capacity.status, CapacityStatus::OverCapacity);
    }

    #[test]
    fn test_capacity_strict_blocks_increase_only() {
        let config = EngineConfig {
            capacity_enforcement: CapacityEnforcement::Strict,
            ..EngineConfig::default()
        };
        let env = TestEnv::with_config(config);
        let date = plan_date();
        env.set_capacity(BAGEL, "S1", 0, 15);
        env.engine.seed_initial_allocations(date, None, "").unwrap();

        let err = env
            .engine
            .adjust_line(date, "S1", BAGEL, None, AdjustField::FinalQuantity, 1, "")
            .unwrap_err();
        assert!(matches!(
            err,
            AllocationError::CapacityExceeded { max_quantity: 15, .. }
        ));
        assert_eq!(line_qty(&env, "S1", BAGEL), 20);

        // 下调仍允许（即使仍高于上限）
        let outcome = env
            .engine
            .adjust_line(date, "S1", BAGEL, None, AdjustField::FinalQuantity, -2, "")
            .unwrap();
        assert_eq!(outcome.line.quantity, 18);
    }

    // ==========================================
    // 计划确认与视图
    // ==========================================

    #[test]
    fn test_confirm_plan_is_monotonic() {
        let env = TestEnv::new();
        let date = plan_date();
        env.engine.seed_initial_allocations(date, None, "").unwrap();

        let plan = env.engine.confirm_plan(date, "hq").unwrap();
        assert_eq!(plan.status, PlanStatus::Confirmed);

        env.engine
            .adjust_line(date, "S1", BAGEL, None, AdjustField::ManufacturedQuantity, 1, "")
            .unwrap();
        let plan = env.plan_repo.find_by_date(date).unwrap().unwrap();
        assert_eq!(plan.status, PlanStatus::Confirmed);
    }

    #[test]
    fn test_views_without_plan_are_empty() {
        let env = TestEnv::new();
        let date = plan_date();
        assert!(env.engine.aggregate_by_product(date).unwrap().is_empty());
        assert!(env.engine.aggregate_by_category(date).unwrap().is_empty());
        assert!(env.engine.project_by_product(date).unwrap().is_empty());
        assert!(env.plan_repo.find_by_date(date).unwrap().is_none());

        // 门店视图仍展示目录范围内的占位行
        let by_store = env.engine.project_by_store(date).unwrap();
        assert_eq!(by_store.len(), 3);
        assert!(by_store.iter().all(|s| s.items.len() == 2 && s.items.iter().all(|i| !i.has_line)));
    }

    #[test]
    fn test_aggregations_after_edits() {
        let env = TestEnv::new();
        let date = plan_date();
        env.engine.seed_initial_allocations(date, None, "").unwrap();
        env.engine
            .adjust_line(date, "S1", BAGEL, None, AdjustField::FinalQuantity, 10, "")
            .unwrap();

        let by_product = env.engine.aggregate_by_product(date).unwrap();
        assert_eq!(by_product.len(), 2);
        assert_eq!(by_product[0].group_key, BAGEL);
        assert_eq!(by_product[0].planned_quantity, 70);
        assert_eq!(by_product[1].planned_quantity, 60);

        let by_category = env.engine.aggregate_by_category(date).unwrap();
        let keys: Vec<&str> = by_category.iter().map(|a| a.group_key.as_str()).collect();
        assert_eq!(keys, vec!["bread", "pastry"]);
        assert_eq!(by_category[0].line_count, 3);
    }
}
