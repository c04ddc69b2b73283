// ==========================================
// 并发控制测试
// ==========================================
// 职责: 验证计划级互斥下的并发调整不丢失更新
// ==========================================


#[cfg(test)]
mod concurrent_allocation_test {
    use bakery_planner::domain::types::AdjustField;
    use chrono::NaiveDate;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    use crate::test_helpers::{plan_date, TestEnv, BAGEL, CROISSANT};

    // ==========================================
    // 测试1: 同一明细并发增量
    // ==========================================

    #[test]
    fn test_concurrent_adjust_no_lost_updates() {
        let env = Arc::new(TestEnv::new());
        let date = plan_date();
        env.engine.seed_initial_allocations(date, None, "").unwrap();

        let threads = 8;
        let per_thread = 10;
        let mut handles = vec![];

        for i in 0..threads {
            let env = env.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..per_thread {
                    env.engine
                        .adjust_line(
                            date,
                            "S1",
                            BAGEL,
                            None,
                            AdjustField::FinalQuantity,
                            1,
                            &format!("user_{}", i),
                        )
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let plan = env.plan_repo.find_by_date(date).unwrap().unwrap();
        let line = env
            .allocation_repo
            .find_by_plan_and_sku(&plan.plan_id, BAGEL)
            .unwrap()
            .into_iter()
            .find(|l| l.store_id == "S1")
            .unwrap();
        assert_eq!(line.quantity, 20 + (threads * per_thread) as u32);

        let logs = env.action_log_repo.find_by_plan(&plan.plan_id, 1000).unwrap();
        let adjusts = logs.iter().filter(|l| l.action_type == "ADJUST_LINE").count();
        assert_eq!(adjusts, threads * per_thread);
    }

    // ==========================================
    // 测试2: 并发解析同一日期只产生一个计划
    // ==========================================

    #[test]
    fn test_concurrent_resolve_creates_single_plan() {
        let env = Arc::new(TestEnv::new());
        let date = plan_date();
        let mut handles = vec![];

        for _ in 0..6 {
            let env = env.clone();
            handles.push(thread::spawn(move || env.engine.resolve_plan(date).unwrap().plan_id));
        }

        let ids: HashSet<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(ids.len(), 1);
    }

    // ==========================================
    // 测试3: 并发初始分配不产生重复明细
    // ==========================================

    #[test]
    fn test_concurrent_seed_creates_each_line_once() {
        let env = Arc::new(TestEnv::new());
        let date = plan_date();
        let mut handles = vec![];

        for _ in 0..4 {
            let env = env.clone();
            handles.push(thread::spawn(move || {
                env.engine
                    .seed_initial_allocations(date, None, "")
                    .unwrap()
                    .created
                    .len()
            }));
        }

        let created: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(created, 6);
        let plan = env.plan_repo.find_by_date(date).unwrap().unwrap();
        assert_eq!(env.allocation_repo.count_by_plan(&plan.plan_id).unwrap(), 6);
    }

    // ==========================================
    // 测试4: 不同日期的计划互不阻塞
    // ==========================================

    #[test]
    fn test_different_dates_in_parallel() {
        let env = Arc::new(TestEnv::new());
        let dates: Vec<NaiveDate> = (10..14)
            .map(|d| NaiveDate::from_ymd_opt(2025, 1, d).unwrap())
            .collect();
        let mut handles = vec![];

        for date in dates.clone() {
            let env = env.clone();
            handles.push(thread::spawn(move || {
                env.engine.seed_initial_allocations(date, None, "").unwrap();
                for _ in 0..5 {
                    env.engine
                        .adjust_line(date, "S2", CROISSANT, None, AdjustField::FinalQuantity, 2, "")
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        for date in dates {
            let snapshot = env.engine.get_plan_snapshot(date).unwrap();
            assert_eq!(snapshot.lines.len(), 6);
            let line = snapshot
                .lines
                .iter()
                .find(|l| l.store_id == "S2" && l.product_sku == CROISSANT)
                .unwrap();
            assert_eq!(line.quantity, 30);
        }
    }
}
