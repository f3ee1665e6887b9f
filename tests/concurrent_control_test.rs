// ==========================================
// 并发控制测试
// ==========================================
// 职责: 验证系统的并发控制机制
// ==========================================


#[cfg(test)]
mod concurrent_control_test {
    use print_broker_core::api::{ApiError, ChangeOrderApi, JobApi};
    use print_broker_core::config::config_manager::ConfigManager;
    use print_broker_core::domain::change_order::{ChangeEntry, ChangeSet, DraftUpdate};
    use print_broker_core::domain::component::JobClassification;
    use print_broker_core::domain::types::JobType;
    use print_broker_core::engine::{ComponentSuggestionEngine, ComponentValidator};
    use print_broker_core::repository::{
        ActionLogRepository, ChangeOrderRepository, ComponentRepository, JobRepository,
    };
    use rusqlite::Connection;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};
    use std::thread;
    use tempfile::NamedTempFile;

    use crate::test_helpers::create_test_db;

    // ==========================================
    // 测试辅助函数
    // ==========================================

    /// 创建测试环境
    fn setup_test_env() -> (NamedTempFile, Arc<JobApi>, Arc<ChangeOrderApi>) {
        let (temp_file, db_path) = create_test_db().unwrap();

        let conn = Arc::new(Mutex::new(Connection::open(&db_path).unwrap()));
        let job_repo = Arc::new(JobRepository::new(conn.clone()));
        let component_repo = Arc::new(ComponentRepository::new(conn.clone()));
        let change_order_repo = Arc::new(ChangeOrderRepository::new(conn.clone()));
        let action_log_repo = Arc::new(ActionLogRepository::new(conn.clone()));
        let config_manager = Arc::new(ConfigManager::from_connection(conn.clone()).unwrap());

        let job_api = Arc::new(JobApi::new(
            job_repo.clone(),
            component_repo,
            action_log_repo.clone(),
            config_manager,
            Arc::new(ComponentSuggestionEngine::new()),
            Arc::new(ComponentValidator::new()),
        ));

        let change_order_api = Arc::new(ChangeOrderApi::new(
            job_repo,
            change_order_repo,
            action_log_repo,
        ));

        (temp_file, job_api, change_order_api)
    }

    // ==========================================
    // 测试1: 并发创建工单 - 编号不重不漏
    // ==========================================

    #[test]
    fn test_concurrent_job_creation_unique_contiguous_seq() {
        let (_temp_file, job_api, _co_api) = setup_test_env();

        let thread_count = 8;
        let jobs_per_thread = 5;

        let mut handles = Vec::new();
        for t in 0..thread_count {
            let api = job_api.clone();
            handles.push(thread::spawn(move || {
                let classification = JobClassification::job(JobType::Flat);
                let mut created = Vec::new();
                for _ in 0..jobs_per_thread {
                    let job = api
                        .create_job(
                            "BK".to_string(),
                            &classification,
                            format!("worker_{}", t),
                        )
                        .unwrap();
                    created.push((job.master_seq, job.base_job_id));
                }
                created
            }));
        }

        let mut all: Vec<(i64, String)> = Vec::new();
        for handle in handles {
            all.extend(handle.join().unwrap());
        }

        let total = (thread_count * jobs_per_thread) as i64;
        assert_eq!(all.len() as i64, total);

        // 序号不重
        let seqs: HashSet<i64> = all.iter().map(|(seq, _)| *seq).collect();
        assert_eq!(seqs.len() as i64, total, "出现重复序号");

        // 序号不漏 (1..=total 连续)
        for seq in 1..=total {
            assert!(seqs.contains(&seq), "序号{}缺失", seq);
        }

        // 人类可读编号同样全局唯一
        let base_ids: HashSet<&String> = all.iter().map(|(_, id)| id).collect();
        assert_eq!(base_ids.len() as i64, total, "出现重复base_job_id");
    }

    // ==========================================
    // 测试2: 并发变更单创建 - 版本分配互斥
    // ==========================================

    #[test]
    fn test_concurrent_change_order_creation_single_winner() {
        let (_temp_file, job_api, co_api) = setup_test_env();

        let job = job_api
            .create_job(
                "BK".to_string(),
                &JobClassification::job(JobType::Flat),
                "test_user".to_string(),
            )
            .unwrap();

        // 多线程抢同一工单的开放变更单槽位: 恰好一个成功
        let mut handles = Vec::new();
        for t in 0..4 {
            let api = co_api.clone();
            let job_id = job.job_id.clone();
            handles.push(thread::spawn(move || {
                api.create_change_order(
                    job_id,
                    format!("并发变更{}", t),
                    ChangeSet {
                        entries: vec![ChangeEntry::Note {
                            text: "并发测试".to_string(),
                        }],
                    },
                    format!("worker_{}", t),
                )
            }));
        }

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let ok_count = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(ok_count, 1, "同一工单同时只允许一个开放变更单");

        for result in results {
            if let Err(e) = result {
                assert!(
                    matches!(e, ApiError::BusinessRuleViolation(_)),
                    "落败方应收到业务规则错误, 实际: {}",
                    e
                );
            }
        }

        // 唯一幸存者拿到 version=1
        let history = co_api.list_change_orders(&job.job_id).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].version, 1);
    }

    // ==========================================
    // 测试3: 乐观锁冲突 - 双写同一草稿
    // ==========================================

    #[test]
    fn test_optimistic_lock_conflict_on_draft_edit() {
        let (_temp_file, job_api, co_api) = setup_test_env();

        let job = job_api
            .create_job(
                "BK".to_string(),
                &JobClassification::job(JobType::Flat),
                "test_user".to_string(),
            )
            .unwrap();

        let co = co_api
            .create_change_order(
                job.job_id.clone(),
                "初始摘要".to_string(),
                ChangeSet::new(),
                "test_user".to_string(),
            )
            .unwrap();

        // 两个用户读到同一 revision
        let stale_revision = co.revision;

        // 用户1先写成功
        let update1 = DraftUpdate {
            summary: Some("用户1的修改".to_string()),
            ..Default::default()
        };
        let co_after = co_api
            .update_draft(&co.change_order_id, &update1, stale_revision, "user_1")
            .unwrap();
        assert_eq!(co_after.summary, "用户1的修改");
        assert!(co_after.revision > stale_revision);

        // 用户2带过期 revision 写入失败
        let update2 = DraftUpdate {
            summary: Some("用户2的修改".to_string()),
            ..Default::default()
        };
        let result = co_api.update_draft(&co.change_order_id, &update2, stale_revision, "user_2");
        assert!(matches!(
            result,
            Err(ApiError::OptimisticLockFailure(_))
        ));

        // 先写者的内容未被覆盖
        let current = co_api
            .get_change_order(&co.change_order_id)
            .unwrap()
            .unwrap();
        assert_eq!(current.summary, "用户1的修改");
    }

    // ==========================================
    // 测试4: 跨工单的变更单互不阻塞
    // ==========================================

    #[test]
    fn test_change_orders_on_different_jobs_do_not_block() {
        let (_temp_file, job_api, co_api) = setup_test_env();

        let classification = JobClassification::job(JobType::Flat);
        let job_a = job_api
            .create_job("BK".to_string(), &classification, "test_user".to_string())
            .unwrap();
        let job_b = job_api
            .create_job("BK".to_string(), &classification, "test_user".to_string())
            .unwrap();

        let mut handles = Vec::new();
        for job_id in [job_a.job_id.clone(), job_b.job_id.clone()] {
            let api = co_api.clone();
            handles.push(thread::spawn(move || {
                api.create_change_order(
                    job_id,
                    "独立变更".to_string(),
                    ChangeSet::new(),
                    "test_user".to_string(),
                )
            }));
        }

        for handle in handles {
            let co = handle.join().unwrap().unwrap();
            // 每个工单各自从 v1 开始
            assert_eq!(co.version, 1);
        }
    }
}
