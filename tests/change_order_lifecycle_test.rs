// ==========================================
// 变更单生命周期测试
// ==========================================
// 职责: 验证版本分配、审批状态机、生效版本指针与不可变约束
// ==========================================


#[cfg(test)]
mod change_order_lifecycle_test {
    use print_broker_core::api::{ApiError, ChangeOrderApi, JobApi};
    use print_broker_core::config::config_manager::ConfigManager;
    use print_broker_core::domain::change_order::{ChangeEntry, ChangeSet, DraftUpdate};
    use print_broker_core::domain::component::JobClassification;
    use print_broker_core::domain::job::Job;
    use print_broker_core::domain::types::{ChangeOrderStatus, JobType};
    use print_broker_core::engine::{ComponentSuggestionEngine, ComponentValidator};
    use print_broker_core::repository::{
        ActionLogRepository, ChangeOrderRepository, ComponentRepository, JobRepository,
    };
    use rusqlite::Connection;
    use std::sync::{Arc, Mutex};
    use tempfile::NamedTempFile;

    use crate::test_helpers::create_test_db;

    // ==========================================
    // 测试辅助函数
    // ==========================================

    /// 创建测试环境
    fn setup_test_env() -> (
        NamedTempFile,
        Arc<JobApi>,
        Arc<ChangeOrderApi>,
        Arc<ChangeOrderRepository>,
    ) {
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
            change_order_repo.clone(),
            action_log_repo,
        ));

        (temp_file, job_api, change_order_api, change_order_repo)
    }

    /// 创建一个测试工单
    fn create_test_job(job_api: &JobApi) -> Job {
        job_api
            .create_job(
                "BK".to_string(),
                &JobClassification::job(JobType::Flat),
                "test_user".to_string(),
            )
            .unwrap()
    }

    /// 简单变更集
    fn sample_changes() -> ChangeSet {
        ChangeSet {
            entries: vec![ChangeEntry::QuantityChange {
                old_qty: 5000,
                new_qty: 7500,
            }],
        }
    }

    // ==========================================
    // 测试1: 首个变更单获得 version=1
    // ==========================================

    #[test]
    fn test_first_change_order_gets_version_one() {
        let (_temp_file, job_api, co_api, _co_repo) = setup_test_env();
        let job = create_test_job(&job_api);

        let co = co_api
            .create_change_order(
                job.job_id.clone(),
                "数量上调".to_string(),
                sample_changes(),
                "test_user".to_string(),
            )
            .unwrap();

        assert_eq!(co.version, 1);
        assert_eq!(co.change_order_no, "BK000001-CO1");
        assert_eq!(co.status, ChangeOrderStatus::Draft);

        // 未批准前指针不动
        let effective = co_api.get_effective_version(&job.job_id).unwrap();
        assert_eq!(effective, None);
    }

    // ==========================================
    // 测试2: 完整生命周期 创建→提交→批准
    // ==========================================

    #[test]
    fn test_full_lifecycle_to_approved() {
        let (_temp_file, job_api, co_api, _co_repo) = setup_test_env();
        let job = create_test_job(&job_api);

        let co = co_api
            .create_change_order(
                job.job_id.clone(),
                "数量上调".to_string(),
                sample_changes(),
                "planner_a".to_string(),
            )
            .unwrap();

        let co = co_api.submit_for_approval(&co.change_order_id, "planner_a").unwrap();
        assert_eq!(co.status, ChangeOrderStatus::PendingApproval);

        let (co, job_after) = co_api.approve(&co.change_order_id, "manager_b").unwrap();
        assert_eq!(co.status, ChangeOrderStatus::Approved);
        assert_eq!(co.approved_by.as_deref(), Some("manager_b"));
        assert!(co.approved_at.is_some());

        // 批准与指针更新同一事务, 返回的工单已可见
        assert_eq!(job_after.effective_co_version, Some(1));
    }

    // ==========================================
    // 测试3: 后续批准推进指针
    // ==========================================

    #[test]
    fn test_subsequent_approval_advances_pointer() {
        let (_temp_file, job_api, co_api, co_repo) = setup_test_env();
        let job = create_test_job(&job_api);

        // v1 批准
        let co1 = co_api
            .create_change_order(
                job.job_id.clone(),
                "变更1".to_string(),
                sample_changes(),
                "test_user".to_string(),
            )
            .unwrap();
        co_api.submit_for_approval(&co1.change_order_id, "test_user").unwrap();
        co_api.approve(&co1.change_order_id, "manager").unwrap();

        // v2 批准
        let co2 = co_api
            .create_change_order(
                job.job_id.clone(),
                "变更2".to_string(),
                sample_changes(),
                "test_user".to_string(),
            )
            .unwrap();
        assert_eq!(co2.version, 2);
        assert_eq!(co2.change_order_no, "BK000001-CO2");

        co_api.submit_for_approval(&co2.change_order_id, "test_user").unwrap();
        let (_, job_after) = co_api.approve(&co2.change_order_id, "manager").unwrap();

        assert_eq!(job_after.effective_co_version, Some(2));
        assert_eq!(co_repo.list_versions(&job.job_id).unwrap(), vec![1, 2]);
    }

    // ==========================================
    // 测试4: 驳回保留版本槽位, 指针不动
    // ==========================================

    #[test]
    fn test_reject_keeps_version_slot_and_pointer() {
        let (_temp_file, job_api, co_api, co_repo) = setup_test_env();
        let job = create_test_job(&job_api);

        // v1 批准
        let co1 = co_api
            .create_change_order(
                job.job_id.clone(),
                "变更1".to_string(),
                sample_changes(),
                "test_user".to_string(),
            )
            .unwrap();
        co_api.submit_for_approval(&co1.change_order_id, "test_user").unwrap();
        co_api.approve(&co1.change_order_id, "manager").unwrap();

        // v2 驳回
        let co2 = co_api
            .create_change_order(
                job.job_id.clone(),
                "变更2".to_string(),
                sample_changes(),
                "test_user".to_string(),
            )
            .unwrap();
        co_api.submit_for_approval(&co2.change_order_id, "test_user").unwrap();
        let co2 = co_api
            .reject(&co2.change_order_id, "成本不可接受", "manager")
            .unwrap();

        assert_eq!(co2.status, ChangeOrderStatus::Rejected);
        assert_eq!(co2.reject_reason.as_deref(), Some("成本不可接受"));

        // 指针仍指向 v1
        assert_eq!(co_api.get_effective_version(&job.job_id).unwrap(), Some(1));

        // 驳回记录占用版本槽位: 下一个变更单拿 v3
        let co3 = co_api
            .create_change_order(
                job.job_id.clone(),
                "变更3".to_string(),
                sample_changes(),
                "test_user".to_string(),
            )
            .unwrap();
        assert_eq!(co3.version, 3);
        assert_eq!(co_repo.list_versions(&job.job_id).unwrap(), vec![1, 2, 3]);
    }

    // ==========================================
    // 测试5: 终态记录不可变
    // ==========================================

    #[test]
    fn test_terminal_records_are_immutable() {
        let (_temp_file, job_api, co_api, _co_repo) = setup_test_env();
        let job = create_test_job(&job_api);

        let co = co_api
            .create_change_order(
                job.job_id.clone(),
                "变更1".to_string(),
                sample_changes(),
                "test_user".to_string(),
            )
            .unwrap();
        co_api.submit_for_approval(&co.change_order_id, "test_user").unwrap();
        let (co, _) = co_api.approve(&co.change_order_id, "manager").unwrap();

        let update = DraftUpdate {
            summary: Some("篡改已批准记录".to_string()),
            ..Default::default()
        };
        let result = co_api.update_draft(&co.change_order_id, &update, co.revision, "test_user");

        assert!(matches!(
            result,
            Err(ApiError::ImmutableRecord { .. })
        ));
    }

    // ==========================================
    // 测试6: 待审批记录需先撤回才能编辑
    // ==========================================

    #[test]
    fn test_pending_approval_requires_withdraw_before_edit() {
        let (_temp_file, job_api, co_api, _co_repo) = setup_test_env();
        let job = create_test_job(&job_api);

        let co = co_api
            .create_change_order(
                job.job_id.clone(),
                "变更1".to_string(),
                sample_changes(),
                "test_user".to_string(),
            )
            .unwrap();
        let co = co_api.submit_for_approval(&co.change_order_id, "test_user").unwrap();

        // 待审批状态直接编辑被拒绝
        let update = DraftUpdate {
            summary: Some("改摘要".to_string()),
            ..Default::default()
        };
        let result = co_api.update_draft(&co.change_order_id, &update, co.revision, "test_user");
        assert!(matches!(
            result,
            Err(ApiError::InvalidStateTransition { .. })
        ));

        // 撤回后可以编辑
        let co = co_api.withdraw(&co.change_order_id, "test_user").unwrap();
        assert_eq!(co.status, ChangeOrderStatus::Draft);

        let co = co_api
            .update_draft(&co.change_order_id, &update, co.revision, "test_user")
            .unwrap();
        assert_eq!(co.summary, "改摘要");
        // version/change_order_no 永不因编辑变化
        assert_eq!(co.version, 1);
        assert_eq!(co.change_order_no, "BK000001-CO1");
    }

    // ==========================================
    // 测试7: 非法状态转换
    // ==========================================

    #[test]
    fn test_invalid_transitions_rejected() {
        let (_temp_file, job_api, co_api, _co_repo) = setup_test_env();
        let job = create_test_job(&job_api);

        let co = co_api
            .create_change_order(
                job.job_id.clone(),
                "变更1".to_string(),
                sample_changes(),
                "test_user".to_string(),
            )
            .unwrap();

        // 草稿不能直接批准
        let result = co_api.approve(&co.change_order_id, "manager");
        assert!(matches!(
            result,
            Err(ApiError::InvalidStateTransition { .. })
        ));

        // 草稿不能驳回
        let result = co_api.reject(&co.change_order_id, "理由", "manager");
        assert!(matches!(
            result,
            Err(ApiError::InvalidStateTransition { .. })
        ));

        // 草稿不能撤回
        let result = co_api.withdraw(&co.change_order_id, "test_user");
        assert!(matches!(
            result,
            Err(ApiError::InvalidStateTransition { .. })
        ));

        // 重复提交被拒绝
        co_api.submit_for_approval(&co.change_order_id, "test_user").unwrap();
        let result = co_api.submit_for_approval(&co.change_order_id, "test_user");
        assert!(matches!(
            result,
            Err(ApiError::InvalidStateTransition { .. })
        ));
    }

    // ==========================================
    // 测试8: 同一工单最多一个开放变更单
    // ==========================================

    #[test]
    fn test_single_open_change_order_per_job() {
        let (_temp_file, job_api, co_api, _co_repo) = setup_test_env();
        let job = create_test_job(&job_api);

        co_api
            .create_change_order(
                job.job_id.clone(),
                "变更1".to_string(),
                sample_changes(),
                "test_user".to_string(),
            )
            .unwrap();

        let result = co_api.create_change_order(
            job.job_id.clone(),
            "变更2".to_string(),
            sample_changes(),
            "test_user".to_string(),
        );

        assert!(matches!(
            result,
            Err(ApiError::BusinessRuleViolation(_))
        ));
    }

    // ==========================================
    // 测试9: 工单不存在时创建变更单报 NotFound
    // ==========================================

    #[test]
    fn test_create_change_order_for_missing_job() {
        let (_temp_file, _job_api, co_api, _co_repo) = setup_test_env();

        let result = co_api.create_change_order(
            "no-such-job".to_string(),
            "变更".to_string(),
            sample_changes(),
            "test_user".to_string(),
        );

        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    // ==========================================
    // 测试10: 历史查询按版本升序
    // ==========================================

    #[test]
    fn test_history_ordered_by_version() {
        let (_temp_file, job_api, co_api, _co_repo) = setup_test_env();
        let job = create_test_job(&job_api);

        for i in 1..=3 {
            let co = co_api
                .create_change_order(
                    job.job_id.clone(),
                    format!("变更{}", i),
                    sample_changes(),
                    "test_user".to_string(),
                )
                .unwrap();
            co_api.submit_for_approval(&co.change_order_id, "test_user").unwrap();
            co_api.approve(&co.change_order_id, "manager").unwrap();
        }

        let history = co_api.list_change_orders(&job.job_id).unwrap();
        assert_eq!(history.len(), 3);
        let versions: Vec<i32> = history.iter().map(|co| co.version).collect();
        assert_eq!(versions, vec![1, 2, 3]);
        assert_eq!(co_api.get_effective_version(&job.job_id).unwrap(), Some(3));
    }
}
