// ==========================================
// 工单编号分配测试
// ==========================================
// 职责: 验证 base_job_id / master_seq 分配的正确性与编号策略配置
// ==========================================


#[cfg(test)]
mod job_identifier_test {
    use print_broker_core::api::JobApi;
    use print_broker_core::config::config_manager::{ConfigManager, KEY_PAD_WIDTH, KEY_SEQ_SCOPE};
    use print_broker_core::domain::component::JobClassification;
    use print_broker_core::domain::types::{JobStatus, JobType, MailFormat};
    use print_broker_core::engine::{ComponentSuggestionEngine, ComponentValidator};
    use print_broker_core::repository::{
        ActionLogRepository, ComponentRepository, JobRepository,
    };
    use rusqlite::Connection;
    use std::sync::{Arc, Mutex};
    use tempfile::NamedTempFile;

    use crate::test_helpers::create_test_db;

    // ==========================================
    // 测试辅助函数
    // ==========================================

    /// 创建测试环境
    fn setup_test_env() -> (NamedTempFile, Arc<JobApi>, Arc<ConfigManager>, Arc<JobRepository>) {
        let (temp_file, db_path) = create_test_db().unwrap();

        let conn = Arc::new(Mutex::new(Connection::open(&db_path).unwrap()));
        let job_repo = Arc::new(JobRepository::new(conn.clone()));
        let component_repo = Arc::new(ComponentRepository::new(conn.clone()));
        let action_log_repo = Arc::new(ActionLogRepository::new(conn.clone()));
        let config_manager = Arc::new(ConfigManager::from_connection(conn.clone()).unwrap());

        let job_api = Arc::new(JobApi::new(
            job_repo.clone(),
            component_repo,
            action_log_repo,
            config_manager.clone(),
            Arc::new(ComponentSuggestionEngine::new()),
            Arc::new(ComponentValidator::new()),
        ));

        (temp_file, job_api, config_manager, job_repo)
    }

    // ==========================================
    // 测试1: 首个工单编号
    // ==========================================

    #[test]
    fn test_first_job_allocates_seq_one() {
        let (_temp_file, job_api, _config, _job_repo) = setup_test_env();

        let job = job_api
            .create_job(
                "BK".to_string(),
                &JobClassification::job(JobType::Flat),
                "test_user".to_string(),
            )
            .unwrap();

        assert_eq!(job.master_seq, 1);
        assert_eq!(job.base_job_id, "BK000001");
        assert_eq!(job.status, JobStatus::Draft);
        assert_eq!(job.effective_co_version, None);
    }

    // ==========================================
    // 测试2: 同类型单调递增
    // ==========================================

    #[test]
    fn test_monotonic_increment_within_type() {
        let (_temp_file, job_api, _config, _job_repo) = setup_test_env();

        let classification = JobClassification::job(JobType::Flat);
        let mut base_ids = Vec::new();
        for _ in 0..3 {
            let job = job_api
                .create_job("BK".to_string(), &classification, "test_user".to_string())
                .unwrap();
            base_ids.push(job.base_job_id);
        }

        assert_eq!(base_ids, vec!["BK000001", "BK000002", "BK000003"]);
    }

    // ==========================================
    // 测试3: PER_TYPE 作用域 - 各类型独立计数
    // ==========================================

    #[test]
    fn test_per_type_scope_keeps_independent_counters() {
        let (_temp_file, job_api, _config, _job_repo) = setup_test_env();

        let classification = JobClassification::job(JobType::Flat);
        let bk1 = job_api
            .create_job("BK".to_string(), &classification, "test_user".to_string())
            .unwrap();
        let cat1 = job_api
            .create_job("CAT".to_string(), &classification, "test_user".to_string())
            .unwrap();
        let bk2 = job_api
            .create_job("BK".to_string(), &classification, "test_user".to_string())
            .unwrap();

        assert_eq!(bk1.base_job_id, "BK000001");
        assert_eq!(cat1.base_job_id, "CAT000001");
        assert_eq!(bk2.base_job_id, "BK000002");
    }

    // ==========================================
    // 测试4: GLOBAL 作用域 - 所有类型共享计数
    // ==========================================

    #[test]
    fn test_global_scope_shares_one_counter() {
        let (_temp_file, job_api, config_manager, _job_repo) = setup_test_env();

        config_manager
            .set_global_config_value(KEY_SEQ_SCOPE, "GLOBAL")
            .unwrap();

        let classification = JobClassification::job(JobType::Flat);
        let bk = job_api
            .create_job("BK".to_string(), &classification, "test_user".to_string())
            .unwrap();
        let cat = job_api
            .create_job("CAT".to_string(), &classification, "test_user".to_string())
            .unwrap();

        assert_eq!(bk.master_seq, 1);
        assert_eq!(cat.master_seq, 2);
        assert_eq!(bk.base_job_id, "BK000001");
        assert_eq!(cat.base_job_id, "CAT000002");
    }

    // ==========================================
    // 测试5: 补零位宽配置
    // ==========================================

    #[test]
    fn test_pad_width_config_applies() {
        let (_temp_file, job_api, config_manager, _job_repo) = setup_test_env();

        config_manager
            .set_global_config_value(KEY_PAD_WIDTH, "4")
            .unwrap();

        let job = job_api
            .create_job(
                "BK".to_string(),
                &JobClassification::job(JobType::Flat),
                "test_user".to_string(),
            )
            .unwrap();

        assert_eq!(job.base_job_id, "BK0001");
    }

    // ==========================================
    // 测试6: 非法类型码拒绝
    // ==========================================

    #[test]
    fn test_invalid_job_type_code_rejected() {
        let (_temp_file, job_api, _config, _job_repo) = setup_test_env();

        let classification = JobClassification::job(JobType::Flat);

        let result = job_api.create_job("".to_string(), &classification, "test_user".to_string());
        assert!(result.is_err(), "空类型码应拒绝");

        let result =
            job_api.create_job("BK-1".to_string(), &classification, "test_user".to_string());
        assert!(result.is_err(), "含非字母数字字符的类型码应拒绝");
    }

    // ==========================================
    // 测试7: 小写类型码规范化为大写
    // ==========================================

    #[test]
    fn test_job_type_code_normalized_to_uppercase() {
        let (_temp_file, job_api, _config, _job_repo) = setup_test_env();

        let job = job_api
            .create_job(
                "bk".to_string(),
                &JobClassification::job(JobType::Flat),
                "test_user".to_string(),
            )
            .unwrap();

        assert_eq!(job.job_type_code, "BK");
        assert_eq!(job.base_job_id, "BK000001");
    }

    // ==========================================
    // 测试8: 创建时播种默认工序
    // ==========================================

    #[test]
    fn test_create_job_seeds_suggested_components() {
        let (_temp_file, job_api, _config, _job_repo) = setup_test_env();

        let job = job_api
            .create_job(
                "ML".to_string(),
                &JobClassification::mailing(MailFormat::Envelope),
                "test_user".to_string(),
            )
            .unwrap();

        let components = job_api.list_components(&job.job_id).unwrap();
        assert!(!components.is_empty(), "创建时应播种默认工序");

        // sort_order 严格递增
        for pair in components.windows(2) {
            assert!(pair[0].sort_order < pair[1].sort_order);
        }
    }

    // ==========================================
    // 测试9: 按 base_job_id 可反查工单
    // ==========================================

    #[test]
    fn test_find_by_base_job_id() {
        let (_temp_file, job_api, _config, job_repo) = setup_test_env();

        let created = job_api
            .create_job(
                "BK".to_string(),
                &JobClassification::job(JobType::Flat),
                "test_user".to_string(),
            )
            .unwrap();

        let found = job_repo.find_by_base_job_id("BK000001").unwrap().unwrap();
        assert_eq!(found.job_id, created.job_id);
        assert_eq!(found.master_seq, 1);
    }
}
