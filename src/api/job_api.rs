// ==========================================
// 印刷经纪订单管理系统 - 工单 API
// ==========================================
// 职责: 工单创建 (编号分配 + 默认工序播种)、
//       工序校验门禁、工单查询
// ==========================================

use std::sync::Arc;

use serde_json::json;
use tracing::instrument;

use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::component::{Component, JobClassification, SuggestedComponent};
use crate::domain::job::Job;
use crate::domain::types::JobStatus;
use crate::engine::{ComponentSuggestionEngine, ComponentValidator, ValidationIssue};
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::component_repo::ComponentRepository;
use crate::repository::error::RepositoryError;
use crate::repository::job_repo::JobRepository;

/// 序列分配冲突的最大重试次数
const MAX_ALLOC_RETRIES: u32 = 3;

// ==========================================
// JobApi - 工单 API
// ==========================================

/// 工单API
///
/// 职责:
/// 1. 工单创建 (事务内分配编号, 建议引擎播种默认工序)
/// 2. 出草稿门禁 (校验引擎结果非空则阻断 DRAFT → OPEN)
/// 3. 工序建议/校验的对外入口
pub struct JobApi {
    job_repo: Arc<JobRepository>,
    component_repo: Arc<ComponentRepository>,
    action_log_repo: Arc<ActionLogRepository>,
    config_manager: Arc<ConfigManager>,
    suggestion_engine: Arc<ComponentSuggestionEngine>,
    validator: Arc<ComponentValidator>,
}

impl JobApi {
    /// 创建新的JobApi实例
    pub fn new(
        job_repo: Arc<JobRepository>,
        component_repo: Arc<ComponentRepository>,
        action_log_repo: Arc<ActionLogRepository>,
        config_manager: Arc<ConfigManager>,
        suggestion_engine: Arc<ComponentSuggestionEngine>,
        validator: Arc<ComponentValidator>,
    ) -> Self {
        Self {
            job_repo,
            component_repo,
            action_log_repo,
            config_manager,
            suggestion_engine,
            validator,
        }
    }

    // ==========================================
    // 工单创建
    // ==========================================

    /// 创建工单
    ///
    /// 流程:
    /// 1. 事务内分配 {base_job_id, master_seq} 并写入工单行 (DRAFT)
    /// 2. 建议引擎按分类播种默认工序
    /// 3. 记录操作日志
    ///
    /// 序列分配竞争失败时整体重试 (最多 MAX_ALLOC_RETRIES 次)
    #[instrument(skip(self, classification), fields(job_type_code = %job_type_code))]
    pub fn create_job(
        &self,
        job_type_code: String,
        classification: &JobClassification,
        created_by: String,
    ) -> ApiResult<Job> {
        // 参数验证
        let job_type_code = job_type_code.trim().to_uppercase();
        if job_type_code.is_empty() {
            return Err(ApiError::InvalidInput("工单类型码不能为空".to_string()));
        }
        if !job_type_code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ApiError::InvalidInput(
                "工单类型码只允许字母与数字".to_string(),
            ));
        }
        if created_by.trim().is_empty() {
            return Err(ApiError::InvalidInput("创建人不能为空".to_string()));
        }

        let policy = self
            .config_manager
            .numbering_policy()
            .map_err(|e| ApiError::InternalError(e.to_string()))?;

        // 创建Job实例 (编号字段由仓储层在事务内分配)
        let now = chrono::Local::now().naive_local();
        let mut job = Job {
            job_id: uuid::Uuid::new_v4().to_string(),
            base_job_id: String::new(),
            master_seq: 0,
            job_type_code: job_type_code.clone(),
            effective_co_version: None,
            status: JobStatus::Draft,
            created_by: created_by.clone(),
            created_at: now,
            updated_at: now,
        };

        // 序列分配冲突整体重试
        let mut attempt = 0;
        loop {
            match self.job_repo.create_with_allocated_seq(&mut job, &policy) {
                Ok(_) => break,
                Err(RepositoryError::SequenceConflict { message }) if attempt < MAX_ALLOC_RETRIES => {
                    attempt += 1;
                    tracing::warn!(
                        attempt,
                        "工单编号分配冲突, 重试中: {}",
                        message
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        // 建议引擎播种默认工序
        let suggested = self.suggestion_engine.suggest(classification);
        let components = self.materialize_components(&job.job_id, &suggested, now);
        self.component_repo.batch_insert(&components)?;

        // 记录ActionLog
        let action_log = ActionLog {
            action_id: uuid::Uuid::new_v4().to_string(),
            job_id: Some(job.job_id.clone()),
            change_order_id: None,
            action_type: ActionType::CreateJob.as_str().to_string(),
            action_ts: now,
            actor: created_by,
            payload_json: Some(json!({
                "base_job_id": job.base_job_id,
                "master_seq": job.master_seq,
                "job_type_code": job.job_type_code,
                "seeded_components": components.len(),
            })),
            detail: Some(format!("创建工单: {}", job.base_job_id)),
        };
        self.action_log_repo.insert(&action_log)?;

        Ok(job)
    }

    /// 将建议工序落为工序行
    fn materialize_components(
        &self,
        job_id: &str,
        suggested: &[SuggestedComponent],
        now: chrono::NaiveDateTime,
    ) -> Vec<Component> {
        suggested
            .iter()
            .map(|s| Component {
                component_id: uuid::Uuid::new_v4().to_string(),
                job_id: job_id.to_string(),
                component_type: s.component_type,
                name: s.name.clone(),
                description: Some(s.description.clone()),
                owner: s.owner,
                vendor_id: None,
                artwork_required: s.artwork_required,
                data_required: s.data_required,
                sort_order: s.sort_order,
                status: "PENDING".to_string(),
                created_at: now,
                updated_at: now,
            })
            .collect()
    }

    // ==========================================
    // 出草稿门禁
    // ==========================================

    /// 工单出草稿 (DRAFT → OPEN)
    ///
    /// 校验引擎结果非空则阻断并返回逐项问题清单
    pub fn release_job(&self, job_id: &str, operator: &str) -> ApiResult<Job> {
        if job_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("工单ID不能为空".to_string()));
        }
        if operator.trim().is_empty() {
            return Err(ApiError::InvalidInput("操作人不能为空".to_string()));
        }

        let job = self
            .job_repo
            .find_by_id(job_id)?
            .ok_or_else(|| ApiError::NotFound(format!("工单{}不存在", job_id)))?;

        // 工序校验门禁
        let components = self.component_repo.find_by_job_id(job_id)?;
        let issues = self.validator.validate(&components);
        if !issues.is_empty() {
            return Err(ApiError::ComponentValidationFailed {
                reason: format!("工单{}存在{}项工序问题", job.base_job_id, issues.len()),
                issues,
            });
        }

        let now = chrono::Local::now().naive_local();
        self.job_repo.mark_open(job_id, now)?;

        // 记录ActionLog
        let action_log = ActionLog {
            action_id: uuid::Uuid::new_v4().to_string(),
            job_id: Some(job_id.to_string()),
            change_order_id: None,
            action_type: ActionType::ReleaseJob.as_str().to_string(),
            action_ts: now,
            actor: operator.to_string(),
            payload_json: Some(json!({ "base_job_id": job.base_job_id })),
            detail: Some(format!("工单出草稿: {}", job.base_job_id)),
        };
        self.action_log_repo.insert(&action_log)?;

        self.job_repo
            .find_by_id(job_id)?
            .ok_or_else(|| ApiError::NotFound(format!("工单{}不存在", job_id)))
    }

    // ==========================================
    // 工序建议/校验入口
    // ==========================================

    /// 按分类推导建议工序集 (纯函数, 不落库)
    pub fn suggest_components(
        &self,
        classification: &JobClassification,
    ) -> Vec<SuggestedComponent> {
        self.suggestion_engine.suggest(classification)
    }

    /// 校验工单当前工序集
    pub fn validate_components(&self, job_id: &str) -> ApiResult<Vec<ValidationIssue>> {
        if self.job_repo.find_by_id(job_id)?.is_none() {
            return Err(ApiError::NotFound(format!("工单{}不存在", job_id)));
        }

        let components = self.component_repo.find_by_job_id(job_id)?;
        Ok(self.validator.validate(&components))
    }

    // ==========================================
    // 查询接口
    // ==========================================

    /// 查询工单详情
    pub fn get_job(&self, job_id: &str) -> ApiResult<Option<Job>> {
        if job_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("工单ID不能为空".to_string()));
        }
        Ok(self.job_repo.find_by_id(job_id)?)
    }

    /// 查询工单列表
    pub fn list_jobs(&self) -> ApiResult<Vec<Job>> {
        Ok(self.job_repo.list_all()?)
    }

    /// 查询工单的工序列表 (按 sort_order 升序)
    pub fn list_components(&self, job_id: &str) -> ApiResult<Vec<Component>> {
        Ok(self.component_repo.find_by_job_id(job_id)?)
    }
}
