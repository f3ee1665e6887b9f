// ==========================================
// 印刷经纪订单管理系统 - 变更单 API
// ==========================================
// 职责: 变更单生命周期管理 (创建/提交/批准/驳回/撤回/草稿编辑)
// 红线: 批准与生效版本指针更新同一事务 (由仓储层保证)
// ==========================================

use std::sync::Arc;

use serde_json::json;
use tracing::instrument;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::change_order::{ChangeOrder, ChangeSet, DraftUpdate};
use crate::domain::job::Job;
use crate::domain::types::ChangeOrderStatus;
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::change_order_repo::ChangeOrderRepository;
use crate::repository::error::RepositoryError;
use crate::repository::job_repo::JobRepository;

/// 序列分配冲突的最大重试次数
const MAX_ALLOC_RETRIES: u32 = 3;

// ==========================================
// ChangeOrderApi - 变更单 API
// ==========================================

/// 变更单API
///
/// 职责:
/// 1. 创建变更单 (版本号由仓储层在事务内分配)
/// 2. 审批状态机 (submit / approve / reject / withdraw)
/// 3. 草稿编辑 (乐观锁)
/// 4. 历史与生效版本查询
pub struct ChangeOrderApi {
    job_repo: Arc<JobRepository>,
    change_order_repo: Arc<ChangeOrderRepository>,
    action_log_repo: Arc<ActionLogRepository>,
}

impl ChangeOrderApi {
    /// 创建新的ChangeOrderApi实例
    pub fn new(
        job_repo: Arc<JobRepository>,
        change_order_repo: Arc<ChangeOrderRepository>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            job_repo,
            change_order_repo,
            action_log_repo,
        }
    }

    // ==========================================
    // 创建
    // ==========================================

    /// 创建变更单 (初始 DRAFT, version/change_order_no 由仓储层分配)
    ///
    /// 序列分配竞争失败时整体重试 (最多 MAX_ALLOC_RETRIES 次)
    #[instrument(skip(self, changes), fields(job_id = %job_id))]
    pub fn create_change_order(
        &self,
        job_id: String,
        summary: String,
        changes: ChangeSet,
        created_by: String,
    ) -> ApiResult<ChangeOrder> {
        // 参数验证
        if job_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("工单ID不能为空".to_string()));
        }
        if summary.trim().is_empty() {
            return Err(ApiError::InvalidInput("变更摘要不能为空".to_string()));
        }
        if created_by.trim().is_empty() {
            return Err(ApiError::InvalidInput("创建人不能为空".to_string()));
        }

        let now = chrono::Local::now().naive_local();
        let mut co = ChangeOrder {
            change_order_id: uuid::Uuid::new_v4().to_string(),
            job_id: job_id.clone(),
            version: 0,
            change_order_no: String::new(),
            summary,
            changes,
            status: ChangeOrderStatus::Draft,
            approved_at: None,
            approved_by: None,
            reject_reason: None,
            affects_vendors: Vec::new(),
            requires_new_po: false,
            requires_reprice: false,
            created_by: created_by.clone(),
            created_at: now,
            revision: 1,
        };

        // 序列分配冲突整体重试
        let mut attempt = 0;
        loop {
            match self.change_order_repo.create_with_next_version(&mut co) {
                Ok(_) => break,
                Err(RepositoryError::SequenceConflict { message }) if attempt < MAX_ALLOC_RETRIES => {
                    attempt += 1;
                    tracing::warn!(attempt, "变更单版本分配冲突, 重试中: {}", message);
                }
                Err(e) => return Err(e.into()),
            }
        }

        // 记录ActionLog
        self.log_action(
            ActionType::CreateChangeOrder,
            &co,
            &created_by,
            Some(json!({
                "version": co.version,
                "change_order_no": co.change_order_no,
            })),
            format!("创建变更单: {}", co.change_order_no),
        )?;

        Ok(co)
    }

    // ==========================================
    // 审批状态机
    // ==========================================

    /// 提交审批 (DRAFT → PENDING_APPROVAL)
    pub fn submit_for_approval(
        &self,
        change_order_id: &str,
        operator: &str,
    ) -> ApiResult<ChangeOrder> {
        if operator.trim().is_empty() {
            return Err(ApiError::InvalidInput("操作人不能为空".to_string()));
        }

        self.change_order_repo.submit(change_order_id)?;

        let co = self.require_change_order(change_order_id)?;
        self.log_action(
            ActionType::SubmitChangeOrder,
            &co,
            operator,
            None,
            format!("提交审批: {}", co.change_order_no),
        )?;

        Ok(co)
    }

    /// 批准 (PENDING_APPROVAL → APPROVED)
    ///
    /// 变更单状态与工单生效版本指针在同一事务内提交;
    /// 返回重读后的变更单与工单, 指针已指向被批准的版本。
    #[instrument(skip(self), fields(change_order_id = %change_order_id))]
    pub fn approve(
        &self,
        change_order_id: &str,
        approver_id: &str,
    ) -> ApiResult<(ChangeOrder, Job)> {
        if approver_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("批准人不能为空".to_string()));
        }

        let now = chrono::Local::now().naive_local();
        let (job_id, version) = self
            .change_order_repo
            .approve(change_order_id, approver_id, now)?;

        let co = self.require_change_order(change_order_id)?;
        let job = self
            .job_repo
            .find_by_id(&job_id)?
            .ok_or_else(|| ApiError::NotFound(format!("工单{}不存在", job_id)))?;

        self.log_action(
            ActionType::ApproveChangeOrder,
            &co,
            approver_id,
            Some(json!({
                "version": version,
                "effective_co_version": job.effective_co_version,
            })),
            format!("批准变更单: {}", co.change_order_no),
        )?;

        Ok((co, job))
    }

    /// 驳回 (PENDING_APPROVAL → REJECTED)
    ///
    /// 不触碰工单的生效版本指针; 驳回记录永久保留
    pub fn reject(
        &self,
        change_order_id: &str,
        reason: &str,
        operator: &str,
    ) -> ApiResult<ChangeOrder> {
        if reason.trim().is_empty() {
            return Err(ApiError::InvalidInput("驳回原因不能为空".to_string()));
        }
        if operator.trim().is_empty() {
            return Err(ApiError::InvalidInput("操作人不能为空".to_string()));
        }

        self.change_order_repo.reject(change_order_id, reason)?;

        let co = self.require_change_order(change_order_id)?;
        self.log_action(
            ActionType::RejectChangeOrder,
            &co,
            operator,
            Some(json!({ "reason": reason })),
            format!("驳回变更单: {}", co.change_order_no),
        )?;

        Ok(co)
    }

    /// 撤回审批 (PENDING_APPROVAL → DRAFT)
    ///
    /// 待审批记录必须先撤回才能继续编辑
    pub fn withdraw(&self, change_order_id: &str, operator: &str) -> ApiResult<ChangeOrder> {
        if operator.trim().is_empty() {
            return Err(ApiError::InvalidInput("操作人不能为空".to_string()));
        }

        self.change_order_repo.withdraw(change_order_id)?;

        let co = self.require_change_order(change_order_id)?;
        self.log_action(
            ActionType::WithdrawChangeOrder,
            &co,
            operator,
            None,
            format!("撤回审批: {}", co.change_order_no),
        )?;

        Ok(co)
    }

    // ==========================================
    // 草稿编辑
    // ==========================================

    /// 更新草稿字段 (乐观锁; 仅 DRAFT 可写)
    ///
    /// # 错误
    /// - `ApiError::ImmutableRecord`: 终态记录禁止修改
    /// - `ApiError::InvalidStateTransition`: 待审批记录需先撤回
    /// - `ApiError::OptimisticLockFailure`: revision 不匹配
    pub fn update_draft(
        &self,
        change_order_id: &str,
        update: &DraftUpdate,
        expected_revision: i32,
        operator: &str,
    ) -> ApiResult<ChangeOrder> {
        if operator.trim().is_empty() {
            return Err(ApiError::InvalidInput("操作人不能为空".to_string()));
        }
        if update.is_empty() {
            return Err(ApiError::InvalidInput("没有任何待更新字段".to_string()));
        }

        self.change_order_repo
            .update_draft(change_order_id, update, expected_revision)?;

        let co = self.require_change_order(change_order_id)?;
        self.log_action(
            ActionType::UpdateChangeOrderDraft,
            &co,
            operator,
            None,
            format!("编辑草稿: {}", co.change_order_no),
        )?;

        Ok(co)
    }

    // ==========================================
    // 查询接口
    // ==========================================

    /// 查询变更单详情
    pub fn get_change_order(&self, change_order_id: &str) -> ApiResult<Option<ChangeOrder>> {
        if change_order_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("变更单ID不能为空".to_string()));
        }
        Ok(self.change_order_repo.find_by_id(change_order_id)?)
    }

    /// 查询工单的变更单历史 (按版本号升序)
    pub fn list_change_orders(&self, job_id: &str) -> ApiResult<Vec<ChangeOrder>> {
        if job_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("工单ID不能为空".to_string()));
        }
        Ok(self.change_order_repo.find_by_job_id(job_id)?)
    }

    /// 查询工单当前生效版本指针
    pub fn get_effective_version(&self, job_id: &str) -> ApiResult<Option<i32>> {
        Ok(self.job_repo.effective_co_version(job_id)?)
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    /// 重读变更单, 不存在视为内部不一致
    fn require_change_order(&self, change_order_id: &str) -> ApiResult<ChangeOrder> {
        self.change_order_repo
            .find_by_id(change_order_id)?
            .ok_or_else(|| ApiError::NotFound(format!("变更单{}不存在", change_order_id)))
    }

    /// 记录操作日志
    fn log_action(
        &self,
        action_type: ActionType,
        co: &ChangeOrder,
        actor: &str,
        payload_json: Option<serde_json::Value>,
        detail: String,
    ) -> ApiResult<()> {
        let action_log = ActionLog {
            action_id: uuid::Uuid::new_v4().to_string(),
            job_id: Some(co.job_id.clone()),
            change_order_id: Some(co.change_order_id.clone()),
            action_type: action_type.as_str().to_string(),
            action_ts: chrono::Local::now().naive_local(),
            actor: actor.to_string(),
            payload_json,
            detail: Some(detail),
        };

        self.action_log_repo.insert(&action_log)?;
        Ok(())
    }
}
