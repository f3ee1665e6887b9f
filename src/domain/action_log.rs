// ==========================================
// 印刷经纪订单管理系统 - 操作日志领域模型
// ==========================================
// 职责: 记录所有 API 层的变更操作, 形成审计追踪
// 红线: 只追加, 不更新, 不删除
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    CreateJob,
    ReleaseJob,
    CreateChangeOrder,
    SubmitChangeOrder,
    ApproveChangeOrder,
    RejectChangeOrder,
    WithdrawChangeOrder,
    UpdateChangeOrderDraft,
}

impl ActionType {
    /// 转换为数据库存储的字符串
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::CreateJob => "CREATE_JOB",
            ActionType::ReleaseJob => "RELEASE_JOB",
            ActionType::CreateChangeOrder => "CREATE_CHANGE_ORDER",
            ActionType::SubmitChangeOrder => "SUBMIT_CHANGE_ORDER",
            ActionType::ApproveChangeOrder => "APPROVE_CHANGE_ORDER",
            ActionType::RejectChangeOrder => "REJECT_CHANGE_ORDER",
            ActionType::WithdrawChangeOrder => "WITHDRAW_CHANGE_ORDER",
            ActionType::UpdateChangeOrderDraft => "UPDATE_CHANGE_ORDER_DRAFT",
        }
    }
}

// ==========================================
// ActionLog - 操作日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,               // 日志ID (uuid)
    pub job_id: Option<String>,          // 关联工单 (可选)
    pub change_order_id: Option<String>, // 关联变更单 (可选)
    pub action_type: String,             // 操作类型
    pub action_ts: NaiveDateTime,        // 操作时间
    pub actor: String,                   // 操作人
    pub payload_json: Option<Value>,     // 操作参数快照
    pub detail: Option<String>,          // 可读说明
}
