// ==========================================
// 印刷经纪订单管理系统 - 领域类型定义
// ==========================================
// 依据: 工单编号与变更单版本化设计 v0.2
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 工单状态 (Job Status)
// ==========================================
// 工单在组件校验通过之前停留在 DRAFT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Draft,  // 草稿 (工序尚未校验通过)
    Open,   // 进行中
    Closed, // 已关闭
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl JobStatus {
    /// 从字符串解析状态
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "OPEN" => JobStatus::Open,
            "CLOSED" => JobStatus::Closed,
            _ => JobStatus::Draft, // 默认值
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            JobStatus::Draft => "DRAFT",
            JobStatus::Open => "OPEN",
            JobStatus::Closed => "CLOSED",
        }
    }
}

// ==========================================
// 变更单状态 (Change Order Status)
// ==========================================
// 红线: APPROVED/REJECTED 为终态，记录不可变、不可删除 (审计追踪)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeOrderStatus {
    Draft,           // 草稿 (可编辑)
    PendingApproval, // 待审批 (需先撤回才能编辑)
    Approved,        // 已批准 (终态)
    Rejected,        // 已驳回 (终态)
}

impl fmt::Display for ChangeOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl ChangeOrderStatus {
    /// 从字符串解析状态
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "PENDING_APPROVAL" => ChangeOrderStatus::PendingApproval,
            "APPROVED" => ChangeOrderStatus::Approved,
            "REJECTED" => ChangeOrderStatus::Rejected,
            _ => ChangeOrderStatus::Draft, // 默认值
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ChangeOrderStatus::Draft => "DRAFT",
            ChangeOrderStatus::PendingApproval => "PENDING_APPROVAL",
            ChangeOrderStatus::Approved => "APPROVED",
            ChangeOrderStatus::Rejected => "REJECTED",
        }
    }

    /// 是否为终态 (终态记录不可变)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ChangeOrderStatus::Approved | ChangeOrderStatus::Rejected
        )
    }

    /// 是否为"开放"状态 (同一工单最多允许一个开放变更单)
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            ChangeOrderStatus::Draft | ChangeOrderStatus::PendingApproval
        )
    }

    /// 判断状态转换是否合法
    ///
    /// 合法转换:
    /// - DRAFT → PENDING_APPROVAL (submit)
    /// - PENDING_APPROVAL → APPROVED (approve)
    /// - PENDING_APPROVAL → REJECTED (reject)
    /// - PENDING_APPROVAL → DRAFT (withdraw)
    pub fn can_transition_to(&self, target: ChangeOrderStatus) -> bool {
        matches!(
            (self, target),
            (ChangeOrderStatus::Draft, ChangeOrderStatus::PendingApproval)
                | (
                    ChangeOrderStatus::PendingApproval,
                    ChangeOrderStatus::Approved
                )
                | (
                    ChangeOrderStatus::PendingApproval,
                    ChangeOrderStatus::Rejected
                )
                | (ChangeOrderStatus::PendingApproval, ChangeOrderStatus::Draft)
        )
    }
}

// ==========================================
// 生产工序类型 (Component Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComponentType {
    Print,     // 印刷
    Data,      // 数据处理
    Proof,     // 打样
    Mailing,   // 邮寄处理
    Finishing, // 成品加工 (装封等)
    Bindery,   // 装订 (折页/骑马钉)
    Shipping,  // 发运
    Samples,   // 样品
    Other,     // 其他
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl ComponentType {
    /// 从字符串解析工序类型
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "PRINT" => ComponentType::Print,
            "DATA" => ComponentType::Data,
            "PROOF" => ComponentType::Proof,
            "MAILING" => ComponentType::Mailing,
            "FINISHING" => ComponentType::Finishing,
            "BINDERY" => ComponentType::Bindery,
            "SHIPPING" => ComponentType::Shipping,
            "SAMPLES" => ComponentType::Samples,
            _ => ComponentType::Other,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ComponentType::Print => "PRINT",
            ComponentType::Data => "DATA",
            ComponentType::Proof => "PROOF",
            ComponentType::Mailing => "MAILING",
            ComponentType::Finishing => "FINISHING",
            ComponentType::Bindery => "BINDERY",
            ComponentType::Shipping => "SHIPPING",
            ComponentType::Samples => "SAMPLES",
            ComponentType::Other => "OTHER",
        }
    }
}

// ==========================================
// 工序归属 (Component Owner)
// ==========================================
// VENDOR 归属的工序必须携带 vendor_id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComponentOwner {
    Internal, // 内部执行
    Vendor,   // 外部供应商执行
}

impl fmt::Display for ComponentOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl ComponentOwner {
    /// 从字符串解析归属
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "VENDOR" => ComponentOwner::Vendor,
            _ => ComponentOwner::Internal, // 默认值
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ComponentOwner::Internal => "INTERNAL",
            ComponentOwner::Vendor => "VENDOR",
        }
    }
}

// ==========================================
// 工单元类型 (Job Meta Type)
// ==========================================
// 工序建议引擎的分类输入，不由本核心持久化
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobMetaType {
    Mailing, // 邮寄类工单
    Job,     // 普通印刷工单
}

impl fmt::Display for JobMetaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobMetaType::Mailing => write!(f, "MAILING"),
            JobMetaType::Job => write!(f, "JOB"),
        }
    }
}

// ==========================================
// 邮件形式 (Mail Format)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MailFormat {
    Envelope,   // 信封装封
    SelfMailer, // 自封邮件
    Postcard,   // 明信片
    Flat,       // 大页邮件
}

impl fmt::Display for MailFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MailFormat::Envelope => write!(f, "ENVELOPE"),
            MailFormat::SelfMailer => write!(f, "SELF_MAILER"),
            MailFormat::Postcard => write!(f, "POSTCARD"),
            MailFormat::Flat => write!(f, "FLAT"),
        }
    }
}

// ==========================================
// 成品形式 (Job Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobType {
    Flat,             // 平张
    Folded,           // 折页
    BookletSelfCover, // 自封面手册
    BookletPlusCover, // 独立封面手册
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobType::Flat => write!(f, "FLAT"),
            JobType::Folded => write!(f, "FOLDED"),
            JobType::BookletSelfCover => write!(f, "BOOKLET_SELF_COVER"),
            JobType::BookletPlusCover => write!(f, "BOOKLET_PLUS_COVER"),
        }
    }
}

impl JobType {
    /// 是否为手册类 (自封面或独立封面)
    pub fn is_booklet(&self) -> bool {
        matches!(self, JobType::BookletSelfCover | JobType::BookletPlusCover)
    }
}

// ==========================================
// 编号序列作用域 (Sequence Scope)
// ==========================================
// master_seq 计数器按全局或按工单类型分区
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SequenceScope {
    Global,  // 单一全局计数器
    PerType, // 每个 job_type_code 一个计数器
}

impl fmt::Display for SequenceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequenceScope::Global => write!(f, "GLOBAL"),
            SequenceScope::PerType => write!(f, "PER_TYPE"),
        }
    }
}

impl SequenceScope {
    /// 从配置字符串解析作用域
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "GLOBAL" => SequenceScope::Global,
            _ => SequenceScope::PerType, // 默认值
        }
    }
}
