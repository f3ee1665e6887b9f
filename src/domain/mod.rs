// ==========================================
// 印刷经纪订单管理系统 - 领域层
// ==========================================
// 职责: 实体与类型定义, 不含数据访问与业务编排
// ==========================================

pub mod action_log;
pub mod change_order;
pub mod component;
pub mod job;
pub mod types;

// 重导出核心实体
pub use action_log::{ActionLog, ActionType};
pub use change_order::{ChangeEntry, ChangeOrder, ChangeSet, DraftUpdate};
pub use component::{
    component_defaults, Component, ComponentDefaults, JobClassification, SuggestedComponent,
};
pub use job::{Job, JobIdentifiers};
