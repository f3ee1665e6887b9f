// ==========================================
// 印刷经纪订单管理系统 - 核心库
// ==========================================
// 依据: 工单编号与变更单版本化设计 v0.2
// 技术栈: Rust + SQLite
// 系统定位: 工单编号分配 / 变更单版本化 / 工序建议与校验
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    ChangeOrderStatus, ComponentOwner, ComponentType, JobMetaType, JobStatus, JobType, MailFormat,
    SequenceScope,
};

// 领域实体
pub use domain::{
    ActionLog, ActionType, ChangeEntry, ChangeOrder, ChangeSet, Component, ComponentDefaults,
    DraftUpdate, Job, JobClassification, JobIdentifiers, SuggestedComponent,
};

// 引擎
pub use engine::{ComponentSuggestionEngine, ComponentValidator, ValidationIssue};

// 仓储
pub use repository::{
    ActionLogRepository, ChangeOrderRepository, ComponentRepository, JobRepository,
    RepositoryError, RepositoryResult,
};

// 配置
pub use config::{ConfigManager, NumberingPolicy};

// API
pub use api::{ApiError, ApiResult, ChangeOrderApi, JobApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "印刷经纪订单管理系统";

// 数据库版本
pub const DB_VERSION: &str = "v0.1";

// ==========================================
// 预编译检查
// ==========================================

// 确保编译时所有模块可见
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
