// ==========================================
// 印刷经纪订单管理系统 - 数据仓储层
// ==========================================
// 职责: 数据访问与事务边界
// 红线: Repository 不含业务逻辑
// ==========================================

pub mod action_log_repo;
pub mod change_order_repo;
pub mod component_repo;
pub mod error;
pub mod job_repo;

// 重导出核心类型
pub use action_log_repo::ActionLogRepository;
pub use change_order_repo::ChangeOrderRepository;
pub use component_repo::ComponentRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use job_repo::JobRepository;
