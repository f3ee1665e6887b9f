// ==========================================
// 印刷经纪订单管理系统 - API层
// ==========================================
// 职责: 面向调用方的业务入口, 参数校验 + 操作日志 + 错误转换
// 红线: API层不直接拼 SQL, 一切数据访问经由仓储层
// ==========================================

pub mod change_order_api;
pub mod error;
pub mod job_api;

// 重导出核心类型
pub use change_order_api::ChangeOrderApi;
pub use error::{ApiError, ApiResult};
pub use job_api::JobApi;
