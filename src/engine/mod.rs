// ==========================================
// 印刷经纪订单管理系统 - 引擎层
// ==========================================
// 职责: 实现业务规则引擎, 不拼 SQL
// 红线: Engine 不拼 SQL, 所有规则必须可解释
// ==========================================

pub mod suggestion;
pub mod validation;

// 重导出核心引擎
pub use suggestion::ComponentSuggestionEngine;
pub use validation::{
    ComponentValidator, ValidationIssue, ISSUE_MISSING_PRINT, ISSUE_MISSING_PROOF,
    ISSUE_VENDOR_ID_REQUIRED,
};
