// ==========================================
// 印刷经纪订单管理系统 - 工序校验引擎
// ==========================================
// 依据: 工序建议与校验设计 v0.1
// 红线: 纯函数, 不抛错不改写输入; 结果是建议性清单,
//       是否阻断落库由调用方决定
// ==========================================

use crate::domain::component::Component;
use crate::domain::types::{ComponentOwner, ComponentType};
use serde::{Deserialize, Serialize};

// ==========================================
// 校验问题代码
// ==========================================
pub const ISSUE_MISSING_PRINT: &str = "MISSING_PRINT";
pub const ISSUE_MISSING_PROOF: &str = "MISSING_PROOF";
pub const ISSUE_VENDOR_ID_REQUIRED: &str = "VENDOR_ID_REQUIRED";

// ==========================================
// ValidationIssue - 校验问题
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// 问题代码 (MISSING_PRINT / MISSING_PROOF / VENDOR_ID_REQUIRED)
    pub issue_code: String,
    /// 问题所指工序 (整组缺失类问题为 None)
    pub component_id: Option<String>,
    /// 可读说明
    pub message: String,
}

impl ValidationIssue {
    fn missing(issue_code: &str, message: &str) -> Self {
        Self {
            issue_code: issue_code.to_string(),
            component_id: None,
            message: message.to_string(),
        }
    }
}

// ==========================================
// ComponentValidator - 工序校验引擎
// ==========================================
pub struct ComponentValidator;

impl ComponentValidator {
    /// 创建新的工序校验引擎
    pub fn new() -> Self {
        Self
    }

    /// 校验工序集
    ///
    /// 各项检查相互独立:
    /// - 至少一个 PRINT 工序
    /// - 至少一个 PROOF 工序
    /// - 每个 VENDOR 归属工序必须携带非空 vendor_id (每个违规工序一条)
    pub fn validate(&self, components: &[Component]) -> Vec<ValidationIssue> {
        let mut issues: Vec<ValidationIssue> = Vec::new();

        if !components
            .iter()
            .any(|c| c.component_type == ComponentType::Print)
        {
            issues.push(ValidationIssue::missing(
                ISSUE_MISSING_PRINT,
                "missing PRINT component",
            ));
        }

        if !components
            .iter()
            .any(|c| c.component_type == ComponentType::Proof)
        {
            issues.push(ValidationIssue::missing(
                ISSUE_MISSING_PROOF,
                "missing PROOF component",
            ));
        }

        for c in components {
            let vendor_id_missing = c
                .vendor_id
                .as_deref()
                .map(|v| v.trim().is_empty())
                .unwrap_or(true);

            if c.owner == ComponentOwner::Vendor && vendor_id_missing {
                issues.push(ValidationIssue {
                    issue_code: ISSUE_VENDOR_ID_REQUIRED.to_string(),
                    component_id: Some(c.component_id.clone()),
                    message: format!("vendor-owned component '{}' has no vendor_id", c.name),
                });
            }
        }

        issues
    }
}

impl Default for ComponentValidator {
    fn default() -> Self {
        Self::new()
    }
}
