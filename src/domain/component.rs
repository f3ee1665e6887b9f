// ==========================================
// 印刷经纪订单管理系统 - 生产工序领域模型
// ==========================================
// 依据: 工序建议与校验设计 v0.1
// ==========================================

use crate::domain::types::{
    ComponentOwner, ComponentType, JobMetaType, JobType, MailFormat,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// Component - 生产工序
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    pub component_id: String,            // 工序ID (系统生成, uuid)
    pub job_id: String,                  // 关联工单
    pub component_type: ComponentType,   // 工序类型
    pub name: String,                    // 工序名称
    pub description: Option<String>,     // 说明
    pub owner: ComponentOwner,           // 归属 (内部/供应商)
    pub vendor_id: Option<String>,       // 供应商ID (owner=VENDOR 时必填)
    pub artwork_required: bool,          // 是否需要稿件
    pub data_required: bool,             // 是否需要数据文件
    pub sort_order: i32,                 // 展示/执行顺序
    pub status: String,                  // 工序生命周期状态 (下游管理, 本核心不约束)
    pub created_at: NaiveDateTime,       // 创建时间
    pub updated_at: NaiveDateTime,       // 更新时间
}

// ==========================================
// SuggestedComponent - 建议工序
// ==========================================
// 建议引擎的纯输出, 尚未持久化
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedComponent {
    pub component_type: ComponentType,
    pub name: String,
    pub description: String,
    pub owner: ComponentOwner,  // 默认 INTERNAL, 下游可覆盖
    pub artwork_required: bool,
    pub data_required: bool,
    pub sort_order: i32,
}

// ==========================================
// ComponentDefaults - 工序类型默认属性
// ==========================================
// 独立于建议流程的纯查表, 可被外部复用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentDefaults {
    pub owner: ComponentOwner,
    pub artwork_required: bool,
    pub data_required: bool,
}

/// 按工序类型查默认属性
///
/// 规则: PRINT/PROOF 需要稿件; DATA/MAILING 需要数据文件; 其余两者皆否
pub fn component_defaults(component_type: ComponentType) -> ComponentDefaults {
    let artwork_required = matches!(component_type, ComponentType::Print | ComponentType::Proof);
    let data_required = matches!(component_type, ComponentType::Data | ComponentType::Mailing);

    ComponentDefaults {
        owner: ComponentOwner::Internal,
        artwork_required,
        data_required,
    }
}

// ==========================================
// JobClassification - 工单分类 (建议引擎输入)
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobClassification {
    pub meta_type: JobMetaType,           // 工单元类型
    pub mail_format: Option<MailFormat>,  // 邮件形式 (邮寄类工单)
    pub job_type: Option<JobType>,        // 成品形式
    pub envelope_components: i32,         // 装封件数 (默认1)
    pub has_samples: bool,                // 是否需要样品
    pub has_data: bool,                   // 是否携带数据文件
    pub has_versions: bool,               // 是否多版本印件
}

impl JobClassification {
    /// 构造普通印刷工单分类
    pub fn job(job_type: JobType) -> Self {
        Self {
            meta_type: JobMetaType::Job,
            mail_format: None,
            job_type: Some(job_type),
            envelope_components: 1,
            has_samples: false,
            has_data: false,
            has_versions: false,
        }
    }

    /// 构造邮寄类工单分类
    pub fn mailing(mail_format: MailFormat) -> Self {
        Self {
            meta_type: JobMetaType::Mailing,
            mail_format: Some(mail_format),
            job_type: None,
            envelope_components: 1,
            has_samples: false,
            has_data: false,
            has_versions: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_defaults_lookup() {
        assert!(component_defaults(ComponentType::Print).artwork_required);
        assert!(component_defaults(ComponentType::Proof).artwork_required);
        assert!(component_defaults(ComponentType::Data).data_required);
        assert!(component_defaults(ComponentType::Mailing).data_required);

        let shipping = component_defaults(ComponentType::Shipping);
        assert!(!shipping.artwork_required);
        assert!(!shipping.data_required);
        assert_eq!(shipping.owner, ComponentOwner::Internal);
    }
}
