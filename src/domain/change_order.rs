// ==========================================
// 印刷经纪订单管理系统 - 变更单领域模型
// ==========================================
// 依据: 工单编号与变更单版本化设计 v0.2
// 红线: 同一工单的 version 必须为 1..N 连续序列,
//       终态记录的 summary/changes/version 不可变
// ==========================================

use crate::domain::types::{ChangeOrderStatus, ComponentType};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ==========================================
// ChangeEntry - 结构化变更条目
// ==========================================
// 变更内容采用带标签的联合类型而非自由 JSON,
// 版本连续性与不可变性约束不依赖其内部形状
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeEntry {
    /// 规格字段变更
    SpecChange {
        field: String,
        old_value: Value,
        new_value: Value,
    },
    /// 数量变更
    QuantityChange { old_qty: i64, new_qty: i64 },
    /// 交期变更
    ScheduleChange {
        old_date: Option<NaiveDate>,
        new_date: NaiveDate,
    },
    /// 新增工序
    ComponentAdded {
        component_type: ComponentType,
        name: String,
    },
    /// 移除工序
    ComponentRemoved {
        component_type: ComponentType,
        name: String,
    },
    /// 备注说明
    Note { text: String },
}

// ==========================================
// ChangeSet - 变更内容集合
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub entries: Vec<ChangeEntry>,
}

impl ChangeSet {
    /// 构造空变更集
    pub fn new() -> Self {
        Self::default()
    }

    /// 判断是否为空
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 序列化为数据库存储的 JSON 字符串
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// 从数据库 JSON 字符串反序列化
    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}

// ==========================================
// ChangeOrder - 变更单
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeOrder {
    pub change_order_id: String,          // 变更单ID (系统生成, uuid)
    pub job_id: String,                   // 关联工单
    pub version: i32,                     // 版本号 (每工单唯一且连续, 从1开始)
    pub change_order_no: String,          // 变更单编号 "{base_job_id}-CO{version}"
    pub summary: String,                  // 变更摘要
    pub changes: ChangeSet,               // 结构化变更内容
    pub status: ChangeOrderStatus,        // 状态
    pub approved_at: Option<NaiveDateTime>, // 批准时间 (仅批准时写入)
    pub approved_by: Option<String>,      // 批准人 (调用方提供的不透明标识)
    pub reject_reason: Option<String>,    // 驳回原因
    pub affects_vendors: Vec<String>,     // 受影响供应商 (下游消费, 不参与本核心约束)
    pub requires_new_po: bool,            // 是否需要重开采购单
    pub requires_reprice: bool,           // 是否需要重新报价
    pub created_by: String,               // 创建人
    pub created_at: NaiveDateTime,        // 创建时间
    pub revision: i32,                    // 乐观锁: 草稿编辑修订号
}

impl ChangeOrder {
    /// 判断是否为草稿状态
    pub fn is_draft(&self) -> bool {
        self.status == ChangeOrderStatus::Draft
    }

    /// 判断是否为终态 (不可变)
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

// ==========================================
// DraftUpdate - 草稿编辑字段集
// ==========================================
// 仅 DRAFT 状态可写; None 表示该字段保持不变
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DraftUpdate {
    pub summary: Option<String>,
    pub changes: Option<ChangeSet>,
    pub affects_vendors: Option<Vec<String>>,
    pub requires_new_po: Option<bool>,
    pub requires_reprice: Option<bool>,
}

impl DraftUpdate {
    /// 判断是否没有任何字段待更新
    pub fn is_empty(&self) -> bool {
        self.summary.is_none()
            && self.changes.is_none()
            && self.affects_vendors.is_none()
            && self.requires_new_po.is_none()
            && self.requires_reprice.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_set_json_roundtrip() {
        let changes = ChangeSet {
            entries: vec![
                ChangeEntry::QuantityChange {
                    old_qty: 5000,
                    new_qty: 7500,
                },
                ChangeEntry::Note {
                    text: "客户要求加急".to_string(),
                },
            ],
        };

        let json = changes.to_json().unwrap();
        assert!(json.contains("QUANTITY_CHANGE"));

        let parsed = ChangeSet::from_json(&json).unwrap();
        assert_eq!(parsed, changes);
    }
}
