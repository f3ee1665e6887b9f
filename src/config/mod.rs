// ==========================================
// 印刷经纪订单管理系统 - 配置层
// ==========================================
// 职责: 系统配置 (编号策略等)
// ==========================================

pub mod config_manager;

pub use config_manager::{ConfigManager, KEY_PAD_WIDTH, KEY_SEQ_SCOPE};

use crate::domain::types::SequenceScope;
use serde::{Deserialize, Serialize};

// ==========================================
// NumberingPolicy - 工单编号策略
// ==========================================
// base_job_id = "{job_type_code}{master_seq 按 pad_width 补零}"
// 计数器作用域: GLOBAL 单行 / PER_TYPE 按类型一行
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberingPolicy {
    pub scope: SequenceScope,
    pub pad_width: usize,
}

impl Default for NumberingPolicy {
    fn default() -> Self {
        Self {
            scope: SequenceScope::PerType,
            pad_width: 6,
        }
    }
}
