// ==========================================
// 印刷经纪订单管理系统 - 工单领域模型
// ==========================================
// 依据: 工单编号与变更单版本化设计 v0.2
// 红线: base_job_id 一经分配终身不变
// ==========================================

use crate::domain::types::JobStatus;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// JobIdentifiers - 工单编号三元组
// ==========================================
// base_job_id 是 (job_type_code, master_seq) 的纯函数:
//   "{job_type_code}{master_seq 按配置位宽补零}"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobIdentifiers {
    pub base_job_id: String,   // 人类可读工单编号
    pub master_seq: i64,       // 单调递增分配序号
    pub job_type_code: String, // 工单类型短码 (嵌入编号)
}

// ==========================================
// Job - 工单
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,                    // 工单ID (系统生成, uuid)
    pub base_job_id: String,               // 人类可读工单编号
    pub master_seq: i64,                   // 分配序号
    pub job_type_code: String,             // 工单类型短码
    pub effective_co_version: Option<i32>, // 最近一次批准的变更单版本号 (无批准则为 None)
    pub status: JobStatus,                 // 工单状态
    pub created_by: String,                // 创建人
    pub created_at: NaiveDateTime,         // 创建时间
    pub updated_at: NaiveDateTime,         // 更新时间
}

impl Job {
    /// 取出编号三元组
    pub fn identifiers(&self) -> JobIdentifiers {
        JobIdentifiers {
            base_job_id: self.base_job_id.clone(),
            master_seq: self.master_seq,
            job_type_code: self.job_type_code.clone(),
        }
    }

    /// 判断是否为草稿状态
    pub fn is_draft(&self) -> bool {
        self.status == JobStatus::Draft
    }

    /// 派生指定版本的变更单编号: "{base_job_id}-CO{version}"
    pub fn change_order_no(&self, version: i32) -> String {
        format!("{}-CO{}", self.base_job_id, version)
    }
}
