// ==========================================
// 印刷经纪订单管理系统 - 变更单数据仓储
// ==========================================
// 依据: 工单编号与变更单版本化设计 v0.2
// 红线: version 分配与变更单写入必须同一事务
// 红线: 批准与生效版本指针更新必须同一事务
// 红线: 终态记录不可变, 不可删除 (审计追踪)
// ==========================================

use crate::domain::change_order::{ChangeOrder, ChangeSet, DraftUpdate};
use crate::domain::types::ChangeOrderStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Transaction};
use std::sync::{Arc, Mutex};

const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

// ==========================================
// ChangeOrderRepository - 变更单仓储
// ==========================================
pub struct ChangeOrderRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ChangeOrderRepository {
    /// 创建新的ChangeOrderRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 版本分配 + 创建
    // ==========================================

    /// 创建变更单 (事务内分配 version 并派生 change_order_no)
    ///
    /// # 并发控制
    /// 在同一事务内查询 MAX(version) 并写入新行, 保证同一 job_id 的
    /// version 分配原子性; (job_id, version) 唯一索引作为兜底,
    /// 竞争失败以 `RepositoryError::SequenceConflict` 返回, 调用方整体重试。
    ///
    /// # 业务约束
    /// - 同一工单最多允许一个开放 (DRAFT/PENDING_APPROVAL) 变更单
    /// - 该方法会覆盖传入 `co` 的 version / change_order_no
    pub fn create_with_next_version(&self, co: &mut ChangeOrder) -> RepositoryResult<String> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        // 1. 校验工单存在并取 base_job_id (编号派生依据)
        let base_job_id: String = tx
            .query_row(
                "SELECT base_job_id FROM job WHERE job_id = ?",
                params![&co.job_id],
                |row| row.get(0),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound {
                    entity: "Job".to_string(),
                    id: co.job_id.clone(),
                },
                other => other.into(),
            })?;

        // 2. 同一工单最多一个开放变更单
        let open_count: i64 = tx.query_row(
            r#"SELECT COUNT(*) FROM change_order
               WHERE job_id = ? AND status IN ('DRAFT', 'PENDING_APPROVAL')"#,
            params![&co.job_id],
            |row| row.get(0),
        )?;

        if open_count > 0 {
            return Err(RepositoryError::BusinessRuleViolation(format!(
                "工单{}已存在开放变更单, 需先完成审批或撤回",
                co.job_id
            )));
        }

        // 3. 分配下一版本号 (从1开始, 连续无空洞;
        //    草稿/驳回的变更单一经创建同样占用版本槽位)
        let max_version: Option<i32> = tx.query_row(
            "SELECT MAX(version) FROM change_order WHERE job_id = ?",
            params![&co.job_id],
            |row| row.get(0),
        )?;

        co.version = max_version.unwrap_or(0) + 1;
        co.change_order_no = format!("{}-CO{}", base_job_id, co.version);

        // 4. 同一事务写入变更单行
        tx.execute(
            r#"INSERT INTO change_order (
                change_order_id, job_id, version, change_order_no,
                summary, changes_json, status,
                approved_at, approved_by, reject_reason,
                affects_vendors_json, requires_new_po, requires_reprice,
                created_by, created_at, revision
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &co.change_order_id,
                &co.job_id,
                &co.version,
                &co.change_order_no,
                &co.summary,
                co.changes
                    .to_json()
                    .map_err(|e| RepositoryError::InternalError(e.to_string()))?,
                co.status.to_db_str(),
                &co.approved_at.map(|t| t.format(DATETIME_FMT).to_string()),
                &co.approved_by,
                &co.reject_reason,
                serde_json::to_string(&co.affects_vendors)
                    .map_err(|e| RepositoryError::InternalError(e.to_string()))?,
                if co.requires_new_po { 1 } else { 0 },
                if co.requires_reprice { 1 } else { 0 },
                &co.created_by,
                &co.created_at.format(DATETIME_FMT).to_string(),
                &co.revision,
            ],
        )
        .map_err(|e| match RepositoryError::from(e) {
            // (job_id, version) 撞车说明并发分配竞争失败, 交由调用方重试
            RepositoryError::UniqueConstraintViolation(msg) => {
                RepositoryError::SequenceConflict { message: msg }
            }
            other => other,
        })?;

        tx.commit()?;
        Ok(co.change_order_id.clone())
    }

    // ==========================================
    // 状态机转换
    // ==========================================

    /// 提交审批 (DRAFT → PENDING_APPROVAL)
    pub fn submit(&self, change_order_id: &str) -> RepositoryResult<()> {
        self.transition(
            change_order_id,
            ChangeOrderStatus::Draft,
            ChangeOrderStatus::PendingApproval,
        )
    }

    /// 撤回审批 (PENDING_APPROVAL → DRAFT)
    ///
    /// 待审批记录必须先撤回才能继续编辑
    pub fn withdraw(&self, change_order_id: &str) -> RepositoryResult<()> {
        self.transition(
            change_order_id,
            ChangeOrderStatus::PendingApproval,
            ChangeOrderStatus::Draft,
        )
    }

    /// 驳回 (PENDING_APPROVAL → REJECTED, 终态)
    ///
    /// 不触碰工单的生效版本指针
    pub fn reject(&self, change_order_id: &str, reason: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let rows_affected = conn.execute(
            r#"UPDATE change_order
               SET status = 'REJECTED', reject_reason = ?, revision = revision + 1
               WHERE change_order_id = ? AND status = 'PENDING_APPROVAL'"#,
            params![reason, change_order_id],
        )?;

        if rows_affected == 0 {
            return Err(self.transition_failure(&conn, change_order_id, ChangeOrderStatus::Rejected));
        }

        Ok(())
    }

    /// 批准 (PENDING_APPROVAL → APPROVED, 终态)
    ///
    /// # 原子性
    /// 变更单状态更新与工单生效版本指针更新在同一事务内提交;
    /// 并发读者绝不会观察到 "已批准但指针未更新" 的中间状态。
    ///
    /// # 返回
    /// - Ok((job_id, version)): 被批准的版本号即写入指针的版本号
    pub fn approve(
        &self,
        change_order_id: &str,
        approver_id: &str,
        now: NaiveDateTime,
    ) -> RepositoryResult<(String, i32)> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        // 1. 读取当前状态与版本
        let (job_id, version, status_str): (String, i32, String) = tx
            .query_row(
                "SELECT job_id, version, status FROM change_order WHERE change_order_id = ?",
                params![change_order_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound {
                    entity: "ChangeOrder".to_string(),
                    id: change_order_id.to_string(),
                },
                other => other.into(),
            })?;

        let status = ChangeOrderStatus::from_str(&status_str);
        if !status.can_transition_to(ChangeOrderStatus::Approved) {
            return Err(RepositoryError::InvalidStateTransition {
                from: status_str,
                to: ChangeOrderStatus::Approved.to_db_str().to_string(),
            });
        }

        // 2. 写入终态与审批痕迹
        tx.execute(
            r#"UPDATE change_order
               SET status = 'APPROVED', approved_at = ?, approved_by = ?,
                   revision = revision + 1
               WHERE change_order_id = ?"#,
            params![
                now.format(DATETIME_FMT).to_string(),
                approver_id,
                change_order_id
            ],
        )?;

        // 3. 同一事务更新生效版本指针
        Self::resolve_effective_version(&tx, &job_id, version, now)?;

        tx.commit()?;
        Ok((job_id, version))
    }

    /// 生效版本指针解析 (仅作为批准事务的内部步骤)
    ///
    /// 指针写入的是"本次批准的版本号"而非 MAX(version):
    /// 先创建的草稿在后创建者被驳回之后获批, 指针同样要指向它。
    fn resolve_effective_version(
        tx: &Transaction,
        job_id: &str,
        version: i32,
        now: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let rows_affected = tx.execute(
            "UPDATE job SET effective_co_version = ?, updated_at = ? WHERE job_id = ?",
            params![version, now.format(DATETIME_FMT).to_string(), job_id],
        )?;

        if rows_affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Job".to_string(),
                id: job_id.to_string(),
            });
        }

        Ok(())
    }

    /// 通用单步状态转换 (带当前状态条件)
    fn transition(
        &self,
        change_order_id: &str,
        from: ChangeOrderStatus,
        to: ChangeOrderStatus,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let rows_affected = conn.execute(
            r#"UPDATE change_order
               SET status = ?, revision = revision + 1
               WHERE change_order_id = ? AND status = ?"#,
            params![to.to_db_str(), change_order_id, from.to_db_str()],
        )?;

        if rows_affected == 0 {
            return Err(self.transition_failure(&conn, change_order_id, to));
        }

        Ok(())
    }

    /// 区分转换失败原因: 记录不存在 / 当前状态不允许
    fn transition_failure(
        &self,
        conn: &Connection,
        change_order_id: &str,
        to: ChangeOrderStatus,
    ) -> RepositoryError {
        let actual: Result<String, _> = conn.query_row(
            "SELECT status FROM change_order WHERE change_order_id = ?",
            params![change_order_id],
            |row| row.get(0),
        );

        match actual {
            Ok(status) => RepositoryError::InvalidStateTransition {
                from: status,
                to: to.to_db_str().to_string(),
            },
            Err(_) => RepositoryError::NotFound {
                entity: "ChangeOrder".to_string(),
                id: change_order_id.to_string(),
            },
        }
    }

    // ==========================================
    // 草稿编辑
    // ==========================================

    /// 更新草稿字段 (带乐观锁检查)
    ///
    /// # 状态约束
    /// - DRAFT: 允许编辑
    /// - PENDING_APPROVAL: 拒绝, 需先 withdraw 回 DRAFT
    /// - APPROVED/REJECTED: 拒绝, `RepositoryError::ImmutableRecord`
    ///
    /// # 并发控制
    /// 使用乐观锁 (revision字段) 防止两个用户同时编辑同一草稿造成覆盖
    pub fn update_draft(
        &self,
        change_order_id: &str,
        update: &DraftUpdate,
        expected_revision: i32,
    ) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        // 1. 读取当前记录
        let co = Self::find_by_id_tx(&tx, change_order_id)?.ok_or_else(|| {
            RepositoryError::NotFound {
                entity: "ChangeOrder".to_string(),
                id: change_order_id.to_string(),
            }
        })?;

        // 2. 状态约束
        if co.status.is_terminal() {
            return Err(RepositoryError::ImmutableRecord {
                entity: "ChangeOrder".to_string(),
                id: change_order_id.to_string(),
                status: co.status.to_db_str().to_string(),
            });
        }
        if co.status != ChangeOrderStatus::Draft {
            return Err(RepositoryError::InvalidStateTransition {
                from: co.status.to_db_str().to_string(),
                to: ChangeOrderStatus::Draft.to_db_str().to_string(),
            });
        }

        // 3. 合并字段 (None 表示保持不变)
        let summary = update.summary.clone().unwrap_or(co.summary);
        let changes = update.changes.clone().unwrap_or(co.changes);
        let affects_vendors = update
            .affects_vendors
            .clone()
            .unwrap_or(co.affects_vendors);
        let requires_new_po = update.requires_new_po.unwrap_or(co.requires_new_po);
        let requires_reprice = update.requires_reprice.unwrap_or(co.requires_reprice);

        // 4. 带 revision 检查写回 (version/change_order_no 永不更新)
        let rows_affected = tx.execute(
            r#"UPDATE change_order
               SET summary = ?, changes_json = ?, affects_vendors_json = ?,
                   requires_new_po = ?, requires_reprice = ?, revision = revision + 1
               WHERE change_order_id = ? AND status = 'DRAFT' AND revision = ?"#,
            params![
                summary,
                changes
                    .to_json()
                    .map_err(|e| RepositoryError::InternalError(e.to_string()))?,
                serde_json::to_string(&affects_vendors)
                    .map_err(|e| RepositoryError::InternalError(e.to_string()))?,
                if requires_new_po { 1 } else { 0 },
                if requires_reprice { 1 } else { 0 },
                change_order_id,
                expected_revision,
            ],
        )?;

        if rows_affected == 0 {
            // 记录存在且为草稿, 只剩 revision 不匹配一种解释
            return Err(RepositoryError::OptimisticLockFailure {
                change_order_id: change_order_id.to_string(),
                expected: expected_revision,
                actual: co.revision,
            });
        }

        tx.commit()?;
        Ok(())
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 按change_order_id查询变更单
    pub fn find_by_id(&self, change_order_id: &str) -> RepositoryResult<Option<ChangeOrder>> {
        let conn = self.get_conn()?;
        Self::query_one(
            &conn,
            "WHERE change_order_id = ?",
            params![change_order_id],
        )
    }

    /// 查询工单的所有变更单 (按版本号升序, 即完整历史)
    pub fn find_by_job_id(&self, job_id: &str) -> RepositoryResult<Vec<ChangeOrder>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            "{} WHERE job_id = ? ORDER BY version ASC",
            Self::SELECT_SQL
        ))?;

        let orders = stmt
            .query_map(params![job_id], Self::map_row)?
            .collect::<Result<Vec<ChangeOrder>, _>>()?;

        Ok(orders)
    }

    /// 查询工单当前开放的变更单 (最多一个)
    pub fn find_open_by_job_id(&self, job_id: &str) -> RepositoryResult<Option<ChangeOrder>> {
        let conn = self.get_conn()?;
        Self::query_one(
            &conn,
            "WHERE job_id = ? AND status IN ('DRAFT', 'PENDING_APPROVAL')",
            params![job_id],
        )
    }

    /// 查询工单最近一次批准的版本号 (审计/一致性核对用)
    pub fn find_latest_approved_version(&self, job_id: &str) -> RepositoryResult<Option<i32>> {
        let conn = self.get_conn()?;

        let v: Option<i32> = conn.query_row(
            "SELECT MAX(version) FROM change_order WHERE job_id = ? AND status = 'APPROVED'",
            params![job_id],
            |row| row.get(0),
        )?;

        Ok(v)
    }

    /// 查询工单已分配的全部版本号 (升序)
    pub fn list_versions(&self, job_id: &str) -> RepositoryResult<Vec<i32>> {
        let conn = self.get_conn()?;

        let mut stmt = conn
            .prepare("SELECT version FROM change_order WHERE job_id = ? ORDER BY version ASC")?;

        let versions = stmt
            .query_map(params![job_id], |row| row.get(0))?
            .collect::<Result<Vec<i32>, _>>()?;

        Ok(versions)
    }

    // ==========================================
    // 行映射
    // ==========================================

    const SELECT_SQL: &'static str = r#"SELECT change_order_id, job_id, version, change_order_no,
                      summary, changes_json, status,
                      approved_at, approved_by, reject_reason,
                      affects_vendors_json, requires_new_po, requires_reprice,
                      created_by, created_at, revision
               FROM change_order"#;

    fn query_one(
        conn: &Connection,
        where_clause: &str,
        params: impl rusqlite::Params,
    ) -> RepositoryResult<Option<ChangeOrder>> {
        match conn.query_row(
            &format!("{} {}", Self::SELECT_SQL, where_clause),
            params,
            Self::map_row,
        ) {
            Ok(co) => Ok(Some(co)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 事务内按 change_order_id 查询
    fn find_by_id_tx(
        tx: &Transaction,
        change_order_id: &str,
    ) -> RepositoryResult<Option<ChangeOrder>> {
        match tx.query_row(
            &format!("{} WHERE change_order_id = ?", Self::SELECT_SQL),
            params![change_order_id],
            Self::map_row,
        ) {
            Ok(co) => Ok(Some(co)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 映射数据库行到ChangeOrder对象
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<ChangeOrder> {
        let changes_json: String = row.get(5)?;
        let status_str: String = row.get(6)?;
        let affects_vendors_json: String = row.get(10)?;

        Ok(ChangeOrder {
            change_order_id: row.get(0)?,
            job_id: row.get(1)?,
            version: row.get(2)?,
            change_order_no: row.get(3)?,
            summary: row.get(4)?,
            changes: ChangeSet::from_json(&changes_json).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
            })?,
            status: ChangeOrderStatus::from_str(&status_str),
            approved_at: row
                .get::<_, Option<String>>(7)?
                .and_then(|s| NaiveDateTime::parse_from_str(&s, DATETIME_FMT).ok()),
            approved_by: row.get(8)?,
            reject_reason: row.get(9)?,
            affects_vendors: serde_json::from_str(&affects_vendors_json).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    10,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?,
            requires_new_po: row.get::<_, i32>(11)? == 1,
            requires_reprice: row.get::<_, i32>(12)? == 1,
            created_by: row.get(13)?,
            created_at: NaiveDateTime::parse_from_str(&row.get::<_, String>(14)?, DATETIME_FMT)
                .map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        14,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?,
            revision: row.get(15)?,
        })
    }
}
