// ==========================================
// 印刷经纪订单管理系统 - 工单数据仓储
// ==========================================
// 依据: 工单编号与变更单版本化设计 v0.2
// 红线: Repository 不含业务逻辑
// 红线: master_seq 分配与工单写入必须同一事务
// ==========================================

use crate::config::NumberingPolicy;
use crate::domain::job::{Job, JobIdentifiers};
use crate::domain::types::{JobStatus, SequenceScope};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// JobRepository - 工单仓储
// ==========================================
pub struct JobRepository {
    conn: Arc<Mutex<Connection>>,
}

impl JobRepository {
    /// 创建新的JobRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建工单 (事务内分配 master_seq 并派生 base_job_id)
    ///
    /// # 并发控制
    /// 在同一事务内对 job_sequence 计数器行执行读取-递增-写回,
    /// 并在事务提交前插入工单行; 两个并发创建绝不会拿到相同序号。
    /// base_job_id 上的唯一索引作为兜底, 竞争失败以
    /// `RepositoryError::SequenceConflict` 返回, 由调用方整体重试。
    ///
    /// # 说明
    /// - 计数器作用域由编号策略决定: GLOBAL 单行, PER_TYPE 按类型一行
    /// - 该方法会覆盖传入 `job` 的 base_job_id / master_seq
    pub fn create_with_allocated_seq(
        &self,
        job: &mut Job,
        policy: &NumberingPolicy,
    ) -> RepositoryResult<JobIdentifiers> {
        if job.job_type_code.trim().is_empty() {
            return Err(RepositoryError::ValidationError(
                "job_type_code 不能为空".to_string(),
            ));
        }

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let seq_scope = match policy.scope {
            SequenceScope::Global => "GLOBAL".to_string(),
            SequenceScope::PerType => job.job_type_code.clone(),
        };

        // 1. 计数器行不存在则初始化为0
        tx.execute(
            "INSERT OR IGNORE INTO job_sequence (seq_scope, next_seq) VALUES (?, 0)",
            params![&seq_scope],
        )?;

        // 2. 读取-递增 (事务内原子)
        tx.execute(
            "UPDATE job_sequence SET next_seq = next_seq + 1 WHERE seq_scope = ?",
            params![&seq_scope],
        )?;

        let master_seq: i64 = tx.query_row(
            "SELECT next_seq FROM job_sequence WHERE seq_scope = ?",
            params![&seq_scope],
            |row| row.get(0),
        )?;

        // 3. 派生人类可读编号: "{job_type_code}{master_seq 补零}"
        job.master_seq = master_seq;
        job.base_job_id = format!(
            "{}{:0width$}",
            job.job_type_code,
            master_seq,
            width = policy.pad_width
        );

        // 4. 同一事务写入工单行
        tx.execute(
            r#"INSERT INTO job (
                job_id, base_job_id, master_seq, job_type_code,
                effective_co_version, status, created_by, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &job.job_id,
                &job.base_job_id,
                &job.master_seq,
                &job.job_type_code,
                &job.effective_co_version,
                job.status.to_db_str(),
                &job.created_by,
                &job.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                &job.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ],
        )
        .map_err(|e| match RepositoryError::from(e) {
            // 编号撞车说明并发分配竞争失败, 交由调用方重试
            RepositoryError::UniqueConstraintViolation(msg) => {
                RepositoryError::SequenceConflict { message: msg }
            }
            other => other,
        })?;

        tx.commit()?;

        Ok(job.identifiers())
    }

    /// 按job_id查询工单
    pub fn find_by_id(&self, job_id: &str) -> RepositoryResult<Option<Job>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT job_id, base_job_id, master_seq, job_type_code,
                      effective_co_version, status, created_by, created_at, updated_at
               FROM job
               WHERE job_id = ?"#,
            params![job_id],
            |row| self.map_row(row),
        ) {
            Ok(job) => Ok(Some(job)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 按base_job_id查询工单
    pub fn find_by_base_job_id(&self, base_job_id: &str) -> RepositoryResult<Option<Job>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT job_id, base_job_id, master_seq, job_type_code,
                      effective_co_version, status, created_by, created_at, updated_at
               FROM job
               WHERE base_job_id = ?"#,
            params![base_job_id],
            |row| self.map_row(row),
        ) {
            Ok(job) => Ok(Some(job)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询所有工单 (按创建时间降序)
    pub fn list_all(&self) -> RepositoryResult<Vec<Job>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT job_id, base_job_id, master_seq, job_type_code,
                      effective_co_version, status, created_by, created_at, updated_at
               FROM job
               ORDER BY created_at DESC, master_seq DESC"#,
        )?;

        let jobs = stmt
            .query_map([], |row| self.map_row(row))?
            .collect::<Result<Vec<Job>, _>>()?;

        Ok(jobs)
    }

    /// 工单出草稿 (DRAFT → OPEN)
    ///
    /// # 错误
    /// - `RepositoryError::InvalidStateTransition`: 当前状态不是 DRAFT
    /// - `RepositoryError::NotFound`: job_id 不存在
    pub fn mark_open(&self, job_id: &str, now: NaiveDateTime) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let rows_affected = conn.execute(
            "UPDATE job SET status = 'OPEN', updated_at = ? WHERE job_id = ? AND status = 'DRAFT'",
            params![now.format("%Y-%m-%d %H:%M:%S").to_string(), job_id],
        )?;

        if rows_affected == 0 {
            // 判断是记录不存在还是状态不符
            let actual: Result<String, _> = conn.query_row(
                "SELECT status FROM job WHERE job_id = ?",
                params![job_id],
                |row| row.get(0),
            );

            return match actual {
                Ok(status) => Err(RepositoryError::InvalidStateTransition {
                    from: status,
                    to: JobStatus::Open.to_db_str().to_string(),
                }),
                Err(_) => Err(RepositoryError::NotFound {
                    entity: "Job".to_string(),
                    id: job_id.to_string(),
                }),
            };
        }

        Ok(())
    }

    /// 读取当前生效版本指针
    pub fn effective_co_version(&self, job_id: &str) -> RepositoryResult<Option<i32>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            "SELECT effective_co_version FROM job WHERE job_id = ?",
            params![job_id],
            |row| row.get::<_, Option<i32>>(0),
        ) {
            Ok(v) => Ok(v),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(RepositoryError::NotFound {
                entity: "Job".to_string(),
                id: job_id.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// 映射数据库行到Job对象
    fn map_row(&self, row: &rusqlite::Row) -> rusqlite::Result<Job> {
        let status_str: String = row.get(5)?;
        Ok(Job {
            job_id: row.get(0)?,
            base_job_id: row.get(1)?,
            master_seq: row.get(2)?,
            job_type_code: row.get(3)?,
            effective_co_version: row.get(4)?,
            status: JobStatus::from_str(&status_str),
            created_by: row.get(6)?,
            created_at: NaiveDateTime::parse_from_str(
                &row.get::<_, String>(7)?,
                "%Y-%m-%d %H:%M:%S",
            )
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
            })?,
            updated_at: NaiveDateTime::parse_from_str(
                &row.get::<_, String>(8)?,
                "%Y-%m-%d %H:%M:%S",
            )
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
            })?,
        })
    }
}
