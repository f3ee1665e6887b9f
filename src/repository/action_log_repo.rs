// ==========================================
// 印刷经纪订单管理系统 - 操作日志仓储
// ==========================================
// 红线: 只追加, 不更新, 不删除
// ==========================================

use crate::domain::action_log::ActionLog;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// ActionLogRepository - 操作日志仓储
// ==========================================
pub struct ActionLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ActionLogRepository {
    /// 创建新的ActionLogRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 追加日志
    pub fn insert(&self, log: &ActionLog) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO action_log (
                action_id, job_id, change_order_id, action_type,
                action_ts, actor, payload_json, detail
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &log.action_id,
                &log.job_id,
                &log.change_order_id,
                &log.action_type,
                &log.action_ts.format("%Y-%m-%d %H:%M:%S").to_string(),
                &log.actor,
                &log.payload_json.as_ref().map(|v| v.to_string()),
                &log.detail,
            ],
        )?;

        Ok(())
    }

    /// 查询工单的操作历史 (按时间升序)
    pub fn find_by_job_id(&self, job_id: &str) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT action_id, job_id, change_order_id, action_type,
                      action_ts, actor, payload_json, detail
               FROM action_log
               WHERE job_id = ?
               ORDER BY action_ts ASC, action_id ASC"#,
        )?;

        let logs = stmt
            .query_map(params![job_id], |row| self.map_row(row))?
            .collect::<Result<Vec<ActionLog>, _>>()?;

        Ok(logs)
    }

    /// 映射数据库行到ActionLog对象
    fn map_row(&self, row: &rusqlite::Row) -> rusqlite::Result<ActionLog> {
        Ok(ActionLog {
            action_id: row.get(0)?,
            job_id: row.get(1)?,
            change_order_id: row.get(2)?,
            action_type: row.get(3)?,
            action_ts: NaiveDateTime::parse_from_str(
                &row.get::<_, String>(4)?,
                "%Y-%m-%d %H:%M:%S",
            )
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
            })?,
            actor: row.get(5)?,
            payload_json: row
                .get::<_, Option<String>>(6)?
                .and_then(|s| serde_json::from_str(&s).ok()),
            detail: row.get(7)?,
        })
    }
}
