// ==========================================
// 印刷经纪订单管理系统 - 生产工序数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::component::Component;
use crate::domain::types::{ComponentOwner, ComponentType};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

// ==========================================
// ComponentRepository - 工序仓储
// ==========================================
pub struct ComponentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ComponentRepository {
    /// 创建新的ComponentRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 批量插入工序
    ///
    /// # 红线
    /// - 必须在事务中完成 (整组工序要么全部落库要么全部不落)
    pub fn batch_insert(&self, components: &[Component]) -> RepositoryResult<usize> {
        if components.is_empty() {
            return Ok(0);
        }

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        for c in components {
            tx.execute(
                r#"INSERT INTO component (
                    component_id, job_id, component_type, name, description,
                    owner, vendor_id, artwork_required, data_required,
                    sort_order, status, created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
                params![
                    &c.component_id,
                    &c.job_id,
                    c.component_type.to_db_str(),
                    &c.name,
                    &c.description,
                    c.owner.to_db_str(),
                    &c.vendor_id,
                    if c.artwork_required { 1 } else { 0 },
                    if c.data_required { 1 } else { 0 },
                    &c.sort_order,
                    &c.status,
                    &c.created_at.format(DATETIME_FMT).to_string(),
                    &c.updated_at.format(DATETIME_FMT).to_string(),
                ],
            )?;
        }

        tx.commit()?;
        Ok(components.len())
    }

    /// 查询工单的所有工序 (按 sort_order 升序)
    pub fn find_by_job_id(&self, job_id: &str) -> RepositoryResult<Vec<Component>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT component_id, job_id, component_type, name, description,
                      owner, vendor_id, artwork_required, data_required,
                      sort_order, status, created_at, updated_at
               FROM component
               WHERE job_id = ?
               ORDER BY sort_order ASC"#,
        )?;

        let components = stmt
            .query_map(params![job_id], |row| self.map_row(row))?
            .collect::<Result<Vec<Component>, _>>()?;

        Ok(components)
    }

    /// 按component_id查询工序
    pub fn find_by_id(&self, component_id: &str) -> RepositoryResult<Option<Component>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT component_id, job_id, component_type, name, description,
                      owner, vendor_id, artwork_required, data_required,
                      sort_order, status, created_at, updated_at
               FROM component
               WHERE component_id = ?"#,
            params![component_id],
            |row| self.map_row(row),
        ) {
            Ok(c) => Ok(Some(c)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 删除工单的所有工序 (仅限草稿工单重新播种时使用)
    pub fn delete_by_job_id(&self, job_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;

        let count = conn.execute("DELETE FROM component WHERE job_id = ?", params![job_id])?;

        Ok(count)
    }

    /// 映射数据库行到Component对象
    fn map_row(&self, row: &rusqlite::Row) -> rusqlite::Result<Component> {
        let type_str: String = row.get(2)?;
        let owner_str: String = row.get(5)?;

        Ok(Component {
            component_id: row.get(0)?,
            job_id: row.get(1)?,
            component_type: ComponentType::from_str(&type_str),
            name: row.get(3)?,
            description: row.get(4)?,
            owner: ComponentOwner::from_str(&owner_str),
            vendor_id: row.get(6)?,
            artwork_required: row.get::<_, i32>(7)? == 1,
            data_required: row.get::<_, i32>(8)? == 1,
            sort_order: row.get(9)?,
            status: row.get(10)?,
            created_at: NaiveDateTime::parse_from_str(&row.get::<_, String>(11)?, DATETIME_FMT)
                .map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        11,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?,
            updated_at: NaiveDateTime::parse_from_str(&row.get::<_, String>(12)?, DATETIME_FMT)
                .map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        12,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?,
        })
    }
}
