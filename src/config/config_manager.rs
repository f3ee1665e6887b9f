// ==========================================
// 印刷经纪订单管理系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value, scope_id='global')
// ==========================================

use crate::config::NumberingPolicy;
use crate::db::open_sqlite_connection;
use crate::domain::types::SequenceScope;
use rusqlite::{params, Connection};
use std::error::Error;
use std::sync::{Arc, Mutex};

/// 编号序列作用域配置键
pub const KEY_SEQ_SCOPE: &str = "numbering.seq_scope";
/// 编号补零位宽配置键
pub const KEY_PAD_WIDTH: &str = "numbering.pad_width";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明: 为保证连接行为一致, 会对传入连接再次应用统一 PRAGMA (幂等)。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值 (scope_id='global')
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 写入/覆写配置值 (scope_id='global')
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        conn.execute(
            r#"INSERT INTO config_kv (scope_id, key, value, updated_at)
               VALUES ('global', ?1, ?2, datetime('now'))
               ON CONFLICT(scope_id, key) DO UPDATE SET
                   value = excluded.value, updated_at = excluded.updated_at"#,
            params![key, value],
        )?;

        Ok(())
    }

    /// 读取整型配置, 缺失或非法时返回默认值
    fn get_i64_or(&self, key: &str, default: i64) -> Result<i64, Box<dyn Error>> {
        Ok(self
            .get_global_config_value(key)?
            .and_then(|v| v.trim().parse::<i64>().ok())
            .unwrap_or(default))
    }

    /// 解析当前生效的编号策略
    ///
    /// 默认: 按工单类型分区计数 (PER_TYPE), 补零位宽 6
    /// 位宽允许范围 1-12, 越界回落默认值
    pub fn numbering_policy(&self) -> Result<NumberingPolicy, Box<dyn Error>> {
        let scope = self
            .get_global_config_value(KEY_SEQ_SCOPE)?
            .map(|v| SequenceScope::from_str(&v))
            .unwrap_or(SequenceScope::PerType);

        let pad_width = self.get_i64_or(KEY_PAD_WIDTH, 6)?;
        let pad_width = if (1..=12).contains(&pad_width) {
            pad_width as usize
        } else {
            6
        };

        Ok(NumberingPolicy { scope, pad_width })
    }
}
