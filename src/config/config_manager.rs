// ==========================================
// 钻头制造执行系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::routing_config_trait::RoutingConfigReader;
use crate::db::open_sqlite_connection;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::error::Error;
use std::sync::{Arc, Mutex};

/// 修复次数上限默认值
pub const DEFAULT_REPAIR_CEILING: i32 = 5;

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
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
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

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self
            .get_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 写入 global scope 配置值 (UPSERT)
    pub fn set_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        conn.execute(
            r#"INSERT INTO config_kv (scope_id, key, value, updated_at)
               VALUES ('global', ?1, ?2, datetime('now'))
               ON CONFLICT(scope_id, key) DO UPDATE SET
                   value = excluded.value,
                   updated_at = excluded.updated_at"#,
            params![key, value],
        )?;

        Ok(())
    }

    /// 写入默认配置（仅缺失时补齐）
    pub fn seed_defaults(&self) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        conn.execute(
            r#"INSERT OR IGNORE INTO config_kv (scope_id, key, value) VALUES
               ('global', 'repair_ceiling', '5'),
               ('global', 'route_fallback_any_material', '1'),
               ('global', 'strict_single_in_progress', '0')"#,
            [],
        )?;

        Ok(())
    }
}

#[async_trait]
impl RoutingConfigReader for ConfigManager {
    async fn get_repair_ceiling(&self) -> Result<i32, Box<dyn Error>> {
        let raw = self.get_config_or_default("repair_ceiling", "5")?;
        let ceiling = raw.trim().parse::<i32>().unwrap_or_else(|_| {
            tracing::warn!("repair_ceiling 配置值无效: {}，使用默认值 5", raw);
            DEFAULT_REPAIR_CEILING
        });
        Ok(ceiling)
    }

    async fn get_route_fallback_any_material(&self) -> Result<bool, Box<dyn Error>> {
        let raw = self.get_config_or_default("route_fallback_any_material", "1")?;
        Ok(raw.trim() == "1" || raw.trim().eq_ignore_ascii_case("true"))
    }

    async fn get_strict_single_in_progress(&self) -> Result<bool, Box<dyn Error>> {
        let raw = self.get_config_or_default("strict_single_in_progress", "0")?;
        Ok(raw.trim() == "1" || raw.trim().eq_ignore_ascii_case("true"))
    }
}
