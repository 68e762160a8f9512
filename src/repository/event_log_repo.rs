// ==========================================
// 钻头制造执行系统 - 路由事件台账仓储
// ==========================================
// 用途: 事件消费的 at-most-once 台账
// 说明: 处理器先查台账再执行，SUCCEEDED 的事件跳过
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

/// 事件处理状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLogStatus {
    Succeeded, // 处理成功
    Failed,    // 处理失败（可重投）
}

impl EventLogStatus {
    /// 从字符串解析处理状态
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "SUCCEEDED" => Some(EventLogStatus::Succeeded),
            "FAILED" => Some(EventLogStatus::Failed),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            EventLogStatus::Succeeded => "SUCCEEDED",
            EventLogStatus::Failed => "FAILED",
        }
    }
}

/// 事件台账记录
#[derive(Debug, Clone)]
pub struct EventLogEntry {
    pub event_id: String,                    // 事件ID
    pub event_type: String,                  // 事件类型
    pub job_card_id: Option<String>,         // 关联派工卡
    pub payload_json: Option<String>,        // 事件负载快照
    pub status: EventLogStatus,              // 处理状态
    pub error_message: Option<String>,       // 失败原因
    pub received_at: DateTime<Utc>,          // 接收时间
    pub processed_at: Option<DateTime<Utc>>, // 处理完成时间
}

// ==========================================
// RoutingEventLogRepository - 事件台账仓储
// ==========================================
pub struct RoutingEventLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl RoutingEventLogRepository {
    /// 创建新的RoutingEventLogRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 记录处理结果 (UPSERT)
    ///
    /// 失败事件重投成功后覆盖为 SUCCEEDED
    pub fn record(&self, entry: &EventLogEntry) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO routing_event_log (
                event_id, event_type, job_card_id, payload_json,
                status, error_message, received_at, processed_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(event_id) DO UPDATE SET
                status = excluded.status,
                error_message = excluded.error_message,
                processed_at = excluded.processed_at"#,
            params![
                &entry.event_id,
                &entry.event_type,
                &entry.job_card_id,
                &entry.payload_json,
                entry.status.to_db_str(),
                &entry.error_message,
                entry.received_at.to_rfc3339(),
                &entry.processed_at.map(|dt| dt.to_rfc3339()),
            ],
        )?;

        Ok(())
    }

    /// 查询事件处理状态
    pub fn find_status(&self, event_id: &str) -> RepositoryResult<Option<EventLogStatus>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            "SELECT status FROM routing_event_log WHERE event_id = ?",
            params![event_id],
            |row| row.get::<_, String>(0),
        ) {
            Ok(status_str) => Ok(EventLogStatus::from_str(&status_str)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询派工卡的事件台账（接收时间升序）
    pub fn find_by_job_card(&self, job_card_id: &str) -> RepositoryResult<Vec<EventLogEntry>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT event_id, event_type, job_card_id, payload_json,
                      status, error_message, received_at, processed_at
               FROM routing_event_log
               WHERE job_card_id = ?
               ORDER BY received_at"#,
        )?;

        let entries = stmt
            .query_map(params![job_card_id], |row| Self::map_row(row))?
            .collect::<Result<Vec<EventLogEntry>, _>>()?;

        Ok(entries)
    }

    /// 映射数据库行到EventLogEntry对象
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<EventLogEntry> {
        let status_str: String = row.get(4)?;

        Ok(EventLogEntry {
            event_id: row.get(0)?,
            event_type: row.get(1)?,
            job_card_id: row.get(2)?,
            payload_json: row.get(3)?,
            status: EventLogStatus::from_str(&status_str).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    4,
                    rusqlite::types::Type::Text,
                    format!("未知事件处理状态: {}", status_str).into(),
                )
            })?,
            error_message: row.get(5)?,
            received_at: row
                .get::<_, String>(6)?
                .parse::<chrono::DateTime<chrono::Utc>>()
                .unwrap_or_else(|_| chrono::Utc::now()),
            processed_at: row
                .get::<_, Option<String>>(7)?
                .and_then(|s| chrono::DateTime::parse_from_rfc3339(&s).ok())
                .map(|dt| dt.with_timezone(&chrono::Utc)),
        })
    }
}
