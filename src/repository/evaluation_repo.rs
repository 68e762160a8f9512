// ==========================================
// 钻头制造执行系统 - 评估结果数据仓储
// ==========================================
// 来源: 评估模块（外部协作方）写入，路线引擎按日期取最新
// ==========================================

use crate::domain::evaluation::EvaluationSummary;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// EvaluationRepository - 评估总结仓储
// ==========================================
pub struct EvaluationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl EvaluationRepository {
    /// 创建新的EvaluationRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建评估总结
    pub fn create(&self, evaluation: &EvaluationSummary) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO evaluation_summary (
                evaluation_id, job_card_id, evaluation_date, overall_condition,
                evaluated_by, remarks, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &evaluation.evaluation_id,
                &evaluation.job_card_id,
                &evaluation.evaluation_date.format("%Y-%m-%d").to_string(),
                &evaluation.overall_condition,
                &evaluation.evaluated_by,
                &evaluation.remarks,
                evaluation.created_at.to_rfc3339(),
            ],
        )?;

        Ok(evaluation.evaluation_id.clone())
    }

    /// 按evaluation_id查询评估
    pub fn find_by_id(&self, evaluation_id: &str) -> RepositoryResult<Option<EvaluationSummary>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT evaluation_id, job_card_id, evaluation_date, overall_condition,
                      evaluated_by, remarks, created_at
               FROM evaluation_summary
               WHERE evaluation_id = ?"#,
            params![evaluation_id],
            |row| Self::map_row(row),
        ) {
            Ok(evaluation) => Ok(Some(evaluation)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询派工卡最新评估（评估日期降序，同日取最后录入）
    pub fn find_latest_by_job_card(
        &self,
        job_card_id: &str,
    ) -> RepositoryResult<Option<EvaluationSummary>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT evaluation_id, job_card_id, evaluation_date, overall_condition,
                      evaluated_by, remarks, created_at
               FROM evaluation_summary
               WHERE job_card_id = ?
               ORDER BY evaluation_date DESC, created_at DESC
               LIMIT 1"#,
            params![job_card_id],
            |row| Self::map_row(row),
        ) {
            Ok(evaluation) => Ok(Some(evaluation)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询派工卡的全部评估（评估日期降序）
    pub fn find_by_job_card(&self, job_card_id: &str) -> RepositoryResult<Vec<EvaluationSummary>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT evaluation_id, job_card_id, evaluation_date, overall_condition,
                      evaluated_by, remarks, created_at
               FROM evaluation_summary
               WHERE job_card_id = ?
               ORDER BY evaluation_date DESC, created_at DESC"#,
        )?;

        let evaluations = stmt
            .query_map(params![job_card_id], |row| Self::map_row(row))?
            .collect::<Result<Vec<EvaluationSummary>, _>>()?;

        Ok(evaluations)
    }

    /// 映射数据库行到EvaluationSummary对象
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<EvaluationSummary> {
        Ok(EvaluationSummary {
            evaluation_id: row.get(0)?,
            job_card_id: row.get(1)?,
            evaluation_date: chrono::NaiveDate::parse_from_str(
                &row.get::<_, String>(2)?,
                "%Y-%m-%d",
            )
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    2,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?,
            overall_condition: row.get(3)?,
            evaluated_by: row.get(4)?,
            remarks: row.get(5)?,
            created_at: row
                .get::<_, String>(6)?
                .parse::<chrono::DateTime<chrono::Utc>>()
                .unwrap_or_else(|_| chrono::Utc::now()),
        })
    }
}
