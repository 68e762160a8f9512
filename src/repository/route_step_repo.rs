// ==========================================
// 钻头制造执行系统 - 工序步骤数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑（工序筛选集合在引擎层）
// 红线: 物化/调整/重生成必须在单事务内完成，不留半成品路线
// 红线: 状态更新必须带期望前态守卫，禁止回退
// ==========================================

use crate::domain::job::JobRouteStep;
use crate::domain::types::StepStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Transaction};
use std::sync::{Arc, Mutex};

// ==========================================
// JobRouteStepRepository - 工序步骤仓储
// ==========================================
pub struct JobRouteStepRepository {
    conn: Arc<Mutex<Connection>>,
}

impl JobRouteStepRepository {
    /// 创建新的JobRouteStepRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 批量插入步骤（路线物化）
    ///
    /// # 红线
    /// - 必须在事务中完成：要么全部落库，要么一条不留
    pub fn batch_insert(&self, steps: &[JobRouteStep]) -> RepositoryResult<usize> {
        if steps.is_empty() {
            return Ok(0);
        }

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        Self::insert_in_tx(&tx, steps)?;

        tx.commit()?;
        Ok(steps.len())
    }

    /// 替换 PENDING 步骤（路线重生成）
    ///
    /// 在单事务内删除派工卡的全部 PENDING 步骤并插入新集合。
    /// 非 PENDING 步骤（已开工/完工/跳过）不受影响。
    ///
    /// # 返回
    /// - Ok((deleted, inserted)): 删除与插入的记录数
    pub fn replace_pending(
        &self,
        job_card_id: &str,
        steps: &[JobRouteStep],
    ) -> RepositoryResult<(usize, usize)> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let deleted = tx.execute(
            "DELETE FROM job_route_step WHERE job_card_id = ? AND status = 'PENDING'",
            params![job_card_id],
        )?;

        Self::insert_in_tx(&tx, steps)?;

        tx.commit()?;
        Ok((deleted, steps.len()))
    }

    /// 事务内批量插入（供物化与重生成共用）
    fn insert_in_tx(tx: &Transaction, steps: &[JobRouteStep]) -> RepositoryResult<()> {
        let mut stmt = tx.prepare(
            r#"INSERT INTO job_route_step (
                step_id, job_card_id, seq_no, process_code, department,
                workstation, estimated_duration_min, is_mandatory, status,
                skip_reason, actual_start, actual_end
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )?;

        for step in steps {
            stmt.execute(params![
                &step.step_id,
                &step.job_card_id,
                &step.seq_no,
                &step.process_code,
                &step.department,
                &step.workstation,
                &step.estimated_duration_min,
                if step.is_mandatory { 1 } else { 0 },
                step.status.to_db_str(),
                &step.skip_reason,
                &step.actual_start.map(|dt| dt.to_rfc3339()),
                &step.actual_end.map(|dt| dt.to_rfc3339()),
            ])?;
        }

        Ok(())
    }

    /// 按step_id查询步骤
    pub fn find_by_id(&self, step_id: &str) -> RepositoryResult<Option<JobRouteStep>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT step_id, job_card_id, seq_no, process_code, department,
                      workstation, estimated_duration_min, is_mandatory, status,
                      skip_reason, actual_start, actual_end
               FROM job_route_step
               WHERE step_id = ?"#,
            params![step_id],
            |row| Self::map_row(row),
        ) {
            Ok(step) => Ok(Some(step)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询派工卡的全部步骤（顺序号升序）
    pub fn find_by_job_card(&self, job_card_id: &str) -> RepositoryResult<Vec<JobRouteStep>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT step_id, job_card_id, seq_no, process_code, department,
                      workstation, estimated_duration_min, is_mandatory, status,
                      skip_reason, actual_start, actual_end
               FROM job_route_step
               WHERE job_card_id = ?
               ORDER BY seq_no"#,
        )?;

        let steps = stmt
            .query_map(params![job_card_id], |row| Self::map_row(row))?
            .collect::<Result<Vec<JobRouteStep>, _>>()?;

        Ok(steps)
    }

    /// 查询派工卡的 PENDING 步骤（顺序号升序）
    pub fn find_pending_by_job_card(
        &self,
        job_card_id: &str,
    ) -> RepositoryResult<Vec<JobRouteStep>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT step_id, job_card_id, seq_no, process_code, department,
                      workstation, estimated_duration_min, is_mandatory, status,
                      skip_reason, actual_start, actual_end
               FROM job_route_step
               WHERE job_card_id = ? AND status = 'PENDING'
               ORDER BY seq_no"#,
        )?;

        let steps = stmt
            .query_map(params![job_card_id], |row| Self::map_row(row))?
            .collect::<Result<Vec<JobRouteStep>, _>>()?;

        Ok(steps)
    }

    /// 统计派工卡 IN_PROGRESS 步骤数
    pub fn count_in_progress(&self, job_card_id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM job_route_step WHERE job_card_id = ? AND status = 'IN_PROGRESS'",
            params![job_card_id],
            |row| row.get(0),
        )?;

        Ok(count)
    }

    /// 开工：PENDING -> IN_PROGRESS，记录实际开工时间
    pub fn start(&self, step_id: &str, at: DateTime<Utc>) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let rows = conn.execute(
            r#"UPDATE job_route_step
               SET status = 'IN_PROGRESS', actual_start = ?
               WHERE step_id = ? AND status = 'PENDING'"#,
            params![at.to_rfc3339(), step_id],
        )?;

        if rows == 0 {
            return Err(Self::transition_failure(&conn, step_id, StepStatus::InProgress)?);
        }

        Ok(())
    }

    /// 完工：IN_PROGRESS -> DONE，记录实际完工时间
    pub fn complete(&self, step_id: &str, at: DateTime<Utc>) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let rows = conn.execute(
            r#"UPDATE job_route_step
               SET status = 'DONE', actual_end = ?
               WHERE step_id = ? AND status = 'IN_PROGRESS'"#,
            params![at.to_rfc3339(), step_id],
        )?;

        if rows == 0 {
            return Err(Self::transition_failure(&conn, step_id, StepStatus::Done)?);
        }

        Ok(())
    }

    /// 跳过：PENDING -> SKIPPED，记录原因
    pub fn skip(&self, step_id: &str, reason: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let rows = conn.execute(
            r#"UPDATE job_route_step
               SET status = 'SKIPPED', skip_reason = ?
               WHERE step_id = ? AND status = 'PENDING'"#,
            params![reason, step_id],
        )?;

        if rows == 0 {
            return Err(Self::transition_failure(&conn, step_id, StepStatus::Skipped)?);
        }

        Ok(())
    }

    /// 批量跳过 PENDING 步骤（评估调整，单事务）
    ///
    /// WHERE 带 status='PENDING' 守卫：非 PENDING 步骤不会被改动
    pub fn batch_skip_pending(
        &self,
        step_ids: &[String],
        reason: &str,
    ) -> RepositoryResult<usize> {
        if step_ids.is_empty() {
            return Ok(0);
        }

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let mut affected = 0usize;
        {
            let mut stmt = tx.prepare(
                r#"UPDATE job_route_step
                   SET status = 'SKIPPED', skip_reason = ?
                   WHERE step_id = ? AND status = 'PENDING'"#,
            )?;

            for step_id in step_ids {
                affected += stmt.execute(params![reason, step_id])?;
            }
        }

        tx.commit()?;
        Ok(affected)
    }

    /// 批量删除 PENDING 步骤（评估调整，单事务）
    ///
    /// WHERE 带 status='PENDING' 守卫：非 PENDING 步骤不会被删除
    pub fn batch_delete_pending(&self, step_ids: &[String]) -> RepositoryResult<usize> {
        if step_ids.is_empty() {
            return Ok(0);
        }

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let mut affected = 0usize;
        {
            let mut stmt = tx.prepare(
                "DELETE FROM job_route_step WHERE step_id = ? AND status = 'PENDING'",
            )?;

            for step_id in step_ids {
                affected += stmt.execute(params![step_id])?;
            }
        }

        tx.commit()?;
        Ok(affected)
    }

    /// 构造状态转换失败错误（区分记录不存在与非法转换）
    fn transition_failure(
        conn: &Connection,
        step_id: &str,
        target: StepStatus,
    ) -> RepositoryResult<RepositoryError> {
        let actual: Result<String, _> = conn.query_row(
            "SELECT status FROM job_route_step WHERE step_id = ?",
            params![step_id],
            |row| row.get(0),
        );

        match actual {
            Ok(from) => Ok(RepositoryError::InvalidStateTransition {
                entity: "JobRouteStep".to_string(),
                from,
                to: target.to_db_str().to_string(),
            }),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(RepositoryError::NotFound {
                entity: "JobRouteStep".to_string(),
                id: step_id.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// 映射数据库行到JobRouteStep对象
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<JobRouteStep> {
        let status_str: String = row.get(8)?;

        Ok(JobRouteStep {
            step_id: row.get(0)?,
            job_card_id: row.get(1)?,
            seq_no: row.get(2)?,
            process_code: row.get(3)?,
            department: row.get(4)?,
            workstation: row.get(5)?,
            estimated_duration_min: row.get(6)?,
            is_mandatory: row.get::<_, i32>(7)? == 1,
            status: StepStatus::from_str(&status_str).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    8,
                    rusqlite::types::Type::Text,
                    format!("未知步骤状态: {}", status_str).into(),
                )
            })?,
            skip_reason: row.get(9)?,
            actual_start: row
                .get::<_, Option<String>>(10)?
                .and_then(|s| chrono::DateTime::parse_from_rfc3339(&s).ok())
                .map(|dt| dt.with_timezone(&chrono::Utc)),
            actual_end: row
                .get::<_, Option<String>>(11)?
                .and_then(|s| chrono::DateTime::parse_from_rfc3339(&s).ok())
                .map(|dt| dt.with_timezone(&chrono::Utc)),
        })
    }
}
