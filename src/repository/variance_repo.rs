// ==========================================
// 钻头制造执行系统 - 物耗差异数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑（复核策略在引擎层）
// ==========================================

use crate::domain::types::QualityOutcome;
use crate::domain::variance::{ActualBom, ActualCutterInstallation};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// ActualBomRepository - 实际物耗仓储
// ==========================================
pub struct ActualBomRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ActualBomRepository {
    /// 创建新的ActualBomRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入或更新实际物耗 (UPSERT)
    ///
    /// 同一 (工单, BOM明细) 重复记录时覆盖实际数量
    pub fn upsert(&self, actual: &ActualBom) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO actual_bom (
                work_order_id, bom_item_id, planned_quantity, actual_quantity,
                recorded_by, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(work_order_id, bom_item_id) DO UPDATE SET
                actual_quantity = excluded.actual_quantity,
                recorded_by = excluded.recorded_by,
                updated_at = excluded.updated_at"#,
            params![
                &actual.work_order_id,
                &actual.bom_item_id,
                &actual.planned_quantity,
                &actual.actual_quantity,
                &actual.recorded_by,
                actual.updated_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    /// 查询单条实际物耗
    pub fn find_one(
        &self,
        work_order_id: &str,
        bom_item_id: &str,
    ) -> RepositoryResult<Option<ActualBom>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT work_order_id, bom_item_id, planned_quantity, actual_quantity,
                      recorded_by, updated_at
               FROM actual_bom
               WHERE work_order_id = ? AND bom_item_id = ?"#,
            params![work_order_id, bom_item_id],
            |row| Self::map_row(row),
        ) {
            Ok(actual) => Ok(Some(actual)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询工单的全部实际物耗
    pub fn find_by_work_order(&self, work_order_id: &str) -> RepositoryResult<Vec<ActualBom>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT work_order_id, bom_item_id, planned_quantity, actual_quantity,
                      recorded_by, updated_at
               FROM actual_bom
               WHERE work_order_id = ?
               ORDER BY bom_item_id"#,
        )?;

        let actuals = stmt
            .query_map(params![work_order_id], |row| Self::map_row(row))?
            .collect::<Result<Vec<ActualBom>, _>>()?;

        Ok(actuals)
    }

    /// 映射数据库行到ActualBom对象
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<ActualBom> {
        Ok(ActualBom {
            work_order_id: row.get(0)?,
            bom_item_id: row.get(1)?,
            planned_quantity: row.get(2)?,
            actual_quantity: row.get(3)?,
            recorded_by: row.get(4)?,
            updated_at: row
                .get::<_, String>(5)?
                .parse::<chrono::DateTime<chrono::Utc>>()
                .unwrap_or_else(|_| chrono::Utc::now()),
        })
    }
}

// ==========================================
// ActualCutterRepository - 实际布齿安装仓储
// ==========================================
pub struct ActualCutterRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ActualCutterRepository {
    /// 创建新的ActualCutterRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建安装记录
    ///
    /// (工单, 布齿位置) 唯一：同一位置重复安装视为数据冲突
    pub fn create(&self, installation: &ActualCutterInstallation) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO actual_cutter_installation (
                installation_id, work_order_id, position_id, actual_cutter_size,
                actual_cutter_type, is_substitution, quality_outcome,
                installed_by, installed_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &installation.installation_id,
                &installation.work_order_id,
                &installation.position_id,
                &installation.actual_cutter_size,
                &installation.actual_cutter_type,
                if installation.is_substitution { 1 } else { 0 },
                installation.quality_outcome.to_db_str(),
                &installation.installed_by,
                installation.installed_at.to_rfc3339(),
            ],
        )?;

        Ok(installation.installation_id.clone())
    }

    /// 查询工单的全部安装记录
    pub fn find_by_work_order(
        &self,
        work_order_id: &str,
    ) -> RepositoryResult<Vec<ActualCutterInstallation>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT installation_id, work_order_id, position_id, actual_cutter_size,
                      actual_cutter_type, is_substitution, quality_outcome,
                      installed_by, installed_at
               FROM actual_cutter_installation
               WHERE work_order_id = ?
               ORDER BY installed_at"#,
        )?;

        let installations = stmt
            .query_map(params![work_order_id], |row| Self::map_row(row))?
            .collect::<Result<Vec<ActualCutterInstallation>, _>>()?;

        Ok(installations)
    }

    /// 查询工单的替代安装记录
    pub fn find_substitutions(
        &self,
        work_order_id: &str,
    ) -> RepositoryResult<Vec<ActualCutterInstallation>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT installation_id, work_order_id, position_id, actual_cutter_size,
                      actual_cutter_type, is_substitution, quality_outcome,
                      installed_by, installed_at
               FROM actual_cutter_installation
               WHERE work_order_id = ? AND is_substitution = 1
               ORDER BY installed_at"#,
        )?;

        let installations = stmt
            .query_map(params![work_order_id], |row| Self::map_row(row))?
            .collect::<Result<Vec<ActualCutterInstallation>, _>>()?;

        Ok(installations)
    }

    /// 映射数据库行到ActualCutterInstallation对象
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<ActualCutterInstallation> {
        let outcome_str: String = row.get(6)?;

        Ok(ActualCutterInstallation {
            installation_id: row.get(0)?,
            work_order_id: row.get(1)?,
            position_id: row.get(2)?,
            actual_cutter_size: row.get(3)?,
            actual_cutter_type: row.get(4)?,
            is_substitution: row.get::<_, i32>(5)? == 1,
            quality_outcome: QualityOutcome::from_str(&outcome_str).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    6,
                    rusqlite::types::Type::Text,
                    format!("未知质量结论: {}", outcome_str).into(),
                )
            })?,
            installed_by: row.get(7)?,
            installed_at: row
                .get::<_, String>(8)?
                .parse::<chrono::DateTime<chrono::Utc>>()
                .unwrap_or_else(|_| chrono::Utc::now()),
        })
    }
}
