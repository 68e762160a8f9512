// ==========================================
// 钻头制造执行系统 - 实物生命周期数据仓储
// ==========================================
// 红线: 状态更新必须带期望前态守卫
// 红线: 修复履历追加与轮次推进必须在同一事务内完成
// ==========================================

use crate::domain::lifecycle::{BitInstance, RepairHistory};
use crate::domain::types::BitStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// BitInstanceRepository - 钻头实物仓储
// ==========================================
pub struct BitInstanceRepository {
    conn: Arc<Mutex<Connection>>,
}

impl BitInstanceRepository {
    /// 创建新的BitInstanceRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建实物
    pub fn create(&self, instance: &BitInstance) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO bit_instance (
                instance_id, serial_no, design_id, status, current_repair_index,
                initial_work_order_id, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &instance.instance_id,
                &instance.serial_no,
                &instance.design_id,
                instance.status.to_db_str(),
                &instance.current_repair_index,
                &instance.initial_work_order_id,
                instance.created_at.to_rfc3339(),
                instance.updated_at.to_rfc3339(),
            ],
        )?;

        Ok(instance.instance_id.clone())
    }

    /// 按instance_id查询实物
    pub fn find_by_id(&self, instance_id: &str) -> RepositoryResult<Option<BitInstance>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT instance_id, serial_no, design_id, status, current_repair_index,
                      initial_work_order_id, created_at, updated_at
               FROM bit_instance
               WHERE instance_id = ?"#,
            params![instance_id],
            |row| Self::map_row(row),
        ) {
            Ok(instance) => Ok(Some(instance)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 按序列号查询实物
    pub fn find_by_serial_no(&self, serial_no: &str) -> RepositoryResult<Option<BitInstance>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT instance_id, serial_no, design_id, status, current_repair_index,
                      initial_work_order_id, created_at, updated_at
               FROM bit_instance
               WHERE serial_no = ?"#,
            params![serial_no],
            |row| Self::map_row(row),
        ) {
            Ok(instance) => Ok(Some(instance)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 状态转换（带期望前态守卫）
    ///
    /// # 错误
    /// - `InvalidStateTransition`: 当前状态与期望前态不一致
    /// - `NotFound`: instance_id 不存在
    pub fn transition_status(
        &self,
        instance_id: &str,
        from: BitStatus,
        to: BitStatus,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let rows = conn.execute(
            r#"UPDATE bit_instance
               SET status = ?, updated_at = ?
               WHERE instance_id = ? AND status = ?"#,
            params![
                to.to_db_str(),
                chrono::Utc::now().to_rfc3339(),
                instance_id,
                from.to_db_str()
            ],
        )?;

        if rows == 0 {
            let actual: Result<String, _> = conn.query_row(
                "SELECT status FROM bit_instance WHERE instance_id = ?",
                params![instance_id],
                |row| row.get(0),
            );

            return match actual {
                Ok(actual_status) => Err(RepositoryError::InvalidStateTransition {
                    entity: "BitInstance".to_string(),
                    from: actual_status,
                    to: to.to_db_str().to_string(),
                }),
                Err(rusqlite::Error::QueryReturnedNoRows) => Err(RepositoryError::NotFound {
                    entity: "BitInstance".to_string(),
                    id: instance_id.to_string(),
                }),
                Err(e) => Err(e.into()),
            };
        }

        Ok(())
    }

    /// 回填新造工单ID
    pub fn set_initial_work_order(
        &self,
        instance_id: &str,
        work_order_id: &str,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let rows = conn.execute(
            r#"UPDATE bit_instance
               SET initial_work_order_id = ?, updated_at = ?
               WHERE instance_id = ?"#,
            params![
                work_order_id,
                chrono::Utc::now().to_rfc3339(),
                instance_id
            ],
        )?;

        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "BitInstance".to_string(),
                id: instance_id.to_string(),
            });
        }

        Ok(())
    }

    /// 映射数据库行到BitInstance对象
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<BitInstance> {
        let status_str: String = row.get(3)?;

        Ok(BitInstance {
            instance_id: row.get(0)?,
            serial_no: row.get(1)?,
            design_id: row.get(2)?,
            status: BitStatus::from_str(&status_str).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    3,
                    rusqlite::types::Type::Text,
                    format!("未知实物状态: {}", status_str).into(),
                )
            })?,
            current_repair_index: row.get(4)?,
            initial_work_order_id: row.get(5)?,
            created_at: row
                .get::<_, String>(6)?
                .parse::<chrono::DateTime<chrono::Utc>>()
                .unwrap_or_else(|_| chrono::Utc::now()),
            updated_at: row
                .get::<_, String>(7)?
                .parse::<chrono::DateTime<chrono::Utc>>()
                .unwrap_or_else(|_| chrono::Utc::now()),
        })
    }
}

// ==========================================
// RepairHistoryRepository - 修复履历仓储
// ==========================================
pub struct RepairHistoryRepository {
    conn: Arc<Mutex<Connection>>,
}

impl RepairHistoryRepository {
    /// 创建新的RepairHistoryRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 追加修复履历并推进实物轮次（单事务）
    ///
    /// # 红线
    /// - repair_index 必须等于 current_repair_index + 1（写入时校验，杜绝空洞）
    /// - 履历插入与 current_repair_index 推进、状态回转必须原子完成
    ///
    /// # 参数
    /// - record: 修复履历
    /// - instance_status_to: 推进后的实物状态（修复完工通常回到 IN_SERVICE）
    pub fn append_and_advance(
        &self,
        record: &RepairHistory,
        instance_status_to: BitStatus,
    ) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        // 1. 读取当前轮次，校验连续性
        let current_index: i32 = tx
            .query_row(
                "SELECT current_repair_index FROM bit_instance WHERE instance_id = ?",
                params![&record.instance_id],
                |row| row.get(0),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound {
                    entity: "BitInstance".to_string(),
                    id: record.instance_id.clone(),
                },
                other => other.into(),
            })?;

        if record.repair_index != current_index + 1 {
            return Err(RepositoryError::RepairIndexGap {
                instance_id: record.instance_id.clone(),
                expected: current_index + 1,
                actual: record.repair_index,
            });
        }

        // 2. 插入履历
        tx.execute(
            r#"INSERT INTO repair_history (
                repair_id, instance_id, repair_index, work_order_id,
                hours_on_bottom, footage_drilled_m, cutters_replaced,
                nozzles_replaced, hardfacing_applied, threads_repaired,
                remarks, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &record.repair_id,
                &record.instance_id,
                &record.repair_index,
                &record.work_order_id,
                &record.hours_on_bottom,
                &record.footage_drilled_m,
                &record.cutters_replaced,
                &record.nozzles_replaced,
                if record.hardfacing_applied { 1 } else { 0 },
                if record.threads_repaired { 1 } else { 0 },
                &record.remarks,
                record.created_at.to_rfc3339(),
            ],
        )?;

        // 3. 推进实物轮次与状态
        tx.execute(
            r#"UPDATE bit_instance
               SET current_repair_index = ?, status = ?, updated_at = ?
               WHERE instance_id = ?"#,
            params![
                &record.repair_index,
                instance_status_to.to_db_str(),
                chrono::Utc::now().to_rfc3339(),
                &record.instance_id,
            ],
        )?;

        tx.commit()?;
        Ok(())
    }

    /// 查询实物的修复履历链（轮次升序）
    pub fn find_chain_by_instance(&self, instance_id: &str) -> RepositoryResult<Vec<RepairHistory>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT repair_id, instance_id, repair_index, work_order_id,
                      hours_on_bottom, footage_drilled_m, cutters_replaced,
                      nozzles_replaced, hardfacing_applied, threads_repaired,
                      remarks, created_at
               FROM repair_history
               WHERE instance_id = ?
               ORDER BY repair_index"#,
        )?;

        let records = stmt
            .query_map(params![instance_id], |row| Self::map_row(row))?
            .collect::<Result<Vec<RepairHistory>, _>>()?;

        Ok(records)
    }

    /// 按工单查询修复履历
    pub fn find_by_work_order(&self, work_order_id: &str) -> RepositoryResult<Option<RepairHistory>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT repair_id, instance_id, repair_index, work_order_id,
                      hours_on_bottom, footage_drilled_m, cutters_replaced,
                      nozzles_replaced, hardfacing_applied, threads_repaired,
                      remarks, created_at
               FROM repair_history
               WHERE work_order_id = ?"#,
            params![work_order_id],
            |row| Self::map_row(row),
        ) {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 映射数据库行到RepairHistory对象
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<RepairHistory> {
        Ok(RepairHistory {
            repair_id: row.get(0)?,
            instance_id: row.get(1)?,
            repair_index: row.get(2)?,
            work_order_id: row.get(3)?,
            hours_on_bottom: row.get(4)?,
            footage_drilled_m: row.get(5)?,
            cutters_replaced: row.get(6)?,
            nozzles_replaced: row.get(7)?,
            hardfacing_applied: row.get::<_, i32>(8)? == 1,
            threads_repaired: row.get::<_, i32>(9)? == 1,
            remarks: row.get(10)?,
            created_at: row
                .get::<_, String>(11)?
                .parse::<chrono::DateTime<chrono::Utc>>()
                .unwrap_or_else(|_| chrono::Utc::now()),
        })
    }
}
