// ==========================================
// 钻头制造执行系统 - 工单/派工卡数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::job::{JobCard, WorkOrder};
use crate::domain::types::{BitType, BodyMaterial, OrderType, WorkOrderStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

/// 派工卡上下文（路线生成所需的联查快照）
///
/// 一次联查取齐派工卡 -> 工单 -> 版次 -> 设计，避免引擎层多次往返
#[derive(Debug, Clone)]
pub struct JobCardContext {
    pub job_card_id: String,                 // 派工卡ID
    pub work_order_id: String,               // 工单ID
    pub order_type: OrderType,               // 工单类型
    pub instance_id: Option<String>,         // 关联实物
    pub revision_id: String,                 // 设计版次ID
    pub design_id: String,                   // 设计ID
    pub bit_type: BitType,                   // 钻头类型
    pub body_material: Option<BodyMaterial>, // 体材质
}

// ==========================================
// WorkOrderRepository - 工单仓储
// ==========================================
pub struct WorkOrderRepository {
    conn: Arc<Mutex<Connection>>,
}

impl WorkOrderRepository {
    /// 创建新的WorkOrderRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建工单
    pub fn create(&self, order: &WorkOrder) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO work_order (
                work_order_id, order_no, order_type, revision_id,
                instance_id, status, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &order.work_order_id,
                &order.order_no,
                order.order_type.to_db_str(),
                &order.revision_id,
                &order.instance_id,
                order.status.to_db_str(),
                order.created_at.to_rfc3339(),
                order.updated_at.to_rfc3339(),
            ],
        )?;

        Ok(order.work_order_id.clone())
    }

    /// 按work_order_id查询工单
    pub fn find_by_id(&self, work_order_id: &str) -> RepositoryResult<Option<WorkOrder>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT work_order_id, order_no, order_type, revision_id,
                      instance_id, status, created_at, updated_at
               FROM work_order
               WHERE work_order_id = ?"#,
            params![work_order_id],
            |row| Self::map_row(row),
        ) {
            Ok(order) => Ok(Some(order)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询实物的工单列表（创建时间降序）
    pub fn find_by_instance(&self, instance_id: &str) -> RepositoryResult<Vec<WorkOrder>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT work_order_id, order_no, order_type, revision_id,
                      instance_id, status, created_at, updated_at
               FROM work_order
               WHERE instance_id = ?
               ORDER BY created_at DESC"#,
        )?;

        let orders = stmt
            .query_map(params![instance_id], |row| Self::map_row(row))?
            .collect::<Result<Vec<WorkOrder>, _>>()?;

        Ok(orders)
    }

    /// 更新工单状态
    pub fn update_status(
        &self,
        work_order_id: &str,
        status: WorkOrderStatus,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let rows = conn.execute(
            "UPDATE work_order SET status = ?, updated_at = ? WHERE work_order_id = ?",
            params![
                status.to_db_str(),
                chrono::Utc::now().to_rfc3339(),
                work_order_id
            ],
        )?;

        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "WorkOrder".to_string(),
                id: work_order_id.to_string(),
            });
        }

        Ok(())
    }

    /// 映射数据库行到WorkOrder对象
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<WorkOrder> {
        let order_type_str: String = row.get(2)?;
        let status_str: String = row.get(5)?;

        Ok(WorkOrder {
            work_order_id: row.get(0)?,
            order_no: row.get(1)?,
            order_type: OrderType::from_str(&order_type_str).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    2,
                    rusqlite::types::Type::Text,
                    format!("未知工单类型: {}", order_type_str).into(),
                )
            })?,
            revision_id: row.get(3)?,
            instance_id: row.get(4)?,
            status: WorkOrderStatus::from_str(&status_str).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    5,
                    rusqlite::types::Type::Text,
                    format!("未知工单状态: {}", status_str).into(),
                )
            })?,
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
// JobCardRepository - 派工卡仓储
// ==========================================
pub struct JobCardRepository {
    conn: Arc<Mutex<Connection>>,
}

impl JobCardRepository {
    /// 创建新的JobCardRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建派工卡
    pub fn create(&self, card: &JobCard) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO job_card (
                job_card_id, work_order_id, card_no, dispatched_by, created_at
            ) VALUES (?, ?, ?, ?, ?)"#,
            params![
                &card.job_card_id,
                &card.work_order_id,
                &card.card_no,
                &card.dispatched_by,
                card.created_at.to_rfc3339(),
            ],
        )?;

        Ok(card.job_card_id.clone())
    }

    /// 按job_card_id查询派工卡
    pub fn find_by_id(&self, job_card_id: &str) -> RepositoryResult<Option<JobCard>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT job_card_id, work_order_id, card_no, dispatched_by, created_at
               FROM job_card
               WHERE job_card_id = ?"#,
            params![job_card_id],
            |row| Self::map_row(row),
        ) {
            Ok(card) => Ok(Some(card)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询工单的所有派工卡
    pub fn find_by_work_order(&self, work_order_id: &str) -> RepositoryResult<Vec<JobCard>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT job_card_id, work_order_id, card_no, dispatched_by, created_at
               FROM job_card
               WHERE work_order_id = ?
               ORDER BY created_at"#,
        )?;

        let cards = stmt
            .query_map(params![work_order_id], |row| Self::map_row(row))?
            .collect::<Result<Vec<JobCard>, _>>()?;

        Ok(cards)
    }

    /// 联查派工卡上下文（卡 -> 工单 -> 版次 -> 设计）
    ///
    /// # 返回
    /// - Ok(Some(JobCardContext)): 上下文完整
    /// - Ok(None): 派工卡不存在
    pub fn find_context(&self, job_card_id: &str) -> RepositoryResult<Option<JobCardContext>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT jc.job_card_id, wo.work_order_id, wo.order_type, wo.instance_id,
                      dr.revision_id, bd.design_id, bd.bit_type, bd.body_material
               FROM job_card jc
               INNER JOIN work_order wo ON jc.work_order_id = wo.work_order_id
               INNER JOIN design_revision dr ON wo.revision_id = dr.revision_id
               INNER JOIN bit_design bd ON dr.design_id = bd.design_id
               WHERE jc.job_card_id = ?"#,
            params![job_card_id],
            |row| {
                let order_type_str: String = row.get(2)?;
                let bit_type_str: String = row.get(6)?;
                let body_material_str: Option<String> = row.get(7)?;

                Ok(JobCardContext {
                    job_card_id: row.get(0)?,
                    work_order_id: row.get(1)?,
                    order_type: OrderType::from_str(&order_type_str).ok_or_else(|| {
                        rusqlite::Error::FromSqlConversionFailure(
                            2,
                            rusqlite::types::Type::Text,
                            format!("未知工单类型: {}", order_type_str).into(),
                        )
                    })?,
                    instance_id: row.get(3)?,
                    revision_id: row.get(4)?,
                    design_id: row.get(5)?,
                    bit_type: BitType::from_str(&bit_type_str).ok_or_else(|| {
                        rusqlite::Error::FromSqlConversionFailure(
                            6,
                            rusqlite::types::Type::Text,
                            format!("未知钻头类型: {}", bit_type_str).into(),
                        )
                    })?,
                    body_material: body_material_str.and_then(|s| BodyMaterial::from_str(&s)),
                })
            },
        ) {
            Ok(ctx) => Ok(Some(ctx)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 映射数据库行到JobCard对象
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<JobCard> {
        Ok(JobCard {
            job_card_id: row.get(0)?,
            work_order_id: row.get(1)?,
            card_no: row.get(2)?,
            dispatched_by: row.get(3)?,
            created_at: row
                .get::<_, String>(4)?
                .parse::<chrono::DateTime<chrono::Utc>>()
                .unwrap_or_else(|_| chrono::Utc::now()),
        })
    }
}
