// ==========================================
// 钻头制造执行系统 - 路线目录数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑（模板选择偏好在引擎层）
// 用途: 工艺工程师维护，路线引擎只读
// ==========================================

use crate::domain::route::{RouteStepTemplate, RouteTemplate};
use crate::domain::types::{BitType, BodyMaterial, OrderType};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// RouteTemplateRepository - 路线模板仓储
// ==========================================
pub struct RouteTemplateRepository {
    conn: Arc<Mutex<Connection>>,
}

impl RouteTemplateRepository {
    /// 创建新的RouteTemplateRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建模板及其步骤（单事务）
    pub fn create_with_steps(
        &self,
        template: &RouteTemplate,
        steps: &[RouteStepTemplate],
    ) -> RepositoryResult<String> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"INSERT INTO route_template (
                template_id, template_name, bit_type, body_material,
                order_type, is_active, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &template.template_id,
                &template.template_name,
                template.bit_type.to_db_str(),
                template.body_material.map(|m| m.to_db_str()),
                template.order_type.to_db_str(),
                if template.is_active { 1 } else { 0 },
                template.created_at.to_rfc3339(),
            ],
        )?;

        {
            let mut stmt = tx.prepare(
                r#"INSERT INTO route_step_template (
                    step_template_id, template_id, seq_no, process_code,
                    default_department, default_workstation,
                    estimated_duration_min, is_mandatory
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
            )?;

            for step in steps {
                stmt.execute(params![
                    &step.step_template_id,
                    &step.template_id,
                    &step.seq_no,
                    &step.process_code,
                    &step.default_department,
                    &step.default_workstation,
                    &step.estimated_duration_min,
                    if step.is_mandatory { 1 } else { 0 },
                ])?;
            }
        }

        tx.commit()?;
        Ok(template.template_id.clone())
    }

    /// 按template_id查询模板
    pub fn find_by_id(&self, template_id: &str) -> RepositoryResult<Option<RouteTemplate>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT template_id, template_name, bit_type, body_material,
                      order_type, is_active, created_at
               FROM route_template
               WHERE template_id = ?"#,
            params![template_id],
            |row| Self::map_template_row(row),
        ) {
            Ok(template) => Ok(Some(template)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询 (钻头类型, 工单类型) 的全部启用模板
    ///
    /// 返回不做材质偏好排序：偏好规则属于引擎层
    pub fn find_candidates(
        &self,
        bit_type: BitType,
        order_type: OrderType,
    ) -> RepositoryResult<Vec<RouteTemplate>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT template_id, template_name, bit_type, body_material,
                      order_type, is_active, created_at
               FROM route_template
               WHERE bit_type = ? AND order_type = ? AND is_active = 1
               ORDER BY created_at"#,
        )?;

        let templates = stmt
            .query_map(
                params![bit_type.to_db_str(), order_type.to_db_str()],
                |row| Self::map_template_row(row),
            )?
            .collect::<Result<Vec<RouteTemplate>, _>>()?;

        Ok(templates)
    }

    /// 查询模板的步骤列表（按顺序号升序）
    pub fn find_steps(&self, template_id: &str) -> RepositoryResult<Vec<RouteStepTemplate>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT step_template_id, template_id, seq_no, process_code,
                      default_department, default_workstation,
                      estimated_duration_min, is_mandatory
               FROM route_step_template
               WHERE template_id = ?
               ORDER BY seq_no"#,
        )?;

        let steps = stmt
            .query_map(params![template_id], |row| Self::map_step_row(row))?
            .collect::<Result<Vec<RouteStepTemplate>, _>>()?;

        Ok(steps)
    }

    /// 停用模板
    pub fn deactivate(&self, template_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let rows = conn.execute(
            "UPDATE route_template SET is_active = 0 WHERE template_id = ?",
            params![template_id],
        )?;

        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "RouteTemplate".to_string(),
                id: template_id.to_string(),
            });
        }

        Ok(())
    }

    /// 映射数据库行到RouteTemplate对象
    fn map_template_row(row: &rusqlite::Row) -> rusqlite::Result<RouteTemplate> {
        let bit_type_str: String = row.get(2)?;
        let body_material_str: Option<String> = row.get(3)?;
        let order_type_str: String = row.get(4)?;

        Ok(RouteTemplate {
            template_id: row.get(0)?,
            template_name: row.get(1)?,
            bit_type: BitType::from_str(&bit_type_str).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    2,
                    rusqlite::types::Type::Text,
                    format!("未知钻头类型: {}", bit_type_str).into(),
                )
            })?,
            body_material: body_material_str.and_then(|s| BodyMaterial::from_str(&s)),
            order_type: OrderType::from_str(&order_type_str).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    4,
                    rusqlite::types::Type::Text,
                    format!("未知工单类型: {}", order_type_str).into(),
                )
            })?,
            is_active: row.get::<_, i32>(5)? == 1,
            created_at: row
                .get::<_, String>(6)?
                .parse::<chrono::DateTime<chrono::Utc>>()
                .unwrap_or_else(|_| chrono::Utc::now()),
        })
    }

    /// 映射数据库行到RouteStepTemplate对象
    fn map_step_row(row: &rusqlite::Row) -> rusqlite::Result<RouteStepTemplate> {
        Ok(RouteStepTemplate {
            step_template_id: row.get(0)?,
            template_id: row.get(1)?,
            seq_no: row.get(2)?,
            process_code: row.get(3)?,
            default_department: row.get(4)?,
            default_workstation: row.get(5)?,
            estimated_duration_min: row.get(6)?,
            is_mandatory: row.get::<_, i32>(7)? == 1,
        })
    }
}
