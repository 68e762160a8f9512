// ==========================================
// 钻头制造执行系统 - 产品定义数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 红线: 同一设计仅一个激活版次（事务内归档+激活）
// ==========================================

use crate::domain::design::{BitDesign, BomItem, CutterLayoutPosition, DesignRevision};
use crate::domain::types::{BitType, BodyMaterial, CutterZone};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// BitDesignRepository - 钻头设计仓储
// ==========================================
pub struct BitDesignRepository {
    conn: Arc<Mutex<Connection>>,
}

impl BitDesignRepository {
    /// 创建新的BitDesignRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建设计
    pub fn create(&self, design: &BitDesign) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO bit_design (
                design_id, design_code, bit_type, body_material, size_inch,
                blade_count, nozzle_count, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &design.design_id,
                &design.design_code,
                design.bit_type.to_db_str(),
                design.body_material.map(|m| m.to_db_str()),
                &design.size_inch,
                &design.blade_count,
                &design.nozzle_count,
                design.created_at.to_rfc3339(),
                design.updated_at.to_rfc3339(),
            ],
        )?;

        Ok(design.design_id.clone())
    }

    /// 按design_id查询设计
    pub fn find_by_id(&self, design_id: &str) -> RepositoryResult<Option<BitDesign>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT design_id, design_code, bit_type, body_material, size_inch,
                      blade_count, nozzle_count, created_at, updated_at
               FROM bit_design
               WHERE design_id = ?"#,
            params![design_id],
            |row| Self::map_row(row),
        ) {
            Ok(design) => Ok(Some(design)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 更新设计标识字段
    ///
    /// # 红线
    /// - 一旦存在版次，bit_type/body_material/size_inch 不可变更
    pub fn update_identity(&self, design: &BitDesign) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let revision_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM design_revision WHERE design_id = ?",
            params![&design.design_id],
            |row| row.get(0),
        )?;

        if revision_count > 0 {
            return Err(RepositoryError::BusinessRuleViolation(format!(
                "设计{}已存在版次，标识字段不可变更",
                design.design_id
            )));
        }

        conn.execute(
            r#"UPDATE bit_design
               SET design_code = ?, bit_type = ?, body_material = ?, size_inch = ?,
                   blade_count = ?, nozzle_count = ?, updated_at = ?
               WHERE design_id = ?"#,
            params![
                &design.design_code,
                design.bit_type.to_db_str(),
                design.body_material.map(|m| m.to_db_str()),
                &design.size_inch,
                &design.blade_count,
                &design.nozzle_count,
                design.updated_at.to_rfc3339(),
                &design.design_id,
            ],
        )?;

        Ok(())
    }

    /// 映射数据库行到BitDesign对象
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<BitDesign> {
        let bit_type_str: String = row.get(2)?;
        let body_material_str: Option<String> = row.get(3)?;

        Ok(BitDesign {
            design_id: row.get(0)?,
            design_code: row.get(1)?,
            bit_type: BitType::from_str(&bit_type_str).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    2,
                    rusqlite::types::Type::Text,
                    format!("未知钻头类型: {}", bit_type_str).into(),
                )
            })?,
            body_material: body_material_str.and_then(|s| BodyMaterial::from_str(&s)),
            size_inch: row.get(4)?,
            blade_count: row.get(5)?,
            nozzle_count: row.get(6)?,
            created_at: row
                .get::<_, String>(7)?
                .parse::<chrono::DateTime<chrono::Utc>>()
                .unwrap_or_else(|_| chrono::Utc::now()),
            updated_at: row
                .get::<_, String>(8)?
                .parse::<chrono::DateTime<chrono::Utc>>()
                .unwrap_or_else(|_| chrono::Utc::now()),
        })
    }
}

// ==========================================
// DesignRevisionRepository - 设计版次仓储
// ==========================================
pub struct DesignRevisionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DesignRevisionRepository {
    /// 创建新的DesignRevisionRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建版次
    ///
    /// # 红线
    /// - 若新版次标记激活，需在同一事务内归档同设计的其他激活版次
    pub fn create(&self, revision: &DesignRevision) -> RepositoryResult<String> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        if revision.is_active {
            tx.execute(
                "UPDATE design_revision SET is_active = 0 WHERE design_id = ? AND is_active = 1",
                params![&revision.design_id],
            )?;
        }

        tx.execute(
            r#"INSERT INTO design_revision (
                revision_id, design_id, revision_no, is_active,
                effective_from, effective_to, released_by, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &revision.revision_id,
                &revision.design_id,
                &revision.revision_no,
                if revision.is_active { 1 } else { 0 },
                &revision.effective_from.map(|d| d.format("%Y-%m-%d").to_string()),
                &revision.effective_to.map(|d| d.format("%Y-%m-%d").to_string()),
                &revision.released_by,
                revision.created_at.to_rfc3339(),
            ],
        )?;

        tx.commit()?;
        Ok(revision.revision_id.clone())
    }

    /// 按revision_id查询版次
    pub fn find_by_id(&self, revision_id: &str) -> RepositoryResult<Option<DesignRevision>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT revision_id, design_id, revision_no, is_active,
                      effective_from, effective_to, released_by, created_at
               FROM design_revision
               WHERE revision_id = ?"#,
            params![revision_id],
            |row| Self::map_row(row),
        ) {
            Ok(revision) => Ok(Some(revision)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询设计的所有版次（版次号降序）
    pub fn find_by_design_id(&self, design_id: &str) -> RepositoryResult<Vec<DesignRevision>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT revision_id, design_id, revision_no, is_active,
                      effective_from, effective_to, released_by, created_at
               FROM design_revision
               WHERE design_id = ?
               ORDER BY revision_no DESC"#,
        )?;

        let revisions = stmt
            .query_map(params![design_id], |row| Self::map_row(row))?
            .collect::<Result<Vec<DesignRevision>, _>>()?;

        Ok(revisions)
    }

    /// 查询设计的激活版次
    pub fn find_active_revision(&self, design_id: &str) -> RepositoryResult<Option<DesignRevision>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT revision_id, design_id, revision_no, is_active,
                      effective_from, effective_to, released_by, created_at
               FROM design_revision
               WHERE design_id = ? AND is_active = 1"#,
            params![design_id],
            |row| Self::map_row(row),
        ) {
            Ok(revision) => Ok(Some(revision)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 激活版次 (同时归档同设计的其他激活版次)
    ///
    /// # 红线
    /// - 必须在事务中完成，确保"同一设计仅一个激活版次"的不变式
    pub fn activate_revision(&self, revision_id: &str) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        // 1. 获取design_id
        let design_id: String = tx
            .query_row(
                "SELECT design_id FROM design_revision WHERE revision_id = ?",
                params![revision_id],
                |row| row.get(0),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound {
                    entity: "DesignRevision".to_string(),
                    id: revision_id.to_string(),
                },
                other => other.into(),
            })?;

        // 2. 归档其他激活版次
        tx.execute(
            "UPDATE design_revision SET is_active = 0 WHERE design_id = ? AND is_active = 1",
            params![&design_id],
        )?;

        // 3. 激活指定版次
        tx.execute(
            "UPDATE design_revision SET is_active = 1 WHERE revision_id = ?",
            params![revision_id],
        )?;

        tx.commit()?;
        Ok(())
    }

    /// 映射数据库行到DesignRevision对象
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<DesignRevision> {
        Ok(DesignRevision {
            revision_id: row.get(0)?,
            design_id: row.get(1)?,
            revision_no: row.get(2)?,
            is_active: row.get::<_, i32>(3)? == 1,
            effective_from: row
                .get::<_, Option<String>>(4)?
                .and_then(|s| chrono::NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
            effective_to: row
                .get::<_, Option<String>>(5)?
                .and_then(|s| chrono::NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
            released_by: row.get(6)?,
            created_at: row
                .get::<_, String>(7)?
                .parse::<chrono::DateTime<chrono::Utc>>()
                .unwrap_or_else(|_| chrono::Utc::now()),
        })
    }
}

// ==========================================
// BomItemRepository - 计划物料仓储
// ==========================================
pub struct BomItemRepository {
    conn: Arc<Mutex<Connection>>,
}

impl BomItemRepository {
    /// 创建新的BomItemRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 批量插入计划物料明细
    ///
    /// # 红线
    /// - 必须在事务中完成
    pub fn batch_insert(&self, items: &[BomItem]) -> RepositoryResult<usize> {
        if items.is_empty() {
            return Ok(0);
        }

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        {
            let mut stmt = tx.prepare(
                r#"INSERT INTO bom_item (
                    bom_item_id, revision_id, item_type, part_number,
                    quantity, unit, is_critical
                ) VALUES (?, ?, ?, ?, ?, ?, ?)"#,
            )?;

            for item in items {
                stmt.execute(params![
                    &item.bom_item_id,
                    &item.revision_id,
                    &item.item_type,
                    &item.part_number,
                    &item.quantity,
                    &item.unit,
                    if item.is_critical { 1 } else { 0 },
                ])?;
            }
        }

        tx.commit()?;
        Ok(items.len())
    }

    /// 按bom_item_id查询明细
    pub fn find_by_id(&self, bom_item_id: &str) -> RepositoryResult<Option<BomItem>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT bom_item_id, revision_id, item_type, part_number,
                      quantity, unit, is_critical
               FROM bom_item
               WHERE bom_item_id = ?"#,
            params![bom_item_id],
            |row| Self::map_row(row),
        ) {
            Ok(item) => Ok(Some(item)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询版次的所有计划明细
    pub fn find_by_revision(&self, revision_id: &str) -> RepositoryResult<Vec<BomItem>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT bom_item_id, revision_id, item_type, part_number,
                      quantity, unit, is_critical
               FROM bom_item
               WHERE revision_id = ?
               ORDER BY item_type, part_number"#,
        )?;

        let items = stmt
            .query_map(params![revision_id], |row| Self::map_row(row))?
            .collect::<Result<Vec<BomItem>, _>>()?;

        Ok(items)
    }

    /// 映射数据库行到BomItem对象
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<BomItem> {
        Ok(BomItem {
            bom_item_id: row.get(0)?,
            revision_id: row.get(1)?,
            item_type: row.get(2)?,
            part_number: row.get(3)?,
            quantity: row.get(4)?,
            unit: row.get(5)?,
            is_critical: row.get::<_, i32>(6)? == 1,
        })
    }
}

// ==========================================
// CutterLayoutRepository - 布齿图仓储
// ==========================================
pub struct CutterLayoutRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CutterLayoutRepository {
    /// 创建新的CutterLayoutRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 批量插入布齿位置
    ///
    /// # 红线
    /// - 必须在事务中完成；(revision, blade, row, position) 唯一
    pub fn batch_insert(&self, positions: &[CutterLayoutPosition]) -> RepositoryResult<usize> {
        if positions.is_empty() {
            return Ok(0);
        }

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        {
            let mut stmt = tx.prepare(
                r#"INSERT INTO cutter_layout_position (
                    position_id, revision_id, blade_no, row_no, position_no,
                    zone, planned_cutter_size, planned_cutter_type
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
            )?;

            for pos in positions {
                stmt.execute(params![
                    &pos.position_id,
                    &pos.revision_id,
                    &pos.blade_no,
                    &pos.row_no,
                    &pos.position_no,
                    pos.zone.to_db_str(),
                    &pos.planned_cutter_size,
                    &pos.planned_cutter_type,
                ])?;
            }
        }

        tx.commit()?;
        Ok(positions.len())
    }

    /// 按position_id查询布齿位置
    pub fn find_by_id(&self, position_id: &str) -> RepositoryResult<Option<CutterLayoutPosition>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT position_id, revision_id, blade_no, row_no, position_no,
                      zone, planned_cutter_size, planned_cutter_type
               FROM cutter_layout_position
               WHERE position_id = ?"#,
            params![position_id],
            |row| Self::map_row(row),
        ) {
            Ok(pos) => Ok(Some(pos)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询版次的所有布齿位置（按刀翼/排/位排序）
    pub fn find_by_revision(&self, revision_id: &str) -> RepositoryResult<Vec<CutterLayoutPosition>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT position_id, revision_id, blade_no, row_no, position_no,
                      zone, planned_cutter_size, planned_cutter_type
               FROM cutter_layout_position
               WHERE revision_id = ?
               ORDER BY blade_no, row_no, position_no"#,
        )?;

        let positions = stmt
            .query_map(params![revision_id], |row| Self::map_row(row))?
            .collect::<Result<Vec<CutterLayoutPosition>, _>>()?;

        Ok(positions)
    }

    /// 映射数据库行到CutterLayoutPosition对象
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<CutterLayoutPosition> {
        let zone_str: String = row.get(5)?;

        Ok(CutterLayoutPosition {
            position_id: row.get(0)?,
            revision_id: row.get(1)?,
            blade_no: row.get(2)?,
            row_no: row.get(3)?,
            position_no: row.get(4)?,
            zone: CutterZone::from_str(&zone_str).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    5,
                    rusqlite::types::Type::Text,
                    format!("未知布齿分区: {}", zone_str).into(),
                )
            })?,
            planned_cutter_size: row.get(6)?,
            planned_cutter_type: row.get(7)?,
        })
    }
}
