// ==========================================
// 钻头制造执行系统 - 产品定义领域模型
// ==========================================
// 依据: Routing_Engine_Specs.md - ProductDefinition
// 红线: 一旦存在版次，设计标识字段不可变更
// 红线: 同一设计同一时刻只允许一个激活版次
// ==========================================

use crate::domain::types::{BitType, BodyMaterial, CutterZone};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// BitDesign - 钻头设计
// ==========================================
// 用途: 产品目录主数据，路线引擎只读
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitDesign {
    pub design_id: String,                   // 设计ID
    pub design_code: String,                 // 设计代号（如 "PX616M"）
    pub bit_type: BitType,                   // 钻头类型（PDC/牙轮）
    pub body_material: Option<BodyMaterial>, // 体材质（仅 PDC，牙轮为 None）
    pub size_inch: f64,                      // 外径（英寸）
    pub blade_count: Option<i32>,            // 刀翼数
    pub nozzle_count: Option<i32>,           // 喷嘴数
    pub created_at: DateTime<Utc>,           // 记录创建时间
    pub updated_at: DateTime<Utc>,           // 记录更新时间
}

// ==========================================
// DesignRevision - 设计版次
// ==========================================
// 用途: 沙盘派生与历史追溯；BOM 与布齿图挂在版次上
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesignRevision {
    pub revision_id: String,               // 版次ID
    pub design_id: String,                 // 关联设计
    pub revision_no: i32,                  // 版次号
    pub is_active: bool,                   // 激活标志（同一设计仅一个）
    pub effective_from: Option<NaiveDate>, // 生效起始日期
    pub effective_to: Option<NaiveDate>,   // 生效截止日期
    pub released_by: Option<String>,       // 发布人
    pub created_at: DateTime<Utc>,         // 记录创建时间
}

impl DesignRevision {
    /// 判断指定日期是否在生效期内
    pub fn is_effective_on(&self, date: NaiveDate) -> bool {
        let after_from = self.effective_from.map_or(true, |from| date >= from);
        let before_to = self.effective_to.map_or(true, |to| date <= to);
        after_from && before_to
    }
}

// ==========================================
// BomItem - 计划物料明细
// ==========================================
// 用途: 版次的计划用料；实际消耗记录在 actual_bom
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BomItem {
    pub bom_item_id: String,  // 明细ID
    pub revision_id: String,  // 关联版次
    pub item_type: String,    // 物料类型（CUTTER/NOZZLE/BODY_POWDER/...）
    pub part_number: String,  // 零件号
    pub quantity: f64,        // 计划数量
    pub unit: String,         // 计量单位
    pub is_critical: bool,    // 关键物料标志（超耗需复核）
}

// ==========================================
// CutterLayoutPosition - 布齿图位置
// ==========================================
// 坐标: 刀翼号 / 排号 / 位号，三元组在版次内唯一
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CutterLayoutPosition {
    pub position_id: String,         // 位置ID
    pub revision_id: String,         // 关联版次
    pub blade_no: i32,               // 刀翼号
    pub row_no: i32,                 // 排号
    pub position_no: i32,            // 位号
    pub zone: CutterZone,            // 分区（锥部/鼻部/保径）
    pub planned_cutter_size: String, // 计划齿规格（如 "1613"）
    pub planned_cutter_type: String, // 计划齿类型（如 "PREMIUM_ABRASION"）
}

impl CutterLayoutPosition {
    /// 判断实际安装规格是否构成替代
    pub fn is_substitution(&self, actual_size: &str, actual_type: &str) -> bool {
        self.planned_cutter_size != actual_size || self.planned_cutter_type != actual_type
    }
}
