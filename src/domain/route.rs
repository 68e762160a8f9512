// ==========================================
// 钻头制造执行系统 - 路线目录领域模型
// ==========================================
// 依据: Routing_Engine_Specs.md - RouteCatalog
// 维护方: 工艺工程师；路线引擎只读
// ==========================================

use crate::domain::types::{BitType, BodyMaterial, OrderType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// RouteTemplate - 路线模板
// ==========================================
// 主键维度: (bit_type, body_material, order_type)
// body_material 为 None 表示通用模板（任意材质可用）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteTemplate {
    pub template_id: String,                 // 模板ID
    pub template_name: String,               // 模板名称
    pub bit_type: BitType,                   // 适用钻头类型
    pub body_material: Option<BodyMaterial>, // 适用体材质（None=通用）
    pub order_type: OrderType,               // 适用工单类型
    pub is_active: bool,                     // 启用标志
    pub created_at: DateTime<Utc>,           // 记录创建时间
}

impl RouteTemplate {
    /// 判断是否与指定体材质精确匹配
    pub fn matches_material_exactly(&self, material: Option<BodyMaterial>) -> bool {
        self.body_material == material
    }

    /// 判断是否为通用材质模板
    pub fn is_material_agnostic(&self) -> bool {
        self.body_material.is_none()
    }
}

// ==========================================
// RouteStepTemplate - 路线步骤模板
// ==========================================
// seq_no 在模板内唯一且决定工序顺序
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteStepTemplate {
    pub step_template_id: String,            // 步骤模板ID
    pub template_id: String,                 // 关联模板
    pub seq_no: i32,                         // 顺序号
    pub process_code: String,                // 工序代码（如 INFILTRATION）
    pub default_department: Option<String>,  // 默认部门
    pub default_workstation: Option<String>, // 默认工位
    pub estimated_duration_min: Option<i32>, // 预估工时（分钟）
    pub is_mandatory: bool,                  // 强制工序标志
}
