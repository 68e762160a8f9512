// ==========================================
// 钻头制造执行系统 - 实物生命周期领域模型
// ==========================================
// 依据: Routing_Engine_Specs.md - UnitLifecycle
// 红线: repair_index 连续无空洞，与 current_repair_index 对齐
// 红线: SCRAP 后不得再开修复工单
// ==========================================

use crate::domain::types::BitStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// BitInstance - 钻头实物
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitInstance {
    pub instance_id: String,                  // 实物ID
    pub serial_no: String,                    // 序列号（业务唯一）
    pub design_id: String,                    // 关联设计
    pub status: BitStatus,                    // 实物状态
    pub current_repair_index: i32,            // 当前修复轮次（0=未修过）
    pub initial_work_order_id: Option<String>, // 新造工单ID
    pub created_at: DateTime<Utc>,            // 记录创建时间
    pub updated_at: DateTime<Utc>,            // 记录更新时间
}

impl BitInstance {
    /// 判断是否还允许再次修复
    ///
    /// # 参数
    /// - repair_ceiling: 修复次数上限（配置项，默认 5）
    ///
    /// # 规则
    /// - 已报废的实物不可修复
    /// - 修复轮次达到上限后不可修复
    pub fn can_be_repaired_again(&self, repair_ceiling: i32) -> bool {
        self.status != BitStatus::Scrap && self.current_repair_index < repair_ceiling
    }
}

// ==========================================
// RepairHistory - 修复履历
// ==========================================
// 每轮修复一条记录，repair_index 自 1 起严格递增
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairHistory {
    pub repair_id: String,             // 履历ID
    pub instance_id: String,           // 关联实物
    pub repair_index: i32,             // 修复轮次（1..k，无空洞）
    pub work_order_id: String,         // 修复工单ID
    pub hours_on_bottom: Option<f64>,  // 井底纯钻时间（小时）
    pub footage_drilled_m: Option<f64>, // 进尺（米）
    pub cutters_replaced: i32,         // 更换切削齿数
    pub nozzles_replaced: i32,         // 更换喷嘴数
    pub hardfacing_applied: bool,      // 是否补焊硬面
    pub threads_repaired: bool,        // 是否修复螺纹
    pub remarks: Option<String>,       // 备注
    pub created_at: DateTime<Utc>,     // 记录创建时间
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(status: BitStatus, repair_index: i32) -> BitInstance {
        BitInstance {
            instance_id: "BI001".to_string(),
            serial_no: "SN-2026-0001".to_string(),
            design_id: "D001".to_string(),
            status,
            current_repair_index: repair_index,
            initial_work_order_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_repair_ceiling() {
        assert!(instance(BitStatus::InService, 0).can_be_repaired_again(5));
        assert!(instance(BitStatus::InService, 4).can_be_repaired_again(5));
        assert!(!instance(BitStatus::InService, 5).can_be_repaired_again(5));
    }

    #[test]
    fn test_scrap_blocks_repair() {
        assert!(!instance(BitStatus::Scrap, 0).can_be_repaired_again(5));
    }
}
