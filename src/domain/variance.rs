// ==========================================
// 钻头制造执行系统 - 物耗差异领域模型
// ==========================================
// 依据: Routing_Engine_Specs.md - MaterialVariance
// 口径: variance = actual - planned，不落库、按需计算
// ==========================================

use crate::domain::types::QualityOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// ActualBom - 实际物耗
// ==========================================
// 一行对应 (工单, BOM明细)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActualBom {
    pub work_order_id: String,       // 关联工单
    pub bom_item_id: String,         // 关联计划明细
    pub planned_quantity: f64,       // 计划数量（落位快照）
    pub actual_quantity: f64,        // 实际数量
    pub recorded_by: Option<String>, // 记录人
    pub updated_at: DateTime<Utc>,   // 最后更新时间
}

impl ActualBom {
    /// 物耗差异 = 实际 - 计划
    pub fn variance(&self) -> f64 {
        self.actual_quantity - self.planned_quantity
    }

    /// 判断是否需要复核（关键物料正差异）
    ///
    /// 策略挂钩：只标记不拦截，由物控人工复核
    pub fn needs_review(&self, is_critical: bool) -> bool {
        is_critical && self.variance() > 0.0
    }
}

// ==========================================
// ActualCutterInstallation - 实际布齿安装
// ==========================================
// 一行对应 (工单, 布齿位置)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActualCutterInstallation {
    pub installation_id: String,        // 安装记录ID
    pub work_order_id: String,          // 关联工单
    pub position_id: String,            // 关联布齿位置
    pub actual_cutter_size: String,     // 实际齿规格
    pub actual_cutter_type: String,     // 实际齿类型
    pub is_substitution: bool,          // 替代标志（实际与计划规格不一致）
    pub quality_outcome: QualityOutcome, // 装配质量结论
    pub installed_by: Option<String>,   // 安装人
    pub installed_at: DateTime<Utc>,    // 安装时间
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actual_bom(planned: f64, actual: f64) -> ActualBom {
        ActualBom {
            work_order_id: "WO001".to_string(),
            bom_item_id: "B001".to_string(),
            planned_quantity: planned,
            actual_quantity: actual,
            recorded_by: None,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_variance_arithmetic() {
        assert_eq!(actual_bom(60.0, 62.0).variance(), 2.0);
        assert_eq!(actual_bom(3.0, 3.0).variance(), 0.0);
        assert_eq!(actual_bom(10.0, 8.0).variance(), -2.0);
    }

    #[test]
    fn test_review_flag_only_on_critical_overrun() {
        // 关键物料正差异 -> 需复核
        assert!(actual_bom(60.0, 62.0).needs_review(true));
        // 非关键物料正差异 -> 不复核
        assert!(!actual_bom(60.0, 62.0).needs_review(false));
        // 关键物料零/负差异 -> 不复核
        assert!(!actual_bom(3.0, 3.0).needs_review(true));
        assert!(!actual_bom(10.0, 8.0).needs_review(true));
    }
}
