// ==========================================
// 钻头制造执行系统 - 评估结果领域模型
// ==========================================
// 依据: Routing_Engine_Specs.md - 外部接口/评估模块
// 来源: 评估模块（外部协作方），路线引擎只读
// ==========================================

use crate::domain::types::OverallCondition;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// EvaluationSummary - 评估总结
// ==========================================
// overall_condition 保留源字符串（外部字段），引擎解析时 fail-open
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub evaluation_id: String,        // 评估ID
    pub job_card_id: String,          // 关联派工卡
    pub evaluation_date: NaiveDate,   // 评估日期
    pub overall_condition: String,    // 总体结论（源字段，如 MINOR_DAMAGE）
    pub evaluated_by: Option<String>, // 评估人
    pub remarks: Option<String>,      // 备注
    pub created_at: DateTime<Utc>,    // 记录创建时间
}

impl EvaluationSummary {
    /// 解析总体结论
    ///
    /// 返回 None 表示未识别的结论值，调用方应 fail-open 并告警
    pub fn condition(&self) -> Option<OverallCondition> {
        OverallCondition::from_str(&self.overall_condition)
    }
}
