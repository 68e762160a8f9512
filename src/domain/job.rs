// ==========================================
// 钻头制造执行系统 - 工单/派工领域模型
// ==========================================
// 依据: Routing_Engine_Specs.md - Job / JobRouteStep 状态机
// 红线: seq_no 在派工卡内唯一；DONE/SKIPPED 为终态
// ==========================================

use crate::domain::types::{OrderType, StepStatus, WorkOrderStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// WorkOrder - 工单
// ==========================================
// 一张工单针对一只钻头实物（新造工单在实物入库前 instance_id 可空）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkOrder {
    pub work_order_id: String,       // 工单ID
    pub order_no: String,            // 工单号（业务唯一）
    pub order_type: OrderType,       // 工单类型（新造/修复/仅评估）
    pub revision_id: String,         // 关联设计版次
    pub instance_id: Option<String>, // 关联钻头实物（修复/评估工单必填）
    pub status: WorkOrderStatus,     // 工单状态
    pub created_at: DateTime<Utc>,   // 记录创建时间
    pub updated_at: DateTime<Utc>,   // 记录更新时间
}

impl WorkOrder {
    /// 判断是否为进行中的工单
    pub fn is_open(&self) -> bool {
        self.status == WorkOrderStatus::Open
    }
}

// ==========================================
// JobCard - 派工卡
// ==========================================
// 工单下的派工单元，持有生成的工序步骤序列
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobCard {
    pub job_card_id: String,           // 派工卡ID
    pub work_order_id: String,         // 关联工单
    pub card_no: String,               // 派工卡号（业务唯一）
    pub dispatched_by: Option<String>, // 派工人
    pub created_at: DateTime<Utc>,     // 记录创建时间
}

// ==========================================
// JobRouteStep - 工序步骤实例
// ==========================================
// 由路线模板物化而来，绑定派工卡
// 红线: 只有 PENDING 步骤可被调整引擎改动
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRouteStep {
    pub step_id: String,                     // 步骤ID
    pub job_card_id: String,                 // 关联派工卡
    pub seq_no: i32,                         // 顺序号（卡内唯一）
    pub process_code: String,                // 工序代码
    pub department: Option<String>,          // 执行部门
    pub workstation: Option<String>,         // 执行工位
    pub estimated_duration_min: Option<i32>, // 预估工时（分钟）
    pub is_mandatory: bool,                  // 强制工序标志
    pub status: StepStatus,                  // 步骤状态
    pub skip_reason: Option<String>,         // 跳过原因（SKIPPED 时记录）
    pub actual_start: Option<DateTime<Utc>>, // 实际开工时间
    pub actual_end: Option<DateTime<Utc>>,   // 实际完工时间
}

impl JobRouteStep {
    /// 判断步骤是否仍可被调整（仅 PENDING）
    pub fn is_adjustable(&self) -> bool {
        self.status == StepStatus::Pending
    }

    /// 计算驻留时长（分钟），未完工返回 None
    pub fn dwell_minutes(&self) -> Option<i64> {
        match (self.actual_start, self.actual_end) {
            (Some(start), Some(end)) => Some((end - start).num_minutes()),
            _ => None,
        }
    }
}
