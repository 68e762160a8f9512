// ==========================================
// 钻头制造执行系统 - 领域模型层
// ==========================================
// 依据: Routing_Engine_Specs.md - 数据模型
// ==========================================
// 职责: 定义领域实体、类型、状态机规则
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod design;
pub mod evaluation;
pub mod job;
pub mod lifecycle;
pub mod route;
pub mod types;
pub mod variance;

// 重导出核心类型
pub use design::{BitDesign, BomItem, CutterLayoutPosition, DesignRevision};
pub use evaluation::EvaluationSummary;
pub use job::{JobCard, JobRouteStep, WorkOrder};
pub use lifecycle::{BitInstance, RepairHistory};
pub use route::{RouteStepTemplate, RouteTemplate};
pub use types::{
    BitStatus, BitType, BodyMaterial, CutterZone, OrderType, OverallCondition, QualityOutcome,
    StepStatus, WorkOrderStatus,
};
pub use variance::{ActualBom, ActualCutterInstallation};
