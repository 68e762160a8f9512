// ==========================================
// 钻头制造执行系统 - 引擎层
// ==========================================
// 职责: 实现业务规则引擎,不拼 SQL
// 红线: Engine 不拼 SQL, 所有规则必须输出 reason
// ==========================================

pub mod evaluation_adjuster;
pub mod event_handler;
pub mod events;
pub mod lifecycle;
pub mod route_generator;
pub mod route_rules;
pub mod variance;

// 重导出核心引擎
pub use evaluation_adjuster::{AdjustmentResult, EvaluationAdjuster};
pub use event_handler::{HandleOutcome, RoutingEventHandler};
pub use events::{
    NoOpEventPublisher, OptionalEventPublisher, RoutingEvent, RoutingEventPublisher,
    RoutingEventType,
};
pub use lifecycle::UnitLifecycleEngine;
pub use route_generator::RouteGenerator;
pub use route_rules::{
    RouteRules, TemplateMatchLevel, TemplateSelection, HEAVY_MANUFACTURING_CODES,
    INFILTRATION_PROCESS_CODES, INSPECTION_PROCESS_CODES, SCRAP_ROUTE_CODES,
};
pub use variance::{BomVarianceLine, BomVarianceRecord, MaterialVarianceEngine};
