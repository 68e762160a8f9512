// ==========================================
// 钻头制造执行系统 - 工艺路线与修复流程引擎核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 独立路线/生命周期引擎 (任意前端可调用)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/schema 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    BitStatus, BitType, BodyMaterial, CutterZone, OrderType, OverallCondition, QualityOutcome,
    StepStatus, WorkOrderStatus,
};

// 领域实体
pub use domain::{
    ActualBom, ActualCutterInstallation, BitDesign, BitInstance, BomItem, CutterLayoutPosition,
    DesignRevision, EvaluationSummary, JobCard, JobRouteStep, RepairHistory, RouteStepTemplate,
    RouteTemplate, WorkOrder,
};

// 引擎
pub use engine::{
    EvaluationAdjuster, MaterialVarianceEngine, RouteGenerator, RouteRules, RoutingEventHandler,
    UnitLifecycleEngine,
};

// API
pub use api::{LifecycleApi, RouteApi, VarianceApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "钻头工艺路线与修复流程引擎";

// 数据库版本
pub const DB_VERSION: &str = "v0.1";

// ==========================================
// 预编译检查
// ==========================================
