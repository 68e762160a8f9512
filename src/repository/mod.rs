// ==========================================
// 钻头制造执行系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod design_repo;
pub mod error;
pub mod evaluation_repo;
pub mod event_log_repo;
pub mod lifecycle_repo;
pub mod route_step_repo;
pub mod route_template_repo;
pub mod variance_repo;
pub mod work_order_repo;

// 重导出核心仓储
pub use design_repo::{
    BitDesignRepository, BomItemRepository, CutterLayoutRepository, DesignRevisionRepository,
};
pub use error::{RepositoryError, RepositoryResult};
pub use evaluation_repo::EvaluationRepository;
pub use event_log_repo::{EventLogEntry, EventLogStatus, RoutingEventLogRepository};
pub use lifecycle_repo::{BitInstanceRepository, RepairHistoryRepository};
pub use route_step_repo::JobRouteStepRepository;
pub use route_template_repo::RouteTemplateRepository;
pub use variance_repo::{ActualBomRepository, ActualCutterRepository};
pub use work_order_repo::{JobCardContext, JobCardRepository, WorkOrderRepository};
