// ==========================================
// 钻头制造执行系统 - 配置层
// ==========================================
// 职责: 系统配置的读取接口与实现
// ==========================================

pub mod config_manager;
pub mod routing_config_trait;

// 重导出核心类型
pub use config_manager::{ConfigManager, DEFAULT_REPAIR_CEILING};
pub use routing_config_trait::RoutingConfigReader;
