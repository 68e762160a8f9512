// ==========================================
// 钻头制造执行系统 - 路由配置读取 Trait
// ==========================================
// 职责: 定义路线引擎所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use async_trait::async_trait;
use std::error::Error;

// ==========================================
// RoutingConfigReader Trait
// ==========================================
// 用途: 路线/生命周期引擎所需的配置读取接口
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait RoutingConfigReader: Send + Sync {
    /// 获取修复次数上限
    ///
    /// # 默认值
    /// - 5
    async fn get_repair_ceiling(&self) -> Result<i32, Box<dyn Error>>;

    /// 是否允许"同钻头类型任意模板"兜底选择
    ///
    /// 材质不匹配的兜底模板可能生成错误路线，允许现场禁用。
    /// 开启时兜底命中仍会记录 warn 级日志。
    ///
    /// # 默认值
    /// - true
    async fn get_route_fallback_any_material(&self) -> Result<bool, Box<dyn Error>>;

    /// 是否将"同卡多工序并行开工"从告警升级为拦截
    ///
    /// # 默认值
    /// - false（仅告警）
    async fn get_strict_single_in_progress(&self) -> Result<bool, Box<dyn Error>>;
}
