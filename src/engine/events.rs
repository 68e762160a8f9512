// ==========================================
// 钻头制造执行系统 - 引擎层事件定义与发布
// ==========================================
// 职责: 定义路由事件类型与发布 trait，实现依赖倒置
// 说明: Engine 层定义 trait，下游（看板/KPI 模块）实现适配器
// 红线: 事件消费方通过 routing_event_log 台账实现 at-most-once
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

// ==========================================
// 路由事件类型
// ==========================================

/// 路由事件触发类型
///
/// 入站: JobCardCreated / EvaluationRecorded（由工单/评估模块发布，路由引擎消费）
/// 出站: 其余类型（由路由引擎发布，供下游订阅）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutingEventType {
    /// 派工卡已创建（入站，触发路线生成）
    JobCardCreated,
    /// 评估结果已录入（入站，触发路线调整）
    EvaluationRecorded,
    /// 路线已生成
    RouteGenerated,
    /// 路线已调整
    RouteAdjusted,
    /// 路线已重生成
    RouteRegenerated,
    /// 实物状态变更
    BitStatusChanged,
    /// 物耗差异待复核
    VarianceFlagged,
}

impl RoutingEventType {
    /// 转换为字符串标识
    pub fn as_str(&self) -> &str {
        match self {
            RoutingEventType::JobCardCreated => "JobCardCreated",
            RoutingEventType::EvaluationRecorded => "EvaluationRecorded",
            RoutingEventType::RouteGenerated => "RouteGenerated",
            RoutingEventType::RouteAdjusted => "RouteAdjusted",
            RoutingEventType::RouteRegenerated => "RouteRegenerated",
            RoutingEventType::BitStatusChanged => "BitStatusChanged",
            RoutingEventType::VarianceFlagged => "VarianceFlagged",
        }
    }
}

/// 路由事件
///
/// event_id 由发布方生成且全局唯一，消费台账以此去重
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingEvent {
    /// 事件ID（发布方生成，消费去重依据）
    pub event_id: String,
    /// 事件类型
    pub event_type: RoutingEventType,
    /// 关联派工卡（部分出站事件可为空）
    pub job_card_id: Option<String>,
    /// 关联评估（EvaluationRecorded 必填）
    pub evaluation_id: Option<String>,
    /// 事件来源描述
    pub source: Option<String>,
    /// 事件发生时间
    pub occurred_at: DateTime<Utc>,
}

impl RoutingEvent {
    /// 创建派工卡创建事件
    pub fn job_card_created(job_card_id: String, source: Option<String>) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            event_type: RoutingEventType::JobCardCreated,
            job_card_id: Some(job_card_id),
            evaluation_id: None,
            source,
            occurred_at: Utc::now(),
        }
    }

    /// 创建评估录入事件
    pub fn evaluation_recorded(
        job_card_id: String,
        evaluation_id: String,
        source: Option<String>,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            event_type: RoutingEventType::EvaluationRecorded,
            job_card_id: Some(job_card_id),
            evaluation_id: Some(evaluation_id),
            source,
            occurred_at: Utc::now(),
        }
    }

    /// 创建出站事件
    pub fn outbound(
        event_type: RoutingEventType,
        job_card_id: Option<String>,
        source: Option<String>,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            event_type,
            job_card_id,
            evaluation_id: None,
            source,
            occurred_at: Utc::now(),
        }
    }
}

// ==========================================
// 事件发布 Trait
// ==========================================

/// 路由事件发布者 Trait
///
/// Engine 层定义，下游模块实现
/// 通过 trait 实现依赖倒置，Engine 不依赖任何下游模块
pub trait RoutingEventPublisher: Send + Sync {
    /// 发布路由事件
    ///
    /// # 返回
    /// - `Ok(())`: 发布成功
    /// - `Err`: 发布失败（引擎只告警，不回滚业务事务）
    fn publish(&self, event: RoutingEvent) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// 空操作事件发布者
///
/// 用于不需要事件发布的场景（如单元测试）
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

impl RoutingEventPublisher for NoOpEventPublisher {
    fn publish(&self, event: RoutingEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            "NoOpEventPublisher: 跳过事件发布 - event_id={}, event_type={}",
            event.event_id,
            event.event_type.as_str()
        );
        Ok(())
    }
}

/// 可选的事件发布者包装
///
/// 简化 Option<Arc<dyn RoutingEventPublisher>> 的使用
pub struct OptionalEventPublisher {
    inner: Option<Arc<dyn RoutingEventPublisher>>,
}

impl OptionalEventPublisher {
    /// 创建带发布者的实例
    pub fn with_publisher(publisher: Arc<dyn RoutingEventPublisher>) -> Self {
        Self {
            inner: Some(publisher),
        }
    }

    /// 创建空实例（不发布事件）
    pub fn none() -> Self {
        Self { inner: None }
    }

    /// 发布事件（如果有发布者）
    pub fn publish(&self, event: RoutingEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        match &self.inner {
            Some(publisher) => publisher.publish(event),
            None => {
                tracing::debug!(
                    "OptionalEventPublisher: 未配置发布者，跳过事件 - event_type={}",
                    event.event_type.as_str()
                );
                Ok(())
            }
        }
    }

    /// 检查是否配置了发布者
    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

impl Default for OptionalEventPublisher {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_card_created_event() {
        let event = RoutingEvent::job_card_created("JC001".to_string(), Some("intake".to_string()));

        assert_eq!(event.event_type, RoutingEventType::JobCardCreated);
        assert_eq!(event.job_card_id.as_deref(), Some("JC001"));
        assert!(event.evaluation_id.is_none());
        assert!(!event.event_id.is_empty());
    }

    #[test]
    fn test_evaluation_recorded_event() {
        let event =
            RoutingEvent::evaluation_recorded("JC001".to_string(), "EV001".to_string(), None);

        assert_eq!(event.event_type, RoutingEventType::EvaluationRecorded);
        assert_eq!(event.evaluation_id.as_deref(), Some("EV001"));
    }

    #[test]
    fn test_noop_publisher() {
        let publisher = NoOpEventPublisher;
        let event = RoutingEvent::outbound(RoutingEventType::RouteGenerated, None, None);

        assert!(publisher.publish(event).is_ok());
    }

    #[test]
    fn test_optional_publisher_none() {
        let publisher = OptionalEventPublisher::none();
        assert!(!publisher.is_configured());

        let event = RoutingEvent::outbound(RoutingEventType::RouteAdjusted, None, None);
        assert!(publisher.publish(event).is_ok());
    }

    #[test]
    fn test_optional_publisher_with_noop() {
        let noop = Arc::new(NoOpEventPublisher) as Arc<dyn RoutingEventPublisher>;
        let publisher = OptionalEventPublisher::with_publisher(noop);
        assert!(publisher.is_configured());

        let event = RoutingEvent::outbound(RoutingEventType::BitStatusChanged, None, None);
        assert!(publisher.publish(event).is_ok());
    }
}
