// ==========================================
// 钻头制造执行系统 - 路由事件处理器
// ==========================================
// 职责: 消费入站事件（派工卡创建/评估录入），分派到对应引擎
// 说明: 替代隐式框架钩子——工单/评估模块显式发布事件，本处理器
//       注册消费；批量创建场景同样逐卡发布，不再依赖保存钩子
// 红线: routing_event_log 台账实现 at-most-once，重投已成功事件不产生副作用
// ==========================================

use crate::config::RoutingConfigReader;
use crate::engine::evaluation_adjuster::EvaluationAdjuster;
use crate::engine::events::{RoutingEvent, RoutingEventType};
use crate::engine::route_generator::RouteGenerator;
use crate::repository::{
    EvaluationRepository, EventLogEntry, EventLogStatus, RepositoryError,
    RoutingEventLogRepository,
};
use chrono::Utc;
use std::error::Error;
use std::sync::Arc;
use tracing::instrument;

/// 事件处理结局
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleOutcome {
    Processed,        // 正常处理
    DuplicateSkipped, // 台账已 SUCCEEDED，跳过
    Ignored,          // 非入站事件类型，不消费
}

// ==========================================
// RoutingEventHandler - 路由事件处理器
// ==========================================
pub struct RoutingEventHandler<C>
where
    C: RoutingConfigReader,
{
    generator: Arc<RouteGenerator<C>>,
    adjuster: Arc<EvaluationAdjuster>,
    evaluation_repo: Arc<EvaluationRepository>,
    event_log_repo: Arc<RoutingEventLogRepository>,
}

impl<C> RoutingEventHandler<C>
where
    C: RoutingConfigReader,
{
    /// 创建新的 RoutingEventHandler 实例
    pub fn new(
        generator: Arc<RouteGenerator<C>>,
        adjuster: Arc<EvaluationAdjuster>,
        evaluation_repo: Arc<EvaluationRepository>,
        event_log_repo: Arc<RoutingEventLogRepository>,
    ) -> Self {
        Self {
            generator,
            adjuster,
            evaluation_repo,
            event_log_repo,
        }
    }

    /// 处理入站事件
    ///
    /// # 去重语义
    /// - 台账中已 SUCCEEDED 的 event_id 直接跳过（重投安全）
    /// - FAILED 的事件允许重投（上次失败已整体回滚，无残留）
    #[instrument(skip(self, event), fields(event_id = %event.event_id, event_type = %event.event_type.as_str()))]
    pub async fn handle(&self, event: &RoutingEvent) -> Result<HandleOutcome, Box<dyn Error>> {
        // 非入站类型不消费
        if !matches!(
            event.event_type,
            RoutingEventType::JobCardCreated | RoutingEventType::EvaluationRecorded
        ) {
            return Ok(HandleOutcome::Ignored);
        }

        // 台账去重
        if self.event_log_repo.find_status(&event.event_id)? == Some(EventLogStatus::Succeeded) {
            tracing::info!("事件已处理过，跳过重投: event_id={}", event.event_id);
            return Ok(HandleOutcome::DuplicateSkipped);
        }

        let received_at = Utc::now();
        let result = self.dispatch(event).await;

        // 记录台账（成功/失败均留痕）
        let entry = EventLogEntry {
            event_id: event.event_id.clone(),
            event_type: event.event_type.as_str().to_string(),
            job_card_id: event.job_card_id.clone(),
            payload_json: serde_json::to_string(event).ok(),
            status: if result.is_ok() {
                EventLogStatus::Succeeded
            } else {
                EventLogStatus::Failed
            },
            error_message: result.as_ref().err().map(|e| e.to_string()),
            received_at,
            processed_at: Some(Utc::now()),
        };
        self.event_log_repo.record(&entry)?;

        result.map(|_| HandleOutcome::Processed)
    }

    /// 按事件类型分派
    async fn dispatch(&self, event: &RoutingEvent) -> Result<(), Box<dyn Error>> {
        let job_card_id = event
            .job_card_id
            .as_deref()
            .ok_or_else(|| format!("事件缺少 job_card_id: event_id={}", event.event_id))?;

        match event.event_type {
            RoutingEventType::JobCardCreated => {
                let steps = self.generator.generate_route_steps(job_card_id).await?;
                if steps.is_empty() {
                    // 模板未命中已由生成引擎告警；此处不视为处理失败
                    tracing::warn!(
                        "派工卡创建事件生成了空路线: job_card_id={}",
                        job_card_id
                    );
                }
                Ok(())
            }
            RoutingEventType::EvaluationRecorded => {
                let evaluation_id = event
                    .evaluation_id
                    .as_deref()
                    .ok_or_else(|| format!("事件缺少 evaluation_id: event_id={}", event.event_id))?;

                let evaluation = self.evaluation_repo.find_by_id(evaluation_id)?.ok_or(
                    RepositoryError::NotFound {
                        entity: "EvaluationSummary".to_string(),
                        id: evaluation_id.to_string(),
                    },
                )?;

                self.adjuster
                    .adjust_route_after_evaluation(job_card_id, &evaluation)?;
                Ok(())
            }
            _ => Ok(()),
        }
    }
}
