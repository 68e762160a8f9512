// ==========================================
// 钻头制造执行系统 - 评估调整引擎
// ==========================================
// 职责: 评估结论录入后调整派工卡的 PENDING 步骤
// 红线: 只触碰 PENDING 步骤；IN_PROGRESS/DONE/SKIPPED 一经写入不可改动
// 红线: 调整必须单事务，失败回滚到调整前状态
// 说明: 同一评估重复执行不产生增量改动（按结论类幂等）
// ==========================================

use crate::domain::evaluation::EvaluationSummary;
use crate::domain::types::OverallCondition;
use crate::engine::events::{
    OptionalEventPublisher, RoutingEvent, RoutingEventPublisher, RoutingEventType,
};
use crate::engine::route_rules::RouteRules;
use crate::repository::JobRouteStepRepository;
use std::error::Error;
use std::sync::Arc;
use tracing::instrument;

/// 调整结果
#[derive(Debug, Clone, Default)]
pub struct AdjustmentResult {
    pub skipped_count: usize, // 转为 SKIPPED 的步骤数
    pub deleted_count: usize, // 删除的步骤数
    pub reasons: Vec<String>, // 决策原因
}

// ==========================================
// EvaluationAdjuster - 评估调整引擎
// ==========================================
pub struct EvaluationAdjuster {
    step_repo: Arc<JobRouteStepRepository>,
    event_publisher: OptionalEventPublisher,
}

impl EvaluationAdjuster {
    /// 创建新的 EvaluationAdjuster 实例
    pub fn new(
        step_repo: Arc<JobRouteStepRepository>,
        event_publisher: Option<Arc<dyn RoutingEventPublisher>>,
    ) -> Self {
        let event_publisher = match event_publisher {
            Some(p) => OptionalEventPublisher::with_publisher(p),
            None => OptionalEventPublisher::none(),
        };

        Self {
            step_repo,
            event_publisher,
        }
    }

    /// 评估录入后调整路线
    ///
    /// 按结论分派:
    /// - SCRAP: 非报废路线的 PENDING 步骤转 SKIPPED（保留审计痕迹，不删除）
    /// - MINOR_DAMAGE: 重制造 PENDING 步骤直接删除（投机生成、未开工，不属实际作业审计）
    /// - 其他结论: 不做改动
    /// - 未识别结论: 不做改动（fail-open）+ 告警
    #[instrument(skip(self, evaluation), fields(job_card_id = %job_card_id, evaluation_id = %evaluation.evaluation_id))]
    pub fn adjust_route_after_evaluation(
        &self,
        job_card_id: &str,
        evaluation: &EvaluationSummary,
    ) -> Result<AdjustmentResult, Box<dyn Error>> {
        let condition = match evaluation.condition() {
            Some(condition) => condition,
            None => {
                tracing::warn!(
                    "未识别的评估结论，路线不做调整: job_card_id={}, overall_condition={}",
                    job_card_id,
                    evaluation.overall_condition
                );
                return Ok(AdjustmentResult::default());
            }
        };

        let result = match condition {
            OverallCondition::Scrap => self.apply_scrap(job_card_id, &evaluation.evaluation_id)?,
            OverallCondition::MinorDamage => self.apply_minor_damage(job_card_id)?,
            OverallCondition::MajorDamage | OverallCondition::Serviceable => {
                tracing::debug!(
                    "评估结论{}不触发路线调整: job_card_id={}",
                    condition,
                    job_card_id
                );
                AdjustmentResult::default()
            }
        };

        if result.skipped_count > 0 || result.deleted_count > 0 {
            tracing::info!(
                "路线调整完成: job_card_id={}, 结论={}, 跳过={}, 删除={}",
                job_card_id,
                condition,
                result.skipped_count,
                result.deleted_count
            );

            if let Err(e) = self.event_publisher.publish(RoutingEvent::outbound(
                RoutingEventType::RouteAdjusted,
                Some(job_card_id.to_string()),
                Some("EvaluationAdjuster".to_string()),
            )) {
                tracing::warn!("RouteAdjusted 事件发布失败: {}", e);
            }
        }

        Ok(result)
    }

    /// 报废结论: 非报废路线的 PENDING 步骤转 SKIPPED
    fn apply_scrap(
        &self,
        job_card_id: &str,
        evaluation_id: &str,
    ) -> Result<AdjustmentResult, Box<dyn Error>> {
        let pending = self.step_repo.find_pending_by_job_card(job_card_id)?;

        let mut to_skip = Vec::new();
        let mut reasons = Vec::new();
        for step in &pending {
            if !RouteRules::is_scrap_route_code(&step.process_code) {
                reasons.push(format!("报废结论跳过工序: {} (seq={})", step.process_code, step.seq_no));
                to_skip.push(step.step_id.clone());
            }
        }

        let skip_reason = format!("报废评估调整: evaluation_id={}", evaluation_id);
        let skipped_count = self.step_repo.batch_skip_pending(&to_skip, &skip_reason)?;

        Ok(AdjustmentResult {
            skipped_count,
            deleted_count: 0,
            reasons,
        })
    }

    /// 轻度损伤结论: 重制造 PENDING 步骤删除
    fn apply_minor_damage(&self, job_card_id: &str) -> Result<AdjustmentResult, Box<dyn Error>> {
        let pending = self.step_repo.find_pending_by_job_card(job_card_id)?;

        let mut to_delete = Vec::new();
        let mut reasons = Vec::new();
        for step in &pending {
            if RouteRules::is_heavy_manufacturing_code(&step.process_code) {
                reasons.push(format!(
                    "轻度损伤删除重制造工序: {} (seq={})",
                    step.process_code, step.seq_no
                ));
                to_delete.push(step.step_id.clone());
            }
        }

        let deleted_count = self.step_repo.batch_delete_pending(&to_delete)?;

        Ok(AdjustmentResult {
            skipped_count: 0,
            deleted_count,
            reasons,
        })
    }
}
