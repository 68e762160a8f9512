// ==========================================
// 钻头制造执行系统 - 路线生成引擎
// ==========================================
// 职责: 模板选择 + 工序筛选 + 路线物化
// 输入: job_card (联查工单/版次/设计)
// 输出: job_route_step (PENDING 步骤序列)
// 红线: 物化必须单事务，全部落库或一条不留
// 红线: 模板未命中为软失败（告警+空路线），不抛异常
// ==========================================

use crate::config::RoutingConfigReader;
use crate::domain::job::JobRouteStep;
use crate::domain::route::RouteStepTemplate;
use crate::domain::types::{OrderType, OverallCondition, StepStatus};
use crate::engine::events::{
    OptionalEventPublisher, RoutingEvent, RoutingEventPublisher, RoutingEventType,
};
use crate::engine::route_rules::{RouteRules, TemplateMatchLevel};
use crate::repository::{
    EvaluationRepository, JobCardContext, JobCardRepository, JobRouteStepRepository,
    RouteTemplateRepository,
};
use std::collections::HashSet;
use std::error::Error;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

// ==========================================
// RouteGenerator - 路线生成引擎
// ==========================================
pub struct RouteGenerator<C>
where
    C: RoutingConfigReader,
{
    template_repo: Arc<RouteTemplateRepository>,
    step_repo: Arc<JobRouteStepRepository>,
    job_card_repo: Arc<JobCardRepository>,
    evaluation_repo: Arc<EvaluationRepository>,
    config: Arc<C>,
    event_publisher: OptionalEventPublisher,
}

impl<C> RouteGenerator<C>
where
    C: RoutingConfigReader,
{
    /// 创建新的 RouteGenerator 实例
    pub fn new(
        template_repo: Arc<RouteTemplateRepository>,
        step_repo: Arc<JobRouteStepRepository>,
        job_card_repo: Arc<JobCardRepository>,
        evaluation_repo: Arc<EvaluationRepository>,
        config: Arc<C>,
        event_publisher: Option<Arc<dyn RoutingEventPublisher>>,
    ) -> Self {
        let event_publisher = match event_publisher {
            Some(p) => OptionalEventPublisher::with_publisher(p),
            None => OptionalEventPublisher::none(),
        };

        Self {
            template_repo,
            step_repo,
            job_card_repo,
            evaluation_repo,
            config,
            event_publisher,
        }
    }

    /// 生成路线步骤（派工卡创建时调用）
    ///
    /// # 返回
    /// - Ok(Vec<JobRouteStep>): 物化的步骤序列（顺序号升序）
    /// - Ok(空): 模板未命中（已告警，下游需显式处理空路线）
    /// - Err: 上下文缺失或物化失败（事务已回滚，不留半成品）
    #[instrument(skip(self), fields(job_card_id = %job_card_id))]
    pub async fn generate_route_steps(
        &self,
        job_card_id: &str,
    ) -> Result<Vec<JobRouteStep>, Box<dyn Error>> {
        let ctx = self.resolve_context(job_card_id)?;

        let steps = match self.build_route_steps(&ctx).await? {
            Some(steps) => steps,
            None => return Ok(Vec::new()),
        };

        // 物化: 单事务插入，失败整体回滚
        self.step_repo.batch_insert(&steps)?;

        tracing::info!(
            "路线生成完成: job_card_id={}, 步骤数={}",
            job_card_id,
            steps.len()
        );

        if let Err(e) = self.event_publisher.publish(RoutingEvent::outbound(
            RoutingEventType::RouteGenerated,
            Some(job_card_id.to_string()),
            Some("RouteGenerator".to_string()),
        )) {
            tracing::warn!("RouteGenerated 事件发布失败: {}", e);
        }

        Ok(steps)
    }

    /// 重生成路线步骤（作业配置变更后显式调用）
    ///
    /// 仅删除 PENDING 步骤后按当前上下文重新生成；已开工/完工/跳过的
    /// 步骤保持不动，其占用的顺序号不再重复物化。幂等：连续调用两次
    /// 与调用一次的最终步骤集一致。
    #[instrument(skip(self), fields(job_card_id = %job_card_id))]
    pub async fn regenerate_route_steps(
        &self,
        job_card_id: &str,
    ) -> Result<Vec<JobRouteStep>, Box<dyn Error>> {
        let ctx = self.resolve_context(job_card_id)?;

        let fresh = self.build_route_steps(&ctx).await?.unwrap_or_default();

        // 已离开 PENDING 的步骤保持不动，其顺序号不可重复占用
        let existing = self.step_repo.find_by_job_card(job_card_id)?;
        let occupied: HashSet<i32> = existing
            .iter()
            .filter(|s| s.status != StepStatus::Pending)
            .map(|s| s.seq_no)
            .collect();

        let replacement: Vec<JobRouteStep> = fresh
            .into_iter()
            .filter(|s| !occupied.contains(&s.seq_no))
            .collect();

        // 删除 PENDING + 插入新集合，单事务完成
        let (deleted, inserted) = self
            .step_repo
            .replace_pending(job_card_id, &replacement)?;

        tracing::info!(
            "路线重生成完成: job_card_id={}, 删除PENDING={}, 新增={}",
            job_card_id,
            deleted,
            inserted
        );

        if let Err(e) = self.event_publisher.publish(RoutingEvent::outbound(
            RoutingEventType::RouteRegenerated,
            Some(job_card_id.to_string()),
            Some("RouteGenerator".to_string()),
        )) {
            tracing::warn!("RouteRegenerated 事件发布失败: {}", e);
        }

        Ok(self.step_repo.find_by_job_card(job_card_id)?)
    }

    /// 解析派工卡上下文
    fn resolve_context(&self, job_card_id: &str) -> Result<JobCardContext, Box<dyn Error>> {
        self.job_card_repo
            .find_context(job_card_id)?
            .ok_or_else(|| format!("派工卡不存在: {}", job_card_id).into())
    }

    /// 按上下文构建步骤集（选择模板 + 筛选 + 组装，不落库）
    ///
    /// # 返回
    /// - Ok(None): 模板未命中（已告警）
    async fn build_route_steps(
        &self,
        ctx: &JobCardContext,
    ) -> Result<Option<Vec<JobRouteStep>>, Box<dyn Error>> {
        // === 步骤 1: 模板选择 ===
        let candidates = self
            .template_repo
            .find_candidates(ctx.bit_type, ctx.order_type)?;

        let fallback_allowed = self.config.get_route_fallback_any_material().await?;

        let selection = match RouteRules::select_template(
            &candidates,
            ctx.body_material,
            fallback_allowed,
        ) {
            Some(selection) => selection,
            None => {
                tracing::warn!(
                    "路线模板未命中: job_card_id={}, bit_type={}, order_type={}, 候选数={}",
                    ctx.job_card_id,
                    ctx.bit_type,
                    ctx.order_type,
                    candidates.len()
                );
                return Ok(None);
            }
        };

        // 兜底命中按缺陷级别告警（材质不匹配可能生成错误路线）
        match selection.match_level {
            TemplateMatchLevel::AnyFallback => {
                tracing::warn!("模板兜底选择: job_card_id={}, {}", ctx.job_card_id, selection.reason)
            }
            _ => tracing::debug!("模板选择: {}", selection.reason),
        }

        // === 步骤 2: 工序筛选 ===
        let repair_condition = self.resolve_repair_condition(ctx).await?;

        let template_steps = self.template_repo.find_steps(&selection.template.template_id)?;
        let (kept, exclusion_reasons) = RouteRules::filter_template_steps(
            &template_steps,
            ctx.body_material,
            ctx.order_type,
            repair_condition,
        );

        for reason in &exclusion_reasons {
            tracing::debug!("工序排除: job_card_id={}, {}", ctx.job_card_id, reason);
        }

        // === 步骤 3: 组装步骤实例 ===
        Ok(Some(Self::materialize(&ctx.job_card_id, &kept)))
    }

    /// 解析修复工单的最新评估结论
    ///
    /// - 非修复工单: None（规则不适用）
    /// - 尚无评估: None（全量生成，待评估录入后调整）
    /// - 未识别结论: None + 告警（fail-open）
    async fn resolve_repair_condition(
        &self,
        ctx: &JobCardContext,
    ) -> Result<Option<OverallCondition>, Box<dyn Error>> {
        if ctx.order_type != OrderType::Repair {
            return Ok(None);
        }

        let latest = self
            .evaluation_repo
            .find_latest_by_job_card(&ctx.job_card_id)?;

        match latest {
            Some(evaluation) => match evaluation.condition() {
                Some(condition) => Ok(Some(condition)),
                None => {
                    tracing::warn!(
                        "未识别的评估结论，按不排除处理: job_card_id={}, overall_condition={}",
                        ctx.job_card_id,
                        evaluation.overall_condition
                    );
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    /// 将模板步骤物化为 PENDING 步骤实例
    fn materialize(job_card_id: &str, template_steps: &[RouteStepTemplate]) -> Vec<JobRouteStep> {
        template_steps
            .iter()
            .map(|t| JobRouteStep {
                step_id: Uuid::new_v4().to_string(),
                job_card_id: job_card_id.to_string(),
                seq_no: t.seq_no,
                process_code: t.process_code.clone(),
                department: t.default_department.clone(),
                workstation: t.default_workstation.clone(),
                estimated_duration_min: t.estimated_duration_min,
                is_mandatory: t.is_mandatory,
                status: StepStatus::Pending,
                skip_reason: None,
                actual_start: None,
                actual_end: None,
            })
            .collect()
    }
}
