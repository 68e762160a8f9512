// ==========================================
// 钻头制造执行系统 - 路线业务接口
// ==========================================
// 职责: 对外提供路线生成/重生成/工序操作接口
// 面向: 车间跟踪界面、看板（步骤只读）、作业配置变更入口
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::StepOperationValidator;
use crate::config::RoutingConfigReader;
use crate::domain::job::JobRouteStep;
use crate::domain::types::StepStatus;
use crate::engine::route_generator::RouteGenerator;
use crate::repository::JobRouteStepRepository;
use chrono::Utc;
use std::sync::Arc;

// ==========================================
// RouteApi - 路线业务接口
// ==========================================
pub struct RouteApi<C>
where
    C: RoutingConfigReader,
{
    generator: Arc<RouteGenerator<C>>,
    step_repo: Arc<JobRouteStepRepository>,
    validator: StepOperationValidator,
    config: Arc<C>,
}

impl<C> RouteApi<C>
where
    C: RoutingConfigReader,
{
    /// 创建新的 RouteApi 实例
    pub fn new(
        generator: Arc<RouteGenerator<C>>,
        step_repo: Arc<JobRouteStepRepository>,
        config: Arc<C>,
    ) -> Self {
        let validator = StepOperationValidator::new(step_repo.clone());

        Self {
            generator,
            step_repo,
            validator,
            config,
        }
    }

    /// 生成路线（派工卡创建时调用）
    ///
    /// 返回空列表表示模板未命中，调用方需决定是否阻断放行
    pub async fn generate_route(&self, job_card_id: &str) -> ApiResult<Vec<JobRouteStep>> {
        Ok(self.generator.generate_route_steps(job_card_id).await?)
    }

    /// 重生成路线（作业配置变更后显式调用）
    pub async fn regenerate_route(&self, job_card_id: &str) -> ApiResult<Vec<JobRouteStep>> {
        Ok(self.generator.regenerate_route_steps(job_card_id).await?)
    }

    /// 查询派工卡的步骤序列（只读，顺序号升序）
    pub fn list_steps(&self, job_card_id: &str) -> ApiResult<Vec<JobRouteStep>> {
        Ok(self.step_repo.find_by_job_card(job_card_id)?)
    }

    /// 工序开工: PENDING -> IN_PROGRESS
    ///
    /// 记录实际开工时间；并行开工默认仅告警，strict 配置下拦截
    pub async fn start_step(&self, step_id: &str) -> ApiResult<JobRouteStep> {
        let step = self.load_step(step_id)?;
        StepOperationValidator::validate_transition(&step, StepStatus::InProgress)?;

        let strict = self
            .config
            .get_strict_single_in_progress()
            .await
            .map_err(|e| ApiError::InternalError(e.to_string()))?;
        self.validator
            .validate_single_in_progress(&step.job_card_id, strict)?;

        self.step_repo.start(step_id, Utc::now())?;
        self.load_step(step_id)
    }

    /// 工序完工: IN_PROGRESS -> DONE
    ///
    /// 记录实际完工时间，用于驻留时长报表
    pub fn complete_step(&self, step_id: &str) -> ApiResult<JobRouteStep> {
        let step = self.load_step(step_id)?;
        StepOperationValidator::validate_transition(&step, StepStatus::Done)?;

        self.step_repo.complete(step_id, Utc::now())?;
        self.load_step(step_id)
    }

    /// 工序跳过: PENDING -> SKIPPED（人工旁路）
    ///
    /// 跳过原因必填，落入 skip_reason 供审计
    pub fn skip_step(
        &self,
        step_id: &str,
        reason: &str,
        operator: Option<&str>,
    ) -> ApiResult<JobRouteStep> {
        let trimmed = reason.trim();
        if trimmed.is_empty() {
            return Err(ApiError::InvalidInput("跳过原因不能为空".to_string()));
        }

        let step = self.load_step(step_id)?;
        StepOperationValidator::validate_transition(&step, StepStatus::Skipped)?;

        let skip_reason = match operator {
            Some(op) => format!("人工跳过: {} (操作人: {})", trimmed, op),
            None => format!("人工跳过: {}", trimmed),
        };
        self.step_repo.skip(step_id, &skip_reason)?;
        self.load_step(step_id)
    }

    /// 读取步骤（不存在则报错）
    fn load_step(&self, step_id: &str) -> ApiResult<JobRouteStep> {
        self.step_repo
            .find_by_id(step_id)?
            .ok_or_else(|| ApiError::NotFound(format!("JobRouteStep(id={})不存在", step_id)))
    }
}
