// ==========================================
// 钻头制造执行系统 - 人工操作校验器
// ==========================================
// 职责: 工序操作的前置校验（状态机 + 并行开工属性）
// 说明: "同卡同时只应有一道工序进行中"默认仅告警不拦截，
//       可通过 strict_single_in_progress 配置升级为拦截
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::job::JobRouteStep;
use crate::domain::types::StepStatus;
use crate::repository::JobRouteStepRepository;
use std::sync::Arc;

// ==========================================
// StepOperationValidator - 工序操作校验器
// ==========================================
pub struct StepOperationValidator {
    step_repo: Arc<JobRouteStepRepository>,
}

impl StepOperationValidator {
    /// 创建新的 StepOperationValidator 实例
    pub fn new(step_repo: Arc<JobRouteStepRepository>) -> Self {
        Self { step_repo }
    }

    /// 校验状态转换合法性（不落库，仓储层 WHERE 守卫兜底）
    pub fn validate_transition(step: &JobRouteStep, target: StepStatus) -> ApiResult<()> {
        if !step.status.can_transition_to(target) {
            return Err(ApiError::InvalidStateTransition {
                entity: "JobRouteStep".to_string(),
                from: step.status.to_db_str().to_string(),
                to: target.to_db_str().to_string(),
            });
        }
        Ok(())
    }

    /// 开工前校验"单工序进行中"属性
    ///
    /// # 参数
    /// - strict: true 时违反即拦截；false 时仅告警放行
    pub fn validate_single_in_progress(
        &self,
        job_card_id: &str,
        strict: bool,
    ) -> ApiResult<()> {
        let in_progress = self.step_repo.count_in_progress(job_card_id)?;

        if in_progress > 0 {
            let reason = format!(
                "派工卡{}已有{}道工序进行中",
                job_card_id, in_progress
            );

            if strict {
                return Err(ApiError::ConcurrentStepViolation { reason });
            }

            tracing::warn!("并行开工: {}", reason);
        }

        Ok(())
    }
}
