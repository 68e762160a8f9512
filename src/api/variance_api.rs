// ==========================================
// 钻头制造执行系统 - 物耗差异业务接口
// ==========================================
// 职责: 对外提供实耗记录与差异查询接口
// 面向: 车间录入端、物控复核、下游分析模块（只读）
// ==========================================

use crate::api::error::ApiResult;
use crate::domain::types::QualityOutcome;
use crate::domain::variance::ActualCutterInstallation;
use crate::engine::variance::{BomVarianceLine, BomVarianceRecord, MaterialVarianceEngine};
use crate::repository::ActualCutterRepository;
use std::sync::Arc;

// ==========================================
// VarianceApi - 物耗差异业务接口
// ==========================================
pub struct VarianceApi {
    engine: Arc<MaterialVarianceEngine>,
    actual_cutter_repo: Arc<ActualCutterRepository>,
}

impl VarianceApi {
    /// 创建新的 VarianceApi 实例
    pub fn new(
        engine: Arc<MaterialVarianceEngine>,
        actual_cutter_repo: Arc<ActualCutterRepository>,
    ) -> Self {
        Self {
            engine,
            actual_cutter_repo,
        }
    }

    /// 记录实际物耗（重复记录覆盖实际数量）
    pub fn record_actual_bom(
        &self,
        work_order_id: &str,
        bom_item_id: &str,
        actual_quantity: f64,
        recorded_by: Option<String>,
    ) -> ApiResult<BomVarianceRecord> {
        Ok(self
            .engine
            .record_actual_bom(work_order_id, bom_item_id, actual_quantity, recorded_by)?)
    }

    /// 记录实际布齿安装（替代标志自动派生）
    pub fn record_cutter_installation(
        &self,
        work_order_id: &str,
        position_id: &str,
        actual_cutter_size: &str,
        actual_cutter_type: &str,
        quality_outcome: QualityOutcome,
        installed_by: Option<String>,
    ) -> ApiResult<ActualCutterInstallation> {
        Ok(self.engine.record_cutter_installation(
            work_order_id,
            position_id,
            actual_cutter_size,
            actual_cutter_type,
            quality_outcome,
            installed_by,
        )?)
    }

    /// 查询工单物耗差异明细
    pub fn list_bom_variances(&self, work_order_id: &str) -> ApiResult<Vec<BomVarianceLine>> {
        Ok(self.engine.list_bom_variances(work_order_id)?)
    }

    /// 查询工单的全部安装记录
    pub fn list_cutter_installations(
        &self,
        work_order_id: &str,
    ) -> ApiResult<Vec<ActualCutterInstallation>> {
        Ok(self.actual_cutter_repo.find_by_work_order(work_order_id)?)
    }

    /// 查询工单的替代安装记录
    pub fn list_substitutions(
        &self,
        work_order_id: &str,
    ) -> ApiResult<Vec<ActualCutterInstallation>> {
        Ok(self.engine.list_substitutions(work_order_id)?)
    }
}
