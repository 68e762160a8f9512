// ==========================================
// 钻头制造执行系统 - 物耗差异引擎
// ==========================================
// 职责: 记录实际物耗/布齿安装，计算差异并标记复核
// 红线: 复核标记只提示不拦截（策略挂钩，人工最终控制权）
// ==========================================

use crate::domain::types::QualityOutcome;
use crate::domain::variance::{ActualBom, ActualCutterInstallation};
use crate::engine::events::{
    OptionalEventPublisher, RoutingEvent, RoutingEventPublisher, RoutingEventType,
};
use crate::repository::{
    ActualBomRepository, ActualCutterRepository, BomItemRepository, CutterLayoutRepository,
    RepositoryError,
};
use chrono::Utc;
use std::error::Error;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// 物耗记录结果
#[derive(Debug, Clone)]
pub struct BomVarianceRecord {
    pub actual: ActualBom,        // 落库的实耗行
    pub variance: f64,            // 差异 = 实际 - 计划
    pub flagged_for_review: bool, // 关键物料正差异标记
}

/// 工单物耗差异明细（含关键物料标志，供报表）
#[derive(Debug, Clone)]
pub struct BomVarianceLine {
    pub bom_item_id: String,
    pub part_number: String,
    pub is_critical: bool,
    pub planned_quantity: f64,
    pub actual_quantity: f64,
    pub variance: f64,
    pub flagged_for_review: bool,
}

// ==========================================
// MaterialVarianceEngine - 物耗差异引擎
// ==========================================
pub struct MaterialVarianceEngine {
    actual_bom_repo: Arc<ActualBomRepository>,
    actual_cutter_repo: Arc<ActualCutterRepository>,
    bom_item_repo: Arc<BomItemRepository>,
    layout_repo: Arc<CutterLayoutRepository>,
    event_publisher: OptionalEventPublisher,
}

impl MaterialVarianceEngine {
    /// 创建新的 MaterialVarianceEngine 实例
    pub fn new(
        actual_bom_repo: Arc<ActualBomRepository>,
        actual_cutter_repo: Arc<ActualCutterRepository>,
        bom_item_repo: Arc<BomItemRepository>,
        layout_repo: Arc<CutterLayoutRepository>,
        event_publisher: Option<Arc<dyn RoutingEventPublisher>>,
    ) -> Self {
        let event_publisher = match event_publisher {
            Some(p) => OptionalEventPublisher::with_publisher(p),
            None => OptionalEventPublisher::none(),
        };

        Self {
            actual_bom_repo,
            actual_cutter_repo,
            bom_item_repo,
            layout_repo,
            event_publisher,
        }
    }

    /// 记录实际物耗
    ///
    /// 计划数量从 bom_item 取快照；关键物料正差异只标记复核，不拦截
    #[instrument(skip(self), fields(work_order_id = %work_order_id, bom_item_id = %bom_item_id))]
    pub fn record_actual_bom(
        &self,
        work_order_id: &str,
        bom_item_id: &str,
        actual_quantity: f64,
        recorded_by: Option<String>,
    ) -> Result<BomVarianceRecord, Box<dyn Error>> {
        let bom_item = self
            .bom_item_repo
            .find_by_id(bom_item_id)?
            .ok_or(RepositoryError::NotFound {
                entity: "BomItem".to_string(),
                id: bom_item_id.to_string(),
            })?;

        let actual = ActualBom {
            work_order_id: work_order_id.to_string(),
            bom_item_id: bom_item_id.to_string(),
            planned_quantity: bom_item.quantity,
            actual_quantity,
            recorded_by,
            updated_at: Utc::now(),
        };

        self.actual_bom_repo.upsert(&actual)?;

        let variance = actual.variance();
        let flagged = actual.needs_review(bom_item.is_critical);

        if flagged {
            tracing::warn!(
                "关键物料超耗待复核: work_order_id={}, part_number={}, 计划={}, 实际={}, 差异={}",
                work_order_id,
                bom_item.part_number,
                actual.planned_quantity,
                actual.actual_quantity,
                variance
            );

            if let Err(e) = self.event_publisher.publish(RoutingEvent::outbound(
                RoutingEventType::VarianceFlagged,
                None,
                Some(format!("MaterialVarianceEngine:{}", work_order_id)),
            )) {
                tracing::warn!("VarianceFlagged 事件发布失败: {}", e);
            }
        }

        Ok(BomVarianceRecord {
            actual,
            variance,
            flagged_for_review: flagged,
        })
    }

    /// 记录实际布齿安装
    ///
    /// 替代标志由计划规格比对派生，不由调用方传入
    #[instrument(skip(self), fields(work_order_id = %work_order_id, position_id = %position_id))]
    pub fn record_cutter_installation(
        &self,
        work_order_id: &str,
        position_id: &str,
        actual_cutter_size: &str,
        actual_cutter_type: &str,
        quality_outcome: QualityOutcome,
        installed_by: Option<String>,
    ) -> Result<ActualCutterInstallation, Box<dyn Error>> {
        let position = self
            .layout_repo
            .find_by_id(position_id)?
            .ok_or(RepositoryError::NotFound {
                entity: "CutterLayoutPosition".to_string(),
                id: position_id.to_string(),
            })?;

        let is_substitution = position.is_substitution(actual_cutter_size, actual_cutter_type);
        if is_substitution {
            tracing::info!(
                "布齿替代安装: work_order_id={}, position_id={}, 计划={}/{}, 实际={}/{}",
                work_order_id,
                position_id,
                position.planned_cutter_size,
                position.planned_cutter_type,
                actual_cutter_size,
                actual_cutter_type
            );
        }

        let installation = ActualCutterInstallation {
            installation_id: Uuid::new_v4().to_string(),
            work_order_id: work_order_id.to_string(),
            position_id: position_id.to_string(),
            actual_cutter_size: actual_cutter_size.to_string(),
            actual_cutter_type: actual_cutter_type.to_string(),
            is_substitution,
            quality_outcome,
            installed_by,
            installed_at: Utc::now(),
        };

        self.actual_cutter_repo.create(&installation)?;
        Ok(installation)
    }

    /// 查询工单物耗差异明细
    ///
    /// 联结计划明细补齐零件号与关键物料标志
    pub fn list_bom_variances(
        &self,
        work_order_id: &str,
    ) -> Result<Vec<BomVarianceLine>, Box<dyn Error>> {
        let actuals = self.actual_bom_repo.find_by_work_order(work_order_id)?;

        let mut lines = Vec::with_capacity(actuals.len());
        for actual in actuals {
            let bom_item = self.bom_item_repo.find_by_id(&actual.bom_item_id)?;
            let (part_number, is_critical) = match bom_item {
                Some(item) => (item.part_number, item.is_critical),
                None => {
                    tracing::warn!(
                        "实耗记录关联的计划明细缺失: bom_item_id={}",
                        actual.bom_item_id
                    );
                    (String::new(), false)
                }
            };

            lines.push(BomVarianceLine {
                bom_item_id: actual.bom_item_id.clone(),
                part_number,
                is_critical,
                planned_quantity: actual.planned_quantity,
                actual_quantity: actual.actual_quantity,
                variance: actual.variance(),
                flagged_for_review: actual.needs_review(is_critical),
            });
        }

        Ok(lines)
    }

    /// 查询工单替代安装记录
    pub fn list_substitutions(
        &self,
        work_order_id: &str,
    ) -> Result<Vec<ActualCutterInstallation>, Box<dyn Error>> {
        Ok(self.actual_cutter_repo.find_substitutions(work_order_id)?)
    }
}
