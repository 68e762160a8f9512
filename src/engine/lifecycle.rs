// ==========================================
// 钻头制造执行系统 - 实物生命周期引擎
// ==========================================
// 职责: 钻头实物状态流转 + 修复履历链维护
// 红线: 修复上限是业务规则不是异常；开修复工单前调用方必须检查
// 红线: 修复完工的履历追加与轮次推进在同一事务内
// ==========================================

use crate::config::RoutingConfigReader;
use crate::domain::lifecycle::{BitInstance, RepairHistory};
use crate::domain::types::{BitStatus, WorkOrderStatus};
use crate::engine::events::{
    OptionalEventPublisher, RoutingEvent, RoutingEventPublisher, RoutingEventType,
};
use crate::repository::{
    BitInstanceRepository, RepairHistoryRepository, RepositoryError, WorkOrderRepository,
};
use std::error::Error;
use std::sync::Arc;
use tracing::instrument;

// ==========================================
// UnitLifecycleEngine - 生命周期引擎
// ==========================================
pub struct UnitLifecycleEngine<C>
where
    C: RoutingConfigReader,
{
    instance_repo: Arc<BitInstanceRepository>,
    repair_history_repo: Arc<RepairHistoryRepository>,
    work_order_repo: Arc<WorkOrderRepository>,
    config: Arc<C>,
    event_publisher: OptionalEventPublisher,
}

impl<C> UnitLifecycleEngine<C>
where
    C: RoutingConfigReader,
{
    /// 创建新的 UnitLifecycleEngine 实例
    pub fn new(
        instance_repo: Arc<BitInstanceRepository>,
        repair_history_repo: Arc<RepairHistoryRepository>,
        work_order_repo: Arc<WorkOrderRepository>,
        config: Arc<C>,
        event_publisher: Option<Arc<dyn RoutingEventPublisher>>,
    ) -> Self {
        let event_publisher = match event_publisher {
            Some(p) => OptionalEventPublisher::with_publisher(p),
            None => OptionalEventPublisher::none(),
        };

        Self {
            instance_repo,
            repair_history_repo,
            work_order_repo,
            config,
            event_publisher,
        }
    }

    /// 读取实物（不存在则报错）
    fn load_instance(&self, instance_id: &str) -> Result<BitInstance, Box<dyn Error>> {
        Ok(self
            .instance_repo
            .find_by_id(instance_id)?
            .ok_or(RepositoryError::NotFound {
                entity: "BitInstance".to_string(),
                id: instance_id.to_string(),
            })?)
    }

    /// 判断实物是否还允许再次修复
    ///
    /// 规则: 未报废且 current_repair_index < repair_ceiling（配置项，默认 5）
    pub async fn can_be_repaired_again(&self, instance_id: &str) -> Result<bool, Box<dyn Error>> {
        let instance = self.load_instance(instance_id)?;
        let ceiling = self.config.get_repair_ceiling().await?;
        Ok(instance.can_be_repaired_again(ceiling))
    }

    /// 新造完工: IN_PRODUCTION -> IN_SERVICE
    ///
    /// 同时完工新造工单并回填 initial_work_order_id
    #[instrument(skip(self), fields(instance_id = %instance_id))]
    pub fn complete_initial_build(
        &self,
        instance_id: &str,
        work_order_id: &str,
    ) -> Result<(), Box<dyn Error>> {
        self.instance_repo.transition_status(
            instance_id,
            BitStatus::InProduction,
            BitStatus::InService,
        )?;
        self.instance_repo
            .set_initial_work_order(instance_id, work_order_id)?;
        self.work_order_repo
            .update_status(work_order_id, WorkOrderStatus::Completed)?;

        tracing::info!("新造完工入役: instance_id={}", instance_id);
        self.publish_status_changed(instance_id);
        Ok(())
    }

    /// 修复工单开立: -> IN_REPAIR
    ///
    /// # 错误
    /// - `BusinessRuleViolation`: 修复上限已到或已报废（调用方应先检查
    ///   `can_be_repaired_again`，引擎此处兜底复核）
    /// - `InvalidStateTransition`: 当前状态不允许进修
    #[instrument(skip(self), fields(instance_id = %instance_id))]
    pub async fn open_repair(&self, instance_id: &str) -> Result<(), Box<dyn Error>> {
        let instance = self.load_instance(instance_id)?;
        let ceiling = self.config.get_repair_ceiling().await?;

        if !instance.can_be_repaired_again(ceiling) {
            return Err(RepositoryError::BusinessRuleViolation(format!(
                "实物{}不允许再次修复: status={}, current_repair_index={}, 上限={}",
                instance_id, instance.status, instance.current_repair_index, ceiling
            ))
            .into());
        }

        self.instance_repo
            .transition_status(instance_id, instance.status, BitStatus::InRepair)?;

        tracing::info!(
            "修复工单开立: instance_id={}, 第{}轮修复",
            instance_id,
            instance.current_repair_index + 1
        );
        self.publish_status_changed(instance_id);
        Ok(())
    }

    /// 修复完工: IN_REPAIR -> IN_SERVICE，追加履历并推进轮次
    ///
    /// 履历插入、current_repair_index 推进、状态回转在仓储层单事务完成；
    /// repair_index 必须等于 current_repair_index + 1，否则整体拒绝。
    #[instrument(skip(self, record), fields(instance_id = %record.instance_id, repair_index = record.repair_index))]
    pub fn complete_repair(&self, record: &RepairHistory) -> Result<(), Box<dyn Error>> {
        let instance = self.load_instance(&record.instance_id)?;

        if instance.status != BitStatus::InRepair {
            return Err(RepositoryError::InvalidStateTransition {
                entity: "BitInstance".to_string(),
                from: instance.status.to_db_str().to_string(),
                to: BitStatus::InService.to_db_str().to_string(),
            }
            .into());
        }

        self.repair_history_repo
            .append_and_advance(record, BitStatus::InService)?;
        self.work_order_repo
            .update_status(&record.work_order_id, WorkOrderStatus::Completed)?;

        tracing::info!(
            "修复完工: instance_id={}, repair_index={}",
            record.instance_id,
            record.repair_index
        );
        self.publish_status_changed(&record.instance_id);
        Ok(())
    }

    /// 发运: IN_SERVICE -> WITH_CUSTOMER
    #[instrument(skip(self), fields(instance_id = %instance_id))]
    pub fn dispatch_to_customer(&self, instance_id: &str) -> Result<(), Box<dyn Error>> {
        self.instance_repo.transition_status(
            instance_id,
            BitStatus::InService,
            BitStatus::WithCustomer,
        )?;

        tracing::info!("实物发运: instance_id={}", instance_id);
        self.publish_status_changed(instance_id);
        Ok(())
    }

    /// 回厂: WITH_CUSTOMER -> IN_SERVICE
    #[instrument(skip(self), fields(instance_id = %instance_id))]
    pub fn return_from_customer(&self, instance_id: &str) -> Result<(), Box<dyn Error>> {
        self.instance_repo.transition_status(
            instance_id,
            BitStatus::WithCustomer,
            BitStatus::InService,
        )?;

        tracing::info!("实物回厂: instance_id={}", instance_id);
        self.publish_status_changed(instance_id);
        Ok(())
    }

    /// 报废处置: -> SCRAP（终态）
    #[instrument(skip(self), fields(instance_id = %instance_id))]
    pub fn scrap(&self, instance_id: &str) -> Result<(), Box<dyn Error>> {
        let instance = self.load_instance(instance_id)?;

        if !instance.status.can_transition_to(BitStatus::Scrap) {
            return Err(RepositoryError::InvalidStateTransition {
                entity: "BitInstance".to_string(),
                from: instance.status.to_db_str().to_string(),
                to: BitStatus::Scrap.to_db_str().to_string(),
            }
            .into());
        }

        self.instance_repo
            .transition_status(instance_id, instance.status, BitStatus::Scrap)?;

        tracing::info!("实物报废: instance_id={}", instance_id);
        self.publish_status_changed(instance_id);
        Ok(())
    }

    /// 查询修复履历链（轮次升序）
    ///
    /// 返回前校验链完整性: 记录数与 current_repair_index 一致，
    /// 轮次自 1 起连续无空洞。写入时已强制该不变式，此处发现
    /// 不一致说明数据已损坏，直接报错而不是静默返回。
    pub fn repair_history_chain(
        &self,
        instance_id: &str,
    ) -> Result<Vec<RepairHistory>, Box<dyn Error>> {
        let instance = self.load_instance(instance_id)?;
        let chain = self.repair_history_repo.find_chain_by_instance(instance_id)?;

        if chain.len() as i32 != instance.current_repair_index {
            return Err(RepositoryError::ValidationError(format!(
                "修复履历链与轮次计数不一致: instance_id={}, 记录数={}, current_repair_index={}",
                instance_id,
                chain.len(),
                instance.current_repair_index
            ))
            .into());
        }

        for (i, record) in chain.iter().enumerate() {
            let expected = i as i32 + 1;
            if record.repair_index != expected {
                return Err(RepositoryError::RepairIndexGap {
                    instance_id: instance_id.to_string(),
                    expected,
                    actual: record.repair_index,
                }
                .into());
            }
        }

        Ok(chain)
    }

    /// 发布实物状态变更事件
    fn publish_status_changed(&self, instance_id: &str) {
        if let Err(e) = self.event_publisher.publish(RoutingEvent::outbound(
            RoutingEventType::BitStatusChanged,
            None,
            Some(format!("UnitLifecycleEngine:{}", instance_id)),
        )) {
            tracing::warn!("BitStatusChanged 事件发布失败: {}", e);
        }
    }
}
