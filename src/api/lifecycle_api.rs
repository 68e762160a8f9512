// ==========================================
// 钻头制造执行系统 - 生命周期业务接口
// ==========================================
// 职责: 对外提供实物状态流转与修复履历查询接口
// 红线: 修复上限返回 false 是业务答复不是异常
// ==========================================

use crate::api::error::ApiResult;
use crate::config::RoutingConfigReader;
use crate::domain::lifecycle::{BitInstance, RepairHistory};
use crate::engine::lifecycle::UnitLifecycleEngine;
use crate::repository::BitInstanceRepository;
use std::sync::Arc;

// ==========================================
// LifecycleApi - 生命周期业务接口
// ==========================================
pub struct LifecycleApi<C>
where
    C: RoutingConfigReader,
{
    engine: Arc<UnitLifecycleEngine<C>>,
    instance_repo: Arc<BitInstanceRepository>,
}

impl<C> LifecycleApi<C>
where
    C: RoutingConfigReader,
{
    /// 创建新的 LifecycleApi 实例
    pub fn new(
        engine: Arc<UnitLifecycleEngine<C>>,
        instance_repo: Arc<BitInstanceRepository>,
    ) -> Self {
        Self {
            engine,
            instance_repo,
        }
    }

    /// 查询实物
    pub fn get_instance(&self, instance_id: &str) -> ApiResult<Option<BitInstance>> {
        Ok(self.instance_repo.find_by_id(instance_id)?)
    }

    /// 按序列号查询实物
    pub fn get_instance_by_serial(&self, serial_no: &str) -> ApiResult<Option<BitInstance>> {
        Ok(self.instance_repo.find_by_serial_no(serial_no)?)
    }

    /// 判断是否允许再次修复（开修复工单前必查）
    pub async fn can_be_repaired_again(&self, instance_id: &str) -> ApiResult<bool> {
        Ok(self.engine.can_be_repaired_again(instance_id).await?)
    }

    /// 新造完工入役
    pub fn complete_initial_build(
        &self,
        instance_id: &str,
        work_order_id: &str,
    ) -> ApiResult<()> {
        Ok(self.engine.complete_initial_build(instance_id, work_order_id)?)
    }

    /// 修复工单开立
    pub async fn open_repair(&self, instance_id: &str) -> ApiResult<()> {
        Ok(self.engine.open_repair(instance_id).await?)
    }

    /// 修复完工（追加履历并推进轮次）
    pub fn complete_repair(&self, record: &RepairHistory) -> ApiResult<()> {
        Ok(self.engine.complete_repair(record)?)
    }

    /// 发运
    pub fn dispatch_to_customer(&self, instance_id: &str) -> ApiResult<()> {
        Ok(self.engine.dispatch_to_customer(instance_id)?)
    }

    /// 回厂
    pub fn return_from_customer(&self, instance_id: &str) -> ApiResult<()> {
        Ok(self.engine.return_from_customer(instance_id)?)
    }

    /// 报废处置
    pub fn scrap(&self, instance_id: &str) -> ApiResult<()> {
        Ok(self.engine.scrap(instance_id)?)
    }

    /// 查询修复履历链（轮次升序，返回前校验完整性）
    pub fn repair_history_chain(&self, instance_id: &str) -> ApiResult<Vec<RepairHistory>> {
        Ok(self.engine.repair_history_chain(instance_id)?)
    }
}
