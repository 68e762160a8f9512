// ==========================================
// 钻头制造执行系统 - 领域类型定义
// ==========================================
// 依据: Routing_Engine_Specs.md - 数据模型/状态机
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 钻头类型 (Bit Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BitType {
    Pdc,        // PDC 钻头（聚晶金刚石复合片）
    RollerCone, // 牙轮钻头
}

impl fmt::Display for BitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl BitType {
    /// 从字符串解析钻头类型
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PDC" => Some(BitType::Pdc),
            "ROLLER_CONE" => Some(BitType::RollerCone),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            BitType::Pdc => "PDC",
            BitType::RollerCone => "ROLLER_CONE",
        }
    }
}

// ==========================================
// 体材质 (Body Material)
// ==========================================
// 仅 PDC 钻头有体材质之分；牙轮钻头为 NULL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BodyMaterial {
    Matrix, // 胎体（碳化钨浸渍）
    Steel,  // 钢体
}

impl fmt::Display for BodyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl BodyMaterial {
    /// 从字符串解析体材质
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "MATRIX" => Some(BodyMaterial::Matrix),
            "STEEL" => Some(BodyMaterial::Steel),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            BodyMaterial::Matrix => "MATRIX",
            BodyMaterial::Steel => "STEEL",
        }
    }
}

// ==========================================
// 工单类型 (Order Type)
// ==========================================
// 路线模板选择的主键维度之一
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    NewBuild,       // 新造
    Repair,         // 修复
    EvaluationOnly, // 仅评估（回厂鉴定）
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl OrderType {
    /// 从字符串解析工单类型
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "NEW_BUILD" => Some(OrderType::NewBuild),
            "REPAIR" => Some(OrderType::Repair),
            "EVALUATION_ONLY" => Some(OrderType::EvaluationOnly),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            OrderType::NewBuild => "NEW_BUILD",
            OrderType::Repair => "REPAIR",
            OrderType::EvaluationOnly => "EVALUATION_ONLY",
        }
    }
}

// ==========================================
// 工单状态 (Work Order Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkOrderStatus {
    Open,      // 进行中
    Completed, // 已完工
    Cancelled, // 已取消
}

impl fmt::Display for WorkOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl WorkOrderStatus {
    /// 从字符串解析工单状态
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "OPEN" => Some(WorkOrderStatus::Open),
            "COMPLETED" => Some(WorkOrderStatus::Completed),
            "CANCELLED" => Some(WorkOrderStatus::Cancelled),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            WorkOrderStatus::Open => "OPEN",
            WorkOrderStatus::Completed => "COMPLETED",
            WorkOrderStatus::Cancelled => "CANCELLED",
        }
    }
}

// ==========================================
// 工序步骤状态 (Step Status)
// ==========================================
// 状态机: PENDING -> IN_PROGRESS -> DONE
//         PENDING -> SKIPPED (唯一的旁路终态)
// 红线: DONE/SKIPPED 为终态，禁止任何回退
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    Pending,    // 待开工
    InProgress, // 进行中
    Done,       // 已完工
    Skipped,    // 已跳过（评估调整或人工旁路）
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl StepStatus {
    /// 从字符串解析步骤状态
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PENDING" => Some(StepStatus::Pending),
            "IN_PROGRESS" => Some(StepStatus::InProgress),
            "DONE" => Some(StepStatus::Done),
            "SKIPPED" => Some(StepStatus::Skipped),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "PENDING",
            StepStatus::InProgress => "IN_PROGRESS",
            StepStatus::Done => "DONE",
            StepStatus::Skipped => "SKIPPED",
        }
    }

    /// 判断是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepStatus::Done | StepStatus::Skipped)
    }

    /// 判断状态转换是否合法
    ///
    /// 合法转换:
    /// - PENDING -> IN_PROGRESS
    /// - PENDING -> SKIPPED
    /// - IN_PROGRESS -> DONE
    pub fn can_transition_to(&self, target: StepStatus) -> bool {
        matches!(
            (self, target),
            (StepStatus::Pending, StepStatus::InProgress)
                | (StepStatus::Pending, StepStatus::Skipped)
                | (StepStatus::InProgress, StepStatus::Done)
        )
    }
}

// ==========================================
// 钻头实物状态 (Bit Instance Status)
// ==========================================
// 状态机: IN_PRODUCTION -> IN_SERVICE <-> IN_REPAIR
//         IN_SERVICE -> WITH_CUSTOMER / SCRAP
// 红线: SCRAP 为终态，报废后不得再开修复工单
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BitStatus {
    InProduction, // 在制
    InService,    // 在役（可派遣/待修）
    InRepair,     // 修复中
    WithCustomer, // 已发往客户
    Scrap,        // 已报废
}

impl fmt::Display for BitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl BitStatus {
    /// 从字符串解析实物状态
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "IN_PRODUCTION" => Some(BitStatus::InProduction),
            "IN_SERVICE" => Some(BitStatus::InService),
            "IN_REPAIR" => Some(BitStatus::InRepair),
            "WITH_CUSTOMER" => Some(BitStatus::WithCustomer),
            "SCRAP" => Some(BitStatus::Scrap),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            BitStatus::InProduction => "IN_PRODUCTION",
            BitStatus::InService => "IN_SERVICE",
            BitStatus::InRepair => "IN_REPAIR",
            BitStatus::WithCustomer => "WITH_CUSTOMER",
            BitStatus::Scrap => "SCRAP",
        }
    }

    /// 判断是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, BitStatus::Scrap)
    }

    /// 判断状态转换是否合法
    ///
    /// 合法转换:
    /// - IN_PRODUCTION -> IN_SERVICE (新造完工)
    /// - IN_SERVICE -> IN_REPAIR (修复工单开立)
    /// - IN_REPAIR -> IN_SERVICE (修复完工)
    /// - IN_SERVICE -> WITH_CUSTOMER (发运)
    /// - WITH_CUSTOMER -> IN_SERVICE (回厂)
    /// - WITH_CUSTOMER -> IN_REPAIR (回厂直接进修)
    /// - IN_SERVICE / IN_REPAIR / WITH_CUSTOMER -> SCRAP (报废处置)
    pub fn can_transition_to(&self, target: BitStatus) -> bool {
        matches!(
            (self, target),
            (BitStatus::InProduction, BitStatus::InService)
                | (BitStatus::InService, BitStatus::InRepair)
                | (BitStatus::InRepair, BitStatus::InService)
                | (BitStatus::InService, BitStatus::WithCustomer)
                | (BitStatus::WithCustomer, BitStatus::InService)
                | (BitStatus::WithCustomer, BitStatus::InRepair)
                | (BitStatus::InService, BitStatus::Scrap)
                | (BitStatus::InRepair, BitStatus::Scrap)
                | (BitStatus::WithCustomer, BitStatus::Scrap)
        )
    }
}

// ==========================================
// 评估总体结论 (Overall Condition)
// ==========================================
// 来源: 评估模块（外部协作方），数据库保留原始字符串
// 红线: 未识别的结论按"不排除任何工序"处理(fail-open)并记录日志
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallCondition {
    Serviceable, // 可直接复用，无需大修
    MinorDamage, // 轻度损伤
    MajorDamage, // 重度损伤（等效重造路线）
    Scrap,       // 报废
}

impl fmt::Display for OverallCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl OverallCondition {
    /// 从字符串解析评估结论
    ///
    /// 返回 None 表示未识别的结论值，调用方应 fail-open 并告警
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "SERVICEABLE" => Some(OverallCondition::Serviceable),
            "MINOR_DAMAGE" => Some(OverallCondition::MinorDamage),
            "MAJOR_DAMAGE" => Some(OverallCondition::MajorDamage),
            "SCRAP" => Some(OverallCondition::Scrap),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            OverallCondition::Serviceable => "SERVICEABLE",
            OverallCondition::MinorDamage => "MINOR_DAMAGE",
            OverallCondition::MajorDamage => "MAJOR_DAMAGE",
            OverallCondition::Scrap => "SCRAP",
        }
    }
}

// ==========================================
// 切削齿分区 (Cutter Zone)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CutterZone {
    Cone,  // 锥部
    Nose,  // 鼻部
    Gauge, // 保径
}

impl fmt::Display for CutterZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl CutterZone {
    /// 从字符串解析分区
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "CONE" => Some(CutterZone::Cone),
            "NOSE" => Some(CutterZone::Nose),
            "GAUGE" => Some(CutterZone::Gauge),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            CutterZone::Cone => "CONE",
            CutterZone::Nose => "NOSE",
            CutterZone::Gauge => "GAUGE",
        }
    }
}

// ==========================================
// 装配质量结论 (Quality Outcome)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QualityOutcome {
    Pass,   // 合格
    Fail,   // 不合格
    Rework, // 返工
}

impl fmt::Display for QualityOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl QualityOutcome {
    /// 从字符串解析质量结论
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PASS" => Some(QualityOutcome::Pass),
            "FAIL" => Some(QualityOutcome::Fail),
            "REWORK" => Some(QualityOutcome::Rework),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            QualityOutcome::Pass => "PASS",
            QualityOutcome::Fail => "FAIL",
            QualityOutcome::Rework => "REWORK",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_status_transitions() {
        assert!(StepStatus::Pending.can_transition_to(StepStatus::InProgress));
        assert!(StepStatus::Pending.can_transition_to(StepStatus::Skipped));
        assert!(StepStatus::InProgress.can_transition_to(StepStatus::Done));

        // 禁止回退与自环
        assert!(!StepStatus::Done.can_transition_to(StepStatus::Pending));
        assert!(!StepStatus::Done.can_transition_to(StepStatus::InProgress));
        assert!(!StepStatus::Skipped.can_transition_to(StepStatus::Pending));
        assert!(!StepStatus::Pending.can_transition_to(StepStatus::Pending));
        assert!(!StepStatus::InProgress.can_transition_to(StepStatus::Skipped));
    }

    #[test]
    fn test_bit_status_scrap_is_terminal() {
        assert!(BitStatus::Scrap.is_terminal());
        assert!(!BitStatus::Scrap.can_transition_to(BitStatus::InService));
        assert!(!BitStatus::Scrap.can_transition_to(BitStatus::InRepair));
    }

    #[test]
    fn test_overall_condition_fail_open_parse() {
        assert_eq!(
            OverallCondition::from_str("minor_damage"),
            Some(OverallCondition::MinorDamage)
        );
        // 未识别的结论返回 None，由调用方 fail-open
        assert_eq!(OverallCondition::from_str("TOTALED"), None);
    }

    #[test]
    fn test_db_str_roundtrip() {
        for t in [BitType::Pdc, BitType::RollerCone] {
            assert_eq!(BitType::from_str(t.to_db_str()), Some(t));
        }
        for o in [
            OrderType::NewBuild,
            OrderType::Repair,
            OrderType::EvaluationOnly,
        ] {
            assert_eq!(OrderType::from_str(o.to_db_str()), Some(o));
        }
    }
}
