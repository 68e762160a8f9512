// ==========================================
// 钻头制造执行系统 - 路线规则核心（纯函数）
// ==========================================
// 职责: 模板选择偏好 + 工序筛选规则，不碰数据库
// 红线: 所有规则必须输出 reason
// 红线: 未识别的评估结论按"不排除"处理(fail-open)
// ==========================================

use crate::domain::route::{RouteStepTemplate, RouteTemplate};
use crate::domain::types::{BodyMaterial, OrderType, OverallCondition};

// ==========================================
// 工序代码集合
// ==========================================

/// 浸渍工艺集合（胎体成型，钢体路线排除）
pub const INFILTRATION_PROCESS_CODES: &[&str] = &[
    "MOLD_PREP",
    "POWDER_LOADING",
    "INFILTRATION",
    "COOLING",
    "MOLD_REMOVAL",
];

/// 检验工序集合（仅评估工单只保留这些）
pub const INSPECTION_PROCESS_CODES: &[&str] = &[
    "VISUAL_INSPECTION",
    "NDT",
    "THREAD_INSPECTION",
    "DIMENSION_CHECK",
    "EVALUATION",
    "FINAL_QC",
];

/// 重制造工序集合（轻度损伤修复排除）
pub const HEAVY_MANUFACTURING_CODES: &[&str] = &[
    "INFILTRATION",
    "MACHINING",
    "MOLD_PREP",
    "POWDER_LOADING",
    "MAJOR_WELD",
];

/// 报废路线保留集合（报废结论仅保留这些）
pub const SCRAP_ROUTE_CODES: &[&str] = &["EVALUATION", "SCRAP_DOCUMENTATION", "FINAL_QC"];

// ==========================================
// 模板选择结果
// ==========================================

/// 模板选择偏好层级
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateMatchLevel {
    ExactMaterial,    // 体材质精确匹配
    MaterialAgnostic, // 通用材质模板
    AnyFallback,      // 兜底：同钻头类型任意模板（材质不匹配）
}

/// 模板选择结果
#[derive(Debug, Clone)]
pub struct TemplateSelection {
    pub template: RouteTemplate,
    pub match_level: TemplateMatchLevel,
    pub reason: String,
}

// ==========================================
// RouteRules - 路线规则核心
// ==========================================
// 红线: 不直接读写库，只计算和返回决策
pub struct RouteRules;

impl RouteRules {
    /// 判断是否为浸渍工艺
    pub fn is_infiltration_code(process_code: &str) -> bool {
        INFILTRATION_PROCESS_CODES.contains(&process_code)
    }

    /// 判断是否为检验工序
    pub fn is_inspection_code(process_code: &str) -> bool {
        INSPECTION_PROCESS_CODES.contains(&process_code)
    }

    /// 判断是否为重制造工序
    pub fn is_heavy_manufacturing_code(process_code: &str) -> bool {
        HEAVY_MANUFACTURING_CODES.contains(&process_code)
    }

    /// 判断是否在报废路线保留集合内
    pub fn is_scrap_route_code(process_code: &str) -> bool {
        SCRAP_ROUTE_CODES.contains(&process_code)
    }

    /// 模板选择偏好
    ///
    /// 候选集已按 (钻头类型, 工单类型) 过滤，此处只做材质偏好:
    /// 1. 体材质精确匹配
    /// 2. 通用材质模板（body_material 为空）
    /// 3. 兜底：任意模板（需 fallback_allowed，且输出告警级 reason）
    ///
    /// # 返回
    /// - None: 无候选或兜底被禁用
    pub fn select_template(
        candidates: &[RouteTemplate],
        body_material: Option<BodyMaterial>,
        fallback_allowed: bool,
    ) -> Option<TemplateSelection> {
        if candidates.is_empty() {
            return None;
        }

        // 1. 体材质精确匹配
        if let Some(template) = candidates
            .iter()
            .find(|t| t.matches_material_exactly(body_material))
        {
            return Some(TemplateSelection {
                template: template.clone(),
                match_level: TemplateMatchLevel::ExactMaterial,
                reason: format!(
                    "模板{}体材质精确匹配({})",
                    template.template_id,
                    body_material.map_or("无".to_string(), |m| m.to_string())
                ),
            });
        }

        // 2. 通用材质模板
        if let Some(template) = candidates.iter().find(|t| t.is_material_agnostic()) {
            return Some(TemplateSelection {
                template: template.clone(),
                match_level: TemplateMatchLevel::MaterialAgnostic,
                reason: format!("模板{}为通用材质模板", template.template_id),
            });
        }

        // 3. 兜底：任意模板（材质不匹配，可能生成错误路线）
        if fallback_allowed {
            let template = &candidates[0];
            return Some(TemplateSelection {
                template: template.clone(),
                match_level: TemplateMatchLevel::AnyFallback,
                reason: format!(
                    "模板{}为兜底选择: 模板材质({})与设计材质({})不匹配",
                    template.template_id,
                    template
                        .body_material
                        .map_or("无".to_string(), |m| m.to_string()),
                    body_material.map_or("无".to_string(), |m| m.to_string())
                ),
            });
        }

        None
    }

    /// 单步骤排除判定
    ///
    /// 三条规则依次评估，任一命中即排除（规则间非互斥）:
    /// - 钢体规则: 体材质为钢，排除浸渍工艺
    /// - 仅评估规则: 仅评估工单，只保留检验工序
    /// - 修复结论规则: 修复工单按最新评估结论过滤
    ///
    /// # 参数
    /// - repair_condition: 修复工单的最新评估结论（None=尚无评估，不过滤）
    ///
    /// # 返回
    /// - Some(reason): 排除及原因
    /// - None: 保留
    pub fn step_exclusion(
        process_code: &str,
        body_material: Option<BodyMaterial>,
        order_type: OrderType,
        repair_condition: Option<OverallCondition>,
    ) -> Option<String> {
        // 钢体规则
        if body_material == Some(BodyMaterial::Steel) && Self::is_infiltration_code(process_code) {
            return Some(format!("钢体设计排除浸渍工艺: {}", process_code));
        }

        // 仅评估规则
        if order_type == OrderType::EvaluationOnly && !Self::is_inspection_code(process_code) {
            return Some(format!("仅评估工单只保留检验工序: {}", process_code));
        }

        // 修复结论规则
        if order_type == OrderType::Repair {
            match repair_condition {
                Some(OverallCondition::MinorDamage) => {
                    if Self::is_heavy_manufacturing_code(process_code) {
                        return Some(format!("轻度损伤排除重制造工序: {}", process_code));
                    }
                }
                Some(OverallCondition::Scrap) => {
                    if !Self::is_scrap_route_code(process_code) {
                        return Some(format!("报废结论仅保留报废路线工序: {}", process_code));
                    }
                }
                // 重度损伤等效重造路线，不排除；可复用/尚无评估同样不过滤
                Some(OverallCondition::MajorDamage)
                | Some(OverallCondition::Serviceable)
                | None => {}
            }
        }

        None
    }

    /// 过滤模板步骤
    ///
    /// # 返回
    /// - (保留的步骤, 排除原因列表)
    pub fn filter_template_steps(
        steps: &[RouteStepTemplate],
        body_material: Option<BodyMaterial>,
        order_type: OrderType,
        repair_condition: Option<OverallCondition>,
    ) -> (Vec<RouteStepTemplate>, Vec<String>) {
        let mut kept = Vec::with_capacity(steps.len());
        let mut reasons = Vec::new();

        for step in steps {
            match Self::step_exclusion(
                &step.process_code,
                body_material,
                order_type,
                repair_condition,
            ) {
                Some(reason) => reasons.push(reason),
                None => kept.push(step.clone()),
            }
        }

        (kept, reasons)
    }
}
