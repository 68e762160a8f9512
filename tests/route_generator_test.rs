// ==========================================
// 路线生成引擎测试
// ==========================================
// 测试范围:
// 1. 模板选择偏好（精确材质/通用/兜底/未命中）
// 2. 钢体排除浸渍工艺、仅评估只留检验工序
// 3. 修复结论过滤与 fail-open
// 4. 物化原子性（失败不留半成品）
// ==========================================


use chrono::NaiveDate;
use drill_bit_routing::config::ConfigManager;
use drill_bit_routing::domain::types::{BitType, BodyMaterial, OrderType, StepStatus};
use drill_bit_routing::engine::INFILTRATION_PROCESS_CODES;
use drill_bit_routing::repository::JobRouteStepRepository;
use test_helpers::*;

/// 测试: 钢体 PDC 新造 -> 选中钢体模板，生成端到端场景的九道工序
#[tokio::test]
async fn test_steel_new_build_generates_exact_route() {
    let (_temp, _path, conn) = setup_test_db();
    seed_standard_templates(&conn);

    let (_design_id, revision_id) = seed_design(
        &conn,
        "PX616S",
        BitType::Pdc,
        Some(BodyMaterial::Steel),
    );
    let (_wo, job_card_id) =
        seed_work_order_with_card(&conn, OrderType::NewBuild, &revision_id, None);

    let config = build_config(&conn);
    let generator = build_generator(&conn, config);

    let steps = generator
        .generate_route_steps(&job_card_id)
        .await
        .expect("生成路线失败");

    let codes: Vec<&str> = steps.iter().map(|s| s.process_code.as_str()).collect();
    assert_eq!(
        codes,
        vec![
            "BODY_PREP",
            "MACHINING",
            "WELD_UPPER",
            "HARDFACING",
            "BRAZING",
            "FINAL_FINISH",
            "NDT_INSPECTION",
            "THREAD_INSPECTION",
            "FINAL_QC",
        ]
    );

    // 全部 PENDING、顺序号升序且无重复
    for window in steps.windows(2) {
        assert!(window[0].seq_no < window[1].seq_no);
    }
    assert!(steps.iter().all(|s| s.status == StepStatus::Pending));

    // 钢体路线不含任何浸渍工艺
    for step in &steps {
        assert!(
            !INFILTRATION_PROCESS_CODES.contains(&step.process_code.as_str()),
            "钢体路线不应包含浸渍工艺: {}",
            step.process_code
        );
    }
}

/// 测试: 胎体 PDC 新造 -> 选中胎体模板，浸渍工艺保留
#[tokio::test]
async fn test_matrix_new_build_keeps_infiltration() {
    let (_temp, _path, conn) = setup_test_db();
    seed_standard_templates(&conn);

    let (_design_id, revision_id) = seed_design(
        &conn,
        "PX616M",
        BitType::Pdc,
        Some(BodyMaterial::Matrix),
    );
    let (_wo, job_card_id) =
        seed_work_order_with_card(&conn, OrderType::NewBuild, &revision_id, None);

    let config = build_config(&conn);
    let generator = build_generator(&conn, config);

    let steps = generator
        .generate_route_steps(&job_card_id)
        .await
        .expect("生成路线失败");

    let codes: Vec<&str> = steps.iter().map(|s| s.process_code.as_str()).collect();
    assert_eq!(codes.len(), MATRIX_NEW_BUILD_STEPS.len());
    assert!(codes.contains(&"INFILTRATION"));
    assert!(codes.contains(&"MOLD_PREP"));
}

/// 测试: 仅评估工单 -> 只保留检验工序集合
#[tokio::test]
async fn test_evaluation_only_restricted_to_inspection_set() {
    let (_temp, _path, conn) = setup_test_db();
    seed_standard_templates(&conn);

    let (_design_id, revision_id) = seed_design(
        &conn,
        "PX616E",
        BitType::Pdc,
        Some(BodyMaterial::Matrix),
    );
    let (_wo, job_card_id) =
        seed_work_order_with_card(&conn, OrderType::EvaluationOnly, &revision_id, None);

    let config = build_config(&conn);
    let generator = build_generator(&conn, config);

    let steps = generator
        .generate_route_steps(&job_card_id)
        .await
        .expect("生成路线失败");

    let codes: Vec<&str> = steps.iter().map(|s| s.process_code.as_str()).collect();
    // 模板中的 CLEANING 被过滤掉
    assert_eq!(
        codes,
        vec![
            "VISUAL_INSPECTION",
            "NDT",
            "DIMENSION_CHECK",
            "THREAD_INSPECTION",
            "EVALUATION",
            "FINAL_QC",
        ]
    );
}

/// 测试: 模板未命中 -> 返回空列表（软失败，不报错）
#[tokio::test]
async fn test_template_miss_returns_empty_without_error() {
    let (_temp, _path, conn) = setup_test_db();
    // 不种任何模板

    let (_design_id, revision_id) = seed_design(
        &conn,
        "RC101",
        BitType::RollerCone,
        None,
    );
    let (_wo, job_card_id) =
        seed_work_order_with_card(&conn, OrderType::NewBuild, &revision_id, None);

    let config = build_config(&conn);
    let generator = build_generator(&conn, config);

    let steps = generator
        .generate_route_steps(&job_card_id)
        .await
        .expect("模板未命中不应报错");
    assert!(steps.is_empty());

    // 库中同样不留任何步骤
    let step_repo = JobRouteStepRepository::new(conn.clone());
    assert!(step_repo.find_by_job_card(&job_card_id).unwrap().is_empty());
}

/// 测试: 材质无精确匹配 -> 兜底选择任意模板；禁用兜底后为空
#[tokio::test]
async fn test_material_fallback_gated_by_config() {
    let (_temp, _path, conn) = setup_test_db();
    // 只有胎体模板，没有钢体/通用模板
    seed_template(
        &conn,
        "T_PDC_MATRIX_NEW",
        BitType::Pdc,
        Some(BodyMaterial::Matrix),
        OrderType::NewBuild,
        MATRIX_NEW_BUILD_STEPS,
    );

    let (_design_id, revision_id) = seed_design(
        &conn,
        "PX616S",
        BitType::Pdc,
        Some(BodyMaterial::Steel),
    );

    let config = build_config(&conn);

    // 兜底开启（默认）: 选中胎体模板，但钢体规则仍排除浸渍工艺
    let (_wo1, card1) = seed_work_order_with_card(&conn, OrderType::NewBuild, &revision_id, None);
    let generator = build_generator(&conn, config.clone());
    let steps = generator
        .generate_route_steps(&card1)
        .await
        .expect("兜底生成失败");
    assert!(!steps.is_empty());
    for step in &steps {
        assert!(!INFILTRATION_PROCESS_CODES.contains(&step.process_code.as_str()));
    }

    // 兜底禁用: 视为模板未命中
    config
        .set_config_value("route_fallback_any_material", "0")
        .unwrap();
    let (_wo2, card2) = seed_work_order_with_card(&conn, OrderType::NewBuild, &revision_id, None);
    let steps = generator
        .generate_route_steps(&card2)
        .await
        .expect("兜底禁用不应报错");
    assert!(steps.is_empty());
}

/// 测试: 修复工单尚无评估 -> 全量生成（延迟到评估后调整）
#[tokio::test]
async fn test_repair_without_evaluation_generates_full_route() {
    let (_temp, _path, conn) = setup_test_db();
    seed_standard_templates(&conn);

    let (design_id, revision_id) = seed_design(
        &conn,
        "PX616M",
        BitType::Pdc,
        Some(BodyMaterial::Matrix),
    );
    let instance_id = seed_instance(
        &conn,
        &design_id,
        drill_bit_routing::domain::types::BitStatus::InRepair,
    );
    let (_wo, job_card_id) = seed_work_order_with_card(
        &conn,
        OrderType::Repair,
        &revision_id,
        Some(&instance_id),
    );

    let config = build_config(&conn);
    let generator = build_generator(&conn, config);

    let steps = generator
        .generate_route_steps(&job_card_id)
        .await
        .expect("生成路线失败");
    assert_eq!(steps.len(), REPAIR_STEPS.len());
}

/// 测试: 修复工单已有轻损评估 -> 生成时即排除重制造工序
#[tokio::test]
async fn test_repair_with_minor_damage_excludes_heavy_at_generation() {
    let (_temp, _path, conn) = setup_test_db();
    seed_standard_templates(&conn);

    let (design_id, revision_id) = seed_design(
        &conn,
        "PX616M",
        BitType::Pdc,
        Some(BodyMaterial::Matrix),
    );
    let instance_id = seed_instance(
        &conn,
        &design_id,
        drill_bit_routing::domain::types::BitStatus::InRepair,
    );
    let (_wo, job_card_id) = seed_work_order_with_card(
        &conn,
        OrderType::Repair,
        &revision_id,
        Some(&instance_id),
    );

    seed_evaluation(
        &conn,
        &job_card_id,
        "MINOR_DAMAGE",
        NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
    );

    let config = build_config(&conn);
    let generator = build_generator(&conn, config);

    let steps = generator
        .generate_route_steps(&job_card_id)
        .await
        .expect("生成路线失败");

    let codes: Vec<&str> = steps.iter().map(|s| s.process_code.as_str()).collect();
    assert!(!codes.contains(&"MACHINING"));
    assert!(!codes.contains(&"MAJOR_WELD"));
    assert!(codes.contains(&"EVALUATION"));
    assert!(codes.contains(&"HARDFACING"));
}

/// 测试: 未识别评估结论 -> fail-open，全量生成
#[tokio::test]
async fn test_unknown_condition_fails_open() {
    let (_temp, _path, conn) = setup_test_db();
    seed_standard_templates(&conn);

    let (design_id, revision_id) = seed_design(
        &conn,
        "PX616M",
        BitType::Pdc,
        Some(BodyMaterial::Matrix),
    );
    let instance_id = seed_instance(
        &conn,
        &design_id,
        drill_bit_routing::domain::types::BitStatus::InRepair,
    );
    let (_wo, job_card_id) = seed_work_order_with_card(
        &conn,
        OrderType::Repair,
        &revision_id,
        Some(&instance_id),
    );

    seed_evaluation(
        &conn,
        &job_card_id,
        "TOTALED", // 外部系统传来的未知结论
        NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
    );

    let config = build_config(&conn);
    let generator = build_generator(&conn, config);

    let steps = generator
        .generate_route_steps(&job_card_id)
        .await
        .expect("未知结论不应报错");
    assert_eq!(steps.len(), REPAIR_STEPS.len());
}

/// 测试: 多次评估取最新（按评估日期降序）
#[tokio::test]
async fn test_latest_evaluation_wins() {
    let (_temp, _path, conn) = setup_test_db();
    seed_standard_templates(&conn);

    let (design_id, revision_id) = seed_design(
        &conn,
        "PX616M",
        BitType::Pdc,
        Some(BodyMaterial::Matrix),
    );
    let instance_id = seed_instance(
        &conn,
        &design_id,
        drill_bit_routing::domain::types::BitStatus::InRepair,
    );
    let (_wo, job_card_id) = seed_work_order_with_card(
        &conn,
        OrderType::Repair,
        &revision_id,
        Some(&instance_id),
    );

    // 早先轻损，复检升级为重损
    seed_evaluation(
        &conn,
        &job_card_id,
        "MINOR_DAMAGE",
        NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
    );
    seed_evaluation(
        &conn,
        &job_card_id,
        "MAJOR_DAMAGE",
        NaiveDate::from_ymd_opt(2026, 6, 15).unwrap(),
    );

    let config = build_config(&conn);
    let generator = build_generator(&conn, config);

    let steps = generator
        .generate_route_steps(&job_card_id)
        .await
        .expect("生成路线失败");

    // 重损 = 等效重造路线，不排除
    assert_eq!(steps.len(), REPAIR_STEPS.len());
}

/// 测试: 物化冲突 -> 整体回滚，不留半成品路线
#[tokio::test]
async fn test_materialization_failure_leaves_no_partial_route() {
    let (_temp, _path, conn) = setup_test_db();
    seed_standard_templates(&conn);

    let (_design_id, revision_id) = seed_design(
        &conn,
        "PX616S",
        BitType::Pdc,
        Some(BodyMaterial::Steel),
    );
    let (_wo, job_card_id) =
        seed_work_order_with_card(&conn, OrderType::NewBuild, &revision_id, None);

    // 预置一条占用 seq_no=50 的步骤，制造唯一约束冲突
    let step_repo = JobRouteStepRepository::new(conn.clone());
    let conflict = drill_bit_routing::domain::job::JobRouteStep {
        step_id: "CONFLICT".to_string(),
        job_card_id: job_card_id.clone(),
        seq_no: 50,
        process_code: "MANUAL_STEP".to_string(),
        department: None,
        workstation: None,
        estimated_duration_min: None,
        is_mandatory: false,
        status: StepStatus::Pending,
        skip_reason: None,
        actual_start: None,
        actual_end: None,
    };
    step_repo.batch_insert(std::slice::from_ref(&conflict)).unwrap();

    let config = build_config(&conn);
    let generator: drill_bit_routing::engine::RouteGenerator<ConfigManager> =
        build_generator(&conn, config);

    let result = generator.generate_route_steps(&job_card_id).await;
    assert!(result.is_err(), "唯一约束冲突应报错");

    // 整体回滚: 只剩预置的那一条
    let remaining = step_repo.find_by_job_card(&job_card_id).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].step_id, "CONFLICT");
}

/// 测试: 派工卡不存在 -> 报错（区别于模板未命中的软失败）
#[tokio::test]
async fn test_missing_job_card_is_an_error() {
    let (_temp, _path, conn) = setup_test_db();
    seed_standard_templates(&conn);

    let config = build_config(&conn);
    let generator = build_generator(&conn, config);

    let result = generator.generate_route_steps("NO_SUCH_CARD").await;
    assert!(result.is_err());
}
