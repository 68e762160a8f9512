// ==========================================
// 路线重生成测试
// ==========================================
// 测试范围:
// 1. 幂等: 连续两次重生成与一次结果一致
// 2. 只删 PENDING；已开工/完工步骤及其顺序号不受影响
// 3. 重生成吸收最新评估结论
// ==========================================


use chrono::{NaiveDate, Utc};
use drill_bit_routing::domain::types::{BitStatus, BitType, BodyMaterial, OrderType, StepStatus};
use drill_bit_routing::repository::JobRouteStepRepository;
use test_helpers::*;

/// 步骤集指纹: (seq_no, process_code, status) 列表
fn fingerprint(steps: &[drill_bit_routing::domain::job::JobRouteStep]) -> Vec<(i32, String, StepStatus)> {
    steps
        .iter()
        .map(|s| (s.seq_no, s.process_code.clone(), s.status))
        .collect()
}

/// 测试: 无中间状态变化时，重生成两次与一次结果一致
#[tokio::test]
async fn test_regeneration_is_idempotent() {
    let (_temp, _path, conn) = setup_test_db();
    seed_standard_templates(&conn);

    let (_design_id, revision_id) =
        seed_design(&conn, "PX616S", BitType::Pdc, Some(BodyMaterial::Steel));
    let (_wo, job_card_id) =
        seed_work_order_with_card(&conn, OrderType::NewBuild, &revision_id, None);

    let config = build_config(&conn);
    let generator = build_generator(&conn, config);

    generator.generate_route_steps(&job_card_id).await.unwrap();

    let once = generator
        .regenerate_route_steps(&job_card_id)
        .await
        .expect("第一次重生成失败");
    let twice = generator
        .regenerate_route_steps(&job_card_id)
        .await
        .expect("第二次重生成失败");

    assert_eq!(fingerprint(&once), fingerprint(&twice));
    assert_eq!(once.len(), STEEL_NEW_BUILD_STEPS.len());
}

/// 测试: 已完工步骤在重生成后保留，且其顺序号不被重复物化
#[tokio::test]
async fn test_regeneration_preserves_non_pending_steps() {
    let (_temp, _path, conn) = setup_test_db();
    seed_standard_templates(&conn);

    let (_design_id, revision_id) =
        seed_design(&conn, "PX616S", BitType::Pdc, Some(BodyMaterial::Steel));
    let (_wo, job_card_id) =
        seed_work_order_with_card(&conn, OrderType::NewBuild, &revision_id, None);

    let config = build_config(&conn);
    let generator = build_generator(&conn, config);
    let step_repo = JobRouteStepRepository::new(conn.clone());

    let steps = generator.generate_route_steps(&job_card_id).await.unwrap();

    // 第一道完工，第二道开工
    step_repo.start(&steps[0].step_id, Utc::now()).unwrap();
    step_repo.complete(&steps[0].step_id, Utc::now()).unwrap();
    step_repo.start(&steps[1].step_id, Utc::now()).unwrap();

    let after = generator
        .regenerate_route_steps(&job_card_id)
        .await
        .expect("重生成失败");

    // 总数不变: 两道非 PENDING 保留 + 其余重新物化
    assert_eq!(after.len(), STEEL_NEW_BUILD_STEPS.len());

    // 保留的步骤 step_id 不变
    assert!(after
        .iter()
        .any(|s| s.step_id == steps[0].step_id && s.status == StepStatus::Done));
    assert!(after
        .iter()
        .any(|s| s.step_id == steps[1].step_id && s.status == StepStatus::InProgress));

    // 重新物化的步骤为全新 PENDING 实例
    let pending_count = after.iter().filter(|s| s.status == StepStatus::Pending).count();
    assert_eq!(pending_count, STEEL_NEW_BUILD_STEPS.len() - 2);

    // 顺序号唯一
    let mut seqs: Vec<i32> = after.iter().map(|s| s.seq_no).collect();
    seqs.sort_unstable();
    seqs.dedup();
    assert_eq!(seqs.len(), after.len());
}

/// 测试: 评估录入后重生成 -> 吸收最新结论重新过滤
#[tokio::test]
async fn test_regeneration_applies_latest_evaluation() {
    let (_temp, _path, conn) = setup_test_db();
    seed_standard_templates(&conn);

    let (design_id, revision_id) =
        seed_design(&conn, "PX616M", BitType::Pdc, Some(BodyMaterial::Matrix));
    let instance_id = seed_instance(&conn, &design_id, BitStatus::InRepair);
    let (_wo, job_card_id) =
        seed_work_order_with_card(&conn, OrderType::Repair, &revision_id, Some(&instance_id));

    let config = build_config(&conn);
    let generator = build_generator(&conn, config);

    // 评估前: 全量路线
    let initial = generator.generate_route_steps(&job_card_id).await.unwrap();
    assert_eq!(initial.len(), REPAIR_STEPS.len());

    // 录入轻损评估后重生成: 重制造工序不再物化
    seed_evaluation(
        &conn,
        &job_card_id,
        "MINOR_DAMAGE",
        NaiveDate::from_ymd_opt(2026, 7, 20).unwrap(),
    );

    let after = generator
        .regenerate_route_steps(&job_card_id)
        .await
        .expect("重生成失败");

    let codes: Vec<&str> = after.iter().map(|s| s.process_code.as_str()).collect();
    assert!(!codes.contains(&"MACHINING"));
    assert!(!codes.contains(&"MAJOR_WELD"));
    assert_eq!(after.len(), REPAIR_STEPS.len() - 2);
}

/// 测试: 模板未命中时重生成清空 PENDING 且不报错
#[tokio::test]
async fn test_regeneration_with_template_miss_clears_pending() {
    let (_temp, _path, conn) = setup_test_db();
    seed_standard_templates(&conn);

    let (_design_id, revision_id) =
        seed_design(&conn, "PX616S", BitType::Pdc, Some(BodyMaterial::Steel));
    let (_wo, job_card_id) =
        seed_work_order_with_card(&conn, OrderType::NewBuild, &revision_id, None);

    let config = build_config(&conn);
    let generator = build_generator(&conn, config);
    generator.generate_route_steps(&job_card_id).await.unwrap();

    // 模板停用后重生成: 等价于模板未命中
    let template_repo =
        drill_bit_routing::repository::RouteTemplateRepository::new(conn.clone());
    template_repo.deactivate("T_PDC_STEEL_NEW").unwrap();
    template_repo.deactivate("T_PDC_MATRIX_NEW").unwrap();

    let after = generator
        .regenerate_route_steps(&job_card_id)
        .await
        .expect("模板未命中不应报错");
    assert!(after.is_empty());
}
