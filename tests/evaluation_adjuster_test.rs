// ==========================================
// 评估调整引擎测试
// ==========================================
// 测试范围:
// 1. 报废结论: 非报废路线 PENDING 步骤转 SKIPPED（保留审计）
// 2. 轻损结论: 重制造 PENDING 步骤删除
// 3. 只触碰 PENDING；重复执行幂等；未知结论 fail-open
// ==========================================


use chrono::{NaiveDate, Utc};
use drill_bit_routing::domain::types::{BitStatus, BitType, BodyMaterial, OrderType, StepStatus};
use drill_bit_routing::repository::JobRouteStepRepository;
use test_helpers::*;

/// 准备一张已生成修复路线的派工卡
async fn setup_repair_card(
    conn: &std::sync::Arc<std::sync::Mutex<rusqlite::Connection>>,
) -> String {
    seed_standard_templates(conn);

    let (design_id, revision_id) = seed_design(conn, "PX616M", BitType::Pdc, Some(BodyMaterial::Matrix));
    let instance_id = seed_instance(conn, &design_id, BitStatus::InRepair);
    let (_wo, job_card_id) =
        seed_work_order_with_card(conn, OrderType::Repair, &revision_id, Some(&instance_id));

    let config = build_config(conn);
    let generator = build_generator(conn, config);
    let steps = generator
        .generate_route_steps(&job_card_id)
        .await
        .expect("生成修复路线失败");
    assert_eq!(steps.len(), REPAIR_STEPS.len());

    job_card_id
}

/// 测试: 报废结论 -> 仅报废路线工序保持 PENDING，其余 SKIPPED 且不删除
#[tokio::test]
async fn test_scrap_adjustment_skips_but_preserves_audit() {
    let (_temp, _path, conn) = setup_test_db();
    let job_card_id = setup_repair_card(&conn).await;

    let evaluation = seed_evaluation(
        &conn,
        &job_card_id,
        "SCRAP",
        NaiveDate::from_ymd_opt(2026, 7, 10).unwrap(),
    );

    let adjuster = build_adjuster(&conn);
    let result = adjuster
        .adjust_route_after_evaluation(&job_card_id, &evaluation)
        .expect("调整失败");

    assert_eq!(result.deleted_count, 0);
    assert_eq!(result.skipped_count, REPAIR_STEPS.len() - 3);

    // 步骤总数不变（审计保留）
    let step_repo = JobRouteStepRepository::new(conn.clone());
    let all = step_repo.find_by_job_card(&job_card_id).unwrap();
    assert_eq!(all.len(), REPAIR_STEPS.len());

    for step in &all {
        match step.process_code.as_str() {
            "EVALUATION" | "SCRAP_DOCUMENTATION" | "FINAL_QC" => {
                assert_eq!(step.status, StepStatus::Pending, "{}", step.process_code);
            }
            _ => {
                assert_eq!(step.status, StepStatus::Skipped, "{}", step.process_code);
                assert!(step.skip_reason.as_deref().unwrap_or("").contains("报废"));
            }
        }
    }
}

/// 测试: 轻损结论 -> 重制造 PENDING 步骤被整体删除
#[tokio::test]
async fn test_minor_damage_deletes_heavy_steps() {
    let (_temp, _path, conn) = setup_test_db();
    let job_card_id = setup_repair_card(&conn).await;

    let evaluation = seed_evaluation(
        &conn,
        &job_card_id,
        "MINOR_DAMAGE",
        NaiveDate::from_ymd_opt(2026, 7, 10).unwrap(),
    );

    let adjuster = build_adjuster(&conn);
    let result = adjuster
        .adjust_route_after_evaluation(&job_card_id, &evaluation)
        .expect("调整失败");

    // 修复模板中的重制造工序: MACHINING + MAJOR_WELD
    assert_eq!(result.deleted_count, 2);
    assert_eq!(result.skipped_count, 0);

    let step_repo = JobRouteStepRepository::new(conn.clone());
    let all = step_repo.find_by_job_card(&job_card_id).unwrap();
    assert_eq!(all.len(), REPAIR_STEPS.len() - 2);

    let codes: Vec<&str> = all.iter().map(|s| s.process_code.as_str()).collect();
    assert!(!codes.contains(&"MACHINING"));
    assert!(!codes.contains(&"MAJOR_WELD"));

    // 非重制造步骤保持 PENDING 不动
    assert!(all.iter().all(|s| s.status == StepStatus::Pending));
}

/// 测试: 已开工/完工步骤不可触碰
#[tokio::test]
async fn test_non_pending_steps_are_immutable() {
    let (_temp, _path, conn) = setup_test_db();
    let job_card_id = setup_repair_card(&conn).await;

    // MACHINING 开工并完工; MAJOR_WELD 开工
    let step_repo = JobRouteStepRepository::new(conn.clone());
    let steps = step_repo.find_by_job_card(&job_card_id).unwrap();
    let machining = steps.iter().find(|s| s.process_code == "MACHINING").unwrap();
    let major_weld = steps.iter().find(|s| s.process_code == "MAJOR_WELD").unwrap();

    step_repo.start(&machining.step_id, Utc::now()).unwrap();
    step_repo.complete(&machining.step_id, Utc::now()).unwrap();
    step_repo.start(&major_weld.step_id, Utc::now()).unwrap();

    let evaluation = seed_evaluation(
        &conn,
        &job_card_id,
        "MINOR_DAMAGE",
        NaiveDate::from_ymd_opt(2026, 7, 10).unwrap(),
    );

    let adjuster = build_adjuster(&conn);
    let result = adjuster
        .adjust_route_after_evaluation(&job_card_id, &evaluation)
        .expect("调整失败");

    // 两道重制造工序均已离开 PENDING，删除数为 0
    assert_eq!(result.deleted_count, 0);

    let after = step_repo.find_by_job_card(&job_card_id).unwrap();
    assert_eq!(after.len(), REPAIR_STEPS.len());
    assert!(after
        .iter()
        .any(|s| s.process_code == "MACHINING" && s.status == StepStatus::Done));
    assert!(after
        .iter()
        .any(|s| s.process_code == "MAJOR_WELD" && s.status == StepStatus::InProgress));
}

/// 测试: 同一评估重复执行 -> 幂等，无增量改动
#[tokio::test]
async fn test_adjustment_is_idempotent_per_condition() {
    let (_temp, _path, conn) = setup_test_db();
    let job_card_id = setup_repair_card(&conn).await;

    let evaluation = seed_evaluation(
        &conn,
        &job_card_id,
        "SCRAP",
        NaiveDate::from_ymd_opt(2026, 7, 10).unwrap(),
    );

    let adjuster = build_adjuster(&conn);
    let first = adjuster
        .adjust_route_after_evaluation(&job_card_id, &evaluation)
        .expect("第一次调整失败");
    assert!(first.skipped_count > 0);

    let second = adjuster
        .adjust_route_after_evaluation(&job_card_id, &evaluation)
        .expect("第二次调整失败");
    assert_eq!(second.skipped_count, 0);
    assert_eq!(second.deleted_count, 0);
}

/// 测试: 可复用/重损结论 -> 不做任何改动
#[tokio::test]
async fn test_serviceable_and_major_damage_do_not_mutate() {
    let (_temp, _path, conn) = setup_test_db();
    let job_card_id = setup_repair_card(&conn).await;

    let adjuster = build_adjuster(&conn);
    let step_repo = JobRouteStepRepository::new(conn.clone());

    for condition in ["SERVICEABLE", "MAJOR_DAMAGE"] {
        let evaluation = seed_evaluation(
            &conn,
            &job_card_id,
            condition,
            NaiveDate::from_ymd_opt(2026, 7, 10).unwrap(),
        );

        let result = adjuster
            .adjust_route_after_evaluation(&job_card_id, &evaluation)
            .expect("调整失败");
        assert_eq!(result.skipped_count, 0);
        assert_eq!(result.deleted_count, 0);

        let all = step_repo.find_by_job_card(&job_card_id).unwrap();
        assert_eq!(all.len(), REPAIR_STEPS.len());
        assert!(all.iter().all(|s| s.status == StepStatus::Pending));
    }
}

/// 测试: 未识别结论 -> fail-open，不做改动
#[tokio::test]
async fn test_unknown_condition_leaves_route_untouched() {
    let (_temp, _path, conn) = setup_test_db();
    let job_card_id = setup_repair_card(&conn).await;

    let evaluation = seed_evaluation(
        &conn,
        &job_card_id,
        "BEYOND_ECONOMIC_REPAIR",
        NaiveDate::from_ymd_opt(2026, 7, 10).unwrap(),
    );

    let adjuster = build_adjuster(&conn);
    let result = adjuster
        .adjust_route_after_evaluation(&job_card_id, &evaluation)
        .expect("未知结论不应报错");

    assert_eq!(result.skipped_count, 0);
    assert_eq!(result.deleted_count, 0);

    let step_repo = JobRouteStepRepository::new(conn.clone());
    let all = step_repo.find_by_job_card(&job_card_id).unwrap();
    assert!(all.iter().all(|s| s.status == StepStatus::Pending));
}
