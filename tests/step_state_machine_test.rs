// ==========================================
// 工序步骤状态机测试
// ==========================================
// 测试范围:
// 1. PENDING -> IN_PROGRESS -> DONE 与 PENDING -> SKIPPED
// 2. 禁止回退；终态不可变
// 3. 实际开工/完工时间戳；单工序进行中属性
// ==========================================


use drill_bit_routing::api::{ApiError, RouteApi};
use drill_bit_routing::domain::types::{BitType, BodyMaterial, OrderType, StepStatus};
use drill_bit_routing::repository::{JobRouteStepRepository, RepositoryError};
use std::sync::Arc;
use test_helpers::*;

/// 准备一张已生成钢体新造路线的派工卡，返回 (RouteApi, job_card_id)
async fn setup_route_api(
    conn: &Arc<std::sync::Mutex<rusqlite::Connection>>,
) -> (
    RouteApi<drill_bit_routing::config::ConfigManager>,
    String,
) {
    seed_standard_templates(conn);

    let (_design_id, revision_id) =
        seed_design(conn, "PX616S", BitType::Pdc, Some(BodyMaterial::Steel));
    let (_wo, job_card_id) =
        seed_work_order_with_card(conn, OrderType::NewBuild, &revision_id, None);

    let config = build_config(conn);
    let generator = Arc::new(build_generator(conn, config.clone()));
    let step_repo = Arc::new(JobRouteStepRepository::new(conn.clone()));
    let api = RouteApi::new(generator, step_repo, config);

    api.generate_route(&job_card_id).await.expect("生成路线失败");
    (api, job_card_id)
}

/// 测试: 正常流转 PENDING -> IN_PROGRESS -> DONE，时间戳落库
#[tokio::test]
async fn test_start_then_complete_records_timestamps() {
    let (_temp, _path, conn) = setup_test_db();
    let (api, job_card_id) = setup_route_api(&conn).await;

    let steps = api.list_steps(&job_card_id).unwrap();
    let first = &steps[0];

    let started = api.start_step(&first.step_id).await.expect("开工失败");
    assert_eq!(started.status, StepStatus::InProgress);
    assert!(started.actual_start.is_some());
    assert!(started.actual_end.is_none());

    let completed = api.complete_step(&first.step_id).expect("完工失败");
    assert_eq!(completed.status, StepStatus::Done);
    assert!(completed.actual_end.is_some());
    assert!(completed.dwell_minutes().is_some());
}

/// 测试: 人工跳过 PENDING -> SKIPPED，原因必填且落库
#[tokio::test]
async fn test_manual_skip_requires_reason() {
    let (_temp, _path, conn) = setup_test_db();
    let (api, job_card_id) = setup_route_api(&conn).await;

    let steps = api.list_steps(&job_card_id).unwrap();
    let target = &steps[1];

    // 空原因拒绝
    let result = api.skip_step(&target.step_id, "  ", None);
    assert!(matches!(result, Err(ApiError::InvalidInput(_))));

    // 带原因跳过
    let skipped = api
        .skip_step(&target.step_id, "客户指定省略", Some("王工"))
        .expect("跳过失败");
    assert_eq!(skipped.status, StepStatus::Skipped);
    let reason = skipped.skip_reason.unwrap();
    assert!(reason.contains("客户指定省略"));
    assert!(reason.contains("王工"));
}

/// 测试: 非法转换被拦截（含终态不可变）
#[tokio::test]
async fn test_invalid_transitions_rejected() {
    let (_temp, _path, conn) = setup_test_db();
    let (api, job_card_id) = setup_route_api(&conn).await;

    let steps = api.list_steps(&job_card_id).unwrap();
    let step_id = steps[0].step_id.clone();

    // PENDING 不可直接完工
    assert!(matches!(
        api.complete_step(&step_id),
        Err(ApiError::InvalidStateTransition { .. })
    ));

    api.start_step(&step_id).await.unwrap();

    // IN_PROGRESS 不可跳过、不可重复开工
    assert!(matches!(
        api.skip_step(&step_id, "来不及了", None),
        Err(ApiError::InvalidStateTransition { .. })
    ));
    assert!(matches!(
        api.start_step(&step_id).await,
        Err(ApiError::InvalidStateTransition { .. })
    ));

    api.complete_step(&step_id).unwrap();

    // DONE 为终态
    assert!(matches!(
        api.start_step(&step_id).await,
        Err(ApiError::InvalidStateTransition { .. })
    ));
    assert!(matches!(
        api.complete_step(&step_id),
        Err(ApiError::InvalidStateTransition { .. })
    ));
}

/// 测试: 仓储层 WHERE 守卫兜底（绕过 API 直接调用仓储）
#[tokio::test]
async fn test_repository_guard_blocks_backward_transition() {
    let (_temp, _path, conn) = setup_test_db();
    let (api, job_card_id) = setup_route_api(&conn).await;

    let steps = api.list_steps(&job_card_id).unwrap();
    let step_id = steps[0].step_id.clone();

    let step_repo = JobRouteStepRepository::new(conn.clone());
    step_repo.start(&step_id, chrono::Utc::now()).unwrap();
    step_repo.complete(&step_id, chrono::Utc::now()).unwrap();

    // DONE 后再开工: 仓储层直接拒绝
    let result = step_repo.start(&step_id, chrono::Utc::now());
    assert!(matches!(
        result,
        Err(RepositoryError::InvalidStateTransition { .. })
    ));
}

/// 测试: 单工序进行中属性——默认仅告警放行，strict 配置下拦截
#[tokio::test]
async fn test_single_in_progress_soft_then_strict() {
    let (_temp, _path, conn) = setup_test_db();
    let (api, job_card_id) = setup_route_api(&conn).await;

    let steps = api.list_steps(&job_card_id).unwrap();

    // 默认: 第二道工序并行开工仅告警
    api.start_step(&steps[0].step_id).await.expect("第一道开工失败");
    api.start_step(&steps[1].step_id)
        .await
        .expect("默认配置下并行开工应放行");

    // strict: 第三道被拦截
    let config = build_config(&conn);
    config
        .set_config_value("strict_single_in_progress", "1")
        .unwrap();

    let result = api.start_step(&steps[2].step_id).await;
    assert!(matches!(
        result,
        Err(ApiError::ConcurrentStepViolation { .. })
    ));

    // 被拦截的步骤保持 PENDING
    let after = api.list_steps(&job_card_id).unwrap();
    assert_eq!(
        after.iter().find(|s| s.step_id == steps[2].step_id).unwrap().status,
        StepStatus::Pending
    );
}

/// 测试: 步骤不存在
#[tokio::test]
async fn test_missing_step_not_found() {
    let (_temp, _path, conn) = setup_test_db();
    let (api, _job_card_id) = setup_route_api(&conn).await;

    assert!(matches!(
        api.start_step("NO_SUCH_STEP").await,
        Err(ApiError::NotFound(_))
    ));
}
