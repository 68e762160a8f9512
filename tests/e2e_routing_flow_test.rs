// ==========================================
// 全业务流端到端测试
// ==========================================
// 场景: 一只胎体 PDC 钻头的完整生命线
// 新造(含物耗记录) -> 入役 -> 发运/回厂 -> 第一轮修复(轻损) ->
// 第二轮修复(评估报废) -> 报废处置
// ==========================================


use chrono::{NaiveDate, Utc};
use drill_bit_routing::config::ConfigManager;
use drill_bit_routing::domain::lifecycle::RepairHistory;
use drill_bit_routing::domain::types::{
    BitStatus, BitType, BodyMaterial, OrderType, QualityOutcome, StepStatus,
};
use drill_bit_routing::engine::{
    MaterialVarianceEngine, RoutingEvent, RoutingEventHandler, UnitLifecycleEngine,
};
use drill_bit_routing::repository::{
    ActualBomRepository, ActualCutterRepository, BitInstanceRepository, BomItemRepository,
    CutterLayoutRepository, EvaluationRepository, JobRouteStepRepository,
    RepairHistoryRepository, RoutingEventLogRepository, WorkOrderRepository,
};
use std::sync::{Arc, Mutex};
use test_helpers::*;
use uuid::Uuid;

struct Fixture {
    handler: RoutingEventHandler<ConfigManager>,
    lifecycle: UnitLifecycleEngine<ConfigManager>,
    variance: MaterialVarianceEngine,
    step_repo: JobRouteStepRepository,
}

impl Fixture {
    fn new(conn: Arc<Mutex<rusqlite::Connection>>) -> Self {
        let config = build_config(&conn);

        let handler = RoutingEventHandler::new(
            Arc::new(build_generator(&conn, config.clone())),
            Arc::new(build_adjuster(&conn)),
            Arc::new(EvaluationRepository::new(conn.clone())),
            Arc::new(RoutingEventLogRepository::new(conn.clone())),
        );

        let lifecycle = UnitLifecycleEngine::new(
            Arc::new(BitInstanceRepository::new(conn.clone())),
            Arc::new(RepairHistoryRepository::new(conn.clone())),
            Arc::new(WorkOrderRepository::new(conn.clone())),
            config,
            None,
        );

        let variance = MaterialVarianceEngine::new(
            Arc::new(ActualBomRepository::new(conn.clone())),
            Arc::new(ActualCutterRepository::new(conn.clone())),
            Arc::new(BomItemRepository::new(conn.clone())),
            Arc::new(CutterLayoutRepository::new(conn.clone())),
            None,
        );

        let step_repo = JobRouteStepRepository::new(conn.clone());

        Self {
            handler,
            lifecycle,
            variance,
            step_repo,
        }
    }

    /// 把派工卡上仍为 PENDING 的步骤全部开工并完工
    fn run_all_pending(&self, job_card_id: &str) {
        let pending = self.step_repo.find_pending_by_job_card(job_card_id).unwrap();
        for step in pending {
            self.step_repo.start(&step.step_id, Utc::now()).unwrap();
            self.step_repo.complete(&step.step_id, Utc::now()).unwrap();
        }
    }
}

#[tokio::test]
async fn test_full_bit_lifecycle_flow() {
    let (_temp, _path, conn) = setup_test_db();
    seed_standard_templates(&conn);

    let fixture = Fixture::new(conn.clone());

    // ===== 阶段 1: 产品定义 =====
    let (design_id, revision_id) =
        seed_design(&conn, "PX616M", BitType::Pdc, Some(BodyMaterial::Matrix));
    let (critical_bom_id, _normal_bom_id, position_id) =
        seed_bom_and_layout(&conn, &revision_id).unwrap();

    // ===== 阶段 2: 新造 =====
    let instance_id = seed_instance(&conn, &design_id, BitStatus::InProduction);
    let (build_wo, build_card) = seed_work_order_with_card(
        &conn,
        OrderType::NewBuild,
        &revision_id,
        Some(&instance_id),
    );

    // 派工卡创建事件 -> 生成胎体新造路线
    fixture
        .handler
        .handle(&RoutingEvent::job_card_created(build_card.clone(), None))
        .await
        .unwrap();
    let steps = fixture.step_repo.find_by_job_card(&build_card).unwrap();
    assert_eq!(steps.len(), MATRIX_NEW_BUILD_STEPS.len());

    // 车间执行全部工序
    fixture.run_all_pending(&build_card);
    assert!(fixture
        .step_repo
        .find_by_job_card(&build_card)
        .unwrap()
        .iter()
        .all(|s| s.status == StepStatus::Done));

    // 物耗: 切削齿超耗2片(关键物料，标记复核)，齿位替代安装
    let bom_record = fixture
        .variance
        .record_actual_bom(&build_wo, &critical_bom_id, 62.0, Some("物控员".to_string()))
        .unwrap();
    assert_eq!(bom_record.variance, 2.0);
    assert!(bom_record.flagged_for_review);

    let installation = fixture
        .variance
        .record_cutter_installation(
            &build_wo,
            &position_id,
            "1313",
            "PREMIUM_ABRASION",
            QualityOutcome::Pass,
            Some("装配工".to_string()),
        )
        .unwrap();
    assert!(installation.is_substitution);

    // 新造完工入役
    fixture
        .lifecycle
        .complete_initial_build(&instance_id, &build_wo)
        .unwrap();

    // ===== 阶段 3: 发运与回厂 =====
    fixture.lifecycle.dispatch_to_customer(&instance_id).unwrap();
    fixture.lifecycle.return_from_customer(&instance_id).unwrap();

    // ===== 阶段 4: 第一轮修复（轻损）=====
    assert!(fixture
        .lifecycle
        .can_be_repaired_again(&instance_id)
        .await
        .unwrap());
    fixture.lifecycle.open_repair(&instance_id).await.unwrap();

    let (repair_wo1, repair_card1) = seed_work_order_with_card(
        &conn,
        OrderType::Repair,
        &revision_id,
        Some(&instance_id),
    );
    fixture
        .handler
        .handle(&RoutingEvent::job_card_created(repair_card1.clone(), None))
        .await
        .unwrap();
    assert_eq!(
        fixture.step_repo.find_by_job_card(&repair_card1).unwrap().len(),
        REPAIR_STEPS.len()
    );

    // 评估: 轻度损伤 -> 重制造工序删除
    let evaluation = seed_evaluation(
        &conn,
        &repair_card1,
        "MINOR_DAMAGE",
        NaiveDate::from_ymd_opt(2026, 7, 5).unwrap(),
    );
    fixture
        .handler
        .handle(&RoutingEvent::evaluation_recorded(
            repair_card1.clone(),
            evaluation.evaluation_id.clone(),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(
        fixture.step_repo.find_by_job_card(&repair_card1).unwrap().len(),
        REPAIR_STEPS.len() - 2
    );

    // 执行修复并完工
    fixture.run_all_pending(&repair_card1);
    fixture
        .lifecycle
        .complete_repair(&RepairHistory {
            repair_id: Uuid::new_v4().to_string(),
            instance_id: instance_id.clone(),
            repair_index: 1,
            work_order_id: repair_wo1.clone(),
            hours_on_bottom: Some(210.0),
            footage_drilled_m: Some(1830.0),
            cutters_replaced: 8,
            nozzles_replaced: 1,
            hardfacing_applied: true,
            threads_repaired: true,
            remarks: Some("保径齿局部更换".to_string()),
            created_at: Utc::now(),
        })
        .unwrap();

    let chain = fixture.lifecycle.repair_history_chain(&instance_id).unwrap();
    assert_eq!(chain.len(), 1);
    assert_eq!(chain[0].repair_index, 1);

    // ===== 阶段 5: 第二轮修复（评估报废）=====
    fixture.lifecycle.open_repair(&instance_id).await.unwrap();
    let (_repair_wo2, repair_card2) = seed_work_order_with_card(
        &conn,
        OrderType::Repair,
        &revision_id,
        Some(&instance_id),
    );
    fixture
        .handler
        .handle(&RoutingEvent::job_card_created(repair_card2.clone(), None))
        .await
        .unwrap();

    let evaluation = seed_evaluation(
        &conn,
        &repair_card2,
        "SCRAP",
        NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
    );
    fixture
        .handler
        .handle(&RoutingEvent::evaluation_recorded(
            repair_card2.clone(),
            evaluation.evaluation_id.clone(),
            None,
        ))
        .await
        .unwrap();

    // 报废调整: 仅报废路线工序保持 PENDING，其余 SKIPPED
    let steps = fixture.step_repo.find_by_job_card(&repair_card2).unwrap();
    assert_eq!(steps.len(), REPAIR_STEPS.len());
    for step in &steps {
        match step.process_code.as_str() {
            "EVALUATION" | "SCRAP_DOCUMENTATION" | "FINAL_QC" => {
                assert_eq!(step.status, StepStatus::Pending)
            }
            _ => assert_eq!(step.status, StepStatus::Skipped),
        }
    }

    // 走完报废文档流程后报废处置
    fixture.run_all_pending(&repair_card2);
    fixture.lifecycle.scrap(&instance_id).unwrap();

    // ===== 终态校验 =====
    let instance_repo = BitInstanceRepository::new(conn.clone());
    let instance = instance_repo.find_by_id(&instance_id).unwrap().unwrap();
    assert_eq!(instance.status, BitStatus::Scrap);
    assert_eq!(instance.current_repair_index, 1);
    assert!(!fixture
        .lifecycle
        .can_be_repaired_again(&instance_id)
        .await
        .unwrap());

    // 履历链仍完整可查
    let chain = fixture.lifecycle.repair_history_chain(&instance_id).unwrap();
    assert_eq!(chain.len(), 1);
}
