// ==========================================
// 钻头制造执行系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为，避免"部分模块外键开启/部分不开启"
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 内嵌 schema 初始化，供二进制入口与测试共用
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要"每个连接"单独开启
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 初始化数据库 schema（幂等）
///
/// 表分组:
/// - 产品定义: bit_design / design_revision / bom_item / cutter_layout_position
/// - 路线目录: route_template / route_step_template
/// - 工单派工: work_order / job_card / job_route_step
/// - 评估接口: evaluation_summary
/// - 实物生命周期: bit_instance / repair_history
/// - 物耗差异: actual_bom / actual_cutter_installation
/// - 基础设施: schema_version / config_scope / config_kv / routing_event_log
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_scope (
            scope_id TEXT PRIMARY KEY,
            scope_type TEXT NOT NULL,
            scope_key TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(scope_type, scope_key)
        );

        INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key)
        VALUES ('global', 'GLOBAL', 'global');

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL REFERENCES config_scope(scope_id) ON DELETE CASCADE,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS bit_design (
            design_id TEXT PRIMARY KEY,
            design_code TEXT NOT NULL UNIQUE,
            bit_type TEXT NOT NULL,
            body_material TEXT,
            size_inch REAL NOT NULL,
            blade_count INTEGER,
            nozzle_count INTEGER,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS design_revision (
            revision_id TEXT PRIMARY KEY,
            design_id TEXT NOT NULL REFERENCES bit_design(design_id) ON DELETE CASCADE,
            revision_no INTEGER NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 0,
            effective_from TEXT,
            effective_to TEXT,
            released_by TEXT,
            created_at TEXT NOT NULL,
            UNIQUE(design_id, revision_no)
        );

        CREATE TABLE IF NOT EXISTS bom_item (
            bom_item_id TEXT PRIMARY KEY,
            revision_id TEXT NOT NULL REFERENCES design_revision(revision_id) ON DELETE CASCADE,
            item_type TEXT NOT NULL,
            part_number TEXT NOT NULL,
            quantity REAL NOT NULL,
            unit TEXT NOT NULL,
            is_critical INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS cutter_layout_position (
            position_id TEXT PRIMARY KEY,
            revision_id TEXT NOT NULL REFERENCES design_revision(revision_id) ON DELETE CASCADE,
            blade_no INTEGER NOT NULL,
            row_no INTEGER NOT NULL,
            position_no INTEGER NOT NULL,
            zone TEXT NOT NULL,
            planned_cutter_size TEXT NOT NULL,
            planned_cutter_type TEXT NOT NULL,
            UNIQUE(revision_id, blade_no, row_no, position_no)
        );

        CREATE TABLE IF NOT EXISTS route_template (
            template_id TEXT PRIMARY KEY,
            template_name TEXT NOT NULL,
            bit_type TEXT NOT NULL,
            body_material TEXT,
            order_type TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS route_step_template (
            step_template_id TEXT PRIMARY KEY,
            template_id TEXT NOT NULL REFERENCES route_template(template_id) ON DELETE CASCADE,
            seq_no INTEGER NOT NULL,
            process_code TEXT NOT NULL,
            default_department TEXT,
            default_workstation TEXT,
            estimated_duration_min INTEGER,
            is_mandatory INTEGER NOT NULL DEFAULT 1,
            UNIQUE(template_id, seq_no)
        );

        CREATE TABLE IF NOT EXISTS bit_instance (
            instance_id TEXT PRIMARY KEY,
            serial_no TEXT NOT NULL UNIQUE,
            design_id TEXT NOT NULL REFERENCES bit_design(design_id),
            status TEXT NOT NULL,
            current_repair_index INTEGER NOT NULL DEFAULT 0,
            initial_work_order_id TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS work_order (
            work_order_id TEXT PRIMARY KEY,
            order_no TEXT NOT NULL UNIQUE,
            order_type TEXT NOT NULL,
            revision_id TEXT NOT NULL REFERENCES design_revision(revision_id),
            instance_id TEXT REFERENCES bit_instance(instance_id),
            status TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS job_card (
            job_card_id TEXT PRIMARY KEY,
            work_order_id TEXT NOT NULL REFERENCES work_order(work_order_id) ON DELETE CASCADE,
            card_no TEXT NOT NULL UNIQUE,
            dispatched_by TEXT,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS job_route_step (
            step_id TEXT PRIMARY KEY,
            job_card_id TEXT NOT NULL REFERENCES job_card(job_card_id) ON DELETE CASCADE,
            seq_no INTEGER NOT NULL,
            process_code TEXT NOT NULL,
            department TEXT,
            workstation TEXT,
            estimated_duration_min INTEGER,
            is_mandatory INTEGER NOT NULL DEFAULT 1,
            status TEXT NOT NULL,
            skip_reason TEXT,
            actual_start TEXT,
            actual_end TEXT,
            UNIQUE(job_card_id, seq_no)
        );

        CREATE TABLE IF NOT EXISTS evaluation_summary (
            evaluation_id TEXT PRIMARY KEY,
            job_card_id TEXT NOT NULL REFERENCES job_card(job_card_id) ON DELETE CASCADE,
            evaluation_date TEXT NOT NULL,
            overall_condition TEXT NOT NULL,
            evaluated_by TEXT,
            remarks TEXT,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS repair_history (
            repair_id TEXT PRIMARY KEY,
            instance_id TEXT NOT NULL REFERENCES bit_instance(instance_id) ON DELETE CASCADE,
            repair_index INTEGER NOT NULL,
            work_order_id TEXT NOT NULL REFERENCES work_order(work_order_id),
            hours_on_bottom REAL,
            footage_drilled_m REAL,
            cutters_replaced INTEGER NOT NULL DEFAULT 0,
            nozzles_replaced INTEGER NOT NULL DEFAULT 0,
            hardfacing_applied INTEGER NOT NULL DEFAULT 0,
            threads_repaired INTEGER NOT NULL DEFAULT 0,
            remarks TEXT,
            created_at TEXT NOT NULL,
            UNIQUE(instance_id, repair_index)
        );

        CREATE TABLE IF NOT EXISTS actual_bom (
            work_order_id TEXT NOT NULL REFERENCES work_order(work_order_id) ON DELETE CASCADE,
            bom_item_id TEXT NOT NULL REFERENCES bom_item(bom_item_id),
            planned_quantity REAL NOT NULL,
            actual_quantity REAL NOT NULL,
            recorded_by TEXT,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (work_order_id, bom_item_id)
        );

        CREATE TABLE IF NOT EXISTS actual_cutter_installation (
            installation_id TEXT PRIMARY KEY,
            work_order_id TEXT NOT NULL REFERENCES work_order(work_order_id) ON DELETE CASCADE,
            position_id TEXT NOT NULL REFERENCES cutter_layout_position(position_id),
            actual_cutter_size TEXT NOT NULL,
            actual_cutter_type TEXT NOT NULL,
            is_substitution INTEGER NOT NULL DEFAULT 0,
            quality_outcome TEXT NOT NULL,
            installed_by TEXT,
            installed_at TEXT NOT NULL,
            UNIQUE(work_order_id, position_id)
        );

        CREATE TABLE IF NOT EXISTS routing_event_log (
            event_id TEXT PRIMARY KEY,
            event_type TEXT NOT NULL,
            job_card_id TEXT,
            payload_json TEXT,
            status TEXT NOT NULL,
            error_message TEXT,
            received_at TEXT NOT NULL,
            processed_at TEXT
        );

        INSERT OR IGNORE INTO schema_version (version) VALUES (1);
        "#,
    )?;

    Ok(())
}
