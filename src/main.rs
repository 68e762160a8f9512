// ==========================================
// 钻头制造执行系统 - 引擎入口
// ==========================================
// 职责: 初始化日志/数据库/默认配置，供宿主进程挂载引擎
// 用法: drill-bit-routing [db_path]
// ==========================================

use drill_bit_routing::config::ConfigManager;
use drill_bit_routing::{db, logging};
use std::sync::{Arc, Mutex};

/// 解析数据库路径: 命令行参数 > 系统数据目录 > 当前目录
fn resolve_db_path() -> String {
    if let Some(path) = std::env::args().nth(1) {
        return path;
    }

    match dirs::data_dir() {
        Some(dir) => dir
            .join("drill-bit-routing")
            .join("routing.db")
            .to_string_lossy()
            .to_string(),
        None => "./routing.db".to_string(),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志系统
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", drill_bit_routing::APP_NAME);
    tracing::info!("系统版本: {}", drill_bit_routing::VERSION);
    tracing::info!("==================================================");

    // 解析并准备数据库路径
    let db_path = resolve_db_path();
    if let Some(parent) = std::path::Path::new(&db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    tracing::info!("使用数据库: {}", db_path);

    // 打开连接并初始化 schema
    let conn = db::open_sqlite_connection(&db_path)?;
    db::init_schema(&conn)?;

    match db::read_schema_version(&conn)? {
        Some(version) if version == db::CURRENT_SCHEMA_VERSION => {
            tracing::info!("schema_version={} (最新)", version);
        }
        Some(version) => {
            tracing::warn!(
                "schema_version={} 与代码期望({})不一致，请检查迁移",
                version,
                db::CURRENT_SCHEMA_VERSION
            );
        }
        None => {
            tracing::warn!("schema_version 表缺失，数据库可能未正确初始化");
        }
    }

    // 补齐默认配置
    let config = ConfigManager::from_connection(Arc::new(Mutex::new(conn)))?;
    config.seed_defaults()?;

    tracing::info!("数据库初始化完成，引擎就绪");
    Ok(())
}
