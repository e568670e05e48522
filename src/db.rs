// ==========================================
// 力量举试举追踪引擎 - SQLite 连接初始化
// ==========================================
// 用途: 仅承载 config_kv 配置表，比赛快照不落库
// 目标: 统一所有 Connection::open 的 PRAGMA 行为
// ==========================================

use rusqlite::Connection;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// busy_timeout 需要每个连接单独配置
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

/// 确保 config_kv 表存在 (幂等)
pub fn ensure_config_table(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );",
    )
}
