// ==========================================
// 日志系统初始化
// ==========================================
// 使用 tracing 和 tracing-subscriber
// 支持环境变量配置日志级别，JSON 输出供场馆日志采集
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// 初始化日志系统
///
/// # 环境变量
/// - RUST_LOG: 日志级别过滤器（默认: info）
///   例如: RUST_LOG=debug 或 RUST_LOG=powertrack_engine=trace
/// - POWERTRACK_LOG_JSON: 非空时输出 JSON 行日志
///
/// # 示例
/// ```no_run
/// use powertrack_engine::logging;
/// logging::init();
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // 日志写 stderr，stdout 留给派生视图输出
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(true)
        .with_writer(std::io::stderr);

    let json = std::env::var("POWERTRACK_LOG_JSON").map(|v| !v.is_empty()).unwrap_or(false);
    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = result {
        eprintln!("日志系统已初始化: {}", e);
    }
}

/// 初始化测试环境的日志系统
///
/// 使用更详细的日志级别，重复初始化时静默忽略
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
