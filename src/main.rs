// ==========================================
// 力量举试举追踪引擎 - 命令行入口
// ==========================================
// 用法: powertrack-engine [updates.jsonl] [config.db]
// - updates.jsonl: 每行一条 AttemptUpdate (缺省读 stdin)
// - config.db: 含 config_kv 表的 SQLite 文件 (缺省使用默认配置)
// 输出: stdout 打印全部台位队列、倒计时与热身批次 (JSON)
// ==========================================

use anyhow::Context;
use powertrack_engine::api::MeetApi;
use powertrack_engine::config::{ConfigManager, EngineConfig, EngineConfigReader};
use powertrack_engine::domain::{AttemptUpdate, MeetState};
use powertrack_engine::engine::OptionalEventPublisher;
use powertrack_engine::services::{FeedStatsSnapshot, UpdateQueue};
use powertrack_engine::{logging, APP_NAME, VERSION};
use serde_json::json;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} v{}", APP_NAME, VERSION);
    tracing::info!("==================================================");

    let mut args = std::env::args().skip(1);
    let updates_path = args.next().filter(|p| p != "-");
    let config_path = args.next();

    let config = load_config(config_path.as_deref()).await?;

    let meet_id = updates_path
        .as_deref()
        .and_then(|p| std::path::Path::new(p).file_stem())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "MEET".to_string());

    let queue = UpdateQueue::start(
        MeetState::new(meet_id, config.pace.clone()),
        config.feed.queue_capacity,
        OptionalEventPublisher::none(),
    );

    let malformed = match &updates_path {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("无法打开更新文件: {}", path))?;
            feed_lines(BufReader::new(file), &queue).await?
        }
        None => feed_lines(BufReader::new(tokio::io::stdin()), &queue).await?,
    };

    let store = queue.store();
    let stats_handle = queue.stats_handle();
    let final_snapshot = queue.shutdown().await?;
    let stats = stats_handle.snapshot();
    tracing::info!(version = final_snapshot.version(), malformed, "数据源回放完成");

    let api = MeetApi::new(store, config);
    let report = build_report(&api, &final_snapshot, stats, malformed)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// 汇总回放结果: 各台队列、倒计时、热身批次与数据源计数
fn build_report(
    api: &MeetApi,
    final_snapshot: &MeetState,
    stats: FeedStatsSnapshot,
    malformed: u64,
) -> anyhow::Result<serde_json::Value> {
    Ok(json!({
        "app": APP_NAME,
        "version": VERSION,
        "meet_id": final_snapshot.meet_id(),
        "snapshot_version": final_snapshot.version(),
        "feed": {
            "applied": stats.applied,
            "unchanged": stats.unchanged,
            "stale": stats.stale,
            "rejected": stats.rejected,
            "malformed": malformed,
        },
        "platforms": api.get_all_platform_queues()?,
        "countdowns": api.get_all_countdowns()?,
        "waves": api.get_all_waves(),
    }))
}

async fn load_config(path: Option<&str>) -> anyhow::Result<EngineConfig> {
    match path {
        Some(path) => {
            let manager = ConfigManager::new(path).with_context(|| format!("无法打开配置库: {}", path))?;
            let overrides = EngineConfigReader::get_config_snapshot(&manager).await?;
            tracing::debug!(%overrides, "配置覆写项");
            Ok(EngineConfigReader::load_engine_config(&manager).await?)
        }
        None => Ok(EngineConfig::default()),
    }
}

/// 逐行解析并入队，返回无法解析的行数
async fn feed_lines<R>(reader: R, queue: &UpdateQueue) -> anyhow::Result<u64>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut malformed = 0u64;
    let mut line_no = 0u64;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<AttemptUpdate>(line) {
            Ok(update) => queue.submit(update).await?,
            Err(e) => {
                malformed += 1;
                tracing::warn!(line_no, error = %e, "跳过无法解析的更新");
            }
        }
    }
    Ok(malformed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use powertrack_engine::config::PaceConfig;
    use powertrack_engine::domain::Discipline;

    fn squat(seq: u64, lifter_id: &str, platform: &str) -> AttemptUpdate {
        AttemptUpdate::new(seq, lifter_id, Discipline::Squat, 1, platform, "1")
    }

    #[tokio::test]
    async fn test_report_serializes_every_platform() {
        let queue = UpdateQueue::start(
            MeetState::new("REPORT_MEET", PaceConfig::default()),
            8,
            OptionalEventPublisher::none(),
        );
        queue.submit(squat(1, "A1", "A").lot(1).declare(100.0)).await.unwrap();
        queue.submit(squat(2, "B1", "B").lot(1).declare(90.0).rack("R1")).await.unwrap();
        queue.submit(squat(3, "A2", "A").lot(2).declare(95.0).rack("R1")).await.unwrap();

        let store = queue.store();
        let stats_handle = queue.stats_handle();
        let final_snapshot = queue.shutdown().await.unwrap();
        let api = MeetApi::new(store, EngineConfig::default());

        let report = build_report(&api, &final_snapshot, stats_handle.snapshot(), 2).unwrap();

        assert_eq!(report["meet_id"], "REPORT_MEET");
        assert_eq!(report["feed"]["applied"], 3);
        assert_eq!(report["feed"]["malformed"], 2);
        assert_eq!(report["platforms"]["A"]["platform_id"], "A");
        assert_eq!(report["platforms"]["B"]["platform_id"], "B");
        assert_eq!(report["countdowns"].as_array().unwrap().len(), 3);
        assert_eq!(report["waves"].as_array().unwrap().len(), 1);

        let text = serde_json::to_string_pretty(&report).unwrap();
        assert!(text.contains("REPORT_MEET"));
    }
}
