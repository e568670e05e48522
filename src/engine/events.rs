// ==========================================
// 力量举试举追踪引擎 - 比赛事件发布
// ==========================================
// 职责: 定义比赛事件与发布 trait，实现依赖倒置
// 说明: 写入任务每提交一条更新发布一个事件，下游 (看板/提醒) 自行实现发布者
// 红线: 发布失败只记日志，不回滚已提交的快照
// ==========================================

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

// ==========================================
// 比赛事件类型
// ==========================================

/// 比赛事件触发类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeetEventType {
    /// 新运动员登记
    LifterRegistered,
    /// 申报重量变更
    DeclarationRecorded,
    /// 判定结果录入
    OutcomeRecorded,
    /// 台位/组别/热身架变更
    LifterReassigned,
}

impl MeetEventType {
    /// 转换为字符串标识
    pub fn as_str(&self) -> &str {
        match self {
            MeetEventType::LifterRegistered => "LifterRegistered",
            MeetEventType::DeclarationRecorded => "DeclarationRecorded",
            MeetEventType::OutcomeRecorded => "OutcomeRecorded",
            MeetEventType::LifterReassigned => "LifterReassigned",
        }
    }
}

/// 比赛事件
///
/// 携带提交后的快照版本与受影响台位，下游据此决定刷新范围
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetEvent {
    pub event_id: String,
    pub meet_id: String,
    /// 提交后的快照版本
    pub version: u64,
    /// 触发事件的更新序号
    pub seq: u64,
    pub event_type: MeetEventType,
    pub lifter_id: String,
    /// 修订号发生变化的台位
    pub affected_platforms: Vec<String>,
}

impl MeetEvent {
    pub fn new(
        meet_id: impl Into<String>,
        version: u64,
        seq: u64,
        event_type: MeetEventType,
        lifter_id: impl Into<String>,
        affected_platforms: Vec<String>,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            meet_id: meet_id.into(),
            version,
            seq,
            event_type,
            lifter_id: lifter_id.into(),
            affected_platforms,
        }
    }
}

// ==========================================
// 事件发布 Trait
// ==========================================

/// 比赛事件发布者 Trait
///
/// # 实现说明
/// - 在写入任务中同步调用，实现应尽快返回 (如转投到自己的通道)
pub trait MeetEventPublisher: Send + Sync {
    /// 发布比赛事件
    ///
    /// # 返回
    /// - `Ok(id)`: 下游分配的 ID 或空字符串
    /// - `Err`: 发布失败
    fn publish(&self, event: MeetEvent) -> Result<String, Box<dyn Error + Send + Sync>>;
}

/// 空操作事件发布者
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

impl MeetEventPublisher for NoOpEventPublisher {
    fn publish(&self, event: MeetEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            "NoOpEventPublisher: 跳过事件发布 - version={}, event_type={}",
            event.version,
            event.event_type.as_str()
        );
        Ok(String::new())
    }
}

/// 可选的事件发布者包装
pub struct OptionalEventPublisher {
    inner: Option<Arc<dyn MeetEventPublisher>>,
}

impl OptionalEventPublisher {
    pub fn with_publisher(publisher: Arc<dyn MeetEventPublisher>) -> Self {
        Self {
            inner: Some(publisher),
        }
    }

    pub fn none() -> Self {
        Self { inner: None }
    }

    /// 发布事件（如果有发布者）
    pub fn publish(&self, event: MeetEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
        match &self.inner {
            Some(publisher) => publisher.publish(event),
            None => {
                tracing::debug!(
                    "OptionalEventPublisher: 未配置发布者，跳过事件 - version={}, event_type={}",
                    event.version,
                    event.event_type.as_str()
                );
                Ok(String::new())
            }
        }
    }

    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

impl Default for OptionalEventPublisher {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recording(Mutex<Vec<MeetEvent>>);

    impl MeetEventPublisher for Recording {
        fn publish(&self, event: MeetEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
            let id = event.event_id.clone();
            self.0.lock().unwrap().push(event);
            Ok(id)
        }
    }

    fn event() -> MeetEvent {
        MeetEvent::new("M1", 3, 7, MeetEventType::OutcomeRecorded, "L1", vec!["A".to_string()])
    }

    #[test]
    fn test_event_ids_are_unique() {
        assert_ne!(event().event_id, event().event_id);
    }

    #[test]
    fn test_noop_publisher() {
        let result = NoOpEventPublisher.publish(event());
        assert!(result.unwrap().is_empty());
    }

    #[test]
    fn test_optional_publisher_none() {
        let publisher = OptionalEventPublisher::none();
        assert!(!publisher.is_configured());
        assert!(publisher.publish(event()).is_ok());
    }

    #[test]
    fn test_optional_publisher_forwards() {
        let recording = Arc::new(Recording(Mutex::new(Vec::new())));
        let publisher = OptionalEventPublisher::with_publisher(recording.clone());
        assert!(publisher.is_configured());

        let id = publisher.publish(event()).unwrap();
        let events = recording.0.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_id, id);
        assert_eq!(events[0].event_type.as_str(), "OutcomeRecorded");
    }
}
