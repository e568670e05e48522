// ==========================================
// 力量举试举追踪引擎 - API层错误类型
// ==========================================
// 职责: 将引擎/队列/配置错误转换为调用方可展示的错误
// 红线: 所有错误均为单次请求级别，可由调用方修正后重试
// ==========================================

use crate::config::ConfigError;
use crate::engine::error::EngineError;
use crate::services::FeedError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 变更被拒绝 (状态不变)
    // ==========================================
    #[error("申报无效: {0}")]
    InvalidDeclaration(String),

    #[error("重复判定: {0}")]
    AlreadyDecided(String),

    // ==========================================
    // 配片
    // ==========================================
    /// 无法精确配出，附目标重量与缺口供展示
    #[error("无法精确配重: target={target_weight}, residual={residual} ({reason})")]
    Infeasible {
        target_weight: f64,
        residual: f64,
        reason: String,
    },

    // ==========================================
    // 查询错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    // ==========================================
    // 队列与配置
    // ==========================================
    #[error("更新队列已关闭")]
    QueueClosed,

    #[error("更新队列已满")]
    QueueFull,

    #[error("配置错误: {0}")]
    Config(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 EngineError 转换
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            e @ EngineError::InvalidDeclaration { .. } => ApiError::InvalidDeclaration(e.to_string()),
            e @ EngineError::AlreadyDecided { .. } => ApiError::AlreadyDecided(e.to_string()),
            EngineError::Infeasible {
                target_weight,
                residual,
                reason,
            } => ApiError::Infeasible {
                target_weight,
                residual,
                reason,
            },
            EngineError::LifterNotFound(id) => ApiError::NotFound(format!("运动员(id={})不存在", id)),
            e @ EngineError::InvalidAttemptNumber(_) => ApiError::InvalidInput(e.to_string()),
            EngineError::InvalidInput(msg) => ApiError::InvalidInput(msg),
        }
    }
}

impl From<FeedError> for ApiError {
    fn from(err: FeedError) -> Self {
        match err {
            FeedError::QueueClosed => ApiError::QueueClosed,
            FeedError::QueueFull => ApiError::QueueFull,
            FeedError::Rejected(e) => e.into(),
            FeedError::WriterFailed(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::Config(err.to_string())
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{Discipline, Outcome};

    #[test]
    fn test_engine_error_mapping() {
        let err: ApiError = EngineError::AlreadyDecided {
            lifter_id: "L1".to_string(),
            discipline: Discipline::Bench,
            attempt_no: 2,
            existing: Outcome::Good,
        }
        .into();
        assert!(matches!(err, ApiError::AlreadyDecided(msg) if msg.contains("L1")));

        let err: ApiError = EngineError::LifterNotFound("L9".to_string()).into();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn test_infeasible_keeps_residual() {
        let err: ApiError = EngineError::Infeasible {
            target_weight: 140.2,
            residual: 0.2,
            reason: "x".to_string(),
        }
        .into();
        match err {
            ApiError::Infeasible { target_weight, residual, .. } => {
                assert_eq!(target_weight, 140.2);
                assert_eq!(residual, 0.2);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_feed_error_mapping() {
        assert!(matches!(ApiError::from(FeedError::QueueClosed), ApiError::QueueClosed));
        let rejected = FeedError::Rejected(EngineError::InvalidAttemptNumber(4));
        assert!(matches!(ApiError::from(rejected), ApiError::InvalidInput(_)));
    }
}
