// ==========================================
// 力量举试举追踪引擎 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 所有失败均为单次请求级别，可由调用方修正输入后重试
//       变更失败时状态保持不变 (无部分应用)
// ==========================================

use crate::domain::types::{Discipline, Outcome};
use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    // ===== 申报/判定错误 =====
    #[error("非法申报: lifter={lifter_id}, {discipline} 第{attempt_no}把, weight={weight}: {reason}")]
    InvalidDeclaration {
        lifter_id: String,
        discipline: Discipline,
        attempt_no: u8,
        weight: f64,
        reason: String,
    },

    #[error("试举已判定: lifter={lifter_id}, {discipline} 第{attempt_no}把, 已有结果={existing}")]
    AlreadyDecided {
        lifter_id: String,
        discipline: Discipline,
        attempt_no: u8,
        existing: Outcome,
    },

    // ===== 配片错误 =====
    #[error("无法精确配片: target={target_weight}, residual={residual}: {reason}")]
    Infeasible {
        target_weight: f64,
        residual: f64,
        reason: String,
    },

    // ===== 查询错误 =====
    #[error("运动员不存在: {0}")]
    LifterNotFound(String),

    #[error("无效的试举序号: {0} (必须为 1-3)")]
    InvalidAttemptNumber(u8),

    #[error("无效输入: {0}")]
    InvalidInput(String),
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
