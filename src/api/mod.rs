// ==========================================
// 力量举试举追踪引擎 - API 层
// ==========================================
// 职责: 提供进程内查询接口，供看板与热身区面板轮询
// ==========================================

pub mod error;
pub mod meet_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use meet_api::{MeetApi, PlateLibrary, WarmupPlan};
