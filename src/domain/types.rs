// ==========================================
// 力量举试举追踪引擎 - 领域类型定义
// ==========================================
// 职责: 项目、判定结果、裁判灯、提醒等级、重量单位
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 比赛项目 (Discipline)
// ==========================================
// 顺序: 深蹲 < 卧推 < 硬拉 (比赛进行顺序)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Discipline {
    Squat,    // 深蹲
    Bench,    // 卧推
    Deadlift, // 硬拉
}

impl Discipline {
    /// 按比赛顺序排列的全部项目
    pub const ALL: [Discipline; 3] = [Discipline::Squat, Discipline::Bench, Discipline::Deadlift];

    /// 在九次试举数组中的起始下标
    pub fn slot_offset(&self) -> usize {
        match self {
            Discipline::Squat => 0,
            Discipline::Bench => 3,
            Discipline::Deadlift => 6,
        }
    }

    /// 从字符串解析项目（大小写不敏感，兼容常见缩写）
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "SQUAT" | "SQ" | "S" => Some(Discipline::Squat),
            "BENCH" | "BP" | "B" => Some(Discipline::Bench),
            "DEADLIFT" | "DL" | "D" => Some(Discipline::Deadlift),
            _ => None,
        }
    }
}

impl fmt::Display for Discipline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discipline::Squat => write!(f, "SQUAT"),
            Discipline::Bench => write!(f, "BENCH"),
            Discipline::Deadlift => write!(f, "DEADLIFT"),
        }
    }
}

// ==========================================
// 试举结果 (Outcome)
// ==========================================
// 状态机: PENDING → GOOD | NO_LIFT (仅一次，不可重开)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Pending, // 待判定
    Good,    // 成功
    NoLift,  // 失败
}

impl Outcome {
    pub fn is_decided(&self) -> bool {
        !matches!(self, Outcome::Pending)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Pending => write!(f, "PENDING"),
            Outcome::Good => write!(f, "GOOD"),
            Outcome::NoLift => write!(f, "NO_LIFT"),
        }
    }
}

// ==========================================
// 裁判灯 (Referee Votes)
// ==========================================
/// 三名裁判独立判定；None 表示尚未亮灯
/// true = 白灯 (成功), false = 红灯 (失败)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefereeVotes {
    pub left: Option<bool>,
    pub head: Option<bool>,
    pub right: Option<bool>,
}

impl RefereeVotes {
    pub fn new(left: Option<bool>, head: Option<bool>, right: Option<bool>) -> Self {
        Self { left, head, right }
    }

    /// 三灯全部给出
    pub fn unanimous(good: bool) -> Self {
        Self::new(Some(good), Some(good), Some(good))
    }

    /// 多数裁决 (2/3)
    ///
    /// # 返回
    /// - `Some(Outcome::Good)`: 至少两盏白灯
    /// - `Some(Outcome::NoLift)`: 至少两盏红灯
    /// - `None`: 尚未形成多数
    pub fn majority(&self) -> Option<Outcome> {
        let lights = [self.left, self.head, self.right];
        let white = lights.iter().filter(|v| **v == Some(true)).count();
        let red = lights.iter().filter(|v| **v == Some(false)).count();

        if white >= 2 {
            Some(Outcome::Good)
        } else if red >= 2 {
            Some(Outcome::NoLift)
        } else {
            None
        }
    }
}

// ==========================================
// 倒计时提醒等级 (Alert Level)
// ==========================================
// 顺序: OnPlatform < FinalCall < ... < Cruise (越靠前越紧急)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertLevel {
    OnPlatform,     // 正在上场
    FinalCall,      // 最后召集
    CriticalWindow, // 关键窗口
    BeginBarWork,   // 开始杠铃热身
    PrepWindow,     // 准备阶段
    Cruise,         // 时间充裕
}

impl AlertLevel {
    /// 提醒严重程度 (critical / warning / ready)
    pub fn severity(&self) -> &'static str {
        match self {
            AlertLevel::OnPlatform | AlertLevel::FinalCall | AlertLevel::CriticalWindow => {
                "critical"
            }
            AlertLevel::BeginBarWork | AlertLevel::PrepWindow => "warning",
            AlertLevel::Cruise => "ready",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertLevel::OnPlatform => write!(f, "ON_PLATFORM"),
            AlertLevel::FinalCall => write!(f, "FINAL_CALL"),
            AlertLevel::CriticalWindow => write!(f, "CRITICAL_WINDOW"),
            AlertLevel::BeginBarWork => write!(f, "BEGIN_BAR_WORK"),
            AlertLevel::PrepWindow => write!(f, "PREP_WINDOW"),
            AlertLevel::Cruise => write!(f, "CRUISE"),
        }
    }
}

// ==========================================
// 重量单位 (Weight Unit)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    #[default]
    Kg,
    Lb,
}

impl WeightUnit {
    /// 热身重量取整步长
    pub fn rounding_increment(&self) -> f64 {
        match self {
            WeightUnit::Kg => 0.5,
            WeightUnit::Lb => 1.0,
        }
    }

    /// 从字符串解析单位，未知值返回 None
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "kg" | "kgs" => Some(WeightUnit::Kg),
            "lb" | "lbs" => Some(WeightUnit::Lb),
            _ => None,
        }
    }
}

impl fmt::Display for WeightUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeightUnit::Kg => write!(f, "kg"),
            WeightUnit::Lb => write!(f, "lb"),
        }
    }
}
