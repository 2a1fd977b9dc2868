// ==========================================
// 预算看板系统 - 领域类型定义
// ==========================================
// 职责: 预算状态等级、阈值常量、花费覆写策略
// 红线: 阈值是固定业务规则,不按公司配置
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// 超过该百分比即为 critical
pub const CRITICAL_THRESHOLD_PCT: f64 = 90.0;

/// 超过该百分比即为 warning
pub const WARNING_THRESHOLD_PCT: f64 = 70.0;

// ==========================================
// 预算状态 (Budget Status)
// ==========================================
// 序列化格式: 小写 (与前端约定一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetStatus {
    Ok,       // 正常
    Warning,  // 关注
    Critical, // 危险
}

impl BudgetStatus {
    /// 由执行百分比派生状态
    ///
    /// - percentage > 90 → Critical
    /// - 70 < percentage <= 90 → Warning
    /// - 其他 → Ok
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage > CRITICAL_THRESHOLD_PCT {
            BudgetStatus::Critical
        } else if percentage > WARNING_THRESHOLD_PCT {
            BudgetStatus::Warning
        } else {
            BudgetStatus::Ok
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetStatus::Ok => "ok",
            BudgetStatus::Warning => "warning",
            BudgetStatus::Critical => "critical",
        }
    }
}

impl fmt::Display for BudgetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// 花费覆写策略 (Spent Override Policy)
// ==========================================
// 决定覆写记录中 spent_value = 0 的含义
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpentOverridePolicy {
    /// 0 视为显式设置,覆盖为 0
    #[default]
    HonorZero,
    /// 0 视为未设置,回退到流水合计
    ZeroMeansUnset,
}

impl SpentOverridePolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "honor" | "honor_zero" | "explicit" => Some(SpentOverridePolicy::HonorZero),
            "unset" | "zero_means_unset" => Some(SpentOverridePolicy::ZeroMeansUnset),
            _ => None,
        }
    }
}
