// ==========================================
// 预算看板系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、业务规则
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod adjustment;
pub mod company;
pub mod snapshot;
pub mod types;

// 重导出核心类型
pub use adjustment::{AdjustmentOverride, CompanyExpenseReport, Expense};
pub use company::{calculate_percentage, round2, CompanyRecord};
pub use snapshot::{Snapshot, Statistics};
pub use types::{BudgetStatus, SpentOverridePolicy, CRITICAL_THRESHOLD_PCT, WARNING_THRESHOLD_PCT};
