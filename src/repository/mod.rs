// ==========================================
// 预算看板系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 人工调整与费用流水的持久化,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod adjustment_repo;
pub mod budget_store;
pub mod error;
pub mod expense_repo;

// 重导出核心仓储
pub use adjustment_repo::AdjustmentRepository;
pub use budget_store::BudgetStore;
pub use error::{RepositoryError, RepositoryResult};
pub use expense_repo::ExpenseRepository;
