// ==========================================
// 预算看板系统 - 引擎层
// ==========================================
// 职责: 合并规则、汇总统计、管道编排
// 红线: 引擎不直接访问数据库,通过 BudgetLookup 查询
// ==========================================

pub mod merge;
pub mod pipeline;
pub mod statistics;

// 重导出核心引擎
pub use merge::{AdjustmentMergeEngine, BudgetLookup, MergeFailure, MergeReport};
pub use pipeline::{
    mailbox, recv_coalesced, CycleReport, CycleTrigger, Pipeline, PipelineCommand, PipelineError,
};
pub use statistics::compute_statistics;
