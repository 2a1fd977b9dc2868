// ==========================================
// 预算看板系统 - 核心库
// ==========================================
// 技术栈: Tokio + Axum + Rust + SQLite
// 系统定位: 文件监听 → 解析 → 合并 → 广播 的实时预算看板
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 人工调整与费用流水
pub mod repository;

// 引擎层 - 合并规则与管道编排
pub mod engine;

// 导入层 - 表格文件解析
pub mod importer;

// 配置层 - 启动配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 文件轮询监听
pub mod watcher;

// 应用层 - 快照存储、广播、HTTP
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{
    AdjustmentOverride, BudgetStatus, CompanyRecord, Expense, Snapshot, SpentOverridePolicy,
    Statistics,
};

// 引擎
pub use engine::{AdjustmentMergeEngine, BudgetLookup, Pipeline, PipelineCommand};

// 应用
pub use app::{AppState, BroadcastGateway, SnapshotStore};

// 监听
pub use watcher::{FileWatcher, WatchError};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "预算看板系统";
