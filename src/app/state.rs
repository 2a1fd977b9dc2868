// ==========================================
// 预算看板系统 - 应用状态
// ==========================================
// 职责: 持有请求处理器与后台管道共享的资源
// 说明: 显式注入,不使用全局单例
// ==========================================

use crate::app::broadcast::BroadcastGateway;
use crate::app::snapshot_store::SnapshotStore;
use crate::config::AppConfig;
use crate::engine::merge::AdjustmentMergeEngine;
use crate::engine::pipeline::{mailbox, Pipeline, PipelineCommand};
use crate::importer::company_parser::CompanySheetParser;
use crate::repository::budget_store::BudgetStore;
use crate::repository::error::RepositoryResult;
use std::sync::Arc;
use tokio::sync::mpsc;

/// 应用状态
///
/// HTTP 处理器只读快照、写持久化数据;快照的唯一写入者是管道
pub struct AppState {
    /// 最新快照
    pub snapshots: Arc<SnapshotStore>,

    /// 实时推送
    pub gateway: BroadcastGateway,

    /// 人工调整与费用流水
    pub budget: Arc<BudgetStore>,

    /// 管道邮箱
    pub commands: mpsc::Sender<PipelineCommand>,
}

impl AppState {
    /// 按配置组装状态与管道 (管道需由调用方 spawn)
    pub fn bootstrap(
        config: &AppConfig,
    ) -> RepositoryResult<(Self, Pipeline, mpsc::Receiver<PipelineCommand>)> {
        let budget = Arc::new(BudgetStore::open(&config.db_path)?);
        Ok(Self::assemble(config, budget))
    }

    /// 使用已打开的存储组装 (测试可传入临时库)
    pub fn assemble(
        config: &AppConfig,
        budget: Arc<BudgetStore>,
    ) -> (Self, Pipeline, mpsc::Receiver<PipelineCommand>) {
        let snapshots = Arc::new(SnapshotStore::new());
        let gateway = BroadcastGateway::new(snapshots.clone());
        let (commands, rx) = mailbox();

        let pipeline = Pipeline::new(
            CompanySheetParser::new(config.column_mapping.clone()),
            AdjustmentMergeEngine::new(config.spent_override_policy),
            budget.clone(),
            snapshots.clone(),
            gateway.clone(),
        )
        .with_parse_timeout(config.parse_timeout);

        let state = Self {
            snapshots,
            gateway,
            budget,
            commands,
        };
        (state, pipeline, rx)
    }
}
