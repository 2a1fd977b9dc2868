// ==========================================
// 预算看板系统 - 管道编排
// ==========================================
// 职责: 解析 → 合并 → 统计 → 替换快照 → 广播,严格顺序执行
// 输入: PipelineCommand 邮箱 (文件变更 / 按需重新合并)
// 输出: 新快照 (SnapshotStore) + 广播 (BroadcastGateway)
// ==========================================
// 红线:
// - 任何周期失败都不替换快照、不广播,上一份快照继续有效
// - 同一时间只有一个周期在执行,突发通知在邮箱中合并
// - 错误只在周期内处理,不终止管道任务
// ==========================================

use crate::app::broadcast::BroadcastGateway;
use crate::app::snapshot_store::SnapshotStore;
use crate::domain::company::CompanyRecord;
use crate::domain::snapshot::Snapshot;
use crate::engine::merge::{AdjustmentMergeEngine, BudgetLookup, MergeFailure, MergeReport};
use crate::engine::statistics::compute_statistics;
use crate::importer::company_parser::{CellWarning, CompanySheetParser, ParseReport};
use crate::importer::error::ImportError;
use crate::watcher::{FileChange, SignatureLedger};
use chrono::Local;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// 管道邮箱容量
pub const PIPELINE_MAILBOX_CAPACITY: usize = 32;

/// 单周期默认解析超时
pub const DEFAULT_PARSE_TIMEOUT: Duration = Duration::from_secs(60);

// ==========================================
// PipelineCommand - 邮箱消息
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineCommand {
    /// 监听器确认的文件变更
    FileChanged(PathBuf),
    /// 用当前持久化数据重新合并上次解析结果
    Remerge,
}

impl PipelineCommand {
    /// 合并两条待处理消息 (较新的文件变更优先,文件变更吸收重新合并)
    pub fn absorb(self, next: PipelineCommand) -> PipelineCommand {
        match (self, next) {
            (_, changed @ PipelineCommand::FileChanged(_)) => changed,
            (changed @ PipelineCommand::FileChanged(_), PipelineCommand::Remerge) => changed,
            (PipelineCommand::Remerge, PipelineCommand::Remerge) => PipelineCommand::Remerge,
        }
    }
}

impl From<FileChange> for PipelineCommand {
    fn from(change: FileChange) -> Self {
        PipelineCommand::FileChanged(change.path)
    }
}

/// 创建管道邮箱
pub fn mailbox() -> (mpsc::Sender<PipelineCommand>, mpsc::Receiver<PipelineCommand>) {
    mpsc::channel(PIPELINE_MAILBOX_CAPACITY)
}

/// 取出下一条消息,并把已排队的消息合并进来
pub async fn recv_coalesced(
    mailbox: &mut mpsc::Receiver<PipelineCommand>,
) -> Option<PipelineCommand> {
    let mut command = mailbox.recv().await?;
    while let Ok(next) = mailbox.try_recv() {
        command = command.absorb(next);
    }
    Some(command)
}

// ==========================================
// PipelineError
// ==========================================
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Import(#[from] ImportError),

    #[error("解析超时: {path} 超过 {timeout_secs} 秒未完成")]
    ParseTimeout { path: String, timeout_secs: u64 },

    #[error("后台任务异常: {0}")]
    Worker(String),

    #[error("尚无成功解析的数据,无法重新合并")]
    NothingToRemerge,

    #[error("上次超时的后台解析仍在运行: {path}")]
    WorkerBusy { path: String },
}

impl PipelineError {
    /// 瞬时失败: 下个轮询周期应重新投递同一文件
    pub fn is_transient(&self) -> bool {
        match self {
            PipelineError::Import(e) => e.is_transient(),
            PipelineError::ParseTimeout { .. } | PipelineError::WorkerBusy { .. } => true,
            _ => false,
        }
    }
}

// ==========================================
// CycleReport - 单周期结果
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleTrigger {
    FileChange,
    Remerge,
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle_id: String,
    pub trigger: CycleTrigger,
    pub file_path: Option<String>,
    pub record_count: usize,
    pub warnings: Vec<CellWarning>,
    pub skipped_rows: usize,
    pub merge_failures: Vec<MergeFailure>,
    pub revision: u64,
    pub subscribers: usize,
}

/// 超时后被分离的阻塞任务 (仍可能持有存储锁)
struct DetachedWorker {
    path: PathBuf,
    running: Arc<AtomicBool>,
}

/// 阻塞任务结束 (含 panic) 时清除运行标记
struct RunningFlag(Arc<AtomicBool>);

impl Drop for RunningFlag {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// ==========================================
// Pipeline
// ==========================================
pub struct Pipeline {
    parser: Arc<CompanySheetParser>,
    engine: Arc<AdjustmentMergeEngine>,
    lookup: Arc<dyn BudgetLookup>,
    store: Arc<SnapshotStore>,
    gateway: BroadcastGateway,
    parse_timeout: Duration,
    ledger: Option<SignatureLedger>,
    /// 上次成功解析的文件与原始记录 (重新合并的输入)
    last_parsed: Option<(PathBuf, Arc<Vec<CompanyRecord>>)>,
    detached: Option<DetachedWorker>,
}

impl Pipeline {
    pub fn new(
        parser: CompanySheetParser,
        engine: AdjustmentMergeEngine,
        lookup: Arc<dyn BudgetLookup>,
        store: Arc<SnapshotStore>,
        gateway: BroadcastGateway,
    ) -> Self {
        Self {
            parser: Arc::new(parser),
            engine: Arc::new(engine),
            lookup,
            store,
            gateway,
            parse_timeout: DEFAULT_PARSE_TIMEOUT,
            ledger: None,
            last_parsed: None,
            detached: None,
        }
    }

    pub fn with_parse_timeout(mut self, timeout: Duration) -> Self {
        self.parse_timeout = timeout;
        self
    }

    /// 关联监听器签名表,瞬时失败时让监听器重新投递
    pub fn with_ledger(mut self, ledger: SignatureLedger) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// 执行一次文件变更周期
    pub async fn run_cycle(&mut self, path: &Path) -> Result<CycleReport, PipelineError> {
        let cycle_id = Uuid::new_v4().to_string();
        debug!(cycle_id = %cycle_id, path = %path.display(), "开始解析周期");

        let parser = self.parser.clone();
        let engine = self.engine.clone();
        let lookup = self.lookup.clone();
        let target = path.to_path_buf();
        let (parsed, merged) = self
            .bounded(path, move || -> Result<(ParseReport, MergeReport), ImportError> {
                let parsed = parser.parse(&target)?;
                let merged = engine.merge(&parsed.records, lookup.as_ref());
                Ok((parsed, merged))
            })
            .await??;

        self.last_parsed = Some((path.to_path_buf(), Arc::new(parsed.records)));
        let (revision, subscribers) = self.install(merged.records.clone(), Some(path));

        let report = CycleReport {
            cycle_id,
            trigger: CycleTrigger::FileChange,
            file_path: Some(path.display().to_string()),
            record_count: merged.records.len(),
            warnings: parsed.warnings,
            skipped_rows: parsed.skipped.len(),
            merge_failures: merged.failures,
            revision,
            subscribers,
        };
        info!(
            cycle_id = %report.cycle_id,
            path = %path.display(),
            records = report.record_count,
            warnings = report.warnings.len(),
            skipped = report.skipped_rows,
            merge_failures = report.merge_failures.len(),
            revision,
            "快照已更新"
        );
        Ok(report)
    }

    /// 按需重新合并: 不重读文件,用当前持久化数据覆盖上次解析结果
    pub async fn remerge(&mut self) -> Result<CycleReport, PipelineError> {
        let Some((path, records)) = self.last_parsed.clone() else {
            return Err(PipelineError::NothingToRemerge);
        };
        let cycle_id = Uuid::new_v4().to_string();

        let engine = self.engine.clone();
        let lookup = self.lookup.clone();
        let merged = self
            .bounded(&path, move || engine.merge(&records, lookup.as_ref()))
            .await?;

        let (revision, subscribers) = self.install(merged.records.clone(), Some(&path));
        info!(
            cycle_id = %cycle_id,
            records = merged.records.len(),
            merge_failures = merged.failures.len(),
            revision,
            "重新合并完成"
        );

        Ok(CycleReport {
            cycle_id,
            trigger: CycleTrigger::Remerge,
            file_path: Some(path.display().to_string()),
            record_count: merged.records.len(),
            warnings: Vec::new(),
            skipped_rows: 0,
            merge_failures: merged.failures,
            revision,
            subscribers,
        })
    }

    /// 处理单条消息,错误在此处记录并吸收
    pub async fn handle(&mut self, command: PipelineCommand) -> Option<CycleReport> {
        let result = match &command {
            PipelineCommand::FileChanged(path) => self.run_cycle(path).await,
            PipelineCommand::Remerge => self.remerge().await,
        };

        match result {
            Ok(report) => Some(report),
            Err(PipelineError::NothingToRemerge) => {
                info!("尚无已解析文件,忽略重新合并请求");
                None
            }
            Err(e @ PipelineError::WorkerBusy { .. }) => {
                // 分离的任务结束前不叠加新的阻塞任务;文件变更仍交还监听器重投
                debug!(error = %e, "跳过本周期");
                if let (PipelineCommand::FileChanged(path), Some(ledger)) =
                    (&command, &self.ledger)
                {
                    ledger.forget(path);
                }
                None
            }
            Err(e) => {
                if let PipelineCommand::FileChanged(path) = &command {
                    if e.is_transient() {
                        warn!(path = %path.display(), error = %e, "文件暂不可读,下个轮询周期重试");
                        if let Some(ledger) = &self.ledger {
                            ledger.forget(path);
                        }
                        return None;
                    }
                }
                error!(error = %e, "管道周期失败,保留上一份快照");
                None
            }
        }
    }

    /// 消费邮箱直到所有发送端关闭
    pub async fn run(mut self, mut mailbox: mpsc::Receiver<PipelineCommand>) {
        info!("管道任务已启动");
        while let Some(command) = recv_coalesced(&mut mailbox).await {
            self.handle(command).await;
        }
        info!("管道邮箱已关闭,管道任务退出");
    }

    fn install(&self, companies: Vec<CompanyRecord>, path: Option<&Path>) -> (u64, usize) {
        let statistics = compute_statistics(&companies);
        let snapshot = Snapshot {
            revision: 0,
            companies,
            statistics,
            file_path: path.map(|p| p.display().to_string()),
            last_update: Some(Local::now()),
        };
        let installed = self.store.replace(snapshot);
        let revision = installed.revision;
        let subscribers = self.gateway.publish(installed);
        (revision, subscribers)
    }

    /// 在阻塞线程池执行,并受解析超时约束
    ///
    /// 超时后阻塞线程无法取消,只能分离;在它结束前拒绝启动新的阻塞任务
    async fn bounded<T, F>(&mut self, path: &Path, work: F) -> Result<T, PipelineError>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        if let Some(busy) = self.busy_worker() {
            return Err(PipelineError::WorkerBusy {
                path: busy.display().to_string(),
            });
        }

        let running = Arc::new(AtomicBool::new(true));
        let flag = RunningFlag(running.clone());
        let task = tokio::task::spawn_blocking(move || {
            let _flag = flag;
            work()
        });

        match tokio::time::timeout(self.parse_timeout, task).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(join_error)) => Err(PipelineError::Worker(join_error.to_string())),
            Err(_) => {
                warn!(
                    path = %path.display(),
                    timeout_ms = self.parse_timeout.as_millis() as u64,
                    "解析超时,后台线程已分离,其结束前不再启动新周期"
                );
                self.detached = Some(DetachedWorker {
                    path: path.to_path_buf(),
                    running,
                });
                Err(PipelineError::ParseTimeout {
                    path: path.display().to_string(),
                    timeout_secs: self.parse_timeout.as_secs(),
                })
            }
        }
    }

    /// 仍在运行的分离任务所处理的文件
    fn busy_worker(&mut self) -> Option<PathBuf> {
        match &self.detached {
            Some(worker) if worker.running.load(Ordering::Acquire) => Some(worker.path.clone()),
            Some(worker) => {
                info!(path = %worker.path.display(), "分离的解析线程已结束");
                self.detached = None;
                None
            }
            None => None,
        }
    }
}
