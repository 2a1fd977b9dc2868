// ==========================================
// 管道端到端测试
// ==========================================
// 测试目标: 文件 → 解析 → 合并 → 快照替换 → 广播 的完整链路
// ==========================================

mod test_helpers;

use budget_dashboard::app::AppState;
use budget_dashboard::domain::{AdjustmentOverride, BudgetStatus, Expense};
use budget_dashboard::engine::{CycleTrigger, PipelineCommand, PipelineError};
use budget_dashboard::logging;
use budget_dashboard::watcher::{FileSignature, FileWatcher, SignatureLedger};
use chrono::NaiveDate;
use std::time::Duration;
use tempfile::TempDir;
use test_helpers::{create_test_store, test_config, write_raw, write_sheet};
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);
const QUIET: Duration = Duration::from_millis(200);

fn sample_rows() -> Vec<(&'static str, &'static str, &'static str, &'static str)> {
    vec![
        ("C001", "Alfa", "1.000,00", "500,00"),
        ("C002", "Beta", "1.000,00", "750,00"),
        ("C003", "Gama", "1.000,00", "950,00"),
    ]
}

#[tokio::test]
async fn test_cycle_replaces_snapshot_and_publishes() {
    logging::init_test();
    let dir = TempDir::new().unwrap();
    let (db, store) = create_test_store().unwrap();
    let config = test_config(db.path().to_str().unwrap(), dir.path());
    let (state, mut pipeline, _rx) = AppState::assemble(&config, store.clone());
    store
        .expenses
        .insert(&Expense::new("C001", "Alfa", 120.0, NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()))
        .unwrap();

    let mut sub = state.gateway.subscribe();
    assert_eq!(sub.next().await.unwrap().revision, 0);

    let path = write_sheet(dir.path(), "orcamento.csv", &sample_rows());
    let report = pipeline.run_cycle(&path).await.unwrap();

    assert_eq!(report.trigger, CycleTrigger::FileChange);
    assert_eq!(report.record_count, 3);
    assert_eq!(report.revision, 1);
    assert_eq!(report.subscribers, 1);

    let published = timeout(WAIT, sub.next()).await.unwrap().unwrap();
    assert_eq!(published.revision, 1);
    assert_eq!(published.companies[0].spent_value, 120.0);
    assert_eq!(published.companies[0].status, BudgetStatus::Ok);
    assert_eq!(published.companies[1].status, BudgetStatus::Warning);
    assert_eq!(published.companies[2].status, BudgetStatus::Critical);
    assert_eq!(published.statistics.total_companies, 3);
    assert_eq!(published.file_path.as_deref(), path.to_str());
    assert!(published.last_update.is_some());

    let current = state.snapshots.current();
    assert_eq!(current.revision, 1);
}

#[tokio::test]
async fn test_unreadable_file_keeps_previous_snapshot() {
    let dir = TempDir::new().unwrap();
    let (db, store) = create_test_store().unwrap();
    let config = test_config(db.path().to_str().unwrap(), dir.path());
    let (state, mut pipeline, _rx) = AppState::assemble(&config, store);

    let good = write_sheet(dir.path(), "orcamento.csv", &sample_rows());
    pipeline.run_cycle(&good).await.unwrap();

    let mut sub = state.gateway.subscribe();
    assert_eq!(sub.next().await.unwrap().revision, 1);

    let bad = write_raw(dir.path(), "quebrado.csv", "isto;nao;e;uma;planilha\n1;2;3;4;5\n");
    let err = pipeline.run_cycle(&bad).await.unwrap_err();
    assert!(matches!(err, PipelineError::Import(_)));
    assert!(!err.is_transient());

    // 快照不变,且没有任何广播
    let current = state.snapshots.current();
    assert_eq!(current.revision, 1);
    assert_eq!(current.companies.len(), 3);
    assert!(timeout(QUIET, sub.next()).await.is_err());
}

#[tokio::test]
async fn test_new_subscriber_receives_current_snapshot() {
    let dir = TempDir::new().unwrap();
    let (db, store) = create_test_store().unwrap();
    let config = test_config(db.path().to_str().unwrap(), dir.path());
    let (state, mut pipeline, _rx) = AppState::assemble(&config, store);

    let path = write_sheet(dir.path(), "orcamento.csv", &sample_rows());
    pipeline.run_cycle(&path).await.unwrap();

    // 加入时没有新的文件变更,也能立即拿到最新快照
    let mut late = state.gateway.subscribe();
    let first = timeout(WAIT, late.next()).await.unwrap().unwrap();
    assert_eq!(first.revision, 1);
    assert_eq!(first.companies.len(), 3);
}

#[tokio::test]
async fn test_remerge_applies_new_overrides_without_reparse() {
    let dir = TempDir::new().unwrap();
    let (db, store) = create_test_store().unwrap();
    let config = test_config(db.path().to_str().unwrap(), dir.path());
    let (state, mut pipeline, _rx) = AppState::assemble(&config, store.clone());

    assert!(matches!(
        pipeline.remerge().await,
        Err(PipelineError::NothingToRemerge)
    ));

    let path = write_sheet(dir.path(), "orcamento.csv", &sample_rows());
    pipeline.run_cycle(&path).await.unwrap();
    std::fs::remove_file(&path).unwrap();

    store
        .adjustments
        .upsert(&AdjustmentOverride::new("C003", "Gama").with_contract_value(2000.0))
        .unwrap();
    let report = pipeline.remerge().await.unwrap();

    assert_eq!(report.trigger, CycleTrigger::Remerge);
    assert_eq!(report.revision, 2);
    let gama = state.snapshots.current().find_company("C003").cloned().unwrap();
    assert_eq!(gama.contract_value, 2000.0);
    assert_eq!(gama.percentage, 47.5);
    assert_eq!(gama.status, BudgetStatus::Ok);
}

#[tokio::test]
async fn test_transient_failure_asks_watcher_to_retry() {
    let dir = TempDir::new().unwrap();
    let (db, store) = create_test_store().unwrap();
    let config = test_config(db.path().to_str().unwrap(), dir.path());
    let (_state, pipeline, _rx) = AppState::assemble(&config, store);

    let ledger = SignatureLedger::new();
    let mut pipeline = pipeline.with_ledger(ledger.clone());
    let path = write_sheet(dir.path(), "orcamento.csv", &sample_rows());
    ledger.record(&path, FileSignature::of(&path).unwrap());
    std::fs::remove_file(&path).unwrap();

    let outcome = pipeline.handle(PipelineCommand::FileChanged(path.clone())).await;

    assert!(outcome.is_none());
    assert_eq!(ledger.get(&path), None);
}

#[tokio::test]
async fn test_watcher_drives_pipeline_end_to_end() {
    let dir = TempDir::new().unwrap();
    let (db, store) = create_test_store().unwrap();
    let config = test_config(db.path().to_str().unwrap(), dir.path());
    let (state, pipeline, rx) = AppState::assemble(&config, store);

    let watcher = FileWatcher::new(
        dir.path(),
        "*.csv",
        Duration::from_millis(25),
        Duration::from_millis(10),
    )
    .unwrap();
    let pipeline_task = tokio::spawn(pipeline.with_ledger(watcher.ledger()).run(rx));
    let handle = watcher.start(state.commands.clone()).unwrap();

    let mut sub = state.gateway.subscribe();
    assert_eq!(sub.next().await.unwrap().revision, 0);

    write_sheet(dir.path(), "orcamento.csv", &sample_rows());
    let published = timeout(WAIT, sub.next()).await.unwrap().unwrap();
    assert_eq!(published.revision, 1);
    assert_eq!(published.companies.len(), 3);

    // 未修改的文件不会被再次处理
    assert!(timeout(QUIET, sub.next()).await.is_err());

    state.commands.send(PipelineCommand::Remerge).await.unwrap();
    let remerged = timeout(WAIT, sub.next()).await.unwrap().unwrap();
    assert_eq!(remerged.revision, 2);

    handle.stop();
    pipeline_task.abort();
}
