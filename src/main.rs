// ==========================================
// 预算看板系统 - 主入口
// ==========================================
// 流程: 日志 → 配置 → 数据库 → 应用状态 → 文件监听 → 管道 → HTTP 服务
// ==========================================

use anyhow::Context;
use budget_dashboard::app::{router, AppState};
use budget_dashboard::config::AppConfig;
use budget_dashboard::watcher::FileWatcher;
use budget_dashboard::{logging, APP_NAME, VERSION};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志系统
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} - 实时预算看板", APP_NAME);
    tracing::info!("系统版本: {}", VERSION);
    tracing::info!("==================================================");

    let config = AppConfig::from_env().context("加载配置失败")?;
    tracing::info!(
        folder = %config.watch_folder.display(),
        pattern = %config.file_pattern,
        db = %config.db_path,
        policy = ?config.spent_override_policy,
        "配置已加载"
    );

    let (state, pipeline, mailbox) = AppState::bootstrap(&config).context("初始化数据库失败")?;

    // 监听启动失败只记录一次,服务继续以空快照运行
    let watcher = FileWatcher::new(
        config.watch_folder.clone(),
        &config.file_pattern,
        config.check_interval,
        config.settle_delay,
    )
    .context("文件名模式无效")?;
    let ledger = watcher.ledger();
    let watch_handle = match watcher.start(state.commands.clone()) {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::error!(error = %e, "文件监听启动失败,看板将保持空快照");
            None
        }
    };

    let pipeline_task = tokio::spawn(pipeline.with_ledger(ledger).run(mailbox));

    let state = Arc::new(state);
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("无法绑定地址 {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "HTTP 服务已启动");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP 服务异常退出")?;

    if let Some(handle) = watch_handle {
        handle.stop();
    }
    pipeline_task.abort();
    tracing::info!("系统已退出");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "无法监听退出信号");
        std::future::pending::<()>().await;
    }
    tracing::info!("收到退出信号,正在关闭");
}
