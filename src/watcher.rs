// ==========================================
// 预算看板系统 - 文件轮询监听器
// ==========================================
// 职责: 按固定间隔扫描目录,发现匹配文件的新建/修改,经过稳定等待后投递变更
// 方式: 协作式定时轮询 (不使用操作系统文件事件)
// ==========================================
// 规则:
// - 每个目录只跟踪一个"规范文件": 匹配文件中修改时间最新者
// - 签名 = (大小, 修改时间),签名与上次确认值不同才视为变更
// - 检测到变更后等待 settle_delay,签名仍不变才投递,否则留待下个周期
// - 下游读取失败 (文件被占用) 时调用 SignatureLedger::forget,下个周期重新投递
// ==========================================

use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// 监听错误
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("监听目录不存在: {0}")]
    FolderMissing(PathBuf),

    #[error("监听目录不可访问: {path}: {message}")]
    FolderInaccessible { path: PathBuf, message: String },

    #[error("文件名模式无效: {pattern}: {message}")]
    InvalidPattern { pattern: String, message: String },
}

// ==========================================
// FilePattern - 文件名通配符 (* / ?)
// ==========================================
#[derive(Debug, Clone)]
pub struct FilePattern {
    source: String,
    regex: Regex,
}

impl FilePattern {
    /// 编译通配符模式 (大小写不敏感)
    pub fn compile(pattern: &str) -> Result<Self, WatchError> {
        let trimmed = pattern.trim();
        if trimmed.is_empty() || trimmed.contains('/') || trimmed.contains('\\') {
            return Err(WatchError::InvalidPattern {
                pattern: pattern.to_string(),
                message: "模式不能为空且只能匹配文件名".to_string(),
            });
        }

        let mut expr = String::from("(?i)^");
        for c in trimmed.chars() {
            match c {
                '*' => expr.push_str(".*"),
                '?' => expr.push('.'),
                other => expr.push_str(&regex::escape(&other.to_string())),
            }
        }
        expr.push('$');

        let regex = Regex::new(&expr).map_err(|e| WatchError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            source: trimmed.to_string(),
            regex,
        })
    }

    /// 是否匹配 (Office 锁文件 "~$" 与隐藏文件始终排除)
    pub fn matches(&self, file_name: &str) -> bool {
        if file_name.starts_with("~$") || file_name.starts_with('.') {
            return false;
        }
        self.regex.is_match(file_name)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

// ==========================================
// 文件签名与变更
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileSignature {
    pub len: u64,
    pub modified: Option<SystemTime>,
}

impl FileSignature {
    pub fn of(path: &Path) -> std::io::Result<Self> {
        let meta = fs::metadata(path)?;
        Ok(Self {
            len: meta.len(),
            modified: meta.modified().ok(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: PathBuf,
    pub signature: FileSignature,
}

// ==========================================
// SignatureLedger - 已确认签名表
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct SignatureLedger {
    inner: Arc<Mutex<HashMap<PathBuf, FileSignature>>>,
}

impl SignatureLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path) -> Option<FileSignature> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(path)
            .copied()
    }

    pub fn record(&self, path: &Path, signature: FileSignature) {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(path.to_path_buf(), signature);
    }

    /// 忘记某文件的签名,下个轮询周期会重新投递
    pub fn forget(&self, path: &Path) {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(path);
    }
}

// ==========================================
// FolderScanner - 单次扫描 (同步,可单测)
// ==========================================
#[derive(Debug, Clone)]
pub struct FolderScanner {
    folder: PathBuf,
    pattern: FilePattern,
    ledger: SignatureLedger,
}

impl FolderScanner {
    pub fn new(folder: impl Into<PathBuf>, pattern: FilePattern, ledger: SignatureLedger) -> Self {
        Self {
            folder: folder.into(),
            pattern,
            ledger,
        }
    }

    /// 检查目录存在且可读
    pub fn check_folder(&self) -> Result<(), WatchError> {
        match fs::metadata(&self.folder) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(WatchError::FolderMissing(self.folder.clone()))
            }
            Err(e) => Err(WatchError::FolderInaccessible {
                path: self.folder.clone(),
                message: e.to_string(),
            }),
            Ok(meta) if !meta.is_dir() => Err(WatchError::FolderInaccessible {
                path: self.folder.clone(),
                message: "不是目录".to_string(),
            }),
            Ok(_) => fs::read_dir(&self.folder)
                .map(|_| ())
                .map_err(|e| WatchError::FolderInaccessible {
                    path: self.folder.clone(),
                    message: e.to_string(),
                }),
        }
    }

    /// 当前规范文件 (匹配文件中修改时间最新者,相同时取路径较大者)
    pub fn canonical_file(&self) -> Result<Option<FileChange>, WatchError> {
        let entries = fs::read_dir(&self.folder).map_err(|e| WatchError::FolderInaccessible {
            path: self.folder.clone(),
            message: e.to_string(),
        })?;

        let mut best: Option<FileChange> = None;
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !self.pattern.matches(name) {
                continue;
            }
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            // 文件可能在扫描间被删除/替换,跳过即可
            let Ok(signature) = FileSignature::of(&path) else {
                continue;
            };

            let candidate = FileChange { path, signature };
            let replace = match &best {
                None => true,
                Some(current) => {
                    (candidate.signature.modified, &candidate.path)
                        > (current.signature.modified, &current.path)
                }
            };
            if replace {
                best = Some(candidate);
            }
        }
        Ok(best)
    }

    /// 单次轮询: 规范文件签名与已确认签名不同则返回变更 (不写入签名表)
    pub fn poll_once(&self) -> Result<Option<FileChange>, WatchError> {
        let Some(change) = self.canonical_file()? else {
            return Ok(None);
        };
        if self.ledger.get(&change.path) == Some(change.signature) {
            return Ok(None);
        }
        Ok(Some(change))
    }

    /// 稳定等待后确认: 签名未变化则写入签名表并返回 true
    pub fn confirm(&self, change: &FileChange) -> bool {
        match FileSignature::of(&change.path) {
            Ok(now) if now == change.signature => {
                self.ledger.record(&change.path, now);
                true
            }
            Ok(_) => false,
            Err(_) => false,
        }
    }

    pub fn ledger(&self) -> &SignatureLedger {
        &self.ledger
    }
}

// ==========================================
// FileWatcher
// ==========================================
pub struct FileWatcher {
    scanner: FolderScanner,
    interval: Duration,
    settle_delay: Duration,
}

/// 运行中的监听任务
pub struct WatchHandle {
    ledger: SignatureLedger,
    task: JoinHandle<()>,
}

impl WatchHandle {
    /// 签名表 (供下游在瞬时读取失败时调用 forget)
    pub fn ledger(&self) -> SignatureLedger {
        self.ledger.clone()
    }

    pub fn stop(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl FileWatcher {
    pub fn new(
        folder: impl Into<PathBuf>,
        pattern: &str,
        interval: Duration,
        settle_delay: Duration,
    ) -> Result<Self, WatchError> {
        let pattern = FilePattern::compile(pattern)?;
        Ok(Self {
            scanner: FolderScanner::new(folder, pattern, SignatureLedger::new()),
            interval,
            settle_delay,
        })
    }

    pub fn ledger(&self) -> SignatureLedger {
        self.scanner.ledger.clone()
    }

    /// 启动轮询任务
    ///
    /// # 返回
    /// - Ok(WatchHandle): 已启动
    /// - Err(WatchError): 目录不存在/不可访问 (只在此处报告一次,不进入错误循环)
    ///
    /// 每个确认的变更通过 `tx` 投递;接收端关闭后任务退出
    pub fn start<T>(self, tx: mpsc::Sender<T>) -> Result<WatchHandle, WatchError>
    where
        T: From<FileChange> + Send + 'static,
    {
        self.scanner.check_folder()?;

        info!(
            folder = %self.scanner.folder.display(),
            pattern = self.scanner.pattern.as_str(),
            interval_ms = self.interval.as_millis() as u64,
            settle_ms = self.settle_delay.as_millis() as u64,
            "文件监听已启动"
        );

        let ledger = self.scanner.ledger.clone();
        let task = tokio::spawn(self.run(tx));
        Ok(WatchHandle { ledger, task })
    }

    async fn run<T>(self, tx: mpsc::Sender<T>)
    where
        T: From<FileChange> + Send + 'static,
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let scanner = self.scanner.clone();
            let polled = match tokio::task::spawn_blocking(move || scanner.poll_once()).await {
                Ok(result) => result,
                Err(e) => {
                    error!(error = %e, "目录扫描任务异常");
                    continue;
                }
            };

            let change = match polled {
                Ok(Some(change)) => change,
                Ok(None) => continue,
                Err(e) => {
                    // 启动后目录被移除等情况: 记录并继续轮询
                    warn!(error = %e, "目录扫描失败,等待下个周期");
                    continue;
                }
            };

            debug!(path = %change.path.display(), "检测到文件变更,等待写入稳定");
            if !self.settle_delay.is_zero() {
                tokio::time::sleep(self.settle_delay).await;
            }

            let scanner = self.scanner.clone();
            let pending = change.clone();
            let stable = tokio::task::spawn_blocking(move || scanner.confirm(&pending))
                .await
                .unwrap_or(false);
            if !stable {
                debug!(path = %change.path.display(), "文件仍在写入,下个周期重试");
                continue;
            }

            info!(path = %change.path.display(), size = change.signature.len, "文件变更已确认");
            if tx.send(T::from(change)).await.is_err() {
                info!("变更接收端已关闭,停止文件监听");
                break;
            }
        }
    }
}
