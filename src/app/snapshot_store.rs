// ==========================================
// 预算看板系统 - 共享快照存储
// ==========================================
// 职责: 持有进程级最新快照,供后台管道写、请求处理读
// 红线: replace 是唯一写入口,整体替换,不做字段级修改
// ==========================================
// 实现: RwLock<Arc<Snapshot>>
// - current() 只在读锁内克隆 Arc,随即释放,慢读者持有的是旧 Arc
// - replace() 只在写锁内交换指针,不会等待任何读者渲染完成
// ==========================================

use crate::domain::snapshot::Snapshot;
use std::sync::{Arc, RwLock};

pub struct SnapshotStore {
    current: RwLock<Arc<Snapshot>>,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore {
    /// 以空快照 (revision 0) 初始化
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(Snapshot::empty())),
        }
    }

    /// 当前快照
    pub fn current(&self) -> Arc<Snapshot> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// 安装新快照,revision 由存储统一分配 (上一版本 + 1)
    ///
    /// 返回已安装的快照,供发布使用
    pub fn replace(&self, mut snapshot: Snapshot) -> Arc<Snapshot> {
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        snapshot.revision = guard.revision + 1;
        let installed = Arc::new(snapshot);
        *guard = installed.clone();
        installed
    }

    pub fn revision(&self) -> u64 {
        self.current().revision
    }
}
