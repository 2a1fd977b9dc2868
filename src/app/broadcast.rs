// ==========================================
// 预算看板系统 - 快照广播网关
// ==========================================
// 职责: 将新快照扇出给所有在线订阅者,新订阅者立即获得当前快照
// 实现: tokio::sync::broadcast<Arc<Snapshot>>
// ==========================================
// 规则:
// - publish 永不阻塞管道: 慢订阅者只会在自己的接收端落后 (Lagged)
// - 落后的订阅者直接跳到存储中的最新快照
// - 每个订阅者按 revision 去重,保证单订阅者内严格递增
// ==========================================

use crate::app::snapshot_store::SnapshotStore;
use crate::domain::snapshot::Snapshot;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

/// 默认广播缓冲 (每个订阅者最多落后的快照数)
pub const DEFAULT_BROADCAST_CAPACITY: usize = 16;

#[derive(Clone)]
pub struct BroadcastGateway {
    tx: broadcast::Sender<Arc<Snapshot>>,
    store: Arc<SnapshotStore>,
}

impl BroadcastGateway {
    pub fn new(store: Arc<SnapshotStore>) -> Self {
        Self::with_capacity(store, DEFAULT_BROADCAST_CAPACITY)
    }

    pub fn with_capacity(store: Arc<SnapshotStore>, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, store }
    }

    /// 发布快照
    ///
    /// # 返回
    /// 收到该快照的订阅者数量 (无订阅者时为 0,不视为错误)
    pub fn publish(&self, snapshot: Arc<Snapshot>) -> usize {
        let revision = snapshot.revision;
        match self.tx.send(snapshot) {
            Ok(receivers) => {
                debug!(revision, receivers, "快照已广播");
                receivers
            }
            Err(_) => {
                debug!(revision, "无在线订阅者,跳过广播");
                0
            }
        }
    }

    /// 新订阅者加入时应收到的快照
    pub fn on_subscribe(&self) -> Arc<Snapshot> {
        self.store.current()
    }

    /// 订阅
    ///
    /// 先挂接收端再读当前快照: 两者之间发生的发布不会丢失,重复部分按 revision 去重
    pub fn subscribe(&self) -> Subscription {
        let rx = self.tx.subscribe();
        let initial = self.on_subscribe();
        Subscription {
            rx,
            store: self.store.clone(),
            pending: Some(initial),
            last_revision: None,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

// ==========================================
// Subscription - 单个订阅者的有序快照流
// ==========================================
pub struct Subscription {
    rx: broadcast::Receiver<Arc<Snapshot>>,
    store: Arc<SnapshotStore>,
    pending: Option<Arc<Snapshot>>,
    last_revision: Option<u64>,
}

impl Subscription {
    /// 下一个待投递快照;网关关闭时返回 None
    pub async fn next(&mut self) -> Option<Arc<Snapshot>> {
        if let Some(initial) = self.pending.take() {
            return Some(self.mark(initial));
        }

        loop {
            match self.rx.recv().await {
                Ok(snapshot) => {
                    if self.is_new(&snapshot) {
                        return Some(self.mark(snapshot));
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "订阅者落后,直接同步到最新快照");
                    let latest = self.store.current();
                    if self.is_new(&latest) {
                        return Some(self.mark(latest));
                    }
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    pub fn last_revision(&self) -> Option<u64> {
        self.last_revision
    }

    fn is_new(&self, snapshot: &Snapshot) -> bool {
        self.last_revision
            .map_or(true, |last| snapshot.revision > last)
    }

    fn mark(&mut self, snapshot: Arc<Snapshot>) -> Arc<Snapshot> {
        self.last_revision = Some(snapshot.revision);
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::company::CompanyRecord;

    fn install(store: &SnapshotStore, code: &str) -> Arc<Snapshot> {
        store.replace(Snapshot {
            companies: vec![CompanyRecord::new(code, code, 100.0, 1.0)],
            ..Snapshot::default()
        })
    }

    #[tokio::test]
    async fn test_new_subscriber_gets_current_snapshot() {
        let store = Arc::new(SnapshotStore::new());
        install(&store, "A");
        let gateway = BroadcastGateway::new(store.clone());

        let mut sub = gateway.subscribe();
        let first = sub.next().await.unwrap();

        assert_eq!(first.revision, 1);
        assert_eq!(first.companies[0].code, "A");
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let store = Arc::new(SnapshotStore::new());
        let gateway = BroadcastGateway::new(store.clone());
        let snapshot = install(&store, "A");
        assert_eq!(gateway.publish(snapshot), 0);
    }

    #[tokio::test]
    async fn test_overlapping_join_is_deduplicated() {
        let store = Arc::new(SnapshotStore::new());
        let gateway = BroadcastGateway::new(store.clone());

        let mut sub = gateway.subscribe();
        // 订阅后、首次读取前发生的发布
        let snapshot = install(&store, "A");
        gateway.publish(snapshot);
        let next = install(&store, "B");
        gateway.publish(next);

        // 初始快照读取于订阅时刻 (revision 0)
        assert_eq!(sub.next().await.unwrap().revision, 0);
        assert_eq!(sub.next().await.unwrap().revision, 1);
        assert_eq!(sub.next().await.unwrap().revision, 2);
    }

    #[tokio::test]
    async fn test_lagged_subscriber_resyncs_to_latest() {
        let store = Arc::new(SnapshotStore::new());
        let gateway = BroadcastGateway::with_capacity(store.clone(), 2);
        let mut sub = gateway.subscribe();
        assert_eq!(sub.next().await.unwrap().revision, 0);

        for code in ["A", "B", "C", "D", "E"] {
            let snapshot = install(&store, code);
            gateway.publish(snapshot);
        }

        let mut seen = Vec::new();
        while sub.last_revision() != Some(5) {
            seen.push(sub.next().await.unwrap().revision);
        }
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(seen.last(), Some(&5));
    }
}
