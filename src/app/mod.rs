// ==========================================
// 预算看板系统 - 应用层
// ==========================================
// 职责: 共享快照、实时广播、HTTP/WebSocket 接入
// ==========================================

pub mod broadcast;
pub mod http;
pub mod snapshot_store;
pub mod state;

// 重导出
pub use broadcast::{BroadcastGateway, Subscription};
pub use http::{router, ApiError};
pub use snapshot_store::SnapshotStore;
pub use state::AppState;
