// ==========================================
// 预算看板系统 - HTTP / WebSocket 接口
// ==========================================
// 路由:
// - GET  /api/data                    当前快照
// - GET  /api/companies/{code}/report 合并后的公司记录 + 原始费用流水
// - POST /api/refresh                 请求按需重新合并 (202)
// - GET  /ws                          实时推送 {"type":"update","data":快照}
// ==========================================

use crate::app::state::AppState;
use crate::domain::adjustment::CompanyExpenseReport;
use crate::domain::snapshot::Snapshot;
use crate::engine::pipeline::PipelineCommand;
use crate::repository::error::RepositoryError;
use axum::extract::ws::{self, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, warn};

// ==========================================
// ApiError
// ==========================================
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("服务暂不可用: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("内部错误: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
            ApiError::Repository(RepositoryError::NotFound { .. }) => {
                (StatusCode::NOT_FOUND, "not_found")
            }
            ApiError::Repository(_) => (StatusCode::INTERNAL_SERVER_ERROR, "repository_error"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };
        if status.is_server_error() {
            error!(error = %self, "请求处理失败");
        }
        let body = ErrorBody {
            error: self.to_string(),
            code,
        };
        (status, Json(body)).into_response()
    }
}

/// WebSocket 推送消息
#[derive(Serialize)]
struct WsMessage<'a> {
    #[serde(rename = "type")]
    msg_type: &'static str,
    data: &'a Snapshot,
}

#[derive(Serialize)]
struct RefreshAccepted {
    status: &'static str,
}

/// 构建路由
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/api/data", get(api_data))
        .route("/api/companies/{code}/report", get(api_company_report))
        .route("/api/refresh", post(api_refresh))
        .with_state(state)
}

/// GET /api/data
async fn api_data(State(state): State<Arc<AppState>>) -> Json<Snapshot> {
    let snapshot = state.snapshots.current();
    Json(Snapshot::clone(&snapshot))
}

/// GET /api/companies/{code}/report
async fn api_company_report(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<CompanyExpenseReport>, ApiError> {
    let snapshot = state.snapshots.current();
    let company = snapshot
        .find_company(&code)
        .cloned()
        .ok_or_else(|| ApiError::NotFound(format!("公司 {}", code)))?;

    let budget = state.budget.clone();
    let expenses = tokio::task::spawn_blocking(move || budget.expenses_for(&code))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(Json(CompanyExpenseReport { company, expenses }))
}

/// POST /api/refresh
async fn api_refresh(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<RefreshAccepted>), ApiError> {
    match state.commands.try_send(PipelineCommand::Remerge) {
        // 邮箱已满说明已有周期排队,本次请求会被合并进去
        Ok(()) | Err(TrySendError::Full(_)) => Ok((
            StatusCode::ACCEPTED,
            Json(RefreshAccepted { status: "queued" }),
        )),
        Err(TrySendError::Closed(_)) => Err(ApiError::Unavailable("管道未运行".to_string())),
    }
}

// ==========================================
// WebSocket
// ==========================================

async fn ws_handler(State(state): State<Arc<AppState>>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_ws_client(socket, state))
}

/// 单个 WebSocket 客户端: 加入时先收到当前快照,之后按发布顺序收到每个新快照
async fn handle_ws_client(socket: WebSocket, state: Arc<AppState>) {
    let (mut tx, mut rx) = socket.split();
    let mut subscription = state.gateway.subscribe();

    let send_task = tokio::spawn(async move {
        while let Some(snapshot) = subscription.next().await {
            let msg = WsMessage {
                msg_type: "update",
                data: &snapshot,
            };
            let json = match serde_json::to_string(&msg) {
                Ok(json) => json,
                Err(e) => {
                    warn!(error = %e, revision = snapshot.revision, "快照序列化失败");
                    continue;
                }
            };
            if tx.send(ws::Message::Text(json.into())).await.is_err() {
                break; // 客户端已断开
            }
        }
    });

    // 客户端消息只用于探测断开
    while let Some(msg) = rx.next().await {
        match msg {
            Ok(ws::Message::Close(_)) | Err(_) => break,
            _ => {}
        }
    }

    send_task.abort();
    debug!("WebSocket 客户端已断开");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::company::CompanyRecord;

    #[test]
    fn test_ws_message_shape() {
        let snapshot = Snapshot {
            revision: 3,
            companies: vec![CompanyRecord::new("C001", "Alfa", 100.0, 95.0)],
            ..Snapshot::default()
        };
        let msg = WsMessage {
            msg_type: "update",
            data: &snapshot,
        };

        let value = serde_json::to_value(&msg).unwrap();

        assert_eq!(value["type"], "update");
        assert_eq!(value["data"]["revision"], 3);
        assert_eq!(value["data"]["companies"][0]["status"], "critical");
    }

    #[test]
    fn test_not_found_status() {
        let response = ApiError::NotFound("公司 X".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
