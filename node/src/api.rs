//! # REST + WebSocket API
//!
//! Builds the axum router that exposes the validator node's HTTP interface.
//! All endpoints share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                   | Description                          |
//! |--------|------------------------|---------------------------------------|
//! | GET    | `/health`              | Liveness probe                        |
//! | GET    | `/status`              | Node status summary                   |
//! | POST   | `/rpc`                 | JSON-RPC 2.0 gateway                  |
//! | GET    | `/ws`                  | WebSocket for live block updates      |
//! | GET    | `/validators`          | Validator set at the chain tip        |
//! | GET    | `/blocks/:number`      | Block by number                       |
//! | GET    | `/state/*path`         | Live DB value at a path               |

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use vesper_consensus::network::transport::NodeView;
use vesper_consensus::network::ConsensusEngine;

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone — everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// View onto the node's reconstructor, mempool, and local address.
    pub node: Arc<dyn NodeView>,
    /// The consensus engine driving this node's participation.
    pub engine: Arc<ConsensusEngine>,
    /// Broadcast channel for live event notifications.
    pub event_tx: broadcast::Sender<NodeEvent>,
    /// Reference to Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
}

/// Events pushed to WebSocket subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeEvent {
    /// A new block was committed.
    #[serde(rename = "new_block")]
    NewBlock {
        number: u64,
        hash: String,
        tx_count: u64,
        timestamp: u64,
    },
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
///
/// The returned router is ready to be served on the configured RPC port.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/rpc", post(rpc_handler))
        .route("/ws", get(ws_handler))
        .route("/validators", get(validators_handler))
        .route("/blocks/{number}", get(block_by_number_handler))
        .route("/state/{*path}", get(state_path_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// JSON-RPC Types
// ---------------------------------------------------------------------------

/// A JSON-RPC 2.0 request envelope.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version. Must be "2.0".
    pub jsonrpc: String,
    /// The method to invoke.
    pub method: String,
    /// Method parameters (positional or named).
    pub params: Option<serde_json::Value>,
    /// Request identifier. Echoed back in the response.
    pub id: serde_json::Value,
}

/// A JSON-RPC 2.0 response envelope.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    /// Protocol version. Always "2.0".
    pub jsonrpc: String,
    /// The result on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// The error on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    /// Request identifier, echoed from the request.
    pub id: serde_json::Value,
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    /// Numeric error code.
    pub code: i32,
    /// Short human-readable error description.
    pub message: String,
    /// Optional structured error data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// Response payload for `GET /status`.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Node software version.
    pub version: String,
    /// This node's address.
    pub address: String,
    /// Engine lifecycle state.
    pub engine_status: String,
    /// Latest committed block number.
    pub block_number: i64,
    /// Current consensus round at the chain tip.
    pub round: u64,
    /// Whether the block store has completed at least one sync exchange.
    pub synced: bool,
    /// ISO-8601 timestamp of the response.
    pub timestamp: String,
}

/// One entry of `GET /validators`.
#[derive(Debug, Serialize)]
pub struct ValidatorInfo {
    pub address: String,
    pub stake: u64,
}

/// Response payload for `GET /blocks/:number`.
#[derive(Debug, Serialize)]
pub struct BlockResponse {
    pub number: u64,
    pub hash: String,
    pub last_hash: String,
    pub proposer: String,
    pub tx_count: u64,
    pub timestamp: u64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health` — returns 200 if the node is alive.
///
/// This is the liveness probe for orchestrators (k8s, systemd, etc.).
/// It intentionally does not check internal subsystem health — that
/// belongs in `/status`.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status` — returns node status summary.
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let block_number = state.node.reconstructor().lock().block_store.last_block_number();
    let consensus_state = state.engine.state();
    let synced = state.node.reconstructor().lock().block_store.synced_after_startup();

    let resp = StatusResponse {
        version: state.version.clone(),
        address: state.node.local_address().to_string(),
        engine_status: format!("{:?}", state.engine.status()),
        block_number,
        round: consensus_state.round,
        synced,
        timestamp: chrono::Utc::now().to_rfc3339(),
    };
    Json(resp)
}

/// `POST /rpc` — JSON-RPC 2.0 gateway.
///
/// Routes method calls to internal handlers. Unknown methods return
/// error code -32601 (Method not found).
async fn rpc_handler(
    State(state): State<AppState>,
    Json(req): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    if req.jsonrpc != "2.0" {
        return Json(JsonRpcResponse {
            jsonrpc: "2.0".into(),
            result: None,
            error: Some(JsonRpcError {
                code: -32600,
                message: "Invalid Request: jsonrpc must be \"2.0\"".into(),
                data: None,
            }),
            id: req.id,
        });
    }

    let (result, error) = match req.method.as_str() {
        "vesper_blockNumber" => {
            let number = state.node.reconstructor().lock().block_store.last_block_number();
            (Some(serde_json::json!(number)), None)
        }
        "vesper_engineStatus" => {
            (Some(serde_json::json!(format!("{:?}", state.engine.status()))), None)
        }
        "vesper_address" => (Some(serde_json::json!(state.node.local_address())), None),
        "vesper_version" => (Some(serde_json::json!(state.version)), None),
        "vesper_getBlock" => {
            let number = req
                .params
                .as_ref()
                .and_then(|p| p.as_array())
                .and_then(|arr| arr.first())
                .and_then(|v| v.as_u64());

            match number {
                Some(n) => match state.node.reconstructor().lock().block_store.get_block_by_number(n) {
                    Some(block) => (Some(serde_json::to_value(to_block_response(&block)).unwrap()), None),
                    None => (
                        None,
                        Some(JsonRpcError { code: -32001, message: "block not found".into(), data: None }),
                    ),
                },
                None => (
                    None,
                    Some(JsonRpcError {
                        code: -32602,
                        message: "Invalid params: expected [number]".into(),
                        data: None,
                    }),
                ),
            }
        }
        _ => (
            None,
            Some(JsonRpcError {
                code: -32601,
                message: format!("Method not found: {}", req.method),
                data: None,
            }),
        ),
    };

    Json(JsonRpcResponse {
        jsonrpc: "2.0".into(),
        result,
        error,
        id: req.id,
    })
}

/// `GET /ws` — WebSocket upgrade for live event streaming.
///
/// Clients receive JSON-encoded [`NodeEvent`] messages for each newly
/// committed block. The connection is read-only from the server's
/// perspective; client messages are ignored.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

/// Drives a single WebSocket connection, forwarding broadcast events
/// until the client disconnects or the channel is closed.
async fn handle_ws_connection(mut socket: WebSocket, state: AppState) {
    let mut rx = state.event_tx.subscribe();

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Ok(ev) => {
                        let payload = match serde_json::to_string(&ev) {
                            Ok(s) => s,
                            Err(e) => {
                                tracing::warn!("failed to serialize ws event: {}", e);
                                continue;
                            }
                        };
                        if socket.send(Message::Text(payload.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("ws subscriber lagged by {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(_)) => {
                        // Client messages are ignored — this is a push-only channel.
                    }
                    _ => break,
                }
            }
        }
    }
}

/// `GET /validators` — returns the validator set recorded in the latest
/// committed block.
async fn validators_handler(State(state): State<AppState>) -> impl IntoResponse {
    let reconstructor = state.node.reconstructor().lock();
    let validators = reconstructor
        .block_store
        .last_block()
        .map(|b| {
            b.validators
                .iter()
                .map(|(address, stake)| ValidatorInfo { address: address.clone(), stake: *stake })
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    Json(validators)
}

fn to_block_response(block: &vesper_consensus::storage::block::Block) -> BlockResponse {
    BlockResponse {
        number: block.number,
        hash: block.hash.clone(),
        last_hash: block.last_hash.clone(),
        proposer: block.proposer.clone(),
        tx_count: block.transactions.len() as u64,
        timestamp: block.timestamp,
    }
}

/// `GET /blocks/:number` — returns a block by its number.
async fn block_by_number_handler(
    Path(number): Path<u64>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let block = state.node.reconstructor().lock().block_store.get_block_by_number(number);
    match block {
        Some(block) => Json(to_block_response(&block)).into_response(),
        None => (StatusCode::NOT_FOUND, "block not found").into_response(),
    }
}

/// `GET /state/*path` — returns the live-DB value at the given path.
///
/// The path segment is matched exactly against the key space the consensus
/// engine and application transactions write into (e.g.
/// `/consensus/number/42/propose`, `/app/counter`).
async fn state_path_handler(
    Path(path): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let reconstructor = state.node.reconstructor().lock();
    let key = format!("/{path}");
    match reconstructor.live_db().get_value(&key) {
        Ok(Some(value)) => Json(value).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "no value at path").into_response(),
        Err(e) => {
            tracing::error!("state db read failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "state db read failed").into_response()
        }
    }
}
