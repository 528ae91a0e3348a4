//! Common test utilities for apiflow integration tests
//!
//! - A scripted stub executor for deterministic flow tests
//! - Request / store builders
//! - Local WebSocket servers (echo and graphql-transport-ws)
//! - CLI invocation helpers

#![allow(dead_code)]

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::handshake::server::{
    ErrorResponse, Request as HsRequest, Response as HsResponse,
};
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use apiflow::errors::{ApiFlowError, Result};
use apiflow::executor::{ExecutorFactory, RequestExecutor};
use apiflow::models::{
    Environment, Flow, FlowStep, Request, RequestCommon, RequestResponse, ResponseExtraction,
    RestRequest, SentRequest,
};
use apiflow::store::Store;

// =============================================================================
// Stub executor
// =============================================================================

enum Scripted {
    Respond(u16, String),
    Fail(String),
}

/// Executor answering from a script keyed by request id
///
/// Unscripted requests get `200 {}`. Every call is recorded with the request
/// exactly as the executor received it (after variable resolution).
#[derive(Default)]
pub struct StubExecutor {
    script: HashMap<String, Scripted>,
    cancel_on: Option<(String, CancellationToken)>,
    calls: Mutex<Vec<Request>>,
}

impl StubExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, request_id: &str, status: u16, body: &str) -> Self {
        self.script
            .insert(request_id.to_string(), Scripted::Respond(status, body.to_string()));
        self
    }

    /// Return a transport error instead of a response
    pub fn fail(mut self, request_id: &str, message: &str) -> Self {
        self.script
            .insert(request_id.to_string(), Scripted::Fail(message.to_string()));
        self
    }

    /// Cancel `token` while executing `request_id`
    pub fn cancel_on(mut self, request_id: &str, token: CancellationToken) -> Self {
        self.cancel_on = Some((request_id.to_string(), token));
        self
    }

    pub fn calls(&self) -> Vec<Request> {
        self.calls.lock().unwrap().clone()
    }

    pub fn executed_ids(&self) -> Vec<String> {
        self.calls().iter().map(|r| r.id().to_string()).collect()
    }
}

#[async_trait]
impl RequestExecutor for StubExecutor {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn can_execute(&self, _request: &Request) -> bool {
        true
    }

    async fn execute(
        &self,
        request: &Request,
        _cancel: &CancellationToken,
    ) -> Result<RequestResponse> {
        self.calls.lock().unwrap().push(request.clone());

        if let Some((ref id, ref token)) = self.cancel_on {
            if id == request.id() {
                token.cancel();
            }
        }

        let (status, body) = match self.script.get(request.id()) {
            Some(Scripted::Fail(message)) => {
                return Err(ApiFlowError::InvalidRequest(message.clone()));
            }
            Some(Scripted::Respond(status, body)) => (*status, body.clone()),
            None => (200, "{}".to_string()),
        };

        let mut headers = indexmap::IndexMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        Ok(RequestResponse {
            status_code: status,
            status_message: reqwest::StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("")
                .to_string(),
            size_bytes: body.len() as u64,
            body,
            headers,
            sent_request: Some(SentRequest {
                method: "GET".to_string(),
                url: request.common().url.clone(),
                headers: request.common().headers.clone(),
                ..Default::default()
            }),
            ..Default::default()
        })
    }
}

pub fn stub_factory(stub: &Arc<StubExecutor>) -> Arc<ExecutorFactory> {
    let executor: Arc<dyn RequestExecutor> = stub.clone();
    Arc::new(ExecutorFactory::new(vec![executor]))
}

// =============================================================================
// Builders
// =============================================================================

pub fn rest(id: &str, url: &str) -> RestRequest {
    RestRequest {
        common: RequestCommon::new(id, format!("Request {}", id), url),
        ..Default::default()
    }
}

pub fn extraction(pattern: &str, variable: &str) -> ResponseExtraction {
    ResponseExtraction {
        pattern: pattern.to_string(),
        variable_name: variable.to_string(),
        save_to_collection: false,
        enabled: true,
    }
}

pub fn flow(id: &str, steps: Vec<FlowStep>) -> Flow {
    Flow {
        id: id.to_string(),
        name: format!("Flow {}", id),
        collection_id: None,
        steps,
    }
}

pub fn step(request_id: &str, order: i32) -> FlowStep {
    FlowStep::new(request_id, order)
}

/// In-memory store holding `requests`, `flows` and `environment`
pub async fn seeded_store(
    requests: Vec<Request>,
    flows: Vec<Flow>,
    environment: Environment,
) -> Store {
    let store = Store::in_memory();
    for request in requests {
        store.requests.add(request).await.unwrap();
    }
    for flow in flows {
        store.flows.add(flow).await.unwrap();
    }
    store.save_environment(&environment).await.unwrap();
    store
}

// =============================================================================
// WebSocket servers
// =============================================================================

const PROTOCOL_HEADER: &str = "sec-websocket-protocol";

type HandshakeResult = std::result::Result<HsResponse, ErrorResponse>;

/// Accept the handshake, echoing the first requested sub-protocol
async fn accept(
    stream: tokio::net::TcpStream,
    seen_auth: Arc<Mutex<Option<String>>>,
) -> Option<tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>> {
    let callback = move |req: &HsRequest, mut resp: HsResponse| -> HandshakeResult {
        let protocol = req
            .headers()
            .get(PROTOCOL_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|p| p.trim().to_string());
        if let Some(protocol) = protocol {
            resp.headers_mut()
                .insert(PROTOCOL_HEADER, HeaderValue::from_str(&protocol).unwrap());
        }
        *seen_auth.lock().unwrap() = req
            .headers()
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        Ok(resp)
    };
    tokio_tungstenite::accept_hdr_async(stream, callback).await.ok()
}

/// Handle to a local WebSocket server
pub struct WsServer {
    pub url: String,
    /// Authorization header of the most recent handshake
    pub seen_auth: Arc<Mutex<Option<String>>>,
}

/// Echo server: echoes text and binary frames; `bye` is echoed then the
/// server closes with 1000 "bye"
pub async fn start_echo_server() -> WsServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let seen_auth = Arc::new(Mutex::new(None));
    let auth = Arc::clone(&seen_auth);

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let auth = Arc::clone(&auth);
            tokio::spawn(async move {
                let Some(mut ws) = accept(stream, auth).await else { return };
                while let Some(Ok(msg)) = ws.next().await {
                    match msg {
                        Message::Text(text) => {
                            let done = text.as_str() == "bye";
                            if ws.send(Message::Text(text)).await.is_err() {
                                break;
                            }
                            if done {
                                let frame = CloseFrame {
                                    code: CloseCode::Normal,
                                    reason: "bye".into(),
                                };
                                let _ = ws.send(Message::Close(Some(frame))).await;
                                break;
                            }
                        }
                        Message::Binary(data) => {
                            if ws.send(Message::Binary(data)).await.is_err() {
                                break;
                            }
                        }
                        Message::Close(_) => break,
                        _ => {}
                    }
                }
            });
        }
    });

    WsServer { url, seen_auth }
}

/// graphql-transport-ws server: acks `connection_init`, answers `subscribe`
/// with two `next` messages then `complete`
///
/// Each `next` payload echoes the `Authorization` value of the init payload.
pub async fn start_graphql_ws_server() -> WsServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/graphql", listener.local_addr().unwrap());
    let seen_auth = Arc::new(Mutex::new(None));
    let auth = Arc::clone(&seen_auth);

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let auth = Arc::clone(&auth);
            tokio::spawn(async move {
                let Some(mut ws) = accept(stream, auth).await else { return };
                let mut init_auth = serde_json::Value::Null;
                while let Some(Ok(msg)) = ws.next().await {
                    let Message::Text(text) = msg else { continue };
                    let value: serde_json::Value = match serde_json::from_str(text.as_str()) {
                        Ok(v) => v,
                        Err(_) => continue,
                    };
                    match value["type"].as_str() {
                        Some("connection_init") => {
                            init_auth = value["payload"]["Authorization"].clone();
                            let ack = serde_json::json!({"type": "connection_ack"}).to_string();
                            let _ = ws.send(Message::Text(ack.into())).await;
                        }
                        Some("subscribe") => {
                            let id = value["id"].as_str().unwrap_or("").to_string();
                            for tick in 1..=2 {
                                let next = serde_json::json!({
                                    "id": id,
                                    "type": "next",
                                    "payload": {"data": {"tick": tick, "auth": init_auth}}
                                });
                                let _ = ws.send(Message::Text(next.to_string().into())).await;
                            }
                            let complete = serde_json::json!({"id": id, "type": "complete"});
                            let _ = ws.send(Message::Text(complete.to_string().into())).await;
                        }
                        _ => {}
                    }
                }
            });
        }
    });

    WsServer { url, seen_auth }
}

// =============================================================================
// CLI helpers
// =============================================================================

/// Result of running the apiflow binary
#[derive(Debug)]
pub struct CliResponse {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Run the apiflow binary with an isolated config directory
pub fn apiflow(args: &[&str]) -> CliResponse {
    let config_home = tempfile::TempDir::new().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_apiflow"))
        .args(["--timeout", "5"])
        .args(args)
        .env("XDG_CONFIG_HOME", config_home.path())
        .env_remove("APIFLOW_LOG")
        .env_remove("APIFLOW_TIMEOUT")
        .env_remove("APIFLOW_INSECURE")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("Failed to execute apiflow");

    CliResponse {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        exit_code: output.status.code().unwrap_or(-1),
    }
}

/// Write `content` to `dir/name` and return its path
pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}
