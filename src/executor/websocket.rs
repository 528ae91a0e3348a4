//! WebSocket executor
//!
//! Connects, sends the optional initial message and collects inbound frames
//! until the server closes, the connection goes idle, or the message limit is
//! reached. The `GraphQLSubscription` flavor speaks graphql-transport-ws.

use async_trait::async_trait;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::auth::apply_auth;
use crate::config::EngineConfig;
use crate::errors::{ApiFlowError, Result};
use crate::graphql::transport_ws::{self, ClientMessage, ServerMessage};
use crate::graphql::GraphQlPayload;
use crate::models::{
    ConnectionFlavor, Request, RequestResponse, SentRequest, StreamEvent, WebSocketRequest,
};
use crate::websocket::{SessionEnd, WsClient, WsMessage, WsOptions};
use super::RequestExecutor;

const SUBSCRIPTION_ID: &str = "1";

/// Executes WebSocket requests over tokio-tungstenite
pub struct WebSocketExecutor {
    connect_timeout: Duration,
    idle_timeout: Duration,
    max_messages: usize,
}

impl WebSocketExecutor {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            connect_timeout: config.timeout(),
            idle_timeout: config.stream_idle_timeout(),
            max_messages: config.max_stream_events,
        }
    }

    pub(crate) fn options(&self) -> WsOptions {
        WsOptions {
            connect_timeout: self.connect_timeout,
            idle_timeout: self.idle_timeout,
            max_messages: self.max_messages,
            ..Default::default()
        }
    }

    async fn run(
        &self,
        ws: &WebSocketRequest,
        cancel: &CancellationToken,
    ) -> Result<RequestResponse> {
        let url = to_ws_url(&ws.common.url)?;
        let mut options = self.options();
        options.headers = ws.common.headers.clone();
        apply_auth(&ws.common.auth, &mut options.headers);
        options.protocols = ws.protocols.clone();

        let sent = SentRequest {
            method: "WS".to_string(),
            url: url.clone(),
            headers: options.headers.clone(),
            body: ws.message.clone(),
            query_params: Default::default(),
        };

        debug!(url = %url, flavor = ?ws.flavor, "opening websocket");
        let started = Instant::now();
        let session = async {
            match ws.flavor {
                ConnectionFlavor::Standard => {
                    standard_session(&url, ws.message.as_deref(), &options).await
                }
                ConnectionFlavor::GraphQlSubscription => {
                    let payload = subscription_payload(ws.message.as_deref().unwrap_or(""))?;
                    graphql_ws_session(&url, payload, options.clone()).await
                }
            }
        };

        let (events, end) = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ApiFlowError::Cancelled),
            result = session => result?,
        };

        Ok(streaming_response(events, &end, started, sent))
    }
}

/// Accept `ws(s)://`, map `http(s)://` to its WebSocket scheme, default to `ws://`
pub(crate) fn to_ws_url(raw: &str) -> Result<String> {
    let raw = raw.trim();
    let converted = if let Some(rest) = raw.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = raw.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else if raw.starts_with("ws://") || raw.starts_with("wss://") {
        raw.to_string()
    } else if raw.contains("://") {
        return Err(ApiFlowError::InvalidRequest(format!("Unsupported WebSocket URL: {}", raw)));
    } else {
        format!("ws://{}", raw)
    };
    url::Url::parse(&converted)?;
    Ok(converted)
}

/// The initial message of a GraphQL subscription: a `{"query", ...}` document
/// or the bare subscription text
fn subscription_payload(message: &str) -> Result<GraphQlPayload> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return Err(ApiFlowError::InvalidRequest(
            "GraphQL subscription requires a query".to_string(),
        ));
    }
    if trimmed.starts_with('{') {
        if let Ok(payload) = serde_json::from_str::<GraphQlPayload>(trimmed) {
            return Ok(payload);
        }
    }
    Ok(GraphQlPayload::new(trimmed))
}

pub(crate) fn streaming_response(
    events: Vec<StreamEvent>,
    end: &SessionEnd,
    started: Instant,
    sent: SentRequest,
) -> RequestResponse {
    let size_bytes = events.iter().map(|e| e.data.len() as u64).sum();
    RequestResponse {
        status_code: 200,
        status_message: end.describe(),
        body: events.last().map(|e| e.data.clone()).unwrap_or_default(),
        headers: Default::default(),
        elapsed_ms: started.elapsed().as_millis() as u64,
        size_bytes,
        is_streaming: true,
        stream_events: events,
        sent_request: Some(sent),
    }
}

async fn next_message(client: &mut WsClient, idle: Duration) -> Result<Option<WsMessage>> {
    match tokio::time::timeout(idle, client.receive()).await {
        Ok(result) => result,
        Err(_) => Ok(None),
    }
}

async fn standard_session(
    url: &str,
    message: Option<&str>,
    options: &WsOptions,
) -> Result<(Vec<StreamEvent>, SessionEnd)> {
    let mut client = WsClient::connect(url, options).await?;

    if let Some(text) = message.filter(|m| !m.is_empty()) {
        client.send_text(text).await?;
    }

    let mut events = Vec::new();
    let end = loop {
        if events.len() >= options.max_messages {
            break SessionEnd::MessageLimit;
        }
        let deadline = Instant::now();
        match next_message(&mut client, options.idle_timeout).await? {
            Some(WsMessage::Close(code, reason)) => break SessionEnd::Closed(code, reason),
            Some(msg) => events.extend(msg.to_event()),
            None if deadline.elapsed() >= options.idle_timeout => break SessionEnd::Idle,
            None => break SessionEnd::Closed(None, String::new()),
        }
    };

    client.close().await;
    Ok((events, end))
}

/// Run a graphql-transport-ws subscription and collect its `next` payloads
pub(crate) async fn graphql_ws_session(
    url: &str,
    payload: GraphQlPayload,
    mut options: WsOptions,
) -> Result<(Vec<StreamEvent>, SessionEnd)> {
    if !options.protocols.iter().any(|p| p == transport_ws::PROTOCOL) {
        options.protocols.push(transport_ws::PROTOCOL.to_string());
    }
    let init_payload = transport_ws::init_payload(&options.headers);
    let mut client = WsClient::connect(url, &options).await?;
    if client.negotiated_protocol() != Some(transport_ws::PROTOCOL) {
        debug!(url = %url, "server did not confirm graphql-transport-ws, continuing anyway");
    }

    client
        .send_text(&ClientMessage::ConnectionInit { payload: init_payload }.to_text())
        .await?;

    loop {
        match next_message(&mut client, options.connect_timeout).await? {
            Some(WsMessage::Text(text)) => match ServerMessage::parse(&text) {
                Some(ServerMessage::ConnectionAck { .. }) => break,
                Some(ServerMessage::Ping { .. }) => {
                    client.send_text(&ClientMessage::Pong.to_text()).await?
                }
                _ => debug!(message = %text, "ignoring message before connection_ack"),
            },
            Some(WsMessage::Close(code, reason)) => {
                return Err(ApiFlowError::GraphQl(format!(
                    "Connection closed before acknowledgement: {}",
                    SessionEnd::Closed(code, reason).describe()
                )));
            }
            Some(_) => {}
            None => {
                return Err(ApiFlowError::GraphQl("No connection_ack from server".to_string()));
            }
        }
    }

    client
        .send_text(
            &ClientMessage::Subscribe {
                id: SUBSCRIPTION_ID.to_string(),
                payload,
            }
            .to_text(),
        )
        .await?;

    let mut events = Vec::new();
    let end = loop {
        if events.len() >= options.max_messages {
            client
                .send_text(&ClientMessage::Complete { id: SUBSCRIPTION_ID.to_string() }.to_text())
                .await
                .ok();
            break SessionEnd::MessageLimit;
        }
        let waited = Instant::now();
        match next_message(&mut client, options.idle_timeout).await? {
            Some(WsMessage::Text(text)) => match ServerMessage::parse(&text) {
                Some(msg @ ServerMessage::Next { .. }) => events.push(payload_event(&msg)),
                Some(msg @ ServerMessage::Error { .. }) => {
                    warn!(message = %text, "subscription error");
                    events.push(payload_event(&msg));
                    break SessionEnd::Completed;
                }
                Some(ServerMessage::Complete { .. }) => break SessionEnd::Completed,
                Some(ServerMessage::Ping { .. }) => {
                    client.send_text(&ClientMessage::Pong.to_text()).await?
                }
                Some(_) => {}
                None => debug!(message = %text, "unrecognized graphql-ws message"),
            },
            Some(WsMessage::Close(code, reason)) => break SessionEnd::Closed(code, reason),
            Some(_) => {}
            None if waited.elapsed() >= options.idle_timeout => break SessionEnd::Idle,
            None => break SessionEnd::Closed(None, String::new()),
        }
    };

    client.close().await;
    Ok((events, end))
}

fn payload_event(msg: &ServerMessage) -> StreamEvent {
    let data = match msg {
        ServerMessage::Next { payload, .. } | ServerMessage::Error { payload, .. } => {
            payload.to_string()
        }
        _ => String::new(),
    };
    StreamEvent::new(data, Some(msg.kind().to_string()))
}

#[async_trait]
impl RequestExecutor for WebSocketExecutor {
    fn name(&self) -> &'static str {
        "websocket"
    }

    fn can_execute(&self, request: &Request) -> bool {
        matches!(request, Request::WebSocket(_))
    }

    async fn execute(
        &self,
        request: &Request,
        cancel: &CancellationToken,
    ) -> Result<RequestResponse> {
        match request {
            Request::WebSocket(ws) => self.run(ws, cancel).await,
            other => Err(ApiFlowError::UnsupportedRequestType(other.kind().to_string())),
        }
    }
}
