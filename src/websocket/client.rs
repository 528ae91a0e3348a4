//! WebSocket client implementation

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        client::IntoClientRequest,
        http::{HeaderName, HeaderValue},
        protocol::Message,
    },
    MaybeTlsStream, WebSocketStream,
};

use crate::errors::{ApiFlowError, Result};
use super::types::{WsMessage, WsOptions};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const SEC_WEBSOCKET_PROTOCOL: &str = "Sec-WebSocket-Protocol";

/// WebSocket client for sending and receiving messages
pub struct WsClient {
    stream: WsStream,
    negotiated_protocol: Option<String>,
}

impl WsClient {
    /// Connect to a WebSocket server
    pub async fn connect(url: &str, options: &WsOptions) -> Result<Self> {
        let mut request = url
            .into_client_request()
            .map_err(|e| ApiFlowError::WebSocket(format!("Invalid WebSocket URL: {}", e)))?;

        let headers = request.headers_mut();
        for (key, value) in &options.headers {
            let name = key.parse::<HeaderName>().map_err(|e| {
                ApiFlowError::InvalidRequest(format!("Invalid header name '{}': {}", key, e))
            })?;
            let val = HeaderValue::from_str(value).map_err(|e| {
                ApiFlowError::InvalidRequest(format!("Invalid value for header '{}': {}", key, e))
            })?;
            headers.insert(name, val);
        }

        let protocols: Vec<&str> = options
            .protocols
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect();
        if !protocols.is_empty() {
            let val = HeaderValue::from_str(&protocols.join(", "))
                .map_err(|e| ApiFlowError::InvalidRequest(format!("Invalid sub-protocol: {}", e)))?;
            headers.insert(SEC_WEBSOCKET_PROTOCOL, val);
        }

        let (stream, response) =
            tokio::time::timeout(options.connect_timeout, connect_async(request))
                .await
                .map_err(|_| ApiFlowError::Timeout(options.connect_timeout.as_secs_f64()))?
                .map_err(|e| ApiFlowError::WebSocket(format!("Connection failed: {}", e)))?;

        let negotiated_protocol = response
            .headers()
            .get(SEC_WEBSOCKET_PROTOCOL)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        if let Some(ref proto) = negotiated_protocol {
            tracing::debug!(protocol = %proto, "negotiated websocket sub-protocol");
        }

        Ok(Self {
            stream,
            negotiated_protocol,
        })
    }

    pub fn negotiated_protocol(&self) -> Option<&str> {
        self.negotiated_protocol.as_deref()
    }

    /// Send a text message
    pub async fn send_text(&mut self, text: &str) -> Result<()> {
        self.stream
            .send(Message::Text(text.to_string().into()))
            .await
            .map_err(|e| ApiFlowError::WebSocket(format!("Send failed: {}", e)))
    }

    /// Receive the next message; `None` when the stream ended
    pub async fn receive(&mut self) -> Result<Option<WsMessage>> {
        match self.stream.next().await {
            Some(Ok(msg)) => Ok(Some(Self::convert_message(msg))),
            Some(Err(e)) => Err(ApiFlowError::WebSocket(format!("Receive error: {}", e))),
            None => Ok(None),
        }
    }

    /// Close the connection; errors from an already-closed peer are ignored
    pub async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            tracing::debug!(error = %e, "websocket close failed");
        }
    }

    /// Convert tungstenite message to our message type
    fn convert_message(msg: Message) -> WsMessage {
        match msg {
            Message::Text(s) => WsMessage::Text(s.to_string()),
            Message::Binary(b) => WsMessage::Binary(b.to_vec()),
            Message::Ping(b) => WsMessage::Ping(b.to_vec()),
            Message::Pong(b) => WsMessage::Pong(b.to_vec()),
            Message::Close(frame) => {
                let (code, reason) = frame
                    .map(|f| (Some(f.code.into()), f.reason.to_string()))
                    .unwrap_or((None, String::new()));
                WsMessage::Close(code, reason)
            }
            Message::Frame(_) => WsMessage::Binary(vec![]),
        }
    }
}
