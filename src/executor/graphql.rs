//! GraphQL executor
//!
//! Queries and mutations are POSTed as JSON. Subscriptions stream over SSE or
//! over a graphql-transport-ws connection.

use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::auth::apply_auth;
use crate::client::http::{
    build_url, collect_response, from_header_map, insert_default_header, send, to_header_map,
};
use crate::client::sse::{collect_events, StreamLimits};
use crate::config::EngineConfig;
use crate::errors::{ApiFlowError, Result};
use crate::graphql::GraphQlPayload;
use crate::models::{
    GraphQlRequest, OperationType, Request, RequestResponse, SentRequest, SubscriptionTransport,
};
use crate::websocket::WsOptions;
use super::websocket::{graphql_ws_session, streaming_response, to_ws_url};
use super::RequestExecutor;

const JSON: &str = "application/json";
const EVENT_STREAM: &str = "text/event-stream";

/// Executes GraphQL operations
pub struct GraphQlExecutor {
    client: Client,
    connect_timeout: Duration,
    limits: StreamLimits,
}

impl GraphQlExecutor {
    pub fn new(client: Client, config: &EngineConfig) -> Self {
        Self {
            client,
            connect_timeout: config.timeout(),
            limits: StreamLimits {
                max_events: config.max_stream_events,
                idle_timeout: config.stream_idle_timeout(),
            },
        }
    }

    async fn run(
        &self,
        gql: &GraphQlRequest,
        cancel: &CancellationToken,
    ) -> Result<RequestResponse> {
        let payload = GraphQlPayload::from_request(gql)?;
        let mut headers = gql.common.headers.clone();
        apply_auth(&gql.common.auth, &mut headers);

        match (gql.operation_type, gql.subscription_transport) {
            (OperationType::Subscription, SubscriptionTransport::WebSocket) => {
                self.subscribe_ws(gql, payload, headers, cancel).await
            }
            (OperationType::Subscription, SubscriptionTransport::Sse) => {
                self.subscribe_sse(gql, payload, headers, cancel).await
            }
            _ => self.post(gql, payload, headers, cancel).await,
        }
    }

    async fn post(
        &self,
        gql: &GraphQlRequest,
        payload: GraphQlPayload,
        mut headers: indexmap::IndexMap<String, String>,
        cancel: &CancellationToken,
    ) -> Result<RequestResponse> {
        let url = build_url(&gql.common.url, &Default::default())?;
        insert_default_header(&mut headers, "Content-Type", JSON);
        insert_default_header(&mut headers, "Accept", JSON);

        let body = payload.to_json_string();
        let builder = self
            .client
            .post(url.clone())
            .headers(to_header_map(&headers)?)
            .body(body.clone());

        let sent = SentRequest {
            method: "POST".to_string(),
            url: url.to_string(),
            headers,
            body: Some(body),
            query_params: Default::default(),
        };

        debug!(url = %sent.url, operation = ?gql.operation_type, "sending graphql operation");
        let started = Instant::now();
        let response = send(builder, cancel).await?;
        collect_response(response, started, sent, cancel).await
    }

    async fn subscribe_sse(
        &self,
        gql: &GraphQlRequest,
        payload: GraphQlPayload,
        mut headers: indexmap::IndexMap<String, String>,
        cancel: &CancellationToken,
    ) -> Result<RequestResponse> {
        let url = build_url(&gql.common.url, &Default::default())?;
        insert_default_header(&mut headers, "Content-Type", JSON);
        insert_default_header(&mut headers, "Accept", EVENT_STREAM);

        let body = payload.to_json_string();
        let builder = self
            .client
            .post(url.clone())
            .headers(to_header_map(&headers)?)
            .body(body.clone());

        let sent = SentRequest {
            method: "POST".to_string(),
            url: url.to_string(),
            headers,
            body: Some(body),
            query_params: Default::default(),
        };

        debug!(url = %sent.url, "opening graphql sse subscription");
        let started = Instant::now();
        let mut response = send(builder, cancel).await?;

        let is_event_stream = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains(EVENT_STREAM));
        if !response.status().is_success() || !is_event_stream {
            // Plain responses (errors, servers without SSE) are reported as-is
            return collect_response(response, started, sent, cancel).await;
        }

        let status = response.status();
        let response_headers = from_header_map(response.headers());
        let (events, raw) = collect_events(&mut response, self.limits, cancel).await?;

        Ok(RequestResponse {
            status_code: status.as_u16(),
            status_message: status.canonical_reason().unwrap_or("").to_string(),
            body: events.last().map(|e| e.data.clone()).unwrap_or_default(),
            headers: response_headers,
            elapsed_ms: started.elapsed().as_millis() as u64,
            size_bytes: raw.len() as u64,
            is_streaming: true,
            stream_events: events,
            sent_request: Some(sent),
        })
    }

    async fn subscribe_ws(
        &self,
        gql: &GraphQlRequest,
        payload: GraphQlPayload,
        headers: indexmap::IndexMap<String, String>,
        cancel: &CancellationToken,
    ) -> Result<RequestResponse> {
        let url = to_ws_url(&gql.common.url)?;
        let sent = SentRequest {
            method: "WS".to_string(),
            url: url.clone(),
            headers: headers.clone(),
            body: Some(payload.to_json_string()),
            query_params: Default::default(),
        };
        let options = WsOptions {
            connect_timeout: self.connect_timeout,
            idle_timeout: self.limits.idle_timeout,
            max_messages: self.limits.max_events,
            headers,
            protocols: Vec::new(),
        };

        debug!(url = %url, "opening graphql-transport-ws subscription");
        let started = Instant::now();
        let (events, end) = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ApiFlowError::Cancelled),
            result = graphql_ws_session(&url, payload, options) => result?,
        };
        Ok(streaming_response(events, &end, started, sent))
    }
}

#[async_trait]
impl RequestExecutor for GraphQlExecutor {
    fn name(&self) -> &'static str {
        "graphql"
    }

    fn can_execute(&self, request: &Request) -> bool {
        matches!(request, Request::GraphQl(_))
    }

    async fn execute(
        &self,
        request: &Request,
        cancel: &CancellationToken,
    ) -> Result<RequestResponse> {
        match request {
            Request::GraphQl(gql) => self.run(gql, cancel).await,
            other => Err(ApiFlowError::UnsupportedRequestType(other.kind().to_string())),
        }
    }
}
