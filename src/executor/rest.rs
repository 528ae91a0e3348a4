//! REST executor

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method};
use std::path::Path;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::auth::apply_auth;
use crate::client::http::{build_url, collect_response, insert_default_header, send, to_header_map};
use crate::errors::{ApiFlowError, Result};
use crate::models::{BodyType, Request, RequestResponse, RestRequest, SentRequest};
use super::RequestExecutor;

const CONTENT_TYPE: &str = "Content-Type";

/// Executes REST requests over reqwest
pub struct RestExecutor {
    client: Client,
}

impl RestExecutor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn run(&self, rest: &RestRequest, cancel: &CancellationToken) -> Result<RequestResponse> {
        let url = build_url(&rest.common.url, &rest.query_params)?;
        let method = Method::from_bytes(rest.method.as_str().as_bytes())
            .map_err(|e| ApiFlowError::InvalidRequest(format!("Invalid HTTP method: {}", e)))?;

        let mut headers = rest.common.headers.clone();
        apply_auth(&rest.common.auth, &mut headers);

        let body = rest.body.as_deref().filter(|b| !b.is_empty());
        if body.is_some() {
            if let Some(content_type) = rest.body_type.default_content_type() {
                insert_default_header(&mut headers, CONTENT_TYPE, content_type);
            }
        }

        let mut builder = self.client.request(method, url.clone());
        let mut sent_body = None;

        match rest.body_type {
            BodyType::None => {}
            BodyType::FormData => {
                // reqwest sets the multipart Content-Type with its boundary
                headers.retain(|k, _| !k.eq_ignore_ascii_case(CONTENT_TYPE));
                let (form, summary) = build_form(rest).await?;
                builder = builder.multipart(form);
                sent_body = Some(summary);
            }
            _ => {
                if let Some(body) = body {
                    builder = builder.body(body.to_string());
                    sent_body = Some(body.to_string());
                }
            }
        }

        builder = builder.headers(to_header_map(&headers)?);

        let sent = SentRequest {
            method: rest.method.to_string(),
            url: url.to_string(),
            headers,
            body: sent_body,
            query_params: rest.query_params.clone(),
        };

        debug!(method = %sent.method, url = %sent.url, "sending request");
        let started = Instant::now();
        let response = send(builder, cancel).await?;
        collect_response(response, started, sent, cancel).await
    }
}

/// Build the multipart body and a readable summary of its parts
async fn build_form(rest: &RestRequest) -> Result<(Form, String)> {
    let mut form = Form::new();
    let mut summary = Vec::new();

    for field in rest.form_fields.iter().filter(|f| f.enabled && !f.key.is_empty()) {
        form = form.text(field.key.clone(), field.value.clone());
        summary.push(format!("{}={}", field.key, field.value));
    }

    for file in rest.form_files.iter().filter(|f| f.enabled && !f.key.is_empty()) {
        let path = Path::new(&file.path);
        let contents = tokio::fs::read(path).await.map_err(|e| {
            ApiFlowError::InvalidRequest(format!("Cannot read form file '{}': {}", file.path, e))
        })?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("file")
            .to_string();
        let mime_type = match file.content_type {
            Some(ref ct) => ct.clone(),
            None => mime_guess::from_path(path)
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
        };
        let part = Part::bytes(contents)
            .file_name(filename)
            .mime_str(&mime_type)
            .map_err(|e| ApiFlowError::InvalidRequest(format!("Invalid MIME type: {}", e)))?;
        form = form.part(file.key.clone(), part);
        summary.push(format!("{}=@{}", file.key, file.path));
    }

    Ok((form, summary.join("&")))
}

#[async_trait]
impl RequestExecutor for RestExecutor {
    fn name(&self) -> &'static str {
        "rest"
    }

    fn can_execute(&self, request: &Request) -> bool {
        matches!(request, Request::Rest(_))
    }

    async fn execute(
        &self,
        request: &Request,
        cancel: &CancellationToken,
    ) -> Result<RequestResponse> {
        match request {
            Request::Rest(rest) => self.run(rest, cancel).await,
            other => Err(ApiFlowError::UnsupportedRequestType(other.kind().to_string())),
        }
    }
}
