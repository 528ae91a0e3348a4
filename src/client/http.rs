//! HTTP client construction and response collection
//!
//! Shared by the REST and GraphQL executors.

use indexmap::IndexMap;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::EngineConfig;
use crate::errors::{ApiFlowError, Result};
use crate::models::{RequestResponse, SentRequest};

/// Build the reqwest client used by the HTTP-based executors
pub fn build_client(config: &EngineConfig) -> Result<Client> {
    let mut builder = Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(config.timeout())
        .referer(false);

    builder = if config.follow_redirects {
        builder.redirect(reqwest::redirect::Policy::limited(config.max_redirects))
    } else {
        builder.redirect(reqwest::redirect::Policy::none())
    };

    if config.insecure {
        builder = builder.danger_accept_invalid_certs(true);
    }

    builder.build().map_err(ApiFlowError::Request)
}

/// Parse the target URL and append query parameters in order
///
/// A URL without a scheme is treated as `http://`.
pub fn build_url(raw: &str, query: &IndexMap<String, String>) -> Result<Url> {
    let raw = raw.trim();
    let mut url = if raw.contains("://") {
        Url::parse(raw)?
    } else {
        Url::parse(&format!("http://{}", raw))?
    };

    let params: Vec<(&String, &String)> = query.iter().filter(|(k, _)| !k.is_empty()).collect();
    if !params.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in params {
            pairs.append_pair(key, value);
        }
    }
    Ok(url)
}

/// Convert an ordered header list into a reqwest header map
pub fn to_header_map(headers: &IndexMap<String, String>) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        if name.trim().is_empty() {
            continue;
        }
        let header_name = HeaderName::from_bytes(name.trim().as_bytes()).map_err(|e| {
            ApiFlowError::InvalidRequest(format!("Invalid header name '{}': {}", name, e))
        })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| {
            ApiFlowError::InvalidRequest(format!("Invalid value for header '{}': {}", name, e))
        })?;
        map.append(header_name, header_value);
    }
    Ok(map)
}

/// Flatten response headers; repeated headers are joined with `, `
pub fn from_header_map(headers: &HeaderMap) -> IndexMap<String, String> {
    let mut map: IndexMap<String, String> = IndexMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).to_string();
        map.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    map
}

/// Insert `value` for `name` unless a header with that name exists (any case)
pub fn insert_default_header(headers: &mut IndexMap<String, String>, name: &str, value: &str) {
    if !headers.keys().any(|k| k.eq_ignore_ascii_case(name)) {
        headers.insert(name.to_string(), value.to_string());
    }
}

/// Read the whole body, racing each chunk against cancellation
pub async fn read_body(response: &mut Response, cancel: &CancellationToken) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    loop {
        let chunk = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ApiFlowError::Cancelled),
            result = response.chunk() => result.map_err(ApiFlowError::Request)?,
        };
        match chunk {
            Some(bytes) => body.extend_from_slice(&bytes),
            None => break,
        }
    }
    Ok(body)
}

/// Send a prepared request, cancelling the transfer if the token fires
pub async fn send(
    request: reqwest::RequestBuilder,
    cancel: &CancellationToken,
) -> Result<Response> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ApiFlowError::Cancelled),
        result = request.send() => result.map_err(ApiFlowError::Request),
    }
}

/// Turn a reqwest response into a [`RequestResponse`]
pub async fn collect_response(
    mut response: Response,
    started: Instant,
    sent: SentRequest,
    cancel: &CancellationToken,
) -> Result<RequestResponse> {
    let status = response.status();
    let headers = from_header_map(response.headers());
    let body = read_body(&mut response, cancel).await?;

    Ok(RequestResponse {
        status_code: status.as_u16(),
        status_message: status.canonical_reason().unwrap_or("").to_string(),
        size_bytes: body.len() as u64,
        body: String::from_utf8_lossy(&body).into_owned(),
        headers,
        elapsed_ms: started.elapsed().as_millis() as u64,
        is_streaming: false,
        stream_events: Vec::new(),
        sent_request: Some(sent),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_round_trip() {
        let mut headers = IndexMap::new();
        headers.insert("X-One".to_string(), "1".to_string());
        headers.insert("Accept".to_string(), "application/json".to_string());
        let map = to_header_map(&headers).unwrap();
        assert_eq!(map.get("x-one").unwrap(), "1");

        let back = from_header_map(&map);
        assert_eq!(back.get("accept").map(String::as_str), Some("application/json"));
    }

    #[test]
    fn test_repeated_headers_joined() {
        let mut map = HeaderMap::new();
        map.append("set-cookie", HeaderValue::from_static("a=1"));
        map.append("set-cookie", HeaderValue::from_static("b=2"));
        let flat = from_header_map(&map);
        assert_eq!(flat.get("set-cookie").map(String::as_str), Some("a=1, b=2"));
    }

    #[test]
    fn test_invalid_header_name() {
        let mut headers = IndexMap::new();
        headers.insert("Bad Header".to_string(), "x".to_string());
        assert!(matches!(to_header_map(&headers), Err(ApiFlowError::InvalidRequest(_))));
    }

    #[test]
    fn test_insert_default_header() {
        let mut headers = IndexMap::new();
        headers.insert("content-type".to_string(), "text/csv".to_string());
        insert_default_header(&mut headers, "Content-Type", "application/json");
        insert_default_header(&mut headers, "Accept", "*/*");
        assert_eq!(headers.get("content-type").map(String::as_str), Some("text/csv"));
        assert_eq!(headers.get("Accept").map(String::as_str), Some("*/*"));
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn test_build_url() {
        let mut query = IndexMap::new();
        query.insert("q".to_string(), "a b".to_string());
        query.insert("".to_string(), "ignored".to_string());
        query.insert("page".to_string(), "2".to_string());

        let url = build_url("https://api.test/search?x=1", &query).unwrap();
        assert_eq!(url.as_str(), "https://api.test/search?x=1&q=a+b&page=2");

        let url = build_url("localhost:8080/ping", &IndexMap::new()).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/ping");

        assert!(build_url("http://", &IndexMap::new()).is_err());
    }

    #[test]
    fn test_build_client() {
        assert!(build_client(&EngineConfig::default()).is_ok());
    }
}
