//! End-to-end tests for the apiflow binary

mod common;

use common::{apiflow, write_file};
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn workspace(base_url: &str) -> String {
    format!(
        r#"
environments:
  - id: dev
    name: Dev
    variables:
      baseUrl: "{base_url}"
      apiKey: k-123
    secret_variable_names: [apiKey]
collections:
  - id: api
    name: API
    variables:
      version: v2
requests:
  - type: rest
    id: login
    name: Login
    url: "{{{{baseUrl}}}}/login"
    method: POST
    body: '{{"user":"ada"}}'
    body_type: json
    extractions:
      - pattern: "$.token"
        variable_name: token
  - type: rest
    id: profile
    name: Profile
    url: "{{{{baseUrl}}}}/me"
    auth:
      mode: bearer_token
      token: "{{{{token}}}}"
  - type: rest
    id: broken
    name: Broken
    url: "{{{{baseUrl}}}}/broken"
flows:
  - id: smoke
    name: Smoke
    steps:
      - request_id: profile
        order: 2
      - request_id: login
        order: 1
  - id: failing
    name: Failing
    steps:
      - request_id: broken
        order: 1
      - request_id: login
        order: 2
  - id: tolerant
    name: Tolerant
    steps:
      - request_id: broken
        order: 1
        continue_on_error: true
      - request_id: login
        order: 2
"#
    )
}

async fn mock_api() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .and(header("content-type", "application/json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"token": "tok-9"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("authorization", "Bearer tok-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"name": "Ada"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
        .mount(&server)
        .await;
    server
}

// =============================================================================
// run
// =============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_run_completed_flow() {
    let server = mock_api().await;
    let dir = TempDir::new().unwrap();
    let ws = write_file(dir.path(), "workspace.yaml", &workspace(&server.uri()));

    let r = apiflow(&["run", ws.to_str().unwrap(), "--flow", "smoke", "--env", "dev"]);

    assert_eq!(r.exit_code, 0, "stderr: {}", r.stderr);
    assert!(r.stdout.contains("FLOW: Smoke"));
    assert!(r.stdout.contains("Step 1: Login (200)"));
    assert!(r.stdout.contains("Step 2: Profile (200)"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_run_failed_flow_exit_code() {
    let server = mock_api().await;
    let dir = TempDir::new().unwrap();
    let ws = write_file(dir.path(), "workspace.yaml", &workspace(&server.uri()));

    let r = apiflow(&["run", ws.to_str().unwrap(), "-f", "failing", "-e", "dev"]);

    assert_eq!(r.exit_code, 10, "stdout: {}", r.stdout);
    assert!(r.stdout.contains("Step 1: Broken (500)"));
    assert!(!r.stdout.contains("Login"));
    assert!(r.stdout.contains("FAILED"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_run_json_output() {
    let server = mock_api().await;
    let dir = TempDir::new().unwrap();
    let ws = write_file(dir.path(), "workspace.yaml", &workspace(&server.uri()));

    let r = apiflow(&["run", ws.to_str().unwrap(), "-f", "tolerant", "-e", "dev", "--json"]);

    assert_eq!(r.exit_code, 0, "stderr: {}", r.stderr);
    let result: serde_json::Value = serde_json::from_str(&r.stdout).unwrap();
    assert_eq!(result["status"], "Completed");
    assert_eq!(result["steps"][0]["status"], "FailedContinued");
    assert_eq!(result["steps"][1]["status"], "Success");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_run_unknown_flow_is_error() {
    let dir = TempDir::new().unwrap();
    let ws = write_file(dir.path(), "workspace.yaml", &workspace("http://127.0.0.1:9"));

    let r = apiflow(&["run", ws.to_str().unwrap(), "-f", "nope", "-e", "dev"]);
    assert_eq!(r.exit_code, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unknown_request_type_is_error() {
    let dir = TempDir::new().unwrap();
    let ws = write_file(
        dir.path(),
        "workspace.json",
        r#"{"requests": [{"type": "grpc", "id": "g", "name": "G", "url": "localhost:50051"}]}"#,
    );

    let r = apiflow(&["run", ws.to_str().unwrap(), "-f", "any", "-e", "dev"]);
    assert_eq!(r.exit_code, 1);
    assert!(r.stderr.contains("Unsupported request type: grpc"));
}

// =============================================================================
// send
// =============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_send_request() {
    let server = mock_api().await;
    let dir = TempDir::new().unwrap();
    let ws = write_file(dir.path(), "workspace.yaml", &workspace(&server.uri()));
    let history = dir.path().join("history.jsonl");

    let r = apiflow(&[
        "--history",
        history.to_str().unwrap(),
        "send",
        ws.to_str().unwrap(),
        "-r",
        "login",
        "-e",
        "dev",
    ]);

    assert_eq!(r.exit_code, 0, "stderr: {}", r.stderr);
    assert!(r.stdout.contains("POST "));
    assert!(r.stdout.contains("200 OK"));
    assert!(r.stdout.contains("tok-9"));

    let lines = std::fs::read_to_string(&history).unwrap();
    assert_eq!(lines.lines().count(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_send_error_status_still_succeeds() {
    let server = mock_api().await;
    let dir = TempDir::new().unwrap();
    let ws = write_file(dir.path(), "workspace.yaml", &workspace(&server.uri()));

    let r = apiflow(&["send", ws.to_str().unwrap(), "-r", "broken", "-e", "dev", "--json"]);

    assert_eq!(r.exit_code, 0, "stderr: {}", r.stderr);
    let response: serde_json::Value = serde_json::from_str(&r.stdout).unwrap();
    assert_eq!(response["status_code"], 500);
    assert_eq!(response["body"], "oops");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_send_connection_failure() {
    let dir = TempDir::new().unwrap();
    let ws = write_file(dir.path(), "workspace.yaml", &workspace("http://127.0.0.1:9"));

    let r = apiflow(&["send", ws.to_str().unwrap(), "-r", "login", "-e", "dev"]);
    assert_eq!(r.exit_code, 1);
    assert!(r.stderr.contains("apiflow: error:"));
}

// =============================================================================
// resolve / validate
// =============================================================================

#[test]
fn test_resolve_text() {
    let dir = TempDir::new().unwrap();
    let ws = write_file(dir.path(), "workspace.yaml", &workspace("http://api.test"));

    let r = apiflow(&[
        "resolve",
        ws.to_str().unwrap(),
        "-e",
        "dev",
        "-c",
        "api",
        "{{baseUrl}}/{{version}}?key={{apiKey}}&u={{missing}}",
    ]);

    assert_eq!(r.exit_code, 0, "stderr: {}", r.stderr);
    assert_eq!(r.stdout.trim(), "http://api.test/v2?key=k-123&u={{missing}}");
    assert!(r.stderr.contains("Unresolved: missing"));
}

#[test]
fn test_validate_flow() {
    let dir = TempDir::new().unwrap();
    let ws = write_file(
        dir.path(),
        "workspace.yaml",
        r#"
flows:
  - id: dup
    name: Duplicates
    steps:
      - request_id: a
        order: 1
      - request_id: b
        order: 1
"#,
    );

    let r = apiflow(&["validate", ws.to_str().unwrap(), "-f", "dup"]);

    assert_eq!(r.exit_code, 0);
    assert!(r.stderr.contains("2 steps share order 1"));
    assert!(r.stderr.contains("request 'a' not found"));
}

#[test]
fn test_missing_workspace_file() {
    let r = apiflow(&["run", "/nonexistent/apiflow/ws.yaml", "-f", "x", "-e", "dev"]);
    assert_eq!(r.exit_code, 1);
}
