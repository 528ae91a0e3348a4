//! Integration tests for single request execution

mod common;

use common::{extraction, rest, seeded_store, stub_factory, StubExecutor};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use apiflow::errors::ApiFlowError;
use apiflow::history::{HistorySink, JsonlHistory, MemoryHistory};
use apiflow::models::{Collection, Environment, RequestKind, VariableScope};
use apiflow::pipeline::RequestRunner;

fn env() -> Environment {
    Environment::new("dev", "Dev").with_variable("host", "env.test")
}

#[tokio::test]
async fn test_extraction_is_persisted() {
    let mut login = rest("login", "http://{{host}}/login");
    login.common.extractions.push(extraction("$.token", "token"));
    let mut refresh = extraction("$.refresh", "refresh");
    refresh.save_to_collection = true;
    login.common.extractions.push(refresh);
    login.common.collection_id = Some("api".to_string());

    let store = seeded_store(vec![login.into()], vec![], env()).await;
    store.save_collection(&Collection::new("api", "API")).await.unwrap();

    let stub = Arc::new(StubExecutor::new().respond(
        "login",
        200,
        r#"{"token":"t-1","refresh":"r-1"}"#,
    ));
    let runner = RequestRunner::new(store.clone(), stub_factory(&stub));

    let response = runner
        .execute("login", "dev", None, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(response.status_code, 200);
    assert_eq!(stub.calls()[0].common().url, "http://env.test/login");

    let environment = store.load_environment("dev").await.unwrap();
    assert_eq!(environment.get_variable("token"), Some("t-1"));
    assert_eq!(environment.get_variable("host"), Some("env.test"));
    let collection = store.load_collection("api").await.unwrap();
    assert_eq!(collection.get_variable("refresh"), Some("r-1"));
}

#[tokio::test]
async fn test_secret_values_survive_extraction_save() {
    let mut request = rest("r", "http://{{host}}/");
    request.common.extractions.push(extraction("$.id", "lastId"));

    let mut environment = env().with_variable("apiKey", "s3cret");
    environment.secret_variable_names.insert("apiKey".to_string());
    let store = seeded_store(vec![request.into()], vec![], environment).await;

    let stub = Arc::new(StubExecutor::new().respond("r", 200, r#"{"id":7}"#));
    RequestRunner::new(store.clone(), stub_factory(&stub))
        .execute("r", "dev", None, &CancellationToken::new())
        .await
        .unwrap();

    // Plain repository never sees the secret value
    let plain = store.environments.get_by_id("dev").await.unwrap().unwrap();
    assert!(plain.variables.get("apiKey").is_none_or(|v| v.is_empty()));

    let loaded = store.load_environment("dev").await.unwrap();
    assert_eq!(loaded.get_variable("apiKey"), Some("s3cret"));
    assert_eq!(loaded.get_variable("lastId"), Some("7"));
}

#[tokio::test]
async fn test_collection_chain_resolution() {
    let mut request = rest("r", "http://{{host}}/{{version}}/{{resource}}");
    request.common.collection_id = Some("child".to_string());
    let store = seeded_store(vec![request.into()], vec![], env()).await;

    let mut parent = Collection::new("parent", "Parent")
        .with_variable("host", "parent.test")
        .with_variable("version", "v1")
        .with_variable("resource", "parent-resource");
    parent.parent_collection_id = None;
    let mut child = Collection::new("child", "Child").with_variable("resource", "orders");
    child.parent_collection_id = Some("parent".to_string());
    store.save_collection(&parent).await.unwrap();
    store.save_collection(&child).await.unwrap();

    let stub = Arc::new(StubExecutor::new());
    RequestRunner::new(store.clone(), stub_factory(&stub))
        .execute("r", "dev", None, &CancellationToken::new())
        .await
        .unwrap();

    // Nearest collection wins, then ancestors, then the environment
    assert_eq!(stub.calls()[0].common().url, "http://parent.test/v1/orders");

    // Flattening does not leak parent variables into the stored child
    let stored_child = store.load_collection("child").await.unwrap();
    assert!(stored_child.get_variable("version").is_none());
}

#[tokio::test]
async fn test_explicit_collection_overrides_request_collection() {
    let mut request = rest("r", "http://{{host}}/");
    request.common.collection_id = Some("a".to_string());
    let store = seeded_store(vec![request.into()], vec![], env()).await;
    store
        .save_collection(&Collection::new("a", "A").with_variable("host", "a.test"))
        .await
        .unwrap();
    store
        .save_collection(&Collection::new("b", "B").with_variable("host", "b.test"))
        .await
        .unwrap();

    let stub = Arc::new(StubExecutor::new());
    RequestRunner::new(store, stub_factory(&stub))
        .execute("r", "dev", Some("b"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(stub.calls()[0].common().url, "http://b.test/");
}

#[tokio::test]
async fn test_history_is_recorded() {
    let store = seeded_store(vec![rest("r", "http://{{host}}/ping").into()], vec![], env()).await;
    let stub = Arc::new(StubExecutor::new().respond("r", 503, "down"));
    let history = Arc::new(MemoryHistory::new());
    let sink: Arc<dyn HistorySink> = history.clone();
    let runner = RequestRunner::new(store, stub_factory(&stub)).with_history(sink);

    // Error statuses are still successful executions
    let response = runner
        .execute("r", "dev", None, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(response.status_code, 503);

    let entries = history.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].request_id, "r");
    assert_eq!(entries[0].request_kind, RequestKind::Rest);
    assert_eq!(entries[0].environment_id, "dev");
    assert!(entries[0].collection_id.is_none());
    assert_eq!(entries[0].sent_request.url, "http://env.test/ping");
    assert_eq!(entries[0].response.body, "down");
}

#[tokio::test]
async fn test_jsonl_history_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("nested").join("history.jsonl");
    let store = seeded_store(vec![rest("r", "http://{{host}}/").into()], vec![], env()).await;
    let stub = Arc::new(StubExecutor::new());
    let runner = RequestRunner::new(store, stub_factory(&stub))
        .with_history(Arc::new(JsonlHistory::new(&path)));

    for _ in 0..2 {
        runner
            .execute("r", "dev", None, &CancellationToken::new())
            .await
            .unwrap();
    }

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    let entry: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(entry["request_id"], "r");
}

#[tokio::test]
async fn test_errors_propagate() {
    let store = seeded_store(vec![rest("r", "http://{{host}}/").into()], vec![], env()).await;
    let stub = Arc::new(StubExecutor::new().fail("r", "boom"));
    let history = Arc::new(MemoryHistory::new());
    let runner = RequestRunner::new(store, stub_factory(&stub)).with_history(history.clone());
    let cancel = CancellationToken::new();

    let err = runner.execute("missing", "dev", None, &cancel).await.unwrap_err();
    assert!(matches!(err, ApiFlowError::NotFound { kind: "Request", .. }));

    let err = runner.execute("r", "prod", None, &cancel).await.unwrap_err();
    assert!(matches!(err, ApiFlowError::NotFound { kind: "Environment", .. }));

    let err = runner.execute("r", "dev", Some("ghost"), &cancel).await.unwrap_err();
    assert!(matches!(err, ApiFlowError::NotFound { kind: "Collection", .. }));

    let err = runner.execute("r", "dev", None, &cancel).await.unwrap_err();
    assert!(matches!(err, ApiFlowError::InvalidRequest(_)));

    assert!(history.entries().is_empty());
}
