//! End-to-end flows through the dashboard: upload, environments, execution
//! and history.

mod common;

use std::sync::Arc;

use apidash::export::ExportFormat;
use apidash::models::NewEnvironment;
use apidash::{Config, Dashboard, HistoryFilter, RequestOverrides, Storage};
use common::{dashboard, CannedServer, SilentServer, UNREACHABLE};
use serde_json::json;

const USERS_DOC: &str = r#"{"Users":[{"method":"get","path":"/users/{{id}}"}]}"#;

#[tokio::test]
async fn test_documented_endpoint_runs_against_active_environment() {
    let server = CannedServer::start("200 OK", "application/json", r#"{"id":42}"#).await;
    let dash = dashboard().await;

    let doc = dash
        .upload_documentation("users", USERS_DOC, None)
        .await
        .unwrap();
    assert_eq!(doc.parsed.endpoints.len(), 1);

    let env = dash
        .create_environment(
            NewEnvironment::new("local")
                .with_var("base_url", server.url.clone())
                .with_var("id", "42"),
        )
        .await
        .unwrap();
    dash.activate_environment("local").await.unwrap();

    let execution = dash
        .run_endpoint(doc.documentation.id, "GET", "/users/{{id}}", RequestOverrides::default())
        .await
        .unwrap();
    let base = server.url.clone();
    let received = server.received().await;

    assert!(received.starts_with("GET /users/42 HTTP/1.1"));
    assert_eq!(execution.result.status, Some(200));
    assert_eq!(execution.result.structured, Some(json!({"id": 42})));
    assert!(execution.unresolved.is_empty());
    assert_eq!(execution.environment.as_deref(), Some("local"));

    let recorded = dash.history_entry(execution.history_id).await.unwrap();
    assert_eq!(recorded.method, "GET");
    assert_eq!(recorded.response_status, Some(200));
    assert_eq!(recorded.environment_id, Some(env.id));
    assert_eq!(recorded.endpoint, format!("{}/users/42", base));
    assert!(recorded.error.is_none());
}

#[tokio::test]
async fn test_overrides_reach_the_wire() {
    let server = CannedServer::start("201 Created", "application/json", "{}").await;
    let dash = dashboard().await;
    let doc = dash
        .upload_documentation(
            "items",
            r#"{"Items":[{"method":"post","path":"/items","headers":{"X-Mode":"doc"}}]}"#,
            None,
        )
        .await
        .unwrap();
    dash.create_environment(NewEnvironment::new("local").with_var("base_url", server.url.clone()))
        .await
        .unwrap();
    dash.activate_environment("local").await.unwrap();

    let overrides = RequestOverrides {
        headers: vec![apidash::Header::new("x-mode", "cli")],
        query: vec![("dry".into(), "1".into())],
        body: Some(json!({"name": "widget"})),
        auth: None,
    };
    let execution = dash
        .run_endpoint(doc.documentation.id, "post", "/items", overrides)
        .await
        .unwrap();
    let received = server.received().await;

    assert_eq!(execution.result.status, Some(201));
    assert!(received.starts_with("POST /items?dry=1 HTTP/1.1"));
    let lower = received.to_lowercase();
    assert!(lower.contains("x-mode: cli"));
    assert!(!lower.contains("x-mode: doc"));
    assert!(received.ends_with(r#"{"name":"widget"}"#));
}

#[tokio::test]
async fn test_failed_request_is_recorded() {
    let dash = dashboard().await;
    let request = apidash::RequestSpec::new(apidash::HttpMethod::GET, format!("{}/down", UNREACHABLE));

    let execution = dash.execute(&request).await.unwrap();
    assert_eq!(execution.result.status, None);

    let failed = dash
        .list_history(&HistoryFilter {
            failed_only: true,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].id, execution.history_id);
    assert!(failed[0].error.is_some());
    assert_eq!(failed[0].environment_id, None);
}

#[tokio::test]
async fn test_timed_out_request_is_recorded() {
    let server = SilentServer::start().await;
    let config = Config {
        request_timeout_secs: 1,
        ..Config::default()
    };
    let dash = Dashboard::in_memory(config).await.unwrap();
    let request = apidash::RequestSpec::new(apidash::HttpMethod::POST, format!("{}/slow", server.url));

    let execution = dash.execute(&request).await.unwrap();
    assert_eq!(execution.result.status, None);

    let recorded = dash.history_entry(execution.history_id).await.unwrap();
    assert_eq!(recorded.method, "POST");
    assert_eq!(recorded.response_status, None);
    assert!(recorded.error.as_deref().unwrap_or_default().contains("timed out"));
    assert!(recorded.is_failure());
}

#[tokio::test]
async fn test_unresolved_tokens_are_sent_as_written() {
    let server = CannedServer::start("200 OK", "text/plain", "ok").await;
    let dash = dashboard().await;
    let request = apidash::RequestSpec::new(
        apidash::HttpMethod::GET,
        format!("{}/users/{{{{missing}}}}", server.url),
    );

    let preview = dash.preview(&request).await.unwrap();
    assert_eq!(preview.unresolved, vec!["missing".to_string()]);
    assert!(preview.environment.is_none());

    let execution = dash.execute(&request).await.unwrap();
    let received = server.received().await;
    assert_eq!(execution.unresolved, vec!["missing".to_string()]);
    assert!(received.contains("missing"));
}

#[tokio::test]
async fn test_postman_environment_round_trip() {
    let dash = dashboard().await;
    dash.create_environment(
        NewEnvironment::new("staging")
            .with_var("base_url", "https://staging.example.com")
            .with_var("region", "eu"),
    )
    .await
    .unwrap();

    let exported = dash
        .export_environment(Some("staging"), ExportFormat::Postman)
        .await
        .unwrap();
    let imported = dash
        .import_environment(&exported, Some("staging-copy"), true)
        .await
        .unwrap();

    assert_eq!(imported.name, "staging-copy");
    assert_eq!(imported.variables["base_url"], "https://staging.example.com");
    assert_eq!(imported.variables["region"], "eu");
    assert!(imported.is_active);

    let active = dash.active_environment().await.unwrap().unwrap();
    assert_eq!(active.id, imported.id);
}

#[tokio::test]
async fn test_history_export_covers_recorded_requests() {
    let dash = dashboard().await;
    let request = apidash::RequestSpec::new(apidash::HttpMethod::DELETE, format!("{}/x", UNREACHABLE));
    dash.execute(&request).await.unwrap();
    dash.execute(&request).await.unwrap();

    let report = dash
        .export_history(&HistoryFilter::default(), ExportFormat::Report)
        .await
        .unwrap();
    let report: serde_json::Value = serde_json::from_str(&report).unwrap();
    assert_eq!(report["summary"]["total_requests"], 2);
    assert_eq!(report["summary"]["failed_requests"], 2);

    assert_eq!(dash.clear_history(None).await.unwrap(), 2);
    assert!(dash.list_history(&HistoryFilter::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_concurrent_activation_leaves_exactly_one_active() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("apidash.db").display());
    let storage = Storage::open(&url).await.unwrap();
    let dash = Arc::new(Dashboard::with_storage(storage, Config::default()));

    let mut names = Vec::new();
    for i in 0..6 {
        let name = format!("env-{}", i);
        dash.create_environment(NewEnvironment::new(name.clone()))
            .await
            .unwrap();
        names.push(name);
    }

    let mut handles = Vec::new();
    for name in names {
        let dash = Arc::clone(&dash);
        handles.push(tokio::spawn(async move {
            dash.activate_environment(&name).await.map(|_| ())
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let active: Vec<_> = dash
        .list_environments()
        .await
        .unwrap()
        .into_iter()
        .filter(|e| e.is_active)
        .collect();
    assert_eq!(active.len(), 1);
    dash.close().await;
}
