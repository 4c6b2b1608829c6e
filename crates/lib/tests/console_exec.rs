//! Integration test: start the console on a free port and drive /health and /api/exec over HTTP.
//! `echo` stands in for the trusted binary so the argv the engine receives is visible in the output.
//! The server task is left running when each test ends.

use lib::config::Config;
use lib::console;
use lib::exec::{Allowlist, CommandRunner, DemoRunner, ExecutionEngine, SandboxedRunner};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind free port");
    listener.local_addr().expect("local_addr").port()
}

/// Start the console with `runner` and wait until /health answers. Returns the base URL.
async fn start(runner: Arc<dyn CommandRunner>, configure: impl FnOnce(&mut Config)) -> String {
    let port = free_port();
    let mut config = Config::default();
    config.console.port = port;
    config.console.bind = "127.0.0.1".to_string();
    configure(&mut config);

    tokio::spawn(async move {
        let _ = console::serve(config, runner, Arc::new(Allowlist::builtin())).await;
    });

    let base = format!("http://127.0.0.1:{}", port);
    let client = reqwest::Client::new();
    for _ in 0..100 {
        if let Ok(resp) = client.get(format!("{}/health", base)).send().await {
            if resp.status().is_success() {
                return base;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("console on {} did not become healthy within 5s", base);
}

fn echo_runner() -> Arc<dyn CommandRunner> {
    Arc::new(SandboxedRunner::new(
        Arc::new(Allowlist::builtin()),
        ExecutionEngine::new("echo", Duration::from_secs(5)),
    ))
}

async fn exec(base: &str, command: &str) -> (StatusCode, Value) {
    let resp = reqwest::Client::new()
        .post(format!("{}/api/exec", base))
        .json(&json!({ "command": command }))
        .send()
        .await
        .expect("POST /api/exec");
    let status = resp.status();
    (status, resp.json().await.expect("parse JSON"))
}

#[cfg(unix)]
#[tokio::test]
async fn authorized_commands_run_with_full_argv() {
    let base = start(echo_runner(), |_| {}).await;

    let (status, body) = exec(&base, "email list --limit 10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "output": "email list --limit 10\n" }));

    let (status, body) = exec(&base, "calendar events list --days 7").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["output"], "calendar events list --days 7\n");

    let (status, body) = exec(&base, "version").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["output"], "version\n");
}

#[tokio::test]
async fn rejected_commands_are_forbidden() {
    let base = start(echo_runner(), |_| {}).await;

    let (status, body) = exec(&base, "").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({ "error": "Command not allowed: empty command" }));

    let (status, body) = exec(&base, "email list; rm -rf /").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body,
        json!({ "error": "Command not allowed: contains dangerous characters" })
    );

    let (status, body) = exec(&base, "sudo anything").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({ "error": "Command not allowed: sudo anything" }));
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let base = start(echo_runner(), |_| {}).await;
    let resp = reqwest::Client::new()
        .post(format!("{}/api/exec", base))
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .expect("POST /api/exec");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("parse JSON");
    assert_eq!(body, json!({ "error": "Invalid request body" }));
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let base = start(echo_runner(), |c| c.console.max_body_bytes = 64).await;
    let command = format!("email list {}", "x".repeat(256));
    let resp = reqwest::Client::new()
        .post(format!("{}/api/exec", base))
        .json(&json!({ "command": command }))
        .send()
        .await
        .expect("POST /api/exec");
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn get_exec_not_allowed() {
    let base = start(echo_runner(), |_| {}).await;
    let resp = reqwest::get(format!("{}/api/exec", base))
        .await
        .expect("GET /api/exec");
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn launch_failure_reported_as_data() {
    let runner: Arc<dyn CommandRunner> = Arc::new(SandboxedRunner::new(
        Arc::new(Allowlist::builtin()),
        ExecutionEngine::new("/nonexistent/conduit-test-binary", Duration::from_secs(5)),
    ));
    let base = start(runner, |_| {}).await;
    let (status, body) = exec(&base, "email list").await;
    assert_eq!(status, StatusCode::OK);
    let err = body["error"].as_str().expect("error field");
    assert!(err.starts_with("Command failed: "), "{}", err);
    assert!(body.get("output").is_none());
}

#[cfg(unix)]
#[tokio::test]
async fn timeout_reported_within_bound() {
    let runner: Arc<dyn CommandRunner> = Arc::new(SandboxedRunner::new(
        Arc::new(Allowlist::from_entries(["10"])),
        ExecutionEngine::new("sleep", Duration::from_millis(300)),
    ));
    let base = start(runner, |_| {}).await;
    let started = std::time::Instant::now();
    let (status, body) = exec(&base, "10").await;
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "error": "Command failed: timed out after 300ms" }));
}

#[tokio::test]
async fn health_commands_and_page() {
    let base = start(Arc::new(DemoRunner), |_| {}).await;

    let health: Value = reqwest::get(format!("{}/health", base))
        .await
        .expect("GET /health")
        .json()
        .await
        .expect("parse JSON");
    assert_eq!(health["runtime"], "running");
    assert_eq!(health["mode"], "demo");

    let commands: Value = reqwest::get(format!("{}/api/commands", base))
        .await
        .expect("GET /api/commands")
        .json()
        .await
        .expect("parse JSON");
    let list = commands["commands"].as_array().expect("commands array");
    assert!(list.iter().any(|c| c == "calendar events list"));
    assert!(list.iter().any(|c| c == "version"));

    let page = reqwest::get(&base).await.expect("GET /");
    assert!(page.status().is_success());
    assert!(page.text().await.expect("body").contains("/api/exec"));
}

#[tokio::test]
async fn demo_mode_returns_canned_output() {
    let base = start(Arc::new(DemoRunner), |c| c.demo = true).await;
    let (status, body) = exec(&base, "email list").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["output"].as_str().unwrap_or("").contains("sample inbox"));
}

#[tokio::test]
async fn token_mode_requires_bearer() {
    let base = start(echo_runner(), |c| {
        c.console.auth.mode = lib::config::ConsoleAuthMode::Token;
        c.console.auth.token = Some("test-token".to_string());
    })
    .await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/exec", base))
        .json(&json!({ "command": "version" }))
        .send()
        .await
        .expect("POST /api/exec");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = client
        .post(format!("{}/api/exec", base))
        .bearer_auth("test-token")
        .json(&json!({ "command": "sudo anything" }))
        .send()
        .await
        .expect("POST /api/exec");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn non_json_content_type_is_unsupported() {
    let base = start(echo_runner(), |_| {}).await;
    let resp = reqwest::Client::new()
        .post(format!("{}/api/exec", base))
        .header("Content-Type", "text/plain")
        .body(r#"{"command":"email send --to x hi"}"#)
        .send()
        .await
        .expect("POST /api/exec");
    assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let body: Value = resp.json().await.expect("parse JSON");
    assert!(body.get("output").is_none());
}

#[tokio::test]
async fn cross_origin_post_is_refused() {
    let base = start(echo_runner(), |_| {}).await;
    let resp = reqwest::Client::new()
        .post(format!("{}/api/exec", base))
        .header("Origin", "https://evil.example")
        .json(&json!({ "command": "email send --to x hi" }))
        .send()
        .await
        .expect("POST /api/exec");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = resp.json().await.expect("parse JSON");
    assert_eq!(body, json!({ "error": "Cross-origin request refused" }));
}

#[cfg(unix)]
#[tokio::test]
async fn same_origin_post_runs() {
    let base = start(echo_runner(), |_| {}).await;
    let resp = reqwest::Client::new()
        .post(format!("{}/api/exec", base))
        .header("Origin", base.as_str())
        .json(&json!({ "command": "version" }))
        .send()
        .await
        .expect("POST /api/exec");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("parse JSON");
    assert_eq!(body, json!({ "output": "version\n" }));
}

#[tokio::test]
async fn token_mode_without_token_refuses_to_start() {
    if std::env::var_os("CONDUIT_CONSOLE_TOKEN").is_some() {
        return;
    }
    let mut config = Config::default();
    config.console.port = free_port();
    config.console.auth.mode = lib::config::ConsoleAuthMode::Token;
    let result = console::serve(config, echo_runner(), Arc::new(Allowlist::builtin())).await;
    assert!(result.is_err());
}
