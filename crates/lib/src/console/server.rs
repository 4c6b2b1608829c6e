//! Console HTTP server (single port).

use crate::config::{self, Config};
use crate::exec::{
    compose, Allowlist, CommandRunner, DemoRunner, ExecError, ExecRequest, ExecResponse,
    ExecutionEngine, ExecutionResult, ProgramSource, SandboxedRunner,
};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderMap, StatusCode},
    response::Html,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

static INDEX_HTML: &str = include_str!("../../static/index.html");

/// Shared state for the console handlers. Everything here is read-only after startup.
#[derive(Clone)]
pub struct ConsoleState {
    pub config: Arc<Config>,
    /// Sandboxed or demo runner, chosen once at startup.
    pub runner: Arc<dyn CommandRunner>,
    /// Allowlist offered to the page as suggestions.
    pub allowlist: Arc<Allowlist>,
    /// When Some, /api requests must carry `Authorization: Bearer <token>`.
    pub required_token: Option<String>,
}

impl ConsoleState {
    pub fn new(config: Config, runner: Arc<dyn CommandRunner>, allowlist: Arc<Allowlist>) -> Self {
        let required_token = if config.console.auth.mode == config::ConsoleAuthMode::Token {
            config::resolve_console_token(&config)
        } else {
            None
        };
        Self {
            config: Arc::new(config),
            runner,
            allowlist,
            required_token,
        }
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let Some(ref expected) = self.required_token else {
            return true;
        };
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|t| t.trim() == expected.as_str())
            .unwrap_or(false)
    }
}

/// Pick the runner from config: demo answers from a canned table; otherwise commands are
/// authorized against `allowlist` and run by re-executing this binary.
pub fn build_runner(config: &Config, allowlist: Arc<Allowlist>) -> Result<Arc<dyn CommandRunner>> {
    if config.demo {
        return Ok(Arc::new(DemoRunner));
    }
    let engine = ExecutionEngine::current_exe(config.exec.timeout(), config.exec.fallback())
        .context("resolving the console's own executable (enable exec.pathFallback to allow a PATH lookup)")?;
    if engine.source() == ProgramSource::PathLookup {
        log::warn!(
            "commands will run {:?} as found on PATH, not this executable",
            engine.program()
        );
    }
    log::info!(
        "commands run {} with a {}s timeout",
        engine.program().display(),
        engine.timeout().as_secs()
    );
    Ok(Arc::new(SandboxedRunner::new(allowlist, engine)))
}

/// Build the router. Exposed for tests and embedding.
pub fn router(state: ConsoleState) -> Router {
    let max_body = state.config.console.max_body_bytes;
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_http))
        .route("/api/commands", get(list_commands))
        .route("/api/exec", post(exec_command))
        .layer(DefaultBodyLimit::max(max_body))
        .with_state(state)
}

/// Run the console with the runner selected by config; binds to console.bind:console.port.
/// Blocks until shutdown (e.g. Ctrl+C).
pub async fn run_console(config: Config) -> Result<()> {
    let allowlist = Arc::new(Allowlist::builtin());
    let runner = build_runner(&config, allowlist.clone())?;
    serve(config, runner, allowlist).await
}

/// Serve the console with an explicit runner.
/// When bind is not loopback, token auth must be configured or startup fails. Token mode
/// with no token set always fails.
pub async fn serve(
    config: Config,
    runner: Arc<dyn CommandRunner>,
    allowlist: Arc<Allowlist>,
) -> Result<()> {
    let bind = config.console.bind.trim().to_string();
    if config.console.auth.mode == config::ConsoleAuthMode::Token
        && config::resolve_console_token(&config).is_none()
    {
        anyhow::bail!(
            "console.auth.mode is \"token\" but no token is set (set console.auth.token or CONDUIT_CONSOLE_TOKEN)"
        );
    }
    if !config::is_loopback_bind(&bind) {
        let token = config::resolve_console_token(&config);
        if token.is_none() || config.console.auth.mode != config::ConsoleAuthMode::Token {
            anyhow::bail!(
                "refusing to bind console to {} without auth (set console.auth.mode to \"token\" and console.auth.token or CONDUIT_CONSOLE_TOKEN)",
                bind
            );
        }
    }

    let port = config.console.port;
    let mode = runner.mode();
    let state = ConsoleState::new(config, runner, allowlist);
    let app = router(state);

    let bind_addr = if bind.contains(':') {
        format!("[{}]:{}", bind, port)
    } else {
        format!("{}:{}", bind, port)
    };
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("console listening on http://{} ({} mode)", bind_addr, mode);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("console server exited")?;
    log::info!("console stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("cannot install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                log::warn!("cannot install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}

/// GET / serves the console page.
async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// GET /health returns a simple health JSON (for probes).
async fn health_http(State(state): State<ConsoleState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "mode": state.runner.mode(),
        "port": state.config.console.port,
    }))
}

/// GET /api/commands lists the allowlisted command prefixes.
async fn list_commands(
    State(state): State<ConsoleState>,
    headers: HeaderMap,
) -> (StatusCode, Json<serde_json::Value>) {
    if !state.authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Unauthorized" })));
    }
    (
        StatusCode::OK,
        Json(json!({ "commands": state.allowlist.sorted() })),
    )
}

/// POST /api/exec: authorize and run one command, reply with `{output}` or `{error}`.
/// If the client disconnects, this future is dropped and the child process is killed with it.
async fn exec_command(
    State(state): State<ConsoleState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<ExecResponse>) {
    if !same_origin(&headers) {
        return (
            StatusCode::FORBIDDEN,
            Json(ExecResponse::error("Cross-origin request refused")),
        );
    }
    if !state.authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(ExecResponse::error("Unauthorized")));
    }
    if !is_json(&headers) {
        return (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Json(ExecResponse::error("Content-Type must be application/json")),
        );
    }
    let req: ExecRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ExecResponse::error("Invalid request body")),
            )
        }
    };

    let request_id = uuid::Uuid::new_v4().simple().to_string();
    let request_id = &request_id[..8];
    let result = state.runner.run(&req.command).await;
    log_result(request_id, &req.command, &result);
    let (status, res) = compose(&result);
    (status, Json(res))
}

/// True when the body is declared as JSON. Browsers cannot send that cross-origin without a
/// CORS preflight, which this server never answers.
fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false)
}

/// A request without `Origin` (curl, the CLI) passes; a browser request must come from the
/// page this server serves, i.e. its origin's host:port equals `Host`.
fn same_origin(headers: &HeaderMap) -> bool {
    let Some(origin) = headers.get(header::ORIGIN) else {
        return true;
    };
    let origin_host = origin
        .to_str()
        .ok()
        .and_then(|o| o.strip_prefix("http://").or_else(|| o.strip_prefix("https://")))
        .map(|o| o.trim_end_matches('/'));
    let host = headers.get(header::HOST).and_then(|v| v.to_str().ok());
    match (origin_host, host) {
        (Some(o), Some(h)) => o.eq_ignore_ascii_case(h.trim()),
        _ => false,
    }
}

/// Rejections are routine (info); launch failures mean a broken deployment (error).
fn log_result(request_id: &str, command: &str, result: &ExecutionResult) {
    match result {
        ExecutionResult::Rejected(r) => {
            log::info!("[{}] rejected {:?}: {}", request_id, command, r);
        }
        ExecutionResult::Failed(e @ ExecError::Launch { .. }) => {
            log::error!("[{}] cannot launch command runner: {}", request_id, e);
        }
        ExecutionResult::Failed(e @ ExecError::Timeout(_)) => {
            log::warn!("[{}] {:?} killed: {}", request_id, command, e);
        }
        ExecutionResult::Failed(e) => {
            log::info!("[{}] {:?} failed: {}", request_id, command, e);
        }
        ExecutionResult::Completed(out) => {
            log::debug!(
                "[{}] {:?} exited {:?} ({} bytes stdout, {} bytes stderr)",
                request_id,
                command,
                out.exit_code,
                out.stdout.len(),
                out.stderr.len()
            );
        }
    }
}
