//! Wire types for `POST /api/exec` and the mapping from [`ExecutionResult`] to a response.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use super::runner::ExecutionResult;

/// Request body: `{ "command": "email list --limit 10" }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecRequest {
    #[serde(default)]
    pub command: String,
}

/// Response body: `{ "output": ... }` or `{ "error": ... }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecResponse {
    pub fn output(text: impl Into<String>) -> Self {
        Self {
            output: Some(text.into()),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            output: None,
            error: Some(msg.into()),
        }
    }
}

/// Map a result to (status, body). Rejections are 403; an authorized command that failed is
/// still 200 because the failure is reported as data, not as an API error.
pub fn compose(result: &ExecutionResult) -> (StatusCode, ExecResponse) {
    match result {
        ExecutionResult::Rejected(r) => (
            StatusCode::FORBIDDEN,
            ExecResponse::error(format!("Command not allowed: {}", r)),
        ),
        ExecutionResult::Failed(e) => (
            StatusCode::OK,
            ExecResponse::error(format!("Command failed: {}", e)),
        ),
        ExecutionResult::Completed(out) => (StatusCode::OK, ExecResponse::output(out.display_text())),
    }
}
