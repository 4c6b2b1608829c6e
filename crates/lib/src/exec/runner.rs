//! Command runners: the strategy the console uses to turn a request into an [`ExecutionResult`].
//! [`SandboxedRunner`] authorizes and executes; `DemoRunner` (see `demo`) returns canned text.
//! The console picks one at startup, so the authorization path carries no demo branches.

use std::sync::Arc;

use async_trait::async_trait;

use super::allowlist::{Allowlist, Classification};
use super::engine::{ExecError, ExecOutput, ExecutionEngine};
use super::sanitize::{sanitize, Rejection};

/// Outcome of one command request.
#[derive(Debug)]
pub enum ExecutionResult {
    /// Refused by the sanitizer or the allowlist; nothing was spawned.
    Rejected(Rejection),
    /// The process ran to completion (any exit code, with some output if it failed).
    Completed(ExecOutput),
    /// An authorized command could not be run to completion.
    Failed(ExecError),
}

/// Runs a raw command string from the console.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str) -> ExecutionResult;

    /// Short name for logs and the health endpoint.
    fn mode(&self) -> &'static str;
}

/// Sanitize then classify: the whole authorization decision for one command string.
pub fn authorize(raw: &str, allowlist: &Allowlist) -> Result<Classification, Rejection> {
    let clean = sanitize(raw)?;
    allowlist.classify(clean)
}

/// Authorizes against an allowlist and executes through an [`ExecutionEngine`].
#[derive(Debug, Clone)]
pub struct SandboxedRunner {
    allowlist: Arc<Allowlist>,
    engine: ExecutionEngine,
}

impl SandboxedRunner {
    pub fn new(allowlist: Arc<Allowlist>, engine: ExecutionEngine) -> Self {
        Self { allowlist, engine }
    }

    pub fn allowlist(&self) -> &Allowlist {
        &self.allowlist
    }

    pub fn engine(&self) -> &ExecutionEngine {
        &self.engine
    }
}

#[async_trait]
impl CommandRunner for SandboxedRunner {
    async fn run(&self, command: &str) -> ExecutionResult {
        let auth = match authorize(command, &self.allowlist) {
            Ok(c) => c,
            Err(r) => return ExecutionResult::Rejected(r),
        };
        log::debug!("authorized {:?} (argc {})", auth.base_command, auth.tokens.len());
        match self.engine.execute(&auth.tokens).await {
            Ok(out) => ExecutionResult::Completed(out),
            Err(e) => ExecutionResult::Failed(e),
        }
    }

    fn mode(&self) -> &'static str {
        "sandboxed"
    }
}
