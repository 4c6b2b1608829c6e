//! Safe execution layer: authorize a free-form command string and run the trusted binary.
//! No shell is used; arguments are passed as a list to avoid injection.
//!
//! Pipeline: [`sanitize`] → [`Allowlist::classify`] → [`ExecutionEngine::execute`] → [`compose`].

mod allowlist;
mod demo;
mod engine;
mod response;
mod runner;
mod sanitize;

pub use allowlist::{Allowlist, Classification, DEFAULT_COMMANDS};
pub use demo::DemoRunner;
pub use engine::{ExecError, ExecOutput, ExecutionEngine, ProgramSource, DEFAULT_TIMEOUT};
pub use response::{compose, ExecRequest, ExecResponse};
pub use runner::{authorize, CommandRunner, ExecutionResult, SandboxedRunner};
pub use sanitize::{contains_dangerous_chars, sanitize, Rejection, DANGEROUS_CHARS};
