//! Console: local HTTP server for the browser command console.
//!
//! Single port serves the page, a health probe, the allowlist, and `POST /api/exec`.

mod server;

pub use server::{build_runner, router, run_console, serve, ConsoleState};
