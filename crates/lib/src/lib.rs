//! Conduit core library: command authorization, sandboxed execution, and the
//! local web console used by the CLI.

pub mod config;
pub mod console;
pub mod exec;
pub mod init;
