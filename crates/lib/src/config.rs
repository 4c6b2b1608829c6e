//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.conduit/config.json`) and environment.
//! Every field has a default, so a missing file or `{}` yields a working loopback console.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Web console server settings.
    #[serde(default)]
    pub console: ConsoleConfig,

    /// Subprocess execution settings.
    #[serde(default)]
    pub exec: ExecConfig,

    /// Serve canned sample output instead of running commands.
    #[serde(default)]
    pub demo: bool,
}

/// Console bind, port, auth, and request limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleConfig {
    /// HTTP port (default 7363).
    #[serde(default = "default_console_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_console_bind")]
    pub bind: String,

    /// Auth settings. When absent, defaults to no auth (loopback only).
    #[serde(default)]
    pub auth: ConsoleAuthConfig,

    /// Largest accepted request body in bytes (default 1 MiB).
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

/// Console auth: token or none (loopback-only when none).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleAuthConfig {
    /// "none" = no shared secret (only safe when bind is loopback). "token" = require a bearer token on /api.
    #[serde(default)]
    pub mode: ConsoleAuthMode,

    /// Shared secret for /api requests. Overridden by CONDUIT_CONSOLE_TOKEN env.
    pub token: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleAuthMode {
    /// No auth; allow only when bind is loopback.
    #[default]
    None,

    /// Require `Authorization: Bearer <token>` matching the configured token.
    Token,
}

/// How authorized commands are executed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecConfig {
    /// Wall-clock limit per command in seconds (default 30).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// When the OS cannot report the running executable, look up `fallbackBinary` on PATH
    /// instead of refusing to start (default true).
    #[serde(default = "default_true")]
    pub path_fallback: bool,

    /// Bare binary name used for the PATH fallback (default "conduit").
    #[serde(default = "default_fallback_binary")]
    pub fallback_binary: String,
}

fn default_console_port() -> u16 {
    7363
}

fn default_console_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_max_body_bytes() -> usize {
    1 << 20
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_fallback_binary() -> String {
    "conduit".to_string()
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            port: default_console_port(),
            bind: default_console_bind(),
            auth: ConsoleAuthConfig::default(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            path_fallback: default_true(),
            fallback_binary: default_fallback_binary(),
        }
    }
}

impl ExecConfig {
    /// Timeout as a Duration; zero is treated as the default so a command can never run unbounded.
    pub fn timeout(&self) -> Duration {
        if self.timeout_secs == 0 {
            Duration::from_secs(default_timeout_secs())
        } else {
            Duration::from_secs(self.timeout_secs)
        }
    }

    /// Fallback binary name when PATH fallback is enabled and the name is non-empty.
    pub fn fallback(&self) -> Option<&str> {
        let name = self.fallback_binary.trim();
        (self.path_fallback && !name.is_empty()).then_some(name)
    }
}

/// Resolve the console token: env CONDUIT_CONSOLE_TOKEN overrides config.
pub fn resolve_console_token(config: &Config) -> Option<String> {
    std::env::var("CONDUIT_CONSOLE_TOKEN")
        .ok()
        .and_then(|s| {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        })
        .or_else(|| {
            config
                .console
                .auth
                .token
                .as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

/// True if the bind address is loopback (127.0.0.1, ::1, etc.).
pub fn is_loopback_bind(bind: &str) -> bool {
    let b = bind.trim();
    b == "localhost"
        || b.parse::<std::net::IpAddr>()
            .map(|ip| ip.is_loopback())
            .unwrap_or(false)
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("CONDUIT_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".conduit").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the given path, or the default path (or CONDUIT_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
