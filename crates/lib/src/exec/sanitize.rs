//! Input sanitizer: first gate for a raw command string from the console.

use std::fmt;

/// Characters that never appear in an authorized command. Arguments are passed to the
/// child as argv (no shell), so these cannot inject anything today; they are still refused
/// so that no later change to how commands are spawned can turn them into injection.
pub const DANGEROUS_CHARS: &[char] = &[';', '|', '&', '`', '$', '(', ')', '<', '>', '\\', '\n', '\0'];

/// Why a command was refused before any process was spawned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Empty or whitespace-only input.
    Empty,
    /// Input contains one of [`DANGEROUS_CHARS`].
    DangerousCharacters,
    /// No allowlisted prefix matched; carries the trimmed command.
    NotAllowed(String),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Empty => f.write_str("empty command"),
            Rejection::DangerousCharacters => f.write_str("contains dangerous characters"),
            Rejection::NotAllowed(cmd) => f.write_str(cmd),
        }
    }
}

impl std::error::Error for Rejection {}

/// True if `cmd` contains any shell metacharacter from [`DANGEROUS_CHARS`].
pub fn contains_dangerous_chars(cmd: &str) -> bool {
    cmd.contains(DANGEROUS_CHARS)
}

/// Trim `raw` and refuse it when empty or when it contains a shell metacharacter.
/// Runs on the whole string before tokenization, so `list;rm` is caught as a single word.
pub fn sanitize(raw: &str) -> Result<&str, Rejection> {
    let cmd = raw.trim();
    if cmd.is_empty() {
        return Err(Rejection::Empty);
    }
    if contains_dangerous_chars(cmd) {
        return Err(Rejection::DangerousCharacters);
    }
    Ok(cmd)
}
