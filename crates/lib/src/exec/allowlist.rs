//! Command allowlist and classifier.
//!
//! Entries are command prefixes of one or more words (`"version"`, `"email list"`,
//! `"calendar events list"`). A request is authorized when one of its leading word
//! sequences is an entry; the longest sequence is probed first so a subcommand such as
//! `calendar events list` is told apart from its parent group `calendar events`.

use std::collections::HashSet;

use super::sanitize::Rejection;

/// Built-in allowlist. Adding a command family is a data change here, nothing else.
pub const DEFAULT_COMMANDS: &[&str] = &[
    // auth
    "auth login",
    "auth logout",
    "auth status",
    "auth whoami",
    "auth list",
    "auth show",
    "auth switch",
    "auth add",
    "auth remove",
    "auth revoke",
    "auth config",
    "auth providers",
    "auth detect",
    "auth scopes",
    "auth token",
    "auth migrate",
    // email
    "email list",
    "email read",
    "email send",
    "email search",
    "email delete",
    "email mark",
    "email drafts",
    "email folders",
    "email threads",
    "email scheduled",
    "email attachments",
    "email metadata",
    "email tracking-info",
    "email ai",
    "email smart-compose",
    "email folders list",
    "email folders show",
    "email folders create",
    "email folders rename",
    "email folders delete",
    "email drafts list",
    "email drafts show",
    "email drafts create",
    "email drafts delete",
    "email drafts send",
    "email threads list",
    "email threads show",
    "email threads search",
    "email threads delete",
    "email threads mark",
    "email scheduled list",
    "email scheduled show",
    "email scheduled cancel",
    "email attachments list",
    "email attachments show",
    "email attachments download",
    // calendar
    "calendar list",
    "calendar show",
    "calendar create",
    "calendar update",
    "calendar delete",
    "calendar events",
    "calendar availability",
    "calendar find-time",
    "calendar recurring",
    "calendar schedule",
    "calendar virtual",
    "calendar ai",
    "calendar events list",
    "calendar events show",
    "calendar events create",
    "calendar events update",
    "calendar events delete",
    "calendar events rsvp",
    "calendar availability check",
    "calendar availability find",
    // contacts
    "contacts list",
    "contacts show",
    "contacts create",
    "contacts update",
    "contacts delete",
    "contacts groups",
    "contacts search",
    "contacts photo",
    "contacts sync",
    "contacts groups list",
    "contacts groups show",
    "contacts groups create",
    "contacts groups delete",
    // inbound
    "inbound list",
    "inbound show",
    "inbound create",
    "inbound delete",
    "inbound messages",
    "inbound monitor",
    // scheduler
    "scheduler configurations",
    "scheduler sessions",
    "scheduler bookings",
    "scheduler pages",
    "scheduler configurations list",
    "scheduler configurations show",
    "scheduler configurations create",
    "scheduler configurations update",
    "scheduler configurations delete",
    "scheduler sessions list",
    "scheduler sessions show",
    "scheduler sessions create",
    "scheduler sessions delete",
    "scheduler bookings list",
    "scheduler bookings show",
    "scheduler bookings create",
    "scheduler bookings confirm",
    "scheduler bookings cancel",
    "scheduler bookings delete",
    "scheduler pages list",
    "scheduler pages show",
    "scheduler pages create",
    "scheduler pages update",
    "scheduler pages delete",
    // timezone (offline)
    "timezone list",
    "timezone info",
    "timezone convert",
    "timezone find-meeting",
    "timezone dst",
    // webhook
    "webhook list",
    "webhook show",
    "webhook create",
    "webhook update",
    "webhook delete",
    "webhook triggers",
    "webhook test",
    "webhook server",
    // otp
    "otp get",
    "otp watch",
    "otp list",
    "otp messages",
    // admin
    "admin applications",
    "admin connectors",
    "admin credentials",
    "admin grants",
    "admin applications list",
    "admin applications show",
    "admin connectors list",
    "admin connectors show",
    "admin connectors create",
    "admin connectors update",
    "admin connectors delete",
    "admin credentials list",
    "admin credentials show",
    "admin credentials create",
    "admin credentials delete",
    "admin grants list",
    "admin grants show",
    "admin grants delete",
    // notetaker
    "notetaker list",
    "notetaker show",
    "notetaker create",
    "notetaker delete",
    "notetaker media",
    "version",
];

/// An authorized command: the full argv and the allowlist entry that matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Every whitespace-separated word of the request, flags included.
    pub tokens: Vec<String>,
    /// The matched allowlist entry (e.g. `"calendar events list"`).
    pub base_command: String,
}

/// Set of allowed command prefixes. Immutable once built; share it behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct Allowlist {
    prefixes: HashSet<String>,
    /// Word count of the longest entry; the classifier probes from here down to 1.
    depth: usize,
}

impl Allowlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in table ([`DEFAULT_COMMANDS`]).
    pub fn builtin() -> Self {
        Self::from_entries(DEFAULT_COMMANDS.iter().copied())
    }

    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a str>) -> Self {
        let mut a = Self::new();
        for e in entries {
            a.allow(e);
        }
        a
    }

    /// Allow a command prefix. Whitespace inside the entry is normalized to single spaces;
    /// blank entries are ignored.
    pub fn allow(&mut self, prefix: &str) {
        let words: Vec<&str> = prefix.split_whitespace().collect();
        if words.is_empty() {
            return;
        }
        self.depth = self.depth.max(words.len());
        self.prefixes.insert(words.join(" "));
    }

    pub fn contains(&self, prefix: &str) -> bool {
        self.prefixes.contains(prefix)
    }

    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }

    /// Entries in lexical order (for listing in the console and CLI).
    pub fn sorted(&self) -> Vec<&str> {
        let mut v: Vec<&str> = self.prefixes.iter().map(String::as_str).collect();
        v.sort_unstable();
        v
    }

    /// Split an already-sanitized command into words and find the longest allowlisted prefix.
    /// Trailing words (flags, values) are returned untouched and never validated here.
    pub fn classify(&self, clean: &str) -> Result<Classification, Rejection> {
        let tokens: Vec<String> = clean.split_whitespace().map(String::from).collect();
        if tokens.is_empty() {
            return Err(Rejection::Empty);
        }
        for n in (1..=self.depth.min(tokens.len())).rev() {
            let candidate = tokens[..n].join(" ");
            if self.prefixes.contains(&candidate) {
                return Ok(Classification {
                    tokens,
                    base_command: candidate,
                });
            }
        }
        Err(Rejection::NotAllowed(clean.to_string()))
    }
}
