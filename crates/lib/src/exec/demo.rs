//! Demo runner: canned sample output for the console, no process is ever spawned.

use async_trait::async_trait;

use super::engine::ExecOutput;
use super::runner::{CommandRunner, ExecutionResult};

/// Sample output keyed by the first one or two words of the command.
const CANNED: &[(&str, &str)] = &[
    (
        "email list",
        "Demo mode - sample inbox\n\n\
         \x20 * alice@example.com      Weekly sync agenda           2 min ago\n\
         \x20   bob@example.com        Q4 planning notes            1 hour ago\n\
         \x20   billing@example.com    Your invoice is ready        1 day ago\n\n\
         3 of 42 messages",
    ),
    (
        "email threads",
        "Demo mode - sample threads\n\n\
         \x20 Weekly sync            4 messages   alice, bob     2 min ago\n\
         \x20 Q4 planning            9 messages   team           3 hours ago\n\n\
         2 threads",
    ),
    (
        "calendar list",
        "Demo mode - sample calendars\n\n\
         \x20 ID              NAME        PRIMARY\n\
         \x20 cal-work-01     Work        yes\n\
         \x20 cal-home-02     Personal\n\n\
         2 calendars",
    ),
    (
        "calendar events",
        "Demo mode - sample events\n\n\
         \x20 TODAY\n\
         \x20 09:30 - 10:00   Standup          Room 2\n\
         \x20 15:00 - 16:00   Design review    Video call\n\n\
         2 upcoming events",
    ),
    (
        "auth status",
        "Demo mode - authentication\n\n\
         \x20 Status:    configured\n\
         \x20 Region:    us\n\
         \x20 Account:   alice@example.com (default)",
    ),
    (
        "auth list",
        "Demo mode - connected accounts\n\n\
         \x20 alice@example.com   google      demo-grant-1 (default)\n\
         \x20 bob@example.com     microsoft   demo-grant-2\n\n\
         2 accounts",
    ),
    ("version", "conduit (demo mode)"),
];

/// Answers from [`CANNED`]; anything else gets a generic notice echoing the command.
#[derive(Debug, Clone, Copy, Default)]
pub struct DemoRunner;

impl DemoRunner {
    pub fn output_for(command: &str) -> String {
        let words: Vec<&str> = command.split_whitespace().collect();
        if words.is_empty() {
            return "Demo mode - no command specified".to_string();
        }
        let key = words[..words.len().min(2)].join(" ");
        CANNED
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, text)| text.to_string())
            .unwrap_or_else(|| {
                format!(
                    "Demo mode - command: {}\n\n(Sample output only. Start the console without --demo to run real commands.)",
                    command.trim()
                )
            })
    }
}

#[async_trait]
impl CommandRunner for DemoRunner {
    async fn run(&self, command: &str) -> ExecutionResult {
        ExecutionResult::Completed(ExecOutput::text(Self::output_for(command)))
    }

    fn mode(&self) -> &'static str {
        "demo"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_commands_use_two_word_key() {
        assert!(DemoRunner::output_for("email list --limit 10").contains("sample inbox"));
        assert!(DemoRunner::output_for("calendar events list").contains("sample events"));
        assert_eq!(DemoRunner::output_for(" version "), "conduit (demo mode)");
    }

    #[test]
    fn empty_and_unknown() {
        assert_eq!(DemoRunner::output_for("  "), "Demo mode - no command specified");
        let out = DemoRunner::output_for("rm -rf /");
        assert!(out.starts_with("Demo mode - command: rm -rf /"));
    }

    #[test]
    fn one_word_key_only_for_one_word_commands() {
        assert_eq!(DemoRunner::output_for("version"), "conduit (demo mode)");
        let out = DemoRunner::output_for("version foo");
        assert!(out.starts_with("Demo mode - command: version foo"), "{}", out);
    }

    #[tokio::test]
    async fn never_rejects() {
        match DemoRunner.run("email list; rm -rf /").await {
            ExecutionResult::Completed(out) => assert!(out.success()),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(DemoRunner.mode(), "demo");
    }
}
