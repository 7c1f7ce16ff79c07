//! Line-oriented front end for the interactive mode

use crate::queue::{QueueEvent, RequestState};

/// Sentence spoken by `:test`
pub const TEST_PHRASE: &str = "这是一个测试。Hello, this is a test message.";

pub const HELP: &str = "\
Type text and press Enter to speak it.
  :test     speak a test sentence
  :clear    drop everything still waiting
  :refresh  re-scan output devices and voices
  :quit     exit";

/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellInput {
    Speak(String),
    Test,
    Clear,
    Refresh,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

pub fn parse_line(line: &str) -> ShellInput {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ShellInput::Empty;
    }

    match trimmed.strip_prefix(':') {
        Some(command) => match command.to_lowercase().as_str() {
            "test" => ShellInput::Test,
            "clear" => ShellInput::Clear,
            "refresh" => ShellInput::Refresh,
            "help" | "?" => ShellInput::Help,
            "quit" | "q" | "exit" => ShellInput::Quit,
            other => ShellInput::Unknown(other.to_string()),
        },
        None => ShellInput::Speak(trimmed.to_string()),
    }
}

/// Prefix a message with the local wall-clock time
pub fn stamp(message: &str) -> String {
    format!("[{}] {}", chrono::Local::now().format("%H:%M:%S"), message)
}

/// Human-readable form of a queue event, `None` for events not worth showing
pub fn describe(event: &QueueEvent) -> Option<String> {
    let text = match event {
        QueueEvent::StateChanged { id, state } => match state {
            RequestState::Pending => return None,
            RequestState::Synthesizing => format!("{} synthesizing", id),
            RequestState::Playing => format!("{} playing", id),
            RequestState::Completed => format!("{} done", id),
            RequestState::Failed(e) => format!("⚠️ {} failed: {}", id, e),
        },
        QueueEvent::Cleared { discarded } if discarded.is_empty() => "Nothing to clear".to_string(),
        QueueEvent::Cleared { discarded } => format!("Cleared {} pending", discarded.len()),
        QueueEvent::MonitorFailed { id, device, error } => {
            format!("⚠️ {} monitor {} failed: {}", id, device, error)
        }
        QueueEvent::CatalogRefreshed(snapshot) => format!(
            "Refreshed: {} output devices, {} voices",
            snapshot.devices.len(),
            snapshot.voices.len()
        ),
        QueueEvent::RefreshFailed { error } => format!("⚠️ Refresh failed: {}", error),
        QueueEvent::Idle => return None,
    };
    Some(text)
}
