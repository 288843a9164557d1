//! Console messages for communication between layers.
//!
//! Messages are the primary mechanism for:
//! - Transport -> Core: structured calls and raw input lines
//! - Core -> Transport: replies and broadcast log lines

use bevy::prelude::*;

use super::Identity;

/// A structured remote call, as delivered by a transport.
///
/// # Examples
///
/// ```ignore
/// fn on_packet(mut calls: MessageWriter<RemoteCallEvent>) {
///     calls.write(RemoteCallEvent::new(Identity::new(42), "say", ["hello"]));
/// }
/// ```
#[derive(Message, Debug, Clone)]
pub struct RemoteCallEvent {
    /// Who issued the call.
    pub caller: Identity,
    /// Command name.
    pub command: String,
    /// Untyped argument tokens.
    pub args: Vec<String>,
}

impl RemoteCallEvent {
    pub fn new<I, S>(caller: Identity, command: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            caller,
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

/// A raw console line typed by a caller.
///
/// The line is split on `;` and each part tokenized before dispatch.
#[derive(Message, Debug, Clone)]
pub struct ConsoleInputEvent {
    /// Who typed the line.
    pub caller: Identity,
    /// The raw command string to execute.
    pub line: String,
}

impl ConsoleInputEvent {
    /// Create a new input event.
    pub fn new(caller: Identity, line: impl Into<String>) -> Self {
        Self {
            caller,
            line: line.into(),
        }
    }
}

/// Message sent when output should be displayed in a console.
///
/// `recipient` is the caller id for replies, or `None` for broadcasts that
/// the transport filters (for example by `CanReceiveServerLogs`).
#[derive(Message, Debug, Clone, PartialEq)]
pub struct ConsoleOutputEvent {
    /// Target caller id, `None` for broadcasts.
    pub recipient: Option<u64>,
    /// The message text.
    pub message: String,
    /// The log level/type.
    pub level: ConsoleOutputLevel,
}

/// Log level for console output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsoleOutputLevel {
    /// Debug information.
    Debug,
    /// General information.
    #[default]
    Info,
    /// Warning.
    Warn,
    /// Error.
    Error,
    /// Command echo (shows the command that was executed).
    Command,
}

impl ConsoleOutputEvent {
    /// Create a new broadcast output event.
    pub fn new(level: ConsoleOutputLevel, message: impl Into<String>) -> Self {
        Self {
            recipient: None,
            message: message.into(),
            level,
        }
    }

    /// Address the event to one caller.
    pub fn to(mut self, recipient: u64) -> Self {
        self.recipient = Some(recipient);
        self
    }

    /// Create a debug message.
    pub fn debug(message: impl Into<String>) -> Self {
        Self::new(ConsoleOutputLevel::Debug, message)
    }

    /// Create an info message.
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(ConsoleOutputLevel::Info, message)
    }

    /// Create a warning message.
    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(ConsoleOutputLevel::Warn, message)
    }

    /// Create an error message.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ConsoleOutputLevel::Error, message)
    }

    /// Create a command echo message.
    pub fn command(message: impl Into<String>) -> Self {
        Self::new(ConsoleOutputLevel::Command, message)
    }
}

/// Plugin that registers all console messages.
pub struct ConsoleEventsPlugin;

impl Plugin for ConsoleEventsPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<RemoteCallEvent>()
            .add_message::<ConsoleInputEvent>()
            .add_message::<ConsoleOutputEvent>();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_call_event() {
        let event = RemoteCallEvent::new(Identity::new(3), "print", ["a", "b"]);
        assert_eq!(event.caller.id(), 3);
        assert_eq!(event.command, "print");
        assert_eq!(event.args, vec!["a", "b"]);
    }

    #[test]
    fn test_console_output_event() {
        let event = ConsoleOutputEvent::error("Something went wrong");
        assert_eq!(event.level, ConsoleOutputLevel::Error);
        assert_eq!(event.recipient, None);

        let event = event.to(8);
        assert_eq!(event.recipient, Some(8));
        assert_eq!(event.message, "Something went wrong");
    }
}
