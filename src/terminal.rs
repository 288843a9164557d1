//! Terminal backend for dedicated servers.
//!
//! Lines typed on stdin become [`ConsoleInputEvent`]s issued by the
//! configured caller (the game owner by default). Replies to that caller and
//! broadcast lines are written to stdout.

use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;
use std::thread::{self, JoinHandle};

use bevy::prelude::*;

use crate::core::{ConsoleInputEvent, ConsoleOutputEvent, ConsoleOutputLevel, ConsoleRegistry, Identity};

/// Plugin that adds terminal (stdin/stdout) console support.
pub struct TerminalPlugin;

impl Plugin for TerminalPlugin {
    fn build(&self, app: &mut App) {
        let (sender, receiver) = mpsc::channel();
        let _handle = spawn_stdin_reader(sender);

        app.insert_resource(StdinReceiver(Mutex::new(receiver)))
            .init_resource::<TerminalConfig>()
            .add_systems(Update, (read_stdin, write_stdout));
    }
}

/// Configuration for terminal behavior.
#[derive(Resource, Default)]
pub struct TerminalConfig {
    /// Whether to use colored output (ANSI escape codes).
    ///
    /// Disabled by default, some terminals render the codes literally.
    pub colored: bool,
    /// Identity the terminal acts as. `None` acts as the game owner.
    pub caller: Option<Identity>,
}

impl TerminalConfig {
    fn caller_or_owner(&self, registry: &ConsoleRegistry) -> Identity {
        self.caller
            .clone()
            .unwrap_or_else(|| registry.owner().identity())
    }
}

#[derive(Resource)]
struct StdinReceiver(Mutex<Receiver<String>>);

fn spawn_stdin_reader(sender: Sender<String>) -> JoinHandle<()> {
    thread::spawn(move || {
        let stdin = io::stdin();
        let handle = stdin.lock();

        for line in handle.lines().map_while(Result::ok) {
            let text = line.trim().to_string();
            if !text.is_empty() && sender.send(text).is_err() {
                break;
            }
        }
    })
}

fn read_stdin(
    receiver: Res<StdinReceiver>,
    config: Res<TerminalConfig>,
    registry: Res<ConsoleRegistry>,
    mut events: MessageWriter<ConsoleInputEvent>,
) {
    let Ok(rx) = receiver.0.lock() else {
        return;
    };
    let mut caller = None;
    while let Ok(line) = rx.try_recv() {
        let caller = caller.get_or_insert_with(|| config.caller_or_owner(&registry));
        events.write(ConsoleInputEvent::new(caller.clone(), line));
    }
}

fn write_stdout(
    mut events: MessageReader<ConsoleOutputEvent>,
    config: Res<TerminalConfig>,
    registry: Res<ConsoleRegistry>,
) {
    let caller_id = config.caller_or_owner(&registry).id();
    let mut stdout = io::stdout().lock();

    for event in events.read().filter(|event| is_visible(event, caller_id)) {
        let _ = if config.colored {
            writeln!(stdout, "{}{}\x1b[0m", color_code(event.level), event.message)
        } else {
            writeln!(stdout, "{}", event.message)
        };
    }
    let _ = stdout.flush();
}

/// Broadcasts and replies addressed to the terminal's caller.
fn is_visible(event: &ConsoleOutputEvent, caller_id: u64) -> bool {
    event.recipient.is_none_or(|id| id == caller_id)
}

fn color_code(level: ConsoleOutputLevel) -> &'static str {
    match level {
        ConsoleOutputLevel::Debug => "\x1b[90m",
        ConsoleOutputLevel::Info => "\x1b[0m",
        ConsoleOutputLevel::Warn => "\x1b[33m",
        ConsoleOutputLevel::Error => "\x1b[31m",
        ConsoleOutputLevel::Command => "\x1b[36m",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::GameOwner;

    #[test]
    fn test_visibility() {
        assert!(is_visible(&ConsoleOutputEvent::info("log line"), 7));
        assert!(is_visible(&ConsoleOutputEvent::info("reply").to(7), 7));
        assert!(!is_visible(&ConsoleOutputEvent::info("someone else").to(8), 7));
    }

    #[test]
    fn test_caller_defaults_to_owner() {
        let mut registry = ConsoleRegistry::new();
        registry.set_owner(GameOwner::User(42)).unwrap();

        let config = TerminalConfig::default();
        assert_eq!(config.caller_or_owner(&registry).id(), 42);

        let config = TerminalConfig {
            colored: true,
            caller: Some(Identity::new(3)),
        };
        assert_eq!(config.caller_or_owner(&registry).id(), 3);
    }

    #[test]
    fn test_error_is_red() {
        assert_eq!(color_code(ConsoleOutputLevel::Error), "\x1b[31m");
    }
}
