//! Routes [`tracing`] events into the console output stream.
//!
//! Install [`custom_log_layer`] through
//! [`LogPlugin::custom_layer`](bevy::log::LogPlugin::custom_layer). Captured
//! events are enriched with the crate version and forwarded by
//! [`ConsolePlugin`](crate::ConsolePlugin) as broadcast
//! [`ConsoleOutputEvent`]s.

use bevy::log::{BoxedLayer, Level};
use bevy::prelude::*;
use std::sync::mpsc;
use std::time::SystemTime;
use tracing::Subscriber;
use tracing_subscriber::field::Visit;
use tracing_subscriber::Layer;

use crate::core::{ConsoleOutputEvent, ConsoleOutputLevel};

/// Property attached to every captured message.
pub const VERSION_PROPERTY: &str = "Version";

/// Layer factory for [`LogPlugin::custom_layer`](bevy::log::LogPlugin::custom_layer).
pub fn custom_log_layer(app: &mut App) -> Option<BoxedLayer> {
    Some(Box::new(create_custom_log_layer(app)))
}

fn create_custom_log_layer(app: &mut App) -> LogCaptureLayer {
    let (sender, receiver) = mpsc::channel();
    app.add_message::<LogMessage>();
    app.insert_non_send_resource(CapturedLogEvents(receiver));
    app.add_systems(PostUpdate, transfer_log_events);

    LogCaptureLayer {
        sender,
        properties: vec![(VERSION_PROPERTY, env!("CARGO_PKG_VERSION").to_string())],
    }
}

/// A captured log message.
#[derive(Message, Debug, Clone)]
pub struct LogMessage {
    /// The message contents.
    pub message: String,

    /// The part of the system the event occurred in.
    pub target: &'static str,

    /// The level of verbosity of the event.
    pub level: Level,

    /// Source file, if known.
    pub file: Option<&'static str>,

    /// Source line, if known.
    pub line: Option<u32>,

    /// Properties added by the capture layer.
    pub properties: Vec<(&'static str, String)>,

    /// The time the log occurred.
    pub time: SystemTime,
}

impl LogMessage {
    /// Value of an enriched property.
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    /// `target file:line`, for consoles allowed to view log metadata.
    pub fn metadata_line(&self) -> String {
        match (self.file, self.line) {
            (Some(file), Some(line)) => format!("{} {}:{}", self.target, file, line),
            (Some(file), None) => format!("{} {}", self.target, file),
            _ => self.target.to_string(),
        }
    }

    /// Broadcast output event for this message.
    pub fn to_output(&self) -> ConsoleOutputEvent {
        let level = match self.level {
            Level::ERROR => ConsoleOutputLevel::Error,
            Level::WARN => ConsoleOutputLevel::Warn,
            Level::INFO => ConsoleOutputLevel::Info,
            _ => ConsoleOutputLevel::Debug,
        };
        ConsoleOutputEvent::new(level, self.message.clone())
    }
}

/// Transfers information from the [`CapturedLogEvents`] resource to [`MessageWriter<LogMessage>`](LogMessage).
fn transfer_log_events(
    receiver: NonSend<CapturedLogEvents>,
    mut log_events: MessageWriter<LogMessage>,
) {
    for msg in receiver.0.try_iter() {
        log_events.write(msg);
    }
}

/// Forward captured log messages as broadcast console output.
pub(crate) fn forward_captured_logs(
    mut logs: MessageReader<LogMessage>,
    mut outputs: MessageWriter<ConsoleOutputEvent>,
) {
    for log in logs.read() {
        outputs.write(log.to_output());
    }
}

/// Holds [`LogMessage`]s until [`transfer_log_events`] writes them.
struct CapturedLogEvents(mpsc::Receiver<LogMessage>);

/// A [`Layer`] that captures log events and saves them to [`CapturedLogEvents`].
struct LogCaptureLayer {
    sender: mpsc::Sender<LogMessage>,
    properties: Vec<(&'static str, String)>,
}

impl LogCaptureLayer {
    fn capture(&self, message: String, metadata: &'static tracing::Metadata<'static>) -> LogMessage {
        LogMessage {
            message,
            target: metadata.target(),
            level: *metadata.level(),
            file: metadata.file(),
            line: metadata.line(),
            properties: self.properties.clone(),
            time: SystemTime::now(),
        }
    }
}

impl<S: Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>> Layer<S>
    for LogCaptureLayer
{
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut message = None;
        event.record(&mut LogEventVisitor(&mut message));
        if let Some(message) = message {
            let _ = self.sender.send(self.capture(message, event.metadata()));
        }
    }
}

/// A [`Visit`]or that extracts the `message` field of an event.
struct LogEventVisitor<'a>(&'a mut Option<String>);

impl Visit for LogEventVisitor<'_> {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.0 = Some(format!("{value:?}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(level: Level) -> LogMessage {
        LogMessage {
            message: "hello".into(),
            target: "game::net",
            level,
            file: Some("src/net.rs"),
            line: Some(12),
            properties: vec![(VERSION_PROPERTY, "1.2.3".into())],
            time: SystemTime::now(),
        }
    }

    #[test]
    fn test_to_output_levels() {
        assert_eq!(message(Level::ERROR).to_output().level, ConsoleOutputLevel::Error);
        assert_eq!(message(Level::WARN).to_output().level, ConsoleOutputLevel::Warn);
        assert_eq!(message(Level::INFO).to_output().level, ConsoleOutputLevel::Info);
        assert_eq!(message(Level::TRACE).to_output().level, ConsoleOutputLevel::Debug);
        assert_eq!(message(Level::INFO).to_output().recipient, None);
    }

    #[test]
    fn test_property_and_metadata() {
        let msg = message(Level::INFO);
        assert_eq!(msg.property(VERSION_PROPERTY), Some("1.2.3"));
        assert_eq!(msg.property("Missing"), None);
        assert_eq!(msg.metadata_line(), "game::net src/net.rs:12");
    }

    #[test]
    fn test_layer_captures_events() {
        use tracing_subscriber::layer::SubscriberExt;

        let (sender, receiver) = mpsc::channel();
        let layer = LogCaptureLayer {
            sender,
            properties: vec![(VERSION_PROPERTY, "1.2.3".into())],
        };
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(target: "game::net", "player {} timed out", 7);
        });

        let captured: Vec<_> = receiver.try_iter().collect();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].message, "player 7 timed out");
        assert_eq!(captured[0].target, "game::net");
        assert_eq!(captured[0].level, Level::WARN);
        assert!(captured[0].file.is_some());
        assert_eq!(captured[0].property(VERSION_PROPERTY), Some("1.2.3"));
    }
}
