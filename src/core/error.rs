//! Error types for registry configuration and command dispatch.
//!
//! - [`RegistryError`]: raised while groups and commands are registered.
//!   These are configuration mistakes and abort startup.
//! - [`DispatchError`]: raised while handling a single call. These are
//!   reported back to the caller and never stop the app.

use thiserror::Error;

use super::ArgType;

/// Error returned from a command handler.
///
/// Any `std::error::Error` converts into this with `?`.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for command handlers.
pub type HandlerResult = Result<(), HandlerError>;

/// Configuration-time errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A group with this name is already registered.
    #[error("group '{0}' is already registered")]
    DuplicateGroup(Box<str>),

    /// A command with this name is already registered.
    #[error("command '{0}' is already registered")]
    DuplicateCommand(Box<str>),

    /// The registry was built; no further registration is accepted.
    #[error("registry is frozen, register groups and commands during startup")]
    Frozen,

    /// Lookup of a group that does not exist.
    #[error("group '{0}' not found")]
    GroupNotFound(Box<str>),

    /// A command allows a group that was never registered.
    #[error("command '{command}' allows unknown group '{group}'")]
    UnknownGroup { command: Box<str>, group: Box<str> },

    /// A command's argument list is malformed.
    #[error("command '{command}' has an invalid signature: {reason}")]
    InvalidSignature { command: Box<str>, reason: &'static str },
}

/// Dispatch-time errors, each rendered as a reply to the caller.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// No command with this name exists.
    #[error("Unknown command: '{0}'")]
    UnknownCommand(Box<str>),

    /// The caller is not in any allowed group, or lacks a required capability.
    #[error("Cannot execute '{command}': {reason}")]
    PermissionDenied { command: Box<str>, reason: String },

    /// Wrong number of arguments.
    #[error("Cannot execute '{command}': expected {expected} argument(s), got {got}. Usage: {usage}")]
    Argument {
        command: Box<str>,
        expected: String,
        got: usize,
        usage: String,
    },

    /// An argument could not be parsed as its declared type.
    #[error("Cannot execute '{command}': argument {position} expects {expected}, got '{token}'")]
    ArgumentType {
        command: Box<str>,
        /// One-based position of the offending argument.
        position: usize,
        expected: ArgType,
        token: String,
    },

    /// Handlers are not reachable, e.g. a handler tried to dispatch another
    /// command.
    #[error("Cannot execute '{0}': commands cannot be dispatched from inside a handler")]
    HandlersUnavailable(Box<str>),

    /// The handler returned an error or panicked.
    #[error("Command '{command}' failed: {source}")]
    HandlerExecution {
        command: Box<str>,
        #[source]
        source: HandlerError,
    },
}

impl DispatchError {
    /// Name of the command the failed call targeted.
    pub fn command(&self) -> &str {
        match self {
            DispatchError::UnknownCommand(command)
            | DispatchError::HandlersUnavailable(command)
            | DispatchError::PermissionDenied { command, .. }
            | DispatchError::Argument { command, .. }
            | DispatchError::ArgumentType { command, .. }
            | DispatchError::HandlerExecution { command, .. } => command,
        }
    }
}

/// A handler panicked; carries the panic payload message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("panicked: {0}")]
pub struct HandlerPanic(pub String);

impl HandlerPanic {
    /// Extract the message from a `catch_unwind` payload.
    pub fn from_payload(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        Self(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_error_messages() {
        assert_eq!(
            RegistryError::DuplicateGroup("admin".into()).to_string(),
            "group 'admin' is already registered"
        );
        assert_eq!(
            RegistryError::UnknownGroup { command: "ping".into(), group: "staff".into() }.to_string(),
            "command 'ping' allows unknown group 'staff'"
        );
    }

    #[test]
    fn test_handler_execution_keeps_source() {
        use std::error::Error as _;

        let err = DispatchError::HandlerExecution {
            command: "boom".into(),
            source: Box::new(HandlerPanic("oops".into())),
        };
        assert_eq!(err.to_string(), "Command 'boom' failed: panicked: oops");
        assert_eq!(err.command(), "boom");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_panic_payloads() {
        let payload = std::panic::catch_unwind(|| panic!("static")).unwrap_err();
        assert_eq!(HandlerPanic::from_payload(&*payload).0, "static");

        let payload = std::panic::catch_unwind(|| panic!("formatted {}", 7)).unwrap_err();
        assert_eq!(HandlerPanic::from_payload(&*payload).0, "formatted 7");

        let payload: Box<dyn std::any::Any + Send> = Box::new(42u8);
        assert_eq!(HandlerPanic::from_payload(&*payload).0, "Unknown panic");
    }
}
