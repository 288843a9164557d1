//! Per-call context handed to command handlers.

use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;

use super::{render_template, CommandArgs, ConsoleOutputEvent, HandlerError, Identity};

/// A reply that completes after the handler returned.
pub type DeferredReply = Pin<Box<dyn Future<Output = Result<String, HandlerError>> + Send + 'static>>;

/// Context of a single command call.
///
/// Gives handlers the caller, the parsed arguments and a reply channel back
/// to the caller.
pub struct CommandContext {
    caller: Identity,
    command: Box<str>,
    groups: Vec<Box<str>>,
    args: CommandArgs,
    replies: Vec<ConsoleOutputEvent>,
    deferred: Vec<DeferredReply>,
}

impl CommandContext {
    pub fn new(caller: Identity, command: impl Into<Box<str>>, groups: Vec<Box<str>>, args: CommandArgs) -> Self {
        Self {
            caller,
            command: command.into(),
            groups,
            args,
            replies: Vec::new(),
            deferred: Vec::new(),
        }
    }

    /// The identity that issued the call.
    #[inline]
    pub fn caller(&self) -> &Identity {
        &self.caller
    }

    /// Name of the command being run.
    #[inline]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Groups the caller resolved to.
    #[inline]
    pub fn groups(&self) -> &[Box<str>] {
        &self.groups
    }

    /// Parsed arguments.
    #[inline]
    pub fn args(&self) -> &CommandArgs {
        &self.args
    }

    /// Send an informational reply to the caller.
    pub fn reply(&mut self, message: impl Into<String>) {
        let reply = ConsoleOutputEvent::info(message).to(self.caller.id());
        self.replies.push(reply);
    }

    /// Send an error reply to the caller.
    pub fn reply_error(&mut self, message: impl Into<String>) {
        let reply = ConsoleOutputEvent::error(message).to(self.caller.id());
        self.replies.push(reply);
    }

    /// Reply with a message template, filling `{Name}` holes in order.
    pub fn reply_template(&mut self, template: &str, values: &[&dyn Display]) {
        self.reply(render_template(template, values));
    }

    /// Reply later, once `future` resolves.
    ///
    /// The future is polled once per frame on the main schedule. Later calls
    /// are dispatched while it is pending.
    pub fn defer<F>(&mut self, future: F)
    where
        F: Future<Output = Result<String, HandlerError>> + Send + 'static,
    {
        self.deferred.push(Box::pin(future));
    }

    /// Consume the context, returning the replies and pending futures.
    pub fn finish(self) -> (Vec<ConsoleOutputEvent>, Vec<DeferredReply>) {
        (self.replies, self.deferred)
    }
}
