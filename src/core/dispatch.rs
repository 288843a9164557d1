//! Command dispatch: authorization, argument validation, handler invocation.

use std::panic::{catch_unwind, AssertUnwindSafe};

use bevy::prelude::*;

use super::{
    parse_args, resolve_capability, resolve_groups, CommandContext, CommandHandlers,
    ConsoleOutputEvent, ConsoleRegistry, DeferredReply, DispatchError, HandlerPanic, Identity,
};

/// What a successful dispatch produced.
pub struct DispatchOutcome {
    /// Replies addressed to the caller.
    pub replies: Vec<ConsoleOutputEvent>,
    /// Replies that complete in a later frame.
    pub deferred: Vec<DeferredReply>,
}

impl std::fmt::Debug for DispatchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchOutcome")
            .field("replies", &self.replies)
            .field("deferred", &self.deferred.len())
            .finish()
    }
}

/// Resolve and run one command call.
///
/// Steps, in order:
/// 1. look the command up
/// 2. resolve the caller's groups and check them against the allowed list
/// 3. check the required capability, if any
/// 4. validate and parse the arguments
/// 5. run the handler
///
/// Handler errors and panics come back as
/// [`DispatchError::HandlerExecution`]; nothing escapes this function.
pub fn dispatch(
    world: &mut World,
    caller: &Identity,
    command: &str,
    raw_args: &[&str],
) -> Result<DispatchOutcome, DispatchError> {
    let (name, groups, args) = {
        let registry = world
            .get_resource::<ConsoleRegistry>()
            .ok_or_else(|| DispatchError::UnknownCommand(command.into()))?;
        let meta = registry
            .get_cmd(command)
            .ok_or_else(|| DispatchError::UnknownCommand(command.into()))?;

        let groups = resolve_groups(registry, caller);
        if !groups.iter().any(|group| meta.allows(group.name())) {
            let reason = if groups.is_empty() {
                format!("{} is not a member of any group", caller.display_name())
            } else {
                format!(
                    "requires one of [{}], {} is in [{}]",
                    meta.allowed_groups.join(", "),
                    caller.display_name(),
                    groups.iter().map(|g| g.name()).collect::<Vec<_>>().join(", ")
                )
            };
            return Err(DispatchError::PermissionDenied {
                command: meta.name.clone(),
                reason,
            });
        }

        if let Some(capability) = &meta.required_capability {
            if !resolve_capability(&groups, capability) {
                return Err(DispatchError::PermissionDenied {
                    command: meta.name.clone(),
                    reason: format!("requires capability {}", capability),
                });
            }
        }

        let args = parse_args(&meta.name, &meta.signature, raw_args)?;
        let groups: Vec<Box<str>> = groups.iter().map(|g| g.name().into()).collect();
        (meta.name.clone(), groups, args)
    };

    let mut ctx = CommandContext::new(caller.clone(), name.clone(), groups, args);

    let result = world.try_resource_scope(|world, handlers: Mut<CommandHandlers>| {
        let handler = handlers.get(&name)?;
        Some(catch_unwind(AssertUnwindSafe(|| handler(&mut ctx, world))))
    });

    // `CommandHandlers` is out of the world while a handler runs.
    let Some(result) = result else {
        return Err(DispatchError::HandlersUnavailable(name));
    };

    match result {
        None => Err(DispatchError::UnknownCommand(name)),
        Some(Ok(Ok(()))) => {
            let (replies, deferred) = ctx.finish();
            Ok(DispatchOutcome { replies, deferred })
        }
        Some(Ok(Err(source))) => Err(DispatchError::HandlerExecution { command: name, source }),
        Some(Err(panic_info)) => Err(DispatchError::HandlerExecution {
            command: name,
            source: Box::new(HandlerPanic::from_payload(&*panic_info)),
        }),
    }
}

/// Convert a dispatch result into the replies sent back to the caller.
///
/// Failures become a single error reply and are logged.
pub fn into_replies(
    caller: &Identity,
    result: Result<DispatchOutcome, DispatchError>,
) -> (Vec<ConsoleOutputEvent>, Vec<DeferredReply>) {
    match result {
        Ok(outcome) => (outcome.replies, outcome.deferred),
        Err(err) => {
            match &err {
                DispatchError::HandlerExecution { .. } => error!("Console: {}", err),
                DispatchError::PermissionDenied { .. } => {
                    warn!("Console: {} denied: {}", caller.display_name(), err)
                }
                _ => debug!("Console: {}", err),
            }
            (vec![ConsoleOutputEvent::error(err.to_string()).to(caller.id())], Vec::new())
        }
    }
}
