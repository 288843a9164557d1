//! Core console types.
//!
//! This module provides the fundamental building blocks:
//! - [`ConsoleRegistry`] - Groups, bindings and command metadata
//! - [`resolve_groups`] - Which groups a caller belongs to
//! - [`resolve_capability`] - Priority-ordered capability resolution
//! - [`dispatch`] - Authorize, validate and run one command call
//! - [`Console`] - Unified system parameter for startup registration
//! - [`tokenize`] - Command line tokenizer
//! - Messages for communication with transports

mod capability;
mod concommand;
mod console;
mod context;
mod dispatch;
mod error;
mod events;
mod group;
mod identity;
mod membership;
mod permissions;
mod registry;
mod template;
mod tokenizer;

pub use capability::{
    Capability, PermissionSet, BUILTIN_CAPABILITIES, CAN_ACCESS_CONSOLE, CAN_EXECUTE_SCRIPTS,
    CAN_RECEIVE_SERVER_LOGS, CAN_VIEW_LOG_METADATA,
};
pub use concommand::{
    parse_args, usage, ArgSpec, ArgType, ArgValue, CommandArgs, CommandHandler, ConCommand,
    ConCommandMeta,
};
pub use console::{Console, ConsoleRef};
pub use context::{CommandContext, DeferredReply};
pub use dispatch::{dispatch, into_replies, DispatchOutcome};
pub use error::{DispatchError, HandlerError, HandlerPanic, HandlerResult, RegistryError};
pub use events::{
    ConsoleEventsPlugin, ConsoleInputEvent, ConsoleOutputEvent, ConsoleOutputLevel,
    RemoteCallEvent,
};
pub use group::{default_groups, Binding, Group, GroupDef, DEFAULT_ADMIN_RANK};
pub use identity::{GameOwner, GroupRole, Identity, GROUP_OWNER_RANK};
pub use membership::{resolve_group_names, resolve_groups};
pub use permissions::{by_priority, deciding_group, resolve_capability};
pub use registry::{CommandHandlers, ConsoleRegistry, RegistryState};
pub use template::{render_template, template_holes};
pub use tokenizer::{split_commands, tokenize, tokenize_string, TokenizeError, TokenizedCommand};
