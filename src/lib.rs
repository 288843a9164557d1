//! Group-based permissions and remote command dispatch for Bevy consoles.
//!
//! bevy_console_access decides who may do what in a game's developer
//! console:
//!
//! - **Groups**: named permission sets with a priority, bound to callers by
//!   user id, external group role, rank threshold or game ownership
//! - **ConCommand**: typed command signatures restricted to groups
//! - **Dispatch**: authorization, argument validation and error isolation
//!   for every remote call
//! - **Console**: Unified system parameter for startup registration
//!
//! # Features
//!
//! - `log_capture` (default): route `tracing` events into console output
//! - `terminal`: stdin/stdout backend for dedicated servers
//! - `persist`: declare groups in a RON file
//! - `full`: Enable log_capture + persist
//!
//! # Quick Start
//!
//! ```ignore
//! use bevy::prelude::*;
//! use bevy_console_access::prelude::*;
//!
//! fn main() {
//!     App::new()
//!         .add_plugins(MinimalPlugins)
//!         .add_plugins(ConsolePlugin::default().owner(GameOwner::Group(5774246)))
//!         .add_systems(Startup, setup_console)
//!         .run();
//! }
//!
//! fn setup_console(mut console: Console) -> Result {
//!     console.create_group(150, "moderator", |group| {
//!         group
//!             .permission(CAN_EXECUTE_SCRIPTS, true)
//!             .bind_to_group_role(5774246, "Moderator")
//!     })?;
//!
//!     console.register_cmd(
//!         ConCommand::new("kick", |ctx, _world| {
//!             ctx.reply(format!("Kicked {}", ctx.args().join(" ")));
//!             Ok(())
//!         })
//!         .arg(ArgType::Integer)
//!         .allow_groups(["creator", "admin", "moderator"]),
//!     )?;
//!     Ok(())
//! }
//! ```

use std::panic::{catch_unwind, AssertUnwindSafe};

use bevy::prelude::*;
use bevy::tasks::futures_lite::future::{block_on, poll_once};

pub mod core;

pub use crate::core::{
    Console, ConsoleRef,
    ConCommand, ConCommandMeta, CommandHandler, CommandArgs, CommandContext,
    ArgType, ArgValue, ArgSpec,
    ConsoleRegistry, CommandHandlers, RegistryState,
    Group, GroupDef, Binding, Identity, GroupRole, GameOwner, PermissionSet, Capability,
    dispatch, into_replies, resolve_groups, resolve_capability, DispatchOutcome, DeferredReply,
    DispatchError, RegistryError, HandlerError, HandlerResult, HandlerPanic,
    tokenize, tokenize_string, split_commands, TokenizedCommand, TokenizeError,
    render_template,
    RemoteCallEvent, ConsoleInputEvent, ConsoleOutputEvent, ConsoleOutputLevel,
    ConsoleEventsPlugin,
    CAN_ACCESS_CONSOLE, CAN_EXECUTE_SCRIPTS, CAN_RECEIVE_SERVER_LOGS, CAN_VIEW_LOG_METADATA,
};

// Log capture (feature-gated)
#[cfg(feature = "log_capture")]
pub mod logging;

// Terminal backend (feature-gated)
#[cfg(feature = "terminal")]
pub mod terminal;

// Persistence module (feature-gated)
#[cfg(feature = "persist")]
pub mod persist;

#[cfg(feature = "log_capture")]
pub use logging::{custom_log_layer, LogMessage};

#[cfg(feature = "persist")]
pub use persist::{ConfigError, GroupsFile, GroupsPath};

#[cfg(feature = "terminal")]
pub use terminal::{TerminalConfig, TerminalPlugin};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::core::{
        Console, ConsoleRef,
        ConCommand, CommandArgs, CommandContext, ArgType, ArgValue,
        ConsoleRegistry, GroupDef, Identity, GroupRole, GameOwner,
        RemoteCallEvent, ConsoleInputEvent, ConsoleOutputEvent, ConsoleOutputLevel,
        DispatchError, RegistryError,
        tokenize, split_commands,
        CAN_ACCESS_CONSOLE, CAN_EXECUTE_SCRIPTS, CAN_RECEIVE_SERVER_LOGS, CAN_VIEW_LOG_METADATA,
    };
    pub use crate::ConsolePlugin;
}

/// Main console plugin.
///
/// Registration happens in `PreStartup` (owner, default groups, built-in
/// commands) and `Startup` (user systems). The registry is frozen in
/// `PostStartup`; any configuration error aborts startup.
///
/// # Configuration
///
/// ```ignore
/// ConsolePlugin::default()
///     .owner(GameOwner::Group(5774246))
///     .builtin_commands(false)
/// ```
#[derive(Debug, Clone)]
pub struct ConsolePlugin {
    /// Who owns the game.
    pub owner: GameOwner,
    /// Register the `creator`, `admin` and `user` groups.
    pub default_groups: bool,
    /// Register `ping`, `print`, `say`, `help` and `whoami`.
    ///
    /// The built-ins are restricted to the default groups, so turning those
    /// off requires declaring `creator` and `user` yourself.
    pub builtin_commands: bool,
}

impl Default for ConsolePlugin {
    fn default() -> Self {
        Self {
            owner: GameOwner::default(),
            default_groups: true,
            builtin_commands: true,
        }
    }
}

impl ConsolePlugin {
    pub fn owner(mut self, owner: GameOwner) -> Self {
        self.owner = owner;
        self
    }

    pub fn default_groups(mut self, enabled: bool) -> Self {
        self.default_groups = enabled;
        self
    }

    pub fn builtin_commands(mut self, enabled: bool) -> Self {
        self.builtin_commands = enabled;
        self
    }
}

/// Startup settings copied from [`ConsolePlugin`].
#[derive(Resource, Debug, Clone)]
pub struct ConsoleSettings {
    pub owner: GameOwner,
    pub default_groups: bool,
    pub builtin_commands: bool,
}

impl Plugin for ConsolePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(ConsoleSettings {
            owner: self.owner,
            default_groups: self.default_groups,
            builtin_commands: self.builtin_commands,
        })
        .init_resource::<ConsoleRegistry>()
        .init_resource::<CommandHandlers>()
        .init_resource::<PendingCommands>()
        .insert_non_send_resource(DeferredReplies::default())
        .add_plugins(crate::core::ConsoleEventsPlugin);

        app.add_systems(PreStartup, setup_registry)
            .add_systems(PostStartup, freeze_registry);

        // Process console calls (five-stage pipeline)
        // 1. read_remote_calls: queue structured calls from transports
        // 2. parse_console_input: tokenize raw lines, queue commands
        // 3. execute_pending_commands: dispatch with exclusive World access
        // 4. poll_deferred_replies: advance pending replies once
        // 5. send_pending_outputs: send output events
        app.add_systems(
            Update,
            (
                read_remote_calls,
                parse_console_input,
                execute_pending_commands,
                poll_deferred_replies,
                send_pending_outputs,
            )
                .chain(),
        );

        // Log capture (feature-gated)
        #[cfg(feature = "log_capture")]
        {
            app.add_message::<logging::LogMessage>()
                .add_systems(PostUpdate, logging::forward_captured_logs);
        }

        // Persistence (feature-gated)
        #[cfg(feature = "persist")]
        {
            app.init_resource::<persist::GroupsPath>()
                .add_systems(Startup, persist::load_groups_on_startup);
        }

        // Terminal backend (feature-gated)
        #[cfg(feature = "terminal")]
        {
            app.add_plugins(terminal::TerminalPlugin);
        }
    }
}

/// Set the owner and register the default groups and built-in commands.
fn setup_registry(settings: Res<ConsoleSettings>, mut console: Console) -> Result {
    console.set_owner(settings.owner)?;

    if settings.default_groups {
        console.create_default_creator_group()?;
        console.create_default_admin_group()?;
        console.create_default_user_group()?;
    }

    if settings.builtin_commands {
        for cmd in builtin_commands() {
            console.register_cmd(cmd)?;
        }
    }
    Ok(())
}

/// Validate and freeze the registry once every startup system has run.
fn freeze_registry(mut registry: ResMut<ConsoleRegistry>) -> Result {
    registry.build()?;
    Ok(())
}

/// Built-in console commands.
fn builtin_commands() -> Vec<ConCommand> {
    use crate::core::default_groups::{CREATOR, USER};

    vec![
        // ping - Liveness check for the owner
        ConCommand::new("ping", |ctx, _world| {
            ctx.reply("Pong!");
            Ok(())
        })
        .description("Reply with Pong!")
        .allow(CREATOR),

        // print - Echo arguments back
        ConCommand::new("print", |ctx, _world| {
            let line = ctx.args().join(" ");
            ctx.reply(line);
            Ok(())
        })
        .description("Print the arguments")
        .variadic(ArgType::Unknown)
        .allow(USER),

        // say - Echo one message through a template
        ConCommand::new("say", |ctx, _world| {
            let message = ctx.args().str(0).unwrap_or_default().to_string();
            ctx.reply_template("Console says '{Message}'", &[&message]);
            Ok(())
        })
        .description("Repeat a message")
        .arg(ArgType::String)
        .allow(USER),

        // help - List runnable commands or describe one
        ConCommand::new("help", |ctx, world| {
            let registry = world.resource::<ConsoleRegistry>();

            if let Some(name) = ctx.args().str(0) {
                match registry.get_cmd(name) {
                    Some(meta) if registry.may_run(ctx.caller(), meta) => {
                        let desc = if meta.description.is_empty() { "No description" } else { meta.description };
                        let line = format!("{} - {}", meta.usage(), desc);
                        ctx.reply(line);
                    }
                    _ => ctx.reply_error(format!("Unknown command: '{}'", name)),
                }
                return Ok(());
            }

            let lines: Vec<String> = registry
                .cmds()
                .filter(|(_, meta)| registry.may_run(ctx.caller(), meta))
                .map(|(_, meta)| format!("  {}", meta.usage()))
                .collect();
            ctx.reply("Commands:");
            for line in lines {
                ctx.reply(line);
            }
            ctx.reply("Use 'help <name>' for details");
            Ok(())
        })
        .description("List commands you may run, or describe one")
        .variadic(ArgType::String)
        .allow(USER),

        // whoami - Show the caller's groups
        ConCommand::new("whoami", |ctx, _world| {
            let line = format!("{} is in [{}]", ctx.caller().display_name(), ctx.groups().join(", "));
            ctx.reply(line);
            Ok(())
        })
        .description("Show your console groups")
        .allow(USER),
    ]
}

/// Queued command for execution.
#[derive(Debug, Clone)]
struct QueuedCommand {
    caller: Identity,
    name: String,
    args: Vec<String>,
}

/// Resource that holds pending command executions.
#[derive(Resource, Default)]
struct PendingCommands {
    queue: Vec<QueuedCommand>,
    outputs: Vec<ConsoleOutputEvent>,
}

/// A deferred reply still waiting on its future.
struct PendingReply {
    caller: u64,
    command: Box<str>,
    future: DeferredReply,
}

/// Deferred replies, polled on the main thread.
///
/// Stored as a non-send resource since the futures are `Send` but not `Sync`.
#[derive(Default)]
struct DeferredReplies {
    pending: Vec<PendingReply>,
}

/// System that queues structured remote calls.
fn read_remote_calls(
    mut calls: MessageReader<RemoteCallEvent>,
    mut pending: ResMut<PendingCommands>,
) {
    for call in calls.read() {
        pending.queue.push(QueuedCommand {
            caller: call.caller.clone(),
            name: call.command.clone(),
            args: call.args.clone(),
        });
    }
}

/// System that parses console input and queues commands for execution.
fn parse_console_input(
    mut input_events: MessageReader<ConsoleInputEvent>,
    mut pending: ResMut<PendingCommands>,
) {
    for event in input_events.read() {
        let caller_id = event.caller.id();

        for cmd_str in split_commands(&event.line) {
            pending
                .outputs
                .push(ConsoleOutputEvent::command(format!("$ {}", cmd_str)).to(caller_id));

            let tokens = match tokenize(cmd_str) {
                Ok(t) => t,
                Err(e) => {
                    pending
                        .outputs
                        .push(ConsoleOutputEvent::error(format!("Parse error: {}", e)).to(caller_id));
                    continue;
                }
            };

            pending.queue.push(QueuedCommand {
                caller: event.caller.clone(),
                name: tokens.command,
                args: tokens.args,
            });
        }
    }
}

/// Exclusive system that dispatches queued commands one at a time.
fn execute_pending_commands(world: &mut World) {
    let mut pending = world.resource_mut::<PendingCommands>();
    let queue = std::mem::take(&mut pending.queue);
    let mut outputs = std::mem::take(&mut pending.outputs);
    drop(pending);

    if queue.is_empty() && outputs.is_empty() {
        return;
    }

    let mut deferred = Vec::new();
    for cmd in queue {
        let args: Vec<&str> = cmd.args.iter().map(String::as_str).collect();
        let result = dispatch(world, &cmd.caller, &cmd.name, &args);
        let (replies, futures) = into_replies(&cmd.caller, result);

        outputs.extend(replies);
        deferred.extend(futures.into_iter().map(|future| PendingReply {
            caller: cmd.caller.id(),
            command: cmd.name.as_str().into(),
            future,
        }));
    }

    if !deferred.is_empty() {
        world.non_send_resource_mut::<DeferredReplies>().pending.extend(deferred);
    }
    world.resource_mut::<PendingCommands>().outputs = outputs;
}

/// Poll every pending deferred reply once.
///
/// Completed replies are addressed to the original caller; failures and
/// panics become `HandlerExecution` error replies.
fn poll_deferred_replies(
    mut deferred: NonSendMut<DeferredReplies>,
    mut pending: ResMut<PendingCommands>,
) {
    if deferred.pending.is_empty() {
        return;
    }

    let mut still_pending = Vec::new();
    for mut entry in deferred.pending.drain(..) {
        let polled = catch_unwind(AssertUnwindSafe(|| block_on(poll_once(entry.future.as_mut()))));

        let failure: HandlerError = match polled {
            Ok(None) => {
                still_pending.push(entry);
                continue;
            }
            Ok(Some(Ok(message))) => {
                pending.outputs.push(ConsoleOutputEvent::info(message).to(entry.caller));
                continue;
            }
            Ok(Some(Err(source))) => source,
            Err(panic_info) => Box::new(HandlerPanic::from_payload(&*panic_info)),
        };

        let err = DispatchError::HandlerExecution {
            command: entry.command,
            source: failure,
        };
        error!("Console: {}", err);
        pending
            .outputs
            .push(ConsoleOutputEvent::error(err.to_string()).to(entry.caller));
    }
    deferred.pending = still_pending;
}

/// System that sends queued output events.
fn send_pending_outputs(
    mut pending: ResMut<PendingCommands>,
    mut output_events: MessageWriter<ConsoleOutputEvent>,
) {
    for output in pending.outputs.drain(..) {
        output_events.write(output);
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::task::Poll;

    use super::*;

    const OWNER: u64 = 1;

    /// Collects every output event for inspection.
    #[derive(Resource, Default)]
    struct Collected(Vec<ConsoleOutputEvent>);

    impl Collected {
        fn messages_for(&self, recipient: u64) -> Vec<&str> {
            self.0
                .iter()
                .filter(|event| event.recipient == Some(recipient))
                .map(|event| event.message.as_str())
                .collect()
        }
    }

    fn collect_outputs(mut reader: MessageReader<ConsoleOutputEvent>, mut sink: ResMut<Collected>) {
        sink.0.extend(reader.read().cloned());
    }

    fn test_app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_plugins(ConsolePlugin::default().owner(GameOwner::User(OWNER)));
        app.init_resource::<Collected>();
        app.add_systems(Last, collect_outputs);
        app
    }

    fn call(app: &mut App, caller: u64, command: &str, args: &[&str]) {
        app.world_mut()
            .write_message(RemoteCallEvent::new(Identity::new(caller), command, args.iter().copied()));
    }

    fn take_messages(app: &mut App, recipient: u64) -> Vec<String> {
        let mut collected = app.world_mut().resource_mut::<Collected>();
        let messages = collected
            .messages_for(recipient)
            .into_iter()
            .map(str::to_string)
            .collect();
        collected.0.retain(|event| event.recipient != Some(recipient));
        messages
    }

    #[test]
    fn test_registry_frozen_after_startup() {
        let mut app = test_app();
        app.update();

        let registry = app.world().resource::<ConsoleRegistry>();
        assert!(registry.is_frozen());
        let groups: Vec<_> = registry.groups().map(Group::name).collect();
        assert_eq!(groups, vec!["creator", "admin", "user"]);
        assert!(registry.contains_cmd("ping"));
    }

    #[test]
    #[should_panic]
    fn test_duplicate_group_aborts_startup() {
        let mut app = test_app();
        app.add_systems(Startup, |mut console: Console| -> Result {
            console.create_group(5, "user", |group| group.bind_to_everyone())?;
            Ok(())
        });
        app.update();
    }

    #[test]
    fn test_ping_creator_only() {
        let mut app = test_app();
        app.update();

        call(&mut app, OWNER, "ping", &[]);
        call(&mut app, 2, "ping", &[]);
        app.update();

        assert_eq!(take_messages(&mut app, OWNER), vec!["Pong!"]);
        let denied = take_messages(&mut app, 2);
        assert_eq!(denied.len(), 1);
        assert!(denied[0].starts_with("Cannot execute 'ping'"));
    }

    #[test]
    fn test_say_argument_count() {
        let mut app = test_app();
        app.update();

        call(&mut app, 2, "say", &[]);
        app.update();
        let replies = take_messages(&mut app, 2);
        assert_eq!(replies.len(), 1);
        assert!(replies[0].contains("expected"));

        call(&mut app, 2, "say", &["hello"]);
        app.update();
        assert_eq!(take_messages(&mut app, 2), vec!["Console says 'hello'"]);
    }

    #[test]
    fn test_print_joins_arguments() {
        let mut app = test_app();
        app.update();

        call(&mut app, 2, "print", &[]);
        call(&mut app, 2, "print", &["a", "1", "true"]);
        app.update();

        assert_eq!(take_messages(&mut app, 2), vec!["", "a 1 true"]);
    }

    #[test]
    fn test_unknown_command() {
        let mut app = test_app();
        app.update();

        call(&mut app, 2, "cuont", &[]);
        app.update();
        assert_eq!(take_messages(&mut app, 2), vec!["Unknown command: 'cuont'"]);
    }

    #[test]
    fn test_whoami_and_help() {
        let mut app = test_app();
        app.update();

        call(&mut app, OWNER, "whoami", &[]);
        call(&mut app, 2, "help", &[]);
        app.update();

        assert_eq!(take_messages(&mut app, OWNER), vec!["#1 is in [creator, user]"]);

        let help = take_messages(&mut app, 2);
        assert_eq!(help.first().map(String::as_str), Some("Commands:"));
        assert!(help.iter().any(|line| line.contains("say <string>")));
        assert!(!help.iter().any(|line| line.contains("ping")));
    }

    #[test]
    fn test_help_hides_commands_missing_a_capability() {
        let mut app = test_app();
        app.add_systems(Startup, |mut console: Console| -> Result {
            console.register_cmd(
                ConCommand::new("script", |ctx, _world| {
                    ctx.reply("ran");
                    Ok(())
                })
                .allow("user")
                .require(CAN_EXECUTE_SCRIPTS),
            )?;
            Ok(())
        });
        app.update();

        call(&mut app, 2, "help", &[]);
        call(&mut app, OWNER, "help", &[]);
        app.update();

        let user_help = take_messages(&mut app, 2);
        assert!(user_help.iter().any(|line| line.contains("print")));
        assert!(!user_help.iter().any(|line| line.contains("script")));

        let owner_help = take_messages(&mut app, OWNER);
        assert!(owner_help.iter().any(|line| line.contains("script")));

        call(&mut app, 2, "help", &["script"]);
        app.update();
        assert_eq!(take_messages(&mut app, 2), vec!["Unknown command: 'script'"]);
    }

    #[test]
    fn test_console_input_lines() {
        let mut app = test_app();
        app.update();

        app.world_mut().write_message(ConsoleInputEvent::new(
            Identity::new(2),
            r#"say "hello world"; print a b"#,
        ));
        app.update();

        let replies = take_messages(&mut app, 2);
        assert!(replies.contains(&r#"$ say "hello world""#.to_string()));
        assert!(replies.contains(&"Console says 'hello world'".to_string()));
        assert!(replies.contains(&"a b".to_string()));

        app.world_mut()
            .write_message(ConsoleInputEvent::new(Identity::new(2), r#"say "open"#));
        app.update();
        let replies = take_messages(&mut app, 2);
        assert!(replies.iter().any(|line| line.starts_with("Parse error:")));
    }

    #[test]
    fn test_deferred_reply_does_not_block() {
        let mut app = test_app();
        let gate = Arc::new(AtomicBool::new(false));
        let open = gate.clone();

        app.add_systems(Startup, move |mut console: Console| -> Result {
            let gate = open.clone();
            console.register_cmd(
                ConCommand::new("slow", move |ctx, _world| {
                    let gate = gate.clone();
                    ctx.defer(poll_fn(move |_| {
                        if gate.load(Ordering::SeqCst) {
                            Poll::Ready(Ok("done".to_string()))
                        } else {
                            Poll::Pending
                        }
                    }));
                    Ok(())
                })
                .allow("user"),
            )?;
            Ok(())
        });
        app.update();

        call(&mut app, 2, "slow", &[]);
        app.update();
        assert!(take_messages(&mut app, 2).is_empty());

        call(&mut app, OWNER, "ping", &[]);
        app.update();
        assert_eq!(take_messages(&mut app, OWNER), vec!["Pong!"]);
        assert!(take_messages(&mut app, 2).is_empty());

        gate.store(true, Ordering::SeqCst);
        app.update();
        assert_eq!(take_messages(&mut app, 2), vec!["done"]);

        app.update();
        assert!(take_messages(&mut app, 2).is_empty());
    }

    #[test]
    fn test_deferred_failure_reported() {
        let mut app = test_app();
        app.add_systems(Startup, |mut console: Console| -> Result {
            console.register_cmd(
                ConCommand::new("lookup", |ctx, _world| {
                    ctx.defer(async { Err::<String, HandlerError>("service unavailable".into()) });
                    Ok(())
                })
                .allow("user"),
            )?;
            Ok(())
        });
        app.update();

        call(&mut app, 2, "lookup", &[]);
        app.update();
        assert_eq!(
            take_messages(&mut app, 2),
            vec!["Command 'lookup' failed: service unavailable"]
        );
    }

    #[test]
    fn test_builtins_disabled() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_plugins(ConsolePlugin::default().builtin_commands(false));
        app.update();

        let registry = app.world().resource::<ConsoleRegistry>();
        assert_eq!(registry.cmd_count(), 0);
        assert_eq!(registry.group_count(), 3);
    }

    #[cfg(feature = "log_capture")]
    #[test]
    fn test_captured_logs_are_broadcast() {
        use bevy::log::Level;
        use std::time::SystemTime;

        let mut app = test_app();
        app.update();

        app.world_mut().write_message(LogMessage {
            message: "server started".into(),
            target: "game",
            level: Level::WARN,
            file: None,
            line: None,
            properties: Vec::new(),
            time: SystemTime::now(),
        });
        app.update();

        let collected = app.world().resource::<Collected>();
        let broadcast: Vec<_> = collected.0.iter().filter(|e| e.recipient.is_none()).collect();
        assert_eq!(broadcast.len(), 1);
        assert_eq!(broadcast[0].message, "server started");
        assert_eq!(broadcast[0].level, ConsoleOutputLevel::Warn);
    }
}
