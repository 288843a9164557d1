//! Headless server example.
//!
//! Declares a moderator group next to the default groups, registers a
//! moderator-only command and plays a few remote calls from different
//! callers, printing what each caller would receive.
//!
//! Run with: `cargo run --example server`

use bevy::app::AppExit;
use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy_console_access::prelude::*;

/// External group owning the game.
const STUDIO_GROUP: u64 = 5774246;

const MODERATOR: &str = "moderator";

fn main() {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins);

    #[cfg(feature = "log_capture")]
    app.add_plugins(LogPlugin {
        custom_layer: bevy_console_access::custom_log_layer,
        ..default()
    });
    #[cfg(not(feature = "log_capture"))]
    app.add_plugins(LogPlugin::default());

    app.add_plugins(ConsolePlugin::default().owner(GameOwner::Group(STUDIO_GROUP)))
        .add_systems(Startup, setup)
        .add_systems(Update, send_test_calls.run_if(run_once))
        .add_systems(Last, (print_outputs, exit_after_frames))
        .run();
}

fn setup(mut console: Console) -> Result {
    // Higher priority wins when groups disagree on a capability.
    console.create_group(150, MODERATOR, |group| {
        group
            .permission(CAN_EXECUTE_SCRIPTS, true)
            .bind_to_group_role(STUDIO_GROUP, "Moderator")
            .bind_to_user_ids([83348])
    })?;

    console.register_cmd(
        ConCommand::new("kick", |ctx, _world| {
            let target = ctx.args().get(0).and_then(ArgValue::as_integer).unwrap_or_default();
            info!("{} kicked player {}", ctx.caller().display_name(), target);
            ctx.reply(format!("Kicked player {}", target));
            Ok(())
        })
        .description("Remove a player from the server")
        .arg(ArgType::Integer)
        .allow_groups(["creator", "admin", MODERATOR])
        .require(CAN_EXECUTE_SCRIPTS),
    )?;

    Ok(())
}

fn send_test_calls(mut calls: MessageWriter<RemoteCallEvent>, mut lines: MessageWriter<ConsoleInputEvent>) {
    let owner = Identity::new(1)
        .name("studio_owner")
        .role(STUDIO_GROUP, GroupRole::new(255, "Owner"));
    let moderator = Identity::new(83348).name("mod_by_id");
    let player = Identity::new(2).name("player");

    calls.write(RemoteCallEvent::new(owner.clone(), "ping", Vec::<String>::new()));
    calls.write(RemoteCallEvent::new(player.clone(), "ping", Vec::<String>::new()));
    calls.write(RemoteCallEvent::new(player.clone(), "print", ["hello", "42", "true"]));
    calls.write(RemoteCallEvent::new(player.clone(), "say", Vec::<String>::new()));
    calls.write(RemoteCallEvent::new(moderator.clone(), "kick", ["two"]));
    calls.write(RemoteCallEvent::new(moderator, "kick", ["7"]));
    calls.write(RemoteCallEvent::new(player.clone(), "kick", ["7"]));

    lines.write(ConsoleInputEvent::new(player, r#"say "hello there"; whoami"#));
    lines.write(ConsoleInputEvent::new(owner, "help"));
}

/// Print what each recipient would see.
fn print_outputs(mut events: MessageReader<ConsoleOutputEvent>) {
    for event in events.read() {
        let prefix = match event.level {
            ConsoleOutputLevel::Debug => "[DEBUG]",
            ConsoleOutputLevel::Info => "[INFO]",
            ConsoleOutputLevel::Warn => "[WARN]",
            ConsoleOutputLevel::Error => "[ERROR]",
            ConsoleOutputLevel::Command => "[$]",
        };
        match event.recipient {
            Some(id) => println!("-> #{} {} {}", id, prefix, event.message),
            None => println!("-> all {} {}", prefix, event.message),
        }
    }
}

fn exit_after_frames(mut frames: Local<u32>, mut exit: MessageWriter<AppExit>) {
    *frames += 1;
    if *frames > 5 {
        exit.write(AppExit::Success);
    }
}
