//! Unified console API for convenient access.
//!
//! The [`Console`] system parameter combines [`ConsoleRegistry`] and
//! [`CommandHandlers`] into a single interface for startup registration.

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;

use super::{
    Capability, CommandHandlers, ConCommand, ConCommandMeta, ConsoleRegistry, GameOwner, Group,
    GroupDef, Identity, RegistryError,
};

/// Unified console system parameter.
///
/// Register groups and commands from a `Startup` system. Errors are
/// returned so the system can propagate them with `?` and abort startup.
///
/// # Examples
///
/// ```ignore
/// fn setup_console(mut console: Console) -> Result {
///     console.create_group(150, "moderator", |group| {
///         group
///             .permission(CAN_EXECUTE_SCRIPTS, true)
///             .bind_to_group_role(5774246, "Moderator")
///             .bind_to_user_ids([83348])
///     })?;
///
///     console.register_cmd(
///         ConCommand::new("kick", |ctx, _world| {
///             ctx.reply("Kicked");
///             Ok(())
///         })
///         .arg(ArgType::Integer)
///         .allow("moderator"),
///     )?;
///     Ok(())
/// }
/// ```
#[derive(SystemParam)]
pub struct Console<'w> {
    registry: ResMut<'w, ConsoleRegistry>,
    handlers: ResMut<'w, CommandHandlers>,
}

impl Console<'_> {
    /// Set the owner that creator bindings resolve against.
    pub fn set_owner(&mut self, owner: GameOwner) -> Result<(), RegistryError> {
        self.registry.set_owner(owner)
    }

    /// Register a group declaration.
    pub fn register_group(&mut self, def: GroupDef) -> Result<(), RegistryError> {
        self.registry.register_group(def)
    }

    /// Declare a group through a builder closure.
    pub fn create_group<F>(&mut self, priority: i32, name: &str, build: F) -> Result<(), RegistryError>
    where
        F: FnOnce(GroupDef) -> GroupDef,
    {
        self.registry.register_group(build(GroupDef::new(name, priority)))
    }

    /// Register the default `creator` group.
    pub fn create_default_creator_group(&mut self) -> Result<(), RegistryError> {
        self.registry.register_group(GroupDef::default_creator())
    }

    /// Register the default `admin` group for the current owner.
    pub fn create_default_admin_group(&mut self) -> Result<(), RegistryError> {
        let def = GroupDef::default_admin(self.registry.owner());
        if def.bindings().is_empty() {
            warn!("Console: game is owned by a user, the admin group has no members");
        }
        self.registry.register_group(def)
    }

    /// Register the default `user` group.
    pub fn create_default_user_group(&mut self) -> Result<(), RegistryError> {
        self.registry.register_group(GroupDef::default_user())
    }

    /// Register a console command.
    ///
    /// This handles both the metadata (in registry) and handler (in handlers) registration.
    pub fn register_cmd(&mut self, cmd: ConCommand) -> Result<(), RegistryError> {
        let (name, handler) = self.registry.register_cmd(cmd)?;
        self.handlers.register(name, handler);
        Ok(())
    }

    /// Look up a group by name.
    pub fn lookup(&self, name: &str) -> Result<&Group, RegistryError> {
        self.registry.lookup(name)
    }

    /// Iterate over all commands.
    pub fn cmds(&self) -> impl Iterator<Item = (&str, &ConCommandMeta)> {
        self.registry.cmds()
    }

    /// Resolve a capability for an identity.
    pub fn has_capability(&self, identity: &Identity, capability: &Capability) -> bool {
        self.registry.has_capability(identity, capability)
    }

    /// Get read-only access to the underlying registry.
    pub fn registry(&self) -> &ConsoleRegistry {
        &self.registry
    }
}

/// Read-only console system parameter.
///
/// Use this after startup, e.g. from a transport deciding who receives
/// broadcast log lines.
#[derive(SystemParam)]
pub struct ConsoleRef<'w> {
    registry: Res<'w, ConsoleRegistry>,
}

impl ConsoleRef<'_> {
    /// Look up a group by name.
    pub fn lookup(&self, name: &str) -> Result<&Group, RegistryError> {
        self.registry.lookup(name)
    }

    /// Names of the groups an identity belongs to.
    pub fn groups_of(&self, identity: &Identity) -> Vec<&str> {
        super::resolve_group_names(&self.registry, identity)
    }

    /// Resolve a capability for an identity.
    pub fn has_capability(&self, identity: &Identity, capability: &Capability) -> bool {
        self.registry.has_capability(identity, capability)
    }

    /// Iterate over all commands.
    pub fn cmds(&self) -> impl Iterator<Item = (&str, &ConCommandMeta)> {
        self.registry.cmds()
    }

    /// Get read-only access to the underlying registry.
    pub fn registry(&self) -> &ConsoleRegistry {
        &self.registry
    }
}
