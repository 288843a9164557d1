//! Console registry for permission groups and ConCommands.
//!
//! The registry is filled during startup and then frozen. Once frozen it is
//! only ever read, so dispatch never has to coordinate with registration.

use std::collections::HashMap;

use bevy::prelude::*;

use super::{
    resolve_capability, resolve_groups, Binding, Capability, CommandHandler, ConCommand,
    ConCommandMeta, GameOwner, Group, GroupDef, Identity, RegistryError,
};

/// Lifecycle state of the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegistryState {
    /// Accepting registrations.
    #[default]
    Building,
    /// Read-only.
    Frozen,
}

/// A registered group with its bindings.
#[derive(Debug, Clone)]
struct GroupEntry {
    group: Group,
    bindings: Vec<Binding>,
}

/// Stores command handlers separately from metadata.
///
/// This separation allows command handlers to access `World` (including
/// `ConsoleRegistry`) without borrow conflicts.
#[derive(Resource, Default)]
pub struct CommandHandlers {
    handlers: HashMap<Box<str>, CommandHandler>,
}

impl CommandHandlers {
    /// Create a new empty handler storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a command.
    pub fn register(&mut self, name: Box<str>, handler: CommandHandler) {
        self.handlers.insert(name, handler);
    }

    /// Get a handler by name.
    pub fn get(&self, name: &str) -> Option<&CommandHandler> {
        self.handlers.get(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Central registry for groups and commands.
///
/// # Examples
///
/// ```
/// use bevy_console_access::core::{ConsoleRegistry, GameOwner, GroupDef, RegistryError};
///
/// let mut registry = ConsoleRegistry::new();
/// registry.set_owner(GameOwner::User(1)).unwrap();
/// registry.register_group(GroupDef::default_creator()).unwrap();
/// registry.register_group(GroupDef::default_user()).unwrap();
/// registry.build().unwrap();
///
/// assert_eq!(
///     registry.register_group(GroupDef::new("late", 1)),
///     Err(RegistryError::Frozen)
/// );
/// ```
#[derive(Resource, Default)]
pub struct ConsoleRegistry {
    state: RegistryState,
    owner: GameOwner,
    /// Registration order is kept; it breaks priority ties.
    groups: Vec<GroupEntry>,
    group_index: HashMap<Box<str>, usize>,
    commands: HashMap<Box<str>, ConCommandMeta>,
}

impl ConsoleRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_building(&self) -> Result<(), RegistryError> {
        match self.state {
            RegistryState::Building => Ok(()),
            RegistryState::Frozen => Err(RegistryError::Frozen),
        }
    }

    /// Set the owner that creator bindings resolve against.
    pub fn set_owner(&mut self, owner: GameOwner) -> Result<(), RegistryError> {
        self.ensure_building()?;
        self.owner = owner;
        Ok(())
    }

    /// Register a group with its bindings.
    ///
    /// Fails without touching the registry if the name is taken or the
    /// registry is frozen.
    pub fn register_group(&mut self, def: GroupDef) -> Result<(), RegistryError> {
        self.ensure_building()?;
        if self.group_index.contains_key(def.name()) {
            return Err(RegistryError::DuplicateGroup(def.name().into()));
        }

        let (group, bindings) = def.split();
        debug!("Console: registered group '{}' (priority {})", group.name(), group.priority());
        self.group_index.insert(group.name().into(), self.groups.len());
        self.groups.push(GroupEntry { group, bindings });
        Ok(())
    }

    /// Register a console command, returning the handler for separate storage.
    ///
    /// Allowed groups are checked in [`build`](Self::build), so commands may
    /// be registered before the groups they reference.
    pub fn register_cmd(&mut self, cmd: ConCommand) -> Result<(Box<str>, CommandHandler), RegistryError> {
        self.ensure_building()?;
        let (meta, handler) = cmd.split();

        if self.commands.contains_key(&meta.name) {
            return Err(RegistryError::DuplicateCommand(meta.name));
        }
        meta.validate_signature()
            .map_err(|reason| RegistryError::InvalidSignature { command: meta.name.clone(), reason })?;

        let name = meta.name.clone();
        debug!("Console: registered command '{}'", meta.usage());
        self.commands.insert(name.clone(), meta);
        Ok((name, handler))
    }

    /// Validate cross references and freeze the registry.
    ///
    /// On error the registry stays in the building state.
    pub fn build(&mut self) -> Result<(), RegistryError> {
        self.ensure_building()?;

        let mut names: Vec<_> = self.commands.keys().collect();
        names.sort();
        for name in names {
            let meta = &self.commands[name];
            if let Some(group) = meta.allowed_groups.iter().find(|g| !self.group_index.contains_key(*g)) {
                return Err(RegistryError::UnknownGroup {
                    command: meta.name.clone(),
                    group: group.clone(),
                });
            }
        }

        self.state = RegistryState::Frozen;
        info!(
            "Console: registry frozen with {} groups and {} commands",
            self.groups.len(),
            self.commands.len()
        );
        Ok(())
    }

    #[inline]
    pub fn state(&self) -> RegistryState {
        self.state
    }

    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.state == RegistryState::Frozen
    }

    #[inline]
    pub fn owner(&self) -> &GameOwner {
        &self.owner
    }

    /// Look up a group by name.
    pub fn lookup(&self, name: &str) -> Result<&Group, RegistryError> {
        self.group_index
            .get(name)
            .map(|&i| &self.groups[i].group)
            .ok_or_else(|| RegistryError::GroupNotFound(name.into()))
    }

    /// Bindings of a group.
    pub fn bindings(&self, name: &str) -> Result<&[Binding], RegistryError> {
        self.group_index
            .get(name)
            .map(|&i| self.groups[i].bindings.as_slice())
            .ok_or_else(|| RegistryError::GroupNotFound(name.into()))
    }

    /// Iterate over groups in registration order.
    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.iter().map(|entry| &entry.group)
    }

    /// Iterate over groups and their bindings in registration order.
    pub fn group_entries(&self) -> impl Iterator<Item = (&Group, &[Binding])> {
        self.groups.iter().map(|entry| (&entry.group, entry.bindings.as_slice()))
    }

    /// Get a command's metadata by name.
    pub fn get_cmd(&self, name: &str) -> Option<&ConCommandMeta> {
        self.commands.get(name)
    }

    /// Check if a command exists.
    pub fn contains_cmd(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Iterate over all commands, sorted by name.
    pub fn cmds(&self) -> impl Iterator<Item = (&str, &ConCommandMeta)> {
        let mut cmds: Vec<_> = self.commands.iter().map(|(k, v)| (k.as_ref(), v)).collect();
        cmds.sort_by(|a, b| a.0.cmp(b.0));
        cmds.into_iter()
    }

    /// Get the number of groups.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Get the number of commands.
    pub fn cmd_count(&self) -> usize {
        self.commands.len()
    }

    /// Whether the identity passes the command's group and capability checks.
    pub fn may_run(&self, identity: &Identity, meta: &ConCommandMeta) -> bool {
        let groups = resolve_groups(self, identity);
        groups.iter().any(|group| meta.allows(group.name()))
            && meta
                .required_capability
                .as_deref()
                .is_none_or(|capability| resolve_capability(&groups, capability))
    }

    /// Resolve a capability for an identity.
    pub fn has_capability(&self, identity: &Identity, capability: &Capability) -> bool {
        resolve_capability(&resolve_groups(self, identity), capability)
    }
}
