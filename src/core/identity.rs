//! Caller identities and game ownership.

use std::collections::HashMap;

/// Rank held by the owner of an external group.
pub const GROUP_OWNER_RANK: u8 = 255;

/// A caller's role inside an external group (guild, clan, studio group...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRole {
    /// Numeric rank, higher is more senior.
    pub rank: u8,
    /// Role display name.
    pub name: Box<str>,
}

impl GroupRole {
    pub fn new(rank: u8, name: impl Into<Box<str>>) -> Self {
        Self {
            rank,
            name: name.into(),
        }
    }
}

/// The caller of a console command.
///
/// Supplied by the transport for each incoming call and never mutated while
/// a call is being resolved.
///
/// # Examples
///
/// ```
/// use bevy_console_access::core::{GroupRole, Identity};
///
/// let caller = Identity::new(83348)
///     .name("builder")
///     .role(5774246, GroupRole::new(200, "Moderator"));
///
/// assert_eq!(caller.rank_in(5774246), Some(200));
/// assert_eq!(caller.rank_in(1), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Identity {
    id: u64,
    name: Box<str>,
    roles: HashMap<u64, GroupRole>,
}

impl Identity {
    /// Create an identity with no external group memberships.
    pub fn new(id: u64) -> Self {
        Self {
            id,
            name: "".into(),
            roles: HashMap::new(),
        }
    }

    /// Set the display name.
    pub fn name(mut self, name: impl Into<Box<str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Add a role in an external group, replacing any previous role there.
    pub fn role(mut self, group_id: u64, role: GroupRole) -> Self {
        self.roles.insert(group_id, role);
        self
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Display name, falling back to the numeric id.
    pub fn display_name(&self) -> String {
        if self.name.is_empty() {
            format!("#{}", self.id)
        } else {
            self.name.to_string()
        }
    }

    /// Role held in an external group, if any.
    pub fn role_in(&self, group_id: u64) -> Option<&GroupRole> {
        self.roles.get(&group_id)
    }

    /// Rank held in an external group, if any.
    pub fn rank_in(&self, group_id: u64) -> Option<u8> {
        self.role_in(group_id).map(|role| role.rank)
    }
}

/// Who owns the game. Creator bindings resolve against this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOwner {
    /// Owned by a single user id.
    User(u64),
    /// Owned by an external group; its owner-rank members are creators.
    Group(u64),
}

impl Default for GameOwner {
    fn default() -> Self {
        GameOwner::User(0)
    }
}

impl GameOwner {
    /// Whether the identity is the designated owner.
    pub fn is_owner(&self, identity: &Identity) -> bool {
        match *self {
            GameOwner::User(id) => identity.id() == id,
            GameOwner::Group(group_id) => identity.rank_in(group_id) == Some(GROUP_OWNER_RANK),
        }
    }

    /// The external group owning the game, if any.
    pub fn group_id(&self) -> Option<u64> {
        match *self {
            GameOwner::User(_) => None,
            GameOwner::Group(id) => Some(id),
        }
    }

    /// An identity that resolves as the owner. Used for local callers such as
    /// the server terminal.
    pub fn identity(&self) -> Identity {
        match *self {
            GameOwner::User(id) => Identity::new(id).name("owner"),
            GameOwner::Group(group_id) => Identity::new(0)
                .name("owner")
                .role(group_id, GroupRole::new(GROUP_OWNER_RANK, "Owner")),
        }
    }
}
