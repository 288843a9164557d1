//! Permission groups and the bindings that decide membership.

use super::{
    Capability, GameOwner, Identity, PermissionSet, BUILTIN_CAPABILITIES,
    CAN_ACCESS_CONSOLE, CAN_EXECUTE_SCRIPTS, CAN_RECEIVE_SERVER_LOGS, CAN_VIEW_LOG_METADATA,
};

/// Names of the groups created by the default constructors.
pub mod default_groups {
    pub const CREATOR: &str = "creator";
    pub const ADMIN: &str = "admin";
    pub const USER: &str = "user";
}

/// Minimum rank in the owning group for the default admin group.
pub const DEFAULT_ADMIN_RANK: u8 = 250;

/// A named bundle of permissions.
///
/// When several groups apply to one caller, the one with the highest
/// `priority` that defines a capability decides it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    name: Box<str>,
    priority: i32,
    permissions: PermissionSet,
}

impl Group {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    #[inline]
    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }
}

/// A rule associating callers with a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// Matches every caller.
    Everyone,
    /// Matches the owner of the game.
    Creator,
    /// Matches specific user ids.
    UserIds(Vec<u64>),
    /// Matches callers holding a named role in an external group.
    GroupRole { group_id: u64, role: Box<str> },
    /// Matches callers whose rank in an external group is at least `min_rank`.
    GroupRank { group_id: u64, min_rank: u8 },
}

impl Binding {
    /// Check whether the binding applies to `identity`.
    pub fn matches(&self, identity: &Identity, owner: &GameOwner) -> bool {
        match self {
            Binding::Everyone => true,
            Binding::Creator => owner.is_owner(identity),
            Binding::UserIds(ids) => ids.contains(&identity.id()),
            Binding::GroupRole { group_id, role } => identity
                .role_in(*group_id)
                .is_some_and(|held| held.name == *role),
            Binding::GroupRank { group_id, min_rank } => identity
                .rank_in(*group_id)
                .is_some_and(|rank| rank >= *min_rank),
        }
    }
}

/// A group declaration: the group plus its bindings.
///
/// # Examples
///
/// ```
/// use bevy_console_access::core::{GroupDef, CAN_EXECUTE_SCRIPTS};
///
/// let moderators = GroupDef::new("moderator", 150)
///     .permission(CAN_EXECUTE_SCRIPTS, true)
///     .bind_to_group_role(5774246, "Moderator")
///     .bind_to_user_ids([83348]);
///
/// assert_eq!(moderators.name(), "moderator");
/// assert_eq!(moderators.bindings().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDef {
    group: Group,
    bindings: Vec<Binding>,
}

impl GroupDef {
    /// Start a declaration with no permissions and no bindings.
    pub fn new(name: impl Into<Box<str>>, priority: i32) -> Self {
        Self {
            group: Group {
                name: name.into(),
                priority,
                permissions: PermissionSet::new(),
            },
            bindings: Vec::new(),
        }
    }

    /// Explicitly define one capability.
    pub fn permission(mut self, capability: &Capability, value: bool) -> Self {
        self.group.permissions.set(capability, value);
        self
    }

    /// Merge explicit definitions into the group's permission set.
    pub fn permissions<'a>(mut self, entries: impl IntoIterator<Item = (&'a str, bool)>) -> Self {
        for (capability, value) in entries {
            self.group.permissions.set(capability, value);
        }
        self
    }

    pub fn bind(mut self, binding: Binding) -> Self {
        self.bindings.push(binding);
        self
    }

    pub fn bind_to_everyone(self) -> Self {
        self.bind(Binding::Everyone)
    }

    pub fn bind_to_creator(self) -> Self {
        self.bind(Binding::Creator)
    }

    pub fn bind_to_user_ids(self, ids: impl IntoIterator<Item = u64>) -> Self {
        self.bind(Binding::UserIds(ids.into_iter().collect()))
    }

    pub fn bind_to_group_role(self, group_id: u64, role: impl Into<Box<str>>) -> Self {
        self.bind(Binding::GroupRole {
            group_id,
            role: role.into(),
        })
    }

    pub fn bind_to_group_rank(self, group_id: u64, min_rank: u8) -> Self {
        self.bind(Binding::GroupRank { group_id, min_rank })
    }

    #[inline]
    pub fn name(&self) -> &str {
        self.group.name()
    }

    #[inline]
    pub fn group(&self) -> &Group {
        &self.group
    }

    #[inline]
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Split into the group and its bindings.
    pub fn split(self) -> (Group, Vec<Binding>) {
        (self.group, self.bindings)
    }

    /// Owner of the game. Highest possible priority, every built-in
    /// capability granted.
    pub fn default_creator() -> Self {
        Self::new(default_groups::CREATOR, i32::MAX)
            .permissions(BUILTIN_CAPABILITIES.map(|capability| (capability, true)))
            .bind_to_creator()
    }

    /// Senior members of the owning group (rank >= 250).
    ///
    /// Has no bindings when the game is owned by a single user.
    pub fn default_admin(owner: &GameOwner) -> Self {
        let def = Self::new(default_groups::ADMIN, 255)
            .permission(CAN_ACCESS_CONSOLE, true)
            .permission(CAN_EXECUTE_SCRIPTS, true)
            .permission(CAN_RECEIVE_SERVER_LOGS, true)
            .permission(CAN_VIEW_LOG_METADATA, true);

        match owner.group_id() {
            Some(group_id) => def.bind_to_group_rank(group_id, DEFAULT_ADMIN_RANK),
            None => def,
        }
    }

    /// Everyone in the game. May open the console but not run scripts.
    pub fn default_user() -> Self {
        Self::new(default_groups::USER, 0)
            .permission(CAN_ACCESS_CONSOLE, true)
            .permission(CAN_EXECUTE_SCRIPTS, false)
            .bind_to_everyone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::GroupRole;

    #[test]
    fn test_binding_everyone_and_ids() {
        let owner = GameOwner::User(1);
        assert!(Binding::Everyone.matches(&Identity::new(99), &owner));
        assert!(Binding::UserIds(vec![5, 6]).matches(&Identity::new(6), &owner));
        assert!(!Binding::UserIds(vec![5, 6]).matches(&Identity::new(7), &owner));
    }

    #[test]
    fn test_binding_creator() {
        let owner = GameOwner::User(1);
        assert!(Binding::Creator.matches(&Identity::new(1), &owner));
        assert!(!Binding::Creator.matches(&Identity::new(2), &owner));
    }

    #[test]
    fn test_binding_group_role_and_rank() {
        let owner = GameOwner::User(1);
        let caller = Identity::new(3).role(10, GroupRole::new(120, "Moderator"));

        let by_role = Binding::GroupRole { group_id: 10, role: "Moderator".into() };
        let wrong_group = Binding::GroupRole { group_id: 11, role: "Moderator".into() };
        assert!(by_role.matches(&caller, &owner));
        assert!(!wrong_group.matches(&caller, &owner));

        assert!(Binding::GroupRank { group_id: 10, min_rank: 120 }.matches(&caller, &owner));
        assert!(Binding::GroupRank { group_id: 10, min_rank: 100 }.matches(&caller, &owner));
        assert!(!Binding::GroupRank { group_id: 10, min_rank: 121 }.matches(&caller, &owner));
    }

    #[test]
    fn test_default_groups() {
        let creator = GroupDef::default_creator();
        assert_eq!(creator.group().priority(), i32::MAX);
        assert_eq!(creator.group().permissions().get(CAN_EXECUTE_SCRIPTS), Some(true));

        let user = GroupDef::default_user();
        assert_eq!(user.group().permissions().get(CAN_EXECUTE_SCRIPTS), Some(false));
        assert_eq!(user.bindings(), &[Binding::Everyone]);

        assert!(GroupDef::default_admin(&GameOwner::User(1)).bindings().is_empty());
        assert_eq!(
            GroupDef::default_admin(&GameOwner::Group(77)).bindings(),
            &[Binding::GroupRank { group_id: 77, min_rank: DEFAULT_ADMIN_RANK }]
        );
    }
}
