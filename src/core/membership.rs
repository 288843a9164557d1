//! Group membership resolution.

use super::{ConsoleRegistry, Group, Identity};

/// Compute the groups a caller belongs to.
///
/// A group is included when at least one of its bindings matches. Each group
/// appears once, in registration order. An empty result is not an error;
/// callers must treat it as unauthorized.
pub fn resolve_groups<'r>(registry: &'r ConsoleRegistry, identity: &Identity) -> Vec<&'r Group> {
    let owner = registry.owner();
    registry
        .group_entries()
        .filter(|(_, bindings)| bindings.iter().any(|b| b.matches(identity, owner)))
        .map(|(group, _)| group)
        .collect()
}

/// Names of the groups a caller belongs to.
pub fn resolve_group_names<'r>(registry: &'r ConsoleRegistry, identity: &Identity) -> Vec<&'r str> {
    resolve_groups(registry, identity)
        .into_iter()
        .map(Group::name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{GameOwner, GroupDef, GroupRole};

    fn registry() -> ConsoleRegistry {
        let mut registry = ConsoleRegistry::new();
        registry.set_owner(GameOwner::User(1)).unwrap();
        registry.register_group(GroupDef::default_creator()).unwrap();
        registry
            .register_group(
                GroupDef::new("moderator", 150)
                    .bind_to_group_role(5774246, "Moderator")
                    .bind_to_user_ids([83348]),
            )
            .unwrap();
        registry
            .register_group(GroupDef::new("veteran", 20).bind_to_group_rank(10, 100))
            .unwrap();
        registry
    }

    #[test]
    fn test_no_bindings_match() {
        let registry = registry();
        assert!(resolve_groups(&registry, &Identity::new(2)).is_empty());
    }

    #[test]
    fn test_creator() {
        let registry = registry();
        assert_eq!(resolve_group_names(&registry, &Identity::new(1)), vec!["creator"]);
    }

    #[test]
    fn test_union_without_duplicates() {
        let registry = registry();
        // Matches moderator twice (id and role) and veteran once.
        let caller = Identity::new(83348)
            .role(5774246, GroupRole::new(50, "Moderator"))
            .role(10, GroupRole::new(150, "Elder"));

        assert_eq!(resolve_group_names(&registry, &caller), vec!["moderator", "veteran"]);
    }

    #[test]
    fn test_rank_threshold() {
        let registry = registry();
        let below = Identity::new(3).role(10, GroupRole::new(99, "Member"));
        let at = Identity::new(4).role(10, GroupRole::new(100, "Member"));

        assert!(resolve_groups(&registry, &below).is_empty());
        assert_eq!(resolve_group_names(&registry, &at), vec!["veteran"]);
    }

    #[test]
    fn test_everyone() {
        let mut registry = registry();
        registry.register_group(GroupDef::default_user()).unwrap();
        assert_eq!(resolve_group_names(&registry, &Identity::new(2)), vec!["user"]);
    }
}
