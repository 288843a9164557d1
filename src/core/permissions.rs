//! Capability resolution across overlapping groups.
//!
//! Groups are consulted from highest to lowest priority. The first group
//! that explicitly defines the capability decides it, so an explicit `false`
//! on a senior group overrides a `true` further down. Capabilities no group
//! defines are denied.

use super::{Capability, Group};

/// Order groups by priority, highest first.
///
/// The sort is stable: groups sharing a priority keep their input order,
/// which is registration order when the input comes from
/// [`resolve_groups`](super::resolve_groups).
pub fn by_priority<'a>(groups: &[&'a Group]) -> Vec<&'a Group> {
    let mut sorted = groups.to_vec();
    sorted.sort_by(|a, b| b.priority().cmp(&a.priority()));
    sorted
}

/// The group whose explicit definition decides `capability`, if any.
pub fn deciding_group<'a>(groups: &[&'a Group], capability: &Capability) -> Option<&'a Group> {
    by_priority(groups)
        .into_iter()
        .find(|group| group.permissions().defines(capability))
}

/// Resolve a capability for a set of matched groups.
///
/// Returns `false` when `groups` is empty or when none of them defines the
/// capability.
///
/// # Examples
///
/// ```
/// use bevy_console_access::core::{resolve_capability, GroupDef, CAN_EXECUTE_SCRIPTS};
///
/// let senior = GroupDef::new("senior", 10).permission(CAN_EXECUTE_SCRIPTS, false);
/// let junior = GroupDef::new("junior", 5).permission(CAN_EXECUTE_SCRIPTS, true);
///
/// let groups = [junior.group(), senior.group()];
/// assert!(!resolve_capability(&groups, CAN_EXECUTE_SCRIPTS));
/// ```
pub fn resolve_capability(groups: &[&Group], capability: &Capability) -> bool {
    deciding_group(groups, capability)
        .and_then(|group| group.permissions().get(capability))
        .unwrap_or(false)
}
