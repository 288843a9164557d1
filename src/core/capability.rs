//! Capabilities and per-group permission sets.
//!
//! A capability is a named boolean permission. Groups only store the
//! capabilities they define explicitly; anything else is left unset so that
//! lower priority groups get a chance to decide.

use std::collections::HashMap;

/// Name of a boolean permission.
pub type Capability = str;

/// Identity may open the console at all.
pub const CAN_ACCESS_CONSOLE: &Capability = "CanAccessConsole";

/// Identity may run scripts through the console.
pub const CAN_EXECUTE_SCRIPTS: &Capability = "CanExecuteScripts";

/// Identity receives log lines broadcast by the server.
pub const CAN_RECEIVE_SERVER_LOGS: &Capability = "CanReceiveServerLogs";

/// Identity sees log metadata (target, file, line) alongside messages.
pub const CAN_VIEW_LOG_METADATA: &Capability = "CanViewLogMetadata";

/// Every capability known to the crate.
pub const BUILTIN_CAPABILITIES: [&Capability; 4] = [
    CAN_ACCESS_CONSOLE,
    CAN_EXECUTE_SCRIPTS,
    CAN_RECEIVE_SERVER_LOGS,
    CAN_VIEW_LOG_METADATA,
];

/// Explicitly defined capabilities of a group.
///
/// Distinguishes "unset" (absent) from an explicit `false`, which matters for
/// priority overrides: an explicit `false` stops resolution, an unset
/// capability falls through to the next group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
    entries: HashMap<Box<str>, bool>,
}

impl PermissionSet {
    /// Create an empty permission set.
    pub fn new() -> Self {
        Self::default()
    }

    /// A set with every built-in capability set to `value`.
    pub fn all(value: bool) -> Self {
        let mut set = Self::new();
        for capability in BUILTIN_CAPABILITIES {
            set.set(capability, value);
        }
        set
    }

    /// Explicitly define a capability.
    pub fn set(&mut self, capability: &Capability, value: bool) -> &mut Self {
        self.entries.insert(capability.into(), value);
        self
    }

    /// Remove an explicit definition, making the capability unset again.
    pub fn unset(&mut self, capability: &Capability) -> Option<bool> {
        self.entries.remove(capability)
    }

    /// The explicit value, or `None` if the capability is unset.
    #[inline]
    pub fn get(&self, capability: &Capability) -> Option<bool> {
        self.entries.get(capability).copied()
    }

    /// Whether the capability is explicitly defined (either way).
    #[inline]
    pub fn defines(&self, capability: &Capability) -> bool {
        self.entries.contains_key(capability)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over explicit definitions, sorted by capability name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        let mut entries: Vec<_> = self.entries.iter().map(|(k, v)| (k.as_ref(), *v)).collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries.into_iter()
    }
}

impl<'a> FromIterator<(&'a str, bool)> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = (&'a str, bool)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (capability, value) in iter {
            set.set(capability, value);
        }
        set
    }
}
