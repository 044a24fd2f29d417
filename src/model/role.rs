//! Structural role labels.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Non-exclusive structural role of an actor (or scale node).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    /// Top decile by connection count.
    Hub,
    /// Top decile by inflow.
    Sink,
    /// Top decile by outflow.
    Source,
    /// Hub that is also a Sink or a Source.
    Broker,
    /// Removal would cut a large share of the graph's edges.
    Bottleneck,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Hub => "hub",
            Role::Sink => "sink",
            Role::Source => "source",
            Role::Broker => "broker",
            Role::Bottleneck => "bottleneck",
        };
        f.write_str(s)
    }
}

/// Small ordered set of roles. Five variants at most, so inline storage.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(SmallVec<[Role; 4]>);

impl RoleSet {
    pub fn new() -> Self {
        Self(SmallVec::new())
    }

    /// Insert keeping the set sorted and free of duplicates.
    pub fn insert(&mut self, role: Role) -> bool {
        match self.0.binary_search(&role) {
            Ok(_) => false,
            Err(pos) => {
                self.0.insert(pos, role);
                true
            }
        }
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0.binary_search(&role).is_ok()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        let mut set = RoleSet::new();
        for role in iter {
            set.insert(role);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_dedup_sorted() {
        let mut set = RoleSet::new();
        assert!(set.insert(Role::Broker));
        assert!(set.insert(Role::Hub));
        assert!(!set.insert(Role::Broker));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![Role::Hub, Role::Broker]);
        assert!(set.contains(Role::Hub));
        assert!(!set.contains(Role::Sink));
    }
}
