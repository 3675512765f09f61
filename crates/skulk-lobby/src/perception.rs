//! Perceived-role distribution.
//!
//! The authority turns its [`RoleTable`] into targeted pushes, one per
//! (observer, target) pair, each addressed to the observer alone. Clients
//! keep what they receive in a [`PerceptionCache`]; that cache is the only
//! thing client-side role rendering may read.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use skulk_protocol::PlayerId;

use crate::{PerceivedRole, RoleTable, TrueRole, perceive};

/// What `role` the receiving observer should show for `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerceivedRolePush {
    pub target: PlayerId,
    pub role: PerceivedRole,
}

/// Everything one observer should be told.
///
/// An observer without a true role (a late joiner) is treated as benign,
/// so it learns nothing. Targets without a role are skipped.
pub fn pushes_for_observer(roles: &RoleTable, observer: PlayerId) -> Vec<PerceivedRolePush> {
    let observer_role = roles.get(observer).unwrap_or(TrueRole::Benign);
    let mut pushes: Vec<_> = roles
        .iter()
        .map(|(target, target_role)| PerceivedRolePush {
            target,
            role: perceive(observer_role, target_role),
        })
        .collect();
    pushes.sort_by_key(|p| p.target);
    pushes
}

/// The full distribution pass: every connected observer gets a push for
/// every target that holds a role.
pub fn perception_pushes(
    roles: &RoleTable,
    observers: impl IntoIterator<Item = PlayerId>,
) -> Vec<(PlayerId, PerceivedRolePush)> {
    observers
        .into_iter()
        .flat_map(|observer| {
            pushes_for_observer(roles, observer)
                .into_iter()
                .map(move |push| (observer, push))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// PerceptionCache
// ---------------------------------------------------------------------------

/// An observer's received perceptions, keyed by target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PerceptionCache {
    entries: BTreeMap<PlayerId, PerceivedRole>,
}

impl PerceptionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, push: PerceivedRolePush) {
        self.entries.insert(push.target, push.role);
    }

    pub fn get(&self, target: PlayerId) -> Option<PerceivedRole> {
        self.entries.get(&target).copied()
    }

    /// Targets this observer has been told are hostile.
    pub fn known_hostiles(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.entries
            .iter()
            .filter(|(_, role)| **role == PerceivedRole::Hostile)
            .map(|(id, _)| *id)
    }

    pub fn forget(&mut self, target: PlayerId) {
        self.entries.remove(&target);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(id: u64) -> PlayerId {
        PlayerId(id)
    }

    fn table() -> RoleTable {
        let mut roles = RoleTable::new();
        roles
            .install([
                (pid(1), TrueRole::Benign),
                (pid(2), TrueRole::Hostile),
                (pid(3), TrueRole::Benign),
                (pid(4), TrueRole::Hostile),
            ])
            .unwrap();
        roles
    }

    #[test]
    fn test_pushes_for_benign_observer_all_benign() {
        let pushes = pushes_for_observer(&table(), pid(1));
        assert_eq!(pushes.len(), 4);
        assert!(pushes.iter().all(|p| p.role == PerceivedRole::Benign));
    }

    #[test]
    fn test_pushes_for_hostile_observer_reveal_fellow_hostiles_only() {
        let pushes = pushes_for_observer(&table(), pid(2));
        let hostile: Vec<_> = pushes
            .iter()
            .filter(|p| p.role == PerceivedRole::Hostile)
            .map(|p| p.target)
            .collect();
        assert_eq!(hostile, vec![pid(2), pid(4)]);
    }

    #[test]
    fn test_pushes_for_roleless_observer_learn_nothing() {
        let pushes = pushes_for_observer(&table(), pid(99));
        assert_eq!(pushes.len(), 4);
        assert!(pushes.iter().all(|p| p.role == PerceivedRole::Benign));
    }

    #[test]
    fn test_perception_pushes_addresses_each_observer() {
        let pushes = perception_pushes(&table(), [pid(1), pid(2)]);
        assert_eq!(pushes.len(), 8);
        assert_eq!(pushes.iter().filter(|(o, _)| *o == pid(1)).count(), 4);
        assert!(
            pushes
                .iter()
                .filter(|(o, _)| *o == pid(1))
                .all(|(_, p)| p.role == PerceivedRole::Benign)
        );
    }

    #[test]
    fn test_cache_apply_and_known_hostiles() {
        let mut cache = PerceptionCache::new();
        for push in pushes_for_observer(&table(), pid(4)) {
            cache.apply(push);
        }
        assert_eq!(cache.get(pid(1)), Some(PerceivedRole::Benign));
        assert_eq!(cache.known_hostiles().collect::<Vec<_>>(), vec![pid(2), pid(4)]);

        cache.forget(pid(2));
        assert_eq!(cache.get(pid(2)), None);
        cache.clear();
        assert!(cache.is_empty());
    }
}
