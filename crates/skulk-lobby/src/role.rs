//! Hidden roles and the perception rule.
//!
//! A participant's [`TrueRole`] never leaves the authority except to its
//! owner. Everyone else only ever receives a [`PerceivedRole`], computed by
//! [`perceive`]: hostiles recognise each other, and everybody else looks
//! benign. The two are separate types: a true role can't be shipped where
//! a perceived one is expected.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use skulk_protocol::PlayerId;

use crate::Rejection;

/// The authoritative role of a participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrueRole {
    Benign,
    Hostile,
}

impl TrueRole {
    pub fn is_hostile(self) -> bool {
        matches!(self, Self::Hostile)
    }
}

impl fmt::Display for TrueRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Benign => write!(f, "Benign"),
            Self::Hostile => write!(f, "Hostile"),
        }
    }
}

/// What one participant is shown about another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PerceivedRole {
    Benign,
    Hostile,
}

/// The role `observer` is shown for `target`.
///
/// Hostile only when both are hostile.
pub fn perceive(observer: TrueRole, target: TrueRole) -> PerceivedRole {
    match (observer, target) {
        (TrueRole::Hostile, TrueRole::Hostile) => PerceivedRole::Hostile,
        _ => PerceivedRole::Benign,
    }
}

// ---------------------------------------------------------------------------
// RoleTable
// ---------------------------------------------------------------------------

/// Authority-only table of true roles for the current match.
///
/// Written once when the match starts; entries are only removed (on
/// disconnect) or wiped (at match end) after that.
#[derive(Debug, Default)]
pub struct RoleTable {
    roles: HashMap<PlayerId, TrueRole>,
}

impl RoleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the roles for a new match.
    ///
    /// # Errors
    /// [`Rejection::RolesAlreadyAssigned`] if the table is not empty.
    pub fn install(
        &mut self,
        roles: impl IntoIterator<Item = (PlayerId, TrueRole)>,
    ) -> Result<(), Rejection> {
        if !self.roles.is_empty() {
            return Err(Rejection::RolesAlreadyAssigned);
        }
        self.roles.extend(roles);
        Ok(())
    }

    pub fn get(&self, player: PlayerId) -> Option<TrueRole> {
        self.roles.get(&player).copied()
    }

    pub fn remove(&mut self, player: PlayerId) -> Option<TrueRole> {
        self.roles.remove(&player)
    }

    pub fn clear(&mut self) {
        self.roles.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlayerId, TrueRole)> + '_ {
        self.roles.iter().map(|(id, role)| (*id, *role))
    }

    pub fn hostiles(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.iter()
            .filter(|(_, role)| role.is_hostile())
            .map(|(id, _)| id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perceive_truth_table() {
        use TrueRole::{Benign, Hostile};
        assert_eq!(perceive(Benign, Benign), PerceivedRole::Benign);
        assert_eq!(perceive(Benign, Hostile), PerceivedRole::Benign);
        assert_eq!(perceive(Hostile, Benign), PerceivedRole::Benign);
        assert_eq!(perceive(Hostile, Hostile), PerceivedRole::Hostile);
    }

    #[test]
    fn test_role_table_install_twice_is_rejected() {
        let mut table = RoleTable::new();
        table
            .install([(PlayerId(1), TrueRole::Hostile)])
            .unwrap();
        assert_eq!(
            table.install([(PlayerId(2), TrueRole::Benign)]),
            Err(Rejection::RolesAlreadyAssigned)
        );
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(PlayerId(2)), None);
    }

    #[test]
    fn test_role_table_hostiles_lists_only_hostiles() {
        let mut table = RoleTable::new();
        table
            .install([
                (PlayerId(1), TrueRole::Hostile),
                (PlayerId(2), TrueRole::Benign),
                (PlayerId(3), TrueRole::Hostile),
            ])
            .unwrap();
        let mut hostiles: Vec<_> = table.hostiles().collect();
        hostiles.sort();
        assert_eq!(hostiles, vec![PlayerId(1), PlayerId(3)]);

        table.clear();
        assert!(table.is_empty());
        assert!(table.install(Vec::new()).is_ok());
    }
}
