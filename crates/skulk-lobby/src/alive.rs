//! Per-avatar alive/eliminated state.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use skulk_protocol::PlayerId;

use crate::Rejection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AliveState {
    Alive,
    Eliminated,
}

impl AliveState {
    pub fn is_alive(self) -> bool {
        matches!(self, Self::Alive)
    }
}

impl fmt::Display for AliveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alive => write!(f, "Alive"),
            Self::Eliminated => write!(f, "Eliminated"),
        }
    }
}

/// Alive state of every spawned avatar, keyed by owner.
///
/// Only the authority calls [`kill`](Self::kill) and
/// [`revive`](Self::revive); replicas overwrite entries with
/// [`set`](Self::set) as updates arrive. A participant without an entry
/// has no avatar (lobby phase, late joiner, or despawned).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliveStore {
    states: BTreeMap<PlayerId, AliveState>,
}

impl AliveStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns an avatar in the `Alive` state, replacing any previous entry.
    pub fn spawn(&mut self, id: PlayerId) {
        self.states.insert(id, AliveState::Alive);
    }

    /// Removes an avatar. Returns its last state.
    pub fn despawn(&mut self, id: PlayerId) -> Option<AliveState> {
        self.states.remove(&id)
    }

    /// Removes every avatar and returns whose they were.
    pub fn despawn_all(&mut self) -> Vec<PlayerId> {
        let ids = self.states.keys().copied().collect();
        self.states.clear();
        ids
    }

    /// Marks an avatar eliminated.
    ///
    /// # Errors
    /// - [`Rejection::NotSpawned`]
    /// - [`Rejection::AlreadyEliminated`], also logged as a warning
    pub fn kill(&mut self, id: PlayerId) -> Result<(), Rejection> {
        self.transition(id, AliveState::Eliminated)
    }

    /// Brings an eliminated avatar back. Not used by normal play.
    ///
    /// # Errors
    /// - [`Rejection::NotSpawned`]
    /// - [`Rejection::AlreadyAlive`], also logged as a warning
    pub fn revive(&mut self, id: PlayerId) -> Result<(), Rejection> {
        self.transition(id, AliveState::Alive)
    }

    /// Overwrites an entry unconditionally. Returns whether it changed.
    pub fn set(&mut self, id: PlayerId, state: AliveState) -> bool {
        self.states.insert(id, state) != Some(state)
    }

    /// Replaces the whole table.
    pub fn replace(&mut self, states: impl IntoIterator<Item = (PlayerId, AliveState)>) {
        self.states = states.into_iter().collect();
    }

    pub fn get(&self, id: PlayerId) -> Option<AliveState> {
        self.states.get(&id).copied()
    }

    pub fn is_alive(&self, id: PlayerId) -> bool {
        self.get(id) == Some(AliveState::Alive)
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.states.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlayerId, AliveState)> + '_ {
        self.states.iter().map(|(id, state)| (*id, *state))
    }

    /// Entries as a list, for replication.
    pub fn to_vec(&self) -> Vec<(PlayerId, AliveState)> {
        self.iter().collect()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    fn transition(&mut self, id: PlayerId, to: AliveState) -> Result<(), Rejection> {
        let state = self
            .states
            .get_mut(&id)
            .ok_or(Rejection::NotSpawned(id))?;
        if *state == to {
            tracing::warn!(player_id = %id, state = %to, "alive state already set");
            return Err(match to {
                AliveState::Alive => Rejection::AlreadyAlive(id),
                AliveState::Eliminated => Rejection::AlreadyEliminated(id),
            });
        }
        *state = to;
        Ok(())
    }
}
