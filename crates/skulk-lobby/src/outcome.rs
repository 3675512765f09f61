//! Win check.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{AliveStore, RoleTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchOutcome {
    BenignVictory,
    HostileVictory,
}

impl fmt::Display for MatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BenignVictory => write!(f, "BenignVictory"),
            Self::HostileVictory => write!(f, "HostileVictory"),
        }
    }
}

/// Decides the match from who is still standing.
///
/// Benign side wins once no hostile is alive. Hostile side wins once
/// living hostiles are at least as many as living benign participants.
/// Only participants with both a role and an avatar count.
pub fn check_outcome(roles: &RoleTable, alive: &AliveStore) -> Option<MatchOutcome> {
    let (mut hostiles, mut benign) = (0usize, 0usize);
    for (id, role) in roles.iter() {
        if !alive.is_alive(id) {
            continue;
        }
        if role.is_hostile() {
            hostiles += 1;
        } else {
            benign += 1;
        }
    }

    if hostiles == 0 {
        Some(MatchOutcome::BenignVictory)
    } else if hostiles >= benign {
        Some(MatchOutcome::HostileVictory)
    } else {
        None
    }
}
