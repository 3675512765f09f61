//! The match phase machine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a lobby is in its round cycle.
///
/// Transitions go strictly in order and wrap around:
///
/// ```text
/// LobbyOpen → MatchInProgress → PostMatch → LobbyOpen
/// ```
///
/// - **LobbyOpen**: participants ready up, the host edits settings.
/// - **MatchInProgress**: roles are assigned, avatars are live,
///   eliminations are accepted.
/// - **PostMatch**: roles are revealed, avatars are gone. A timer returns
///   the lobby to `LobbyOpen`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MatchPhase {
    #[default]
    LobbyOpen,
    MatchInProgress,
    PostMatch,
}

impl MatchPhase {
    /// The only phase this one may move to.
    pub fn next(self) -> Self {
        match self {
            Self::LobbyOpen => Self::MatchInProgress,
            Self::MatchInProgress => Self::PostMatch,
            Self::PostMatch => Self::LobbyOpen,
        }
    }

    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == target
    }

    pub fn is_lobby_open(self) -> bool {
        matches!(self, Self::LobbyOpen)
    }

    pub fn is_in_match(self) -> bool {
        matches!(self, Self::MatchInProgress)
    }
}

impl fmt::Display for MatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LobbyOpen => write!(f, "LobbyOpen"),
            Self::MatchInProgress => write!(f, "MatchInProgress"),
            Self::PostMatch => write!(f, "PostMatch"),
        }
    }
}
