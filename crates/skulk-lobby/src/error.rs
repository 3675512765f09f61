//! Error types for the lobby layer.
//!
//! Two families live here. [`LobbyError`] covers the directory and actor
//! plumbing (a code that doesn't exist, a dead actor). [`Rejection`] is
//! the authority refusing a client action; rejections are logged and never
//! sent back, so a cheating client learns nothing from them.

use skulk_protocol::{LobbyCode, PlayerId};

use crate::MatchPhase;

/// Errors from lobby directory and actor operations.
#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    /// No lobby has this code.
    #[error("lobby {0} not found")]
    NotFound(LobbyCode),

    /// The lobby is at its participant cap.
    #[error("lobby {0} is full")]
    LobbyFull(LobbyCode),

    /// The player already belongs to a lobby.
    #[error("player {0} already in lobby {1}")]
    AlreadyInLobby(PlayerId, LobbyCode),

    /// The player is not in any lobby.
    #[error("player {0} is not in a lobby")]
    NotInLobby(PlayerId),

    /// The lobby's command channel is closed.
    #[error("lobby {0} is unavailable")]
    Unavailable(LobbyCode),
}

/// Why the authority refused an action.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Rejection {
    #[error("{0} is not a participant")]
    UnknownParticipant(PlayerId),

    #[error("{0} is not the host")]
    NotHost(PlayerId),

    #[error("not allowed while {actual}")]
    WrongPhase { actual: MatchPhase },

    #[error("{0} joined during the match")]
    LateJoiner(PlayerId),

    #[error("lobby is at its cap of {max}")]
    LobbyFull { max: usize },

    #[error("need {required} eligible participants, have {actual}")]
    NotEnoughParticipants { required: usize, actual: usize },

    #[error("{0} is not ready")]
    NotReady(PlayerId),

    #[error("hostile count {hostile_count} must stay below eligible count {eligible}")]
    TooManyHostiles { hostile_count: usize, eligible: usize },

    #[error("roles are already assigned for this match")]
    RolesAlreadyAssigned,

    #[error("{0} is already alive")]
    AlreadyAlive(PlayerId),

    #[error("{0} is already eliminated")]
    AlreadyEliminated(PlayerId),

    #[error("{0} has no avatar")]
    NotSpawned(PlayerId),

    // Elimination pipeline.
    #[error("requester {0} is not hostile")]
    RequesterNotHostile(PlayerId),

    #[error("requester {0} is eliminated")]
    RequesterEliminated(PlayerId),

    #[error("{requester} is on cooldown for another {remaining_ms}ms")]
    OnCooldown { requester: PlayerId, remaining_ms: u64 },

    #[error("target {0} is not tracked")]
    UnknownTarget(PlayerId),

    #[error("target {0} is already eliminated")]
    TargetEliminated(PlayerId),

    #[error("cannot target self")]
    SelfTarget,

    #[error("no known position for {0}")]
    PositionUnknown(PlayerId),

    #[error("target is {distance:.2} away, range is {range:.2}")]
    OutOfRange { distance: f32, range: f32 },

    #[error("hostiles cannot eliminate each other")]
    FriendlyFire,

    #[error("position is not finite")]
    InvalidPosition,
}
