//! Game traffic carried inside `Payload::Game`.
//!
//! [`GameAction`] flows from a client to the authority; [`GameEvent`]
//! flows back. Events addressed to a single participant ([`OwnRole`],
//! [`PerceivedRole`]) are never broadcast.
//!
//! [`OwnRole`]: GameEvent::OwnRole
//! [`PerceivedRole`]: GameEvent::PerceivedRole

use serde::{Deserialize, Serialize};
use skulk_protocol::PlayerId;

use crate::{
    AliveState, LobbySettings, MatchOutcome, MatchPhase, PerceivedRolePush, RosterSnapshot,
    TrueRole, Vec2,
};

/// A request from a participant. The sender is implied by the connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GameAction {
    SubmitName { name: String },
    SetReady { ready: bool },
    UpdateSettings { settings: LobbySettings },
    StartMatch,
    RequestElimination { target: PlayerId },
    ReportPosition { position: Vec2 },
}

/// State pushed from the authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GameEvent {
    /// Full roster, sent after every roster mutation.
    Roster(RosterSnapshot),

    Settings { settings: LobbySettings },

    Phase { phase: MatchPhase },

    /// Full alive table. Sent when avatars spawn or all despawn.
    AliveStates { states: Vec<(PlayerId, AliveState)> },

    AliveChanged { player: PlayerId, state: AliveState },

    AvatarDespawned { player: PlayerId },

    /// Full cooldown table; end times in lobby-clock milliseconds.
    Cooldowns { ends: Vec<(PlayerId, u64)> },

    CooldownChanged { player: PlayerId, ends_at_ms: u64 },

    /// The receiver's own true role. Sent to its owner only.
    OwnRole { role: TrueRole },

    /// One perception for the receiving observer. Sent to that observer
    /// only.
    PerceivedRole(PerceivedRolePush),

    /// Cosmetic: play the elimination effect on `victim`.
    EliminationEffect { victim: PlayerId },

    /// The match is over; roles are revealed.
    MatchEnded {
        outcome: MatchOutcome,
        roles: Vec<(PlayerId, TrueRole)>,
    },
}
