//! Lobby configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::LobbySettings;

/// Server-side knobs for every lobby. Not editable by clients; the host
/// edits [`LobbySettings`] instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobbyConfig {
    /// Maximum distance, in world units, for an elimination.
    pub kill_range: f32,

    /// How long `PostMatch` lasts before the lobby reopens.
    pub return_to_lobby_delay: Duration,

    /// Eligible participants needed to start a match.
    pub min_eligible: usize,

    /// End the match on its own when one side has won.
    pub auto_end: bool,

    /// Only hostiles may request eliminations.
    pub require_hostile_requester: bool,

    /// Settings a new lobby starts with.
    pub initial_settings: LobbySettings,

    /// Capacity of the lobby actor's command channel.
    pub channel_size: usize,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            kill_range: 2.0,
            return_to_lobby_delay: Duration::from_secs(5),
            min_eligible: 2,
            auto_end: true,
            require_hostile_requester: true,
            initial_settings: LobbySettings::default(),
            channel_size: 64,
        }
    }
}
