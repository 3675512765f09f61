//! Session types: the server's record of one signed-in identity.

use std::time::Instant;

use skulk_protocol::{LobbyCode, PlayerId};

/// Configuration for session behavior.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long (in seconds) a dropped connection may take to resume
    /// before its session is expired. 0 disables resumption.
    pub resume_grace_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            resume_grace_secs: 30,
        }
    }
}

/// The current state of a session.
///
/// ```text
///   Connected ──(disconnect)──→ Disconnected ──(grace elapsed)──→ Expired
///       ↑                            │
///       └─────────(resume)───────────┘
/// ```
#[derive(Debug, Clone)]
pub enum SessionState {
    /// Bound to a live connection.
    Connected,

    /// The connection dropped at `since`; resumable until
    /// `since + grace`.
    Disconnected { since: Instant },

    /// Grace elapsed. Awaiting cleanup.
    Expired,
}

/// A single identity's session on the server.
#[derive(Debug, Clone)]
pub struct Session {
    /// Which player this session belongs to.
    pub player_id: PlayerId,

    /// Current lifecycle state.
    pub state: SessionState,

    /// Secret the client presents to resume this identity. 32 hex chars.
    pub session_token: String,

    /// The lobby this identity was last placed in, if any. A resumed
    /// connection is routed back to it.
    pub lobby: Option<LobbyCode>,
}
