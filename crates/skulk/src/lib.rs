//! # Skulk
//!
//! Authoritative lobby server for a hidden-role social-deduction game.
//!
//! Clients connect over WebSocket, sign in, then host or join a lobby by
//! code. Each lobby is an actor owning a
//! [`GameSession`](skulk_lobby::GameSession): the roster, host-editable
//! settings, match phase, hidden roles and eliminations. Clients only send
//! requests; the authority validates every one and replicates the result.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use skulk::prelude::*;
//!
//! # async fn start() -> Result<(), SkulkError> {
//! skulk::init_tracing();
//! let server = SkulkServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .build(GuestAuthenticator::default())
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::SkulkError;
pub use server::{PROTOCOL_VERSION, ServerTimeouts, SkulkServer, SkulkServerBuilder};

use tracing_subscriber::EnvFilter;

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, defaulting to
/// `info`. Does nothing if a global subscriber is already set.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Everything a server binary or a test client usually needs.
pub mod prelude {
    pub use crate::{PROTOCOL_VERSION, ServerTimeouts, SkulkError, SkulkServer, SkulkServerBuilder};
    pub use skulk_clock::{Clock, ManualClock, TokioClock};
    pub use skulk_lobby::{
        AliveState, ClientReplica, GameAction, GameEvent, LobbyConfig, LobbySettings,
        MatchOutcome, MatchPhase, PerceivedRole, TrueRole, Vec2,
    };
    pub use skulk_protocol::{
        Channel, Codec, Envelope, JsonCodec, LobbyCode, LobbyListEntry, Payload, PlayerId,
        Recipient, SystemMessage,
    };
    pub use skulk_session::{Authenticator, GuestAuthenticator, SessionConfig, SessionError};
    pub use skulk_transport::{Connection, MemoryConnector, Transport, memory_transport};
}
