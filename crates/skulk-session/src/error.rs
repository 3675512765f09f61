//! Error types for the session layer.

use skulk_protocol::PlayerId;

/// Errors that can occur during sign-in and session tracking.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The identity token was rejected by the [`Authenticator`](crate::Authenticator).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// No session exists for the given player.
    #[error("session not found for player {0}")]
    NotFound(PlayerId),

    /// The session token doesn't match anything the server issued.
    #[error("invalid session token")]
    InvalidToken,

    /// The resume grace period has elapsed.
    #[error("session expired for player {0}")]
    SessionExpired(PlayerId),

    /// The identity is already bound to a live connection.
    #[error("player {0} already has an active session")]
    AlreadyConnected(PlayerId),
}
