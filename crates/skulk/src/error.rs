//! Unified error type for the Skulk server.

use skulk_lobby::LobbyError;
use skulk_protocol::ProtocolError;
use skulk_session::SessionError;
use skulk_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum SkulkError {
    /// A transport-level error (connection, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (auth, resume, expired).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A lobby-level error (not found, full, unavailable).
    #[error(transparent)]
    Lobby(#[from] LobbyError),
}

impl SkulkError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::Protocol(ProtocolError::InvalidMessage(message.into()))
    }
}
