//! The session manager: tracks every signed-in identity.
//!
//! Responsibilities:
//! - create a session after sign-in and issue its session token
//! - mark sessions disconnected when the connection drops
//! - resume a session from its token within the grace period
//! - remember which lobby each identity was placed in
//! - expire and clean up abandoned sessions
//!
//! Not thread-safe on its own; the server keeps it behind a mutex and holds
//! the lock only for the duration of a single call.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use rand::Rng;
use skulk_protocol::{LobbyCode, PlayerId};

use crate::{Session, SessionConfig, SessionError, SessionState};

/// Registry of sessions keyed by player, with a token index for resumption.
pub struct SessionManager {
    sessions: HashMap<PlayerId, Session>,
    /// Session token → owner. Kept in sync with `sessions`.
    tokens: HashMap<String, PlayerId>,
    config: SessionConfig,
}

impl SessionManager {
    /// Creates a new, empty session manager.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            tokens: HashMap::new(),
            config,
        }
    }

    /// Creates a fresh session after sign-in.
    ///
    /// A stale (disconnected or expired) session for the same identity is
    /// replaced and its token revoked.
    ///
    /// # Errors
    /// [`SessionError::AlreadyConnected`] if the identity is live on
    /// another connection.
    pub fn create(&mut self, player_id: PlayerId) -> Result<&Session, SessionError> {
        if let Some(existing) = self.sessions.get(&player_id) {
            if matches!(existing.state, SessionState::Connected) {
                return Err(SessionError::AlreadyConnected(player_id));
            }
            self.tokens.remove(&existing.session_token);
        }

        let token = generate_token();
        self.tokens.insert(token.clone(), player_id);
        let session = self.sessions.entry(player_id).insert_entry(Session {
            player_id,
            state: SessionState::Connected,
            session_token: token,
            lobby: None,
        });

        tracing::info!(%player_id, "session created");
        Ok(session.into_mut())
    }

    /// Marks a player as disconnected and starts the grace period.
    ///
    /// Idempotent: disconnecting an already-disconnected session keeps the
    /// original timestamp.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if no session exists.
    pub fn disconnect(&mut self, player_id: PlayerId) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get_mut(&player_id)
            .ok_or(SessionError::NotFound(player_id))?;

        if matches!(session.state, SessionState::Connected) {
            session.state = SessionState::Disconnected {
                since: Instant::now(),
            };
            tracing::info!(%player_id, "connection dropped, grace period started");
        }
        Ok(())
    }

    /// Resumes a session from its token.
    ///
    /// # Errors
    /// - [`SessionError::InvalidToken`]: token not recognized
    /// - [`SessionError::SessionExpired`]: grace period elapsed
    /// - [`SessionError::AlreadyConnected`]: the session is still live
    pub fn resume(&mut self, token: &str) -> Result<&Session, SessionError> {
        let player_id = self
            .tokens
            .get(token)
            .copied()
            .ok_or(SessionError::InvalidToken)?;
        let grace = self.grace();
        let session = self
            .sessions
            .get_mut(&player_id)
            .ok_or(SessionError::InvalidToken)?;

        match session.state {
            SessionState::Disconnected { since } if since.elapsed() > grace => {
                session.state = SessionState::Expired;
                Err(SessionError::SessionExpired(player_id))
            }
            SessionState::Disconnected { .. } => {
                session.state = SessionState::Connected;
                tracing::info!(%player_id, "session resumed");
                Ok(session)
            }
            SessionState::Connected => Err(SessionError::AlreadyConnected(player_id)),
            SessionState::Expired => Err(SessionError::SessionExpired(player_id)),
        }
    }

    /// Records the lobby a player was placed in (or `None` after leaving).
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if no session exists.
    pub fn set_lobby(
        &mut self,
        player_id: PlayerId,
        lobby: Option<LobbyCode>,
    ) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get_mut(&player_id)
            .ok_or(SessionError::NotFound(player_id))?;
        session.lobby = lobby;
        Ok(())
    }

    /// Expires every disconnected session whose grace has elapsed and
    /// returns their IDs.
    pub fn expire_stale(&mut self) -> Vec<PlayerId> {
        let grace = self.grace();
        let mut expired = Vec::new();

        for session in self.sessions.values_mut() {
            if let SessionState::Disconnected { since } = session.state {
                if since.elapsed() > grace {
                    session.state = SessionState::Expired;
                    expired.push(session.player_id);
                    tracing::info!(
                        player_id = %session.player_id,
                        "session expired (grace period elapsed)"
                    );
                }
            }
        }

        expired
    }

    /// Removes expired sessions and revokes their tokens.
    pub fn cleanup_expired(&mut self) {
        let tokens = &mut self.tokens;
        self.sessions.retain(|_, session| {
            let keep = !matches!(session.state, SessionState::Expired);
            if !keep {
                tokens.remove(&session.session_token);
            }
            keep
        });
    }

    /// Looks up a session by player ID.
    pub fn get(&self, player_id: &PlayerId) -> Option<&Session> {
        self.sessions.get(player_id)
    }

    /// Number of sessions in any state.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// `true` if there are no sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn grace(&self) -> Duration {
        Duration::from_secs(self.config.resume_grace_secs)
    }
}

/// 128 random bits as 32 lowercase hex characters.
fn generate_token() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
