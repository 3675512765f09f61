//! Lobby directory: creates lobbies, hands out join codes, and tracks
//! which player is in which lobby.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use rand::Rng;
use skulk_clock::TokioClock;
use skulk_protocol::{LobbyCode, PlayerId};

use crate::lobby::spawn_lobby;
use crate::{
    GameAction, GameSession, LobbyConfig, LobbyError, LobbyHandle, LobbyInfo, MatchOutcome,
    PlayerSender,
};

/// Every hosted lobby on this server.
///
/// Entry point for lobby operations from the connection handler. A player
/// is in at most one lobby at a time; a lobby is shut down when its last
/// participant leaves.
pub struct LobbyDirectory {
    lobbies: BTreeMap<LobbyCode, LobbyHandle>,
    player_lobbies: HashMap<PlayerId, LobbyCode>,
    config: LobbyConfig,
}

impl LobbyDirectory {
    pub fn new(config: LobbyConfig) -> Self {
        Self {
            lobbies: BTreeMap::new(),
            player_lobbies: HashMap::new(),
            config,
        }
    }

    /// Creates a lobby with `host` as its first participant.
    pub async fn create(
        &mut self,
        host: PlayerId,
        sender: PlayerSender,
    ) -> Result<LobbyCode, LobbyError> {
        self.ensure_free(host)?;

        let code = self.generate_code();
        let session = GameSession::new(self.config.clone());
        let handle = spawn_lobby(code.clone(), session, Arc::new(TokioClock::start()));

        if let Err(e) = handle.join(host, sender).await {
            let _ = handle.shutdown().await;
            return Err(e);
        }
        self.lobbies.insert(code.clone(), handle);
        self.player_lobbies.insert(host, code.clone());
        tracing::info!(%code, %host, "lobby created");
        Ok(code)
    }

    /// Joins the lobby with this code. Mid-match joins are allowed; the
    /// player waits as a late joiner.
    pub async fn join_by_code(
        &mut self,
        player_id: PlayerId,
        code: &LobbyCode,
        sender: PlayerSender,
    ) -> Result<(), LobbyError> {
        self.ensure_free(player_id)?;
        let handle = self
            .lobbies
            .get(code)
            .ok_or_else(|| LobbyError::NotFound(code.clone()))?;

        handle.join(player_id, sender).await?;
        self.player_lobbies.insert(player_id, code.clone());
        Ok(())
    }

    /// Joins the first open lobby with room, or creates one.
    pub async fn quick_join(
        &mut self,
        player_id: PlayerId,
        sender: PlayerSender,
    ) -> Result<LobbyCode, LobbyError> {
        self.ensure_free(player_id)?;

        // Lobbies are tried in code order. One can fill between get_info
        // and join; keep looking.
        for handle in self.lobbies.values() {
            let Ok(info) = handle.get_info().await else {
                continue;
            };
            if info.is_open() && handle.join(player_id, sender.clone()).await.is_ok() {
                self.player_lobbies.insert(player_id, info.code.clone());
                return Ok(info.code);
            }
        }

        self.create(player_id, sender).await
    }

    /// Removes a player from its lobby, shutting the lobby down if it is
    /// now empty. Returns the lobby it left.
    pub async fn leave(&mut self, player_id: PlayerId) -> Result<LobbyCode, LobbyError> {
        let code = self
            .player_lobbies
            .remove(&player_id)
            .ok_or(LobbyError::NotInLobby(player_id))?;

        let Some(handle) = self.lobbies.get(&code) else {
            return Ok(code);
        };
        let remaining = match handle.leave(player_id).await {
            Ok(remaining) => remaining,
            Err(e) => {
                tracing::warn!(%code, %player_id, error = %e, "lobby gone during leave");
                0
            }
        };
        if remaining == 0 {
            if let Some(handle) = self.lobbies.remove(&code) {
                let _ = handle.shutdown().await;
            }
            self.player_lobbies.retain(|_, c| *c != code);
            tracing::info!(%code, "lobby closed");
        }
        Ok(code)
    }

    /// Routes a client action to the sender's lobby.
    pub async fn route_action(
        &self,
        player_id: PlayerId,
        action: GameAction,
    ) -> Result<(), LobbyError> {
        let handle = self.handle_for(player_id)?;
        handle.send_action(player_id, action).await
    }

    /// Delivers the external end-of-match signal to a lobby.
    pub async fn end_match(
        &self,
        code: &LobbyCode,
        outcome: MatchOutcome,
    ) -> Result<bool, LobbyError> {
        let handle = self
            .lobbies
            .get(code)
            .ok_or_else(|| LobbyError::NotFound(code.clone()))?;
        handle.end_match(outcome).await
    }

    /// Info for every lobby. Lobbies that fail to answer are skipped.
    pub async fn list(&self) -> Vec<LobbyInfo> {
        let mut infos = Vec::with_capacity(self.lobbies.len());
        for handle in self.lobbies.values() {
            if let Ok(info) = handle.get_info().await {
                infos.push(info);
            }
        }
        infos
    }

    pub fn lobby_of(&self, player_id: PlayerId) -> Option<&LobbyCode> {
        self.player_lobbies.get(&player_id)
    }

    pub fn handle(&self, code: &LobbyCode) -> Option<LobbyHandle> {
        self.lobbies.get(code).cloned()
    }

    pub fn lobby_count(&self) -> usize {
        self.lobbies.len()
    }

    fn handle_for(&self, player_id: PlayerId) -> Result<&LobbyHandle, LobbyError> {
        let code = self
            .player_lobbies
            .get(&player_id)
            .ok_or(LobbyError::NotInLobby(player_id))?;
        self.lobbies
            .get(code)
            .ok_or_else(|| LobbyError::NotFound(code.clone()))
    }

    fn ensure_free(&self, player_id: PlayerId) -> Result<(), LobbyError> {
        match self.player_lobbies.get(&player_id) {
            Some(code) => Err(LobbyError::AlreadyInLobby(player_id, code.clone())),
            None => Ok(()),
        }
    }

    /// A fresh code not used by any live lobby.
    fn generate_code(&self) -> LobbyCode {
        let mut rng = rand::rng();
        loop {
            let raw: String = (0..LobbyCode::LEN)
                .map(|_| {
                    let i = rng.random_range(0..LobbyCode::ALPHABET.len());
                    char::from(LobbyCode::ALPHABET[i])
                })
                .collect();
            if let Ok(code) = LobbyCode::parse(&raw) {
                if !self.lobbies.contains_key(&code) {
                    return code;
                }
            }
        }
    }
}

impl Default for LobbyDirectory {
    fn default() -> Self {
        Self::new(LobbyConfig::default())
    }
}
