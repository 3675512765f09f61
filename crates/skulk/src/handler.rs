//! Per-connection handler: handshake, sign-in or resume, and routing.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Receive Handshake → validate version
//!   2. Resume a session token, or authenticate → get PlayerId
//!   3. Send HandshakeAck with the session token
//!   4. Rejoin the last lobby if this was a resume
//!   5. Loop: client envelopes → directory or lobby; lobby events → client

use std::sync::Arc;

use skulk_lobby::{GameAction, GameEvent, LobbyError};
use skulk_protocol::{
    Channel, Codec, Envelope, LobbyCode, Payload, PlayerId, SystemMessage,
};
use skulk_session::{Authenticator, SessionError};
use skulk_transport::Connection;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};

use crate::SkulkError;
use crate::server::{PROTOCOL_VERSION, ServerState};

/// Drop guard that takes a player out of its lobby and starts the
/// session's resume grace when the handler exits.
///
/// The session keeps its last lobby so a resume can route back to it.
/// Since `Drop` is synchronous, the cleanup runs in a spawned task.
struct SessionGuard<A: Authenticator, C: Codec> {
    player_id: PlayerId,
    state: Arc<ServerState<A, C>>,
}

impl<A: Authenticator, C: Codec> Drop for SessionGuard<A, C> {
    fn drop(&mut self) {
        let player_id = self.player_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            {
                let mut lobbies = state.lobbies.lock().await;
                if lobbies.lobby_of(player_id).is_some() {
                    let _ = lobbies.leave(player_id).await;
                }
            }
            let _ = state.sessions.lock().await.disconnect(player_id);
        });
    }
}

/// Outbound half of a connection: stamps envelopes with a sequence
/// number and server time.
struct Outbox<'a, Conn, A: Authenticator, C: Codec> {
    conn: &'a Conn,
    state: &'a ServerState<A, C>,
    seq: u64,
}

impl<'a, Conn, A, C> Outbox<'a, Conn, A, C>
where
    Conn: Connection,
    A: Authenticator,
    C: Codec,
{
    fn new(conn: &'a Conn, state: &'a ServerState<A, C>) -> Self {
        Self {
            conn,
            state,
            seq: 0,
        }
    }

    async fn send(&mut self, payload: Payload) -> Result<(), SkulkError> {
        let envelope = Envelope {
            seq: self.seq,
            timestamp: self.state.server_time(),
            channel: Channel::ReliableOrdered,
            payload,
        };
        self.seq += 1;
        let bytes = self.state.codec.encode(&envelope)?;
        self.conn.send(&bytes).await?;
        Ok(())
    }

    async fn system(&mut self, msg: SystemMessage) -> Result<(), SkulkError> {
        self.send(Payload::System(msg)).await
    }

    async fn event(&mut self, event: &GameEvent) -> Result<(), SkulkError> {
        let data = self.state.codec.encode(event)?;
        self.send(Payload::Game(data)).await
    }

    async fn error(&mut self, code: u16, message: impl Into<String>) -> Result<(), SkulkError> {
        self.system(SystemMessage::Error {
            code,
            message: message.into(),
        })
        .await
    }
}

/// What the handshake settled on.
struct Identity {
    player_id: PlayerId,
    session_token: String,
    /// Set when a resumed session was last in a lobby.
    rejoin: Option<LobbyCode>,
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<Conn, A, C>(
    conn: Conn,
    state: Arc<ServerState<A, C>>,
) -> Result<(), SkulkError>
where
    Conn: Connection,
    A: Authenticator,
    C: Codec,
{
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let mut outbox = Outbox::new(&conn, &state);

    // --- Handshake ---
    let identity = perform_handshake(&conn, &state, &mut outbox).await?;
    let player_id = identity.player_id;
    let _guard = SessionGuard {
        player_id,
        state: Arc::clone(&state),
    };
    outbox
        .system(SystemMessage::HandshakeAck {
            player_id,
            server_time: state.server_time(),
            session_token: identity.session_token,
        })
        .await?;
    tracing::info!(%conn_id, %player_id, "player connected");

    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<GameEvent>();

    if let Some(code) = identity.rejoin {
        rejoin_lobby(&state, &mut outbox, player_id, code, &events_tx).await?;
    }

    // --- Message loop ---
    let idle_timeout = state.timeouts.idle;
    let idle = time::sleep(idle_timeout);
    tokio::pin!(idle);

    loop {
        tokio::select! {
            received = conn.recv() => {
                let data = match received {
                    Ok(Some(data)) => data,
                    Ok(None) => {
                        tracing::info!(%player_id, "connection closed cleanly");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(%player_id, error = %e, "recv error");
                        break;
                    }
                };
                idle.as_mut().reset(Instant::now() + idle_timeout);

                let envelope: Envelope = match state.codec.decode(&data) {
                    Ok(env) => env,
                    Err(e) => {
                        tracing::debug!(%player_id, error = %e, "failed to decode envelope");
                        continue;
                    }
                };

                let should_close = match envelope.payload {
                    Payload::System(msg) => {
                        handle_system_message(&state, &mut outbox, player_id, msg, &events_tx)
                            .await?
                    }
                    Payload::Game(data) => {
                        handle_game_message(&state, &mut outbox, player_id, &data).await?;
                        false
                    }
                };
                if should_close {
                    break;
                }
            }
            Some(event) = events_rx.recv() => {
                outbox.event(&event).await?;
            }
            () = &mut idle => {
                tracing::info!(%player_id, "connection timed out");
                break;
            }
        }
    }

    let _ = conn.close().await;
    // _guard drops here → lobby leave and session disconnect fire.
    Ok(())
}

/// Receives the Handshake, checks the version, and resolves an identity
/// by session token or by the authenticator.
async fn perform_handshake<Conn, A, C>(
    conn: &Conn,
    state: &ServerState<A, C>,
    outbox: &mut Outbox<'_, Conn, A, C>,
) -> Result<Identity, SkulkError>
where
    Conn: Connection,
    A: Authenticator,
    C: Codec,
{
    let data = match time::timeout(state.timeouts.handshake, conn.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => return Err(SkulkError::invalid("connection closed before handshake")),
        Ok(Err(e)) => return Err(SkulkError::Transport(e)),
        Err(_) => return Err(SkulkError::invalid("handshake timed out")),
    };

    let envelope: Envelope = state.codec.decode(&data)?;

    let Payload::System(SystemMessage::Handshake {
        version,
        token,
        session_token,
    }) = envelope.payload
    else {
        outbox.error(400, "expected Handshake").await?;
        return Err(SkulkError::invalid("first message must be Handshake"));
    };

    if version != PROTOCOL_VERSION {
        outbox
            .error(
                400,
                format!("version mismatch: expected {PROTOCOL_VERSION}, got {version}"),
            )
            .await?;
        return Err(SkulkError::invalid("protocol version mismatch"));
    }

    if let Some(resume_token) = session_token {
        let resumed = state
            .sessions
            .lock()
            .await
            .resume(&resume_token)
            .map(|s| (s.player_id, s.session_token.clone(), s.lobby.clone()));
        match resumed {
            Ok((player_id, session_token, rejoin)) => {
                return Ok(Identity {
                    player_id,
                    session_token,
                    rejoin,
                });
            }
            Err(e) => {
                tracing::debug!(error = %e, "resume failed, signing in fresh");
            }
        }
    }

    let player_id = match state.auth.authenticate(token.as_deref().unwrap_or("")).await {
        Ok(pid) => pid,
        Err(e) => {
            outbox.error(401, "unauthorized").await?;
            return Err(SkulkError::Session(e));
        }
    };

    let created = state
        .sessions
        .lock()
        .await
        .create(player_id)
        .map(|s| s.session_token.clone());
    match created {
        Ok(session_token) => Ok(Identity {
            player_id,
            session_token,
            rejoin: None,
        }),
        Err(e) => {
            let code = match &e {
                SessionError::AlreadyConnected(_) => 409,
                _ => 500,
            };
            outbox.error(code, e.to_string()).await?;
            Err(SkulkError::Session(e))
        }
    }
}

/// Routes a resumed player back to its last lobby. A mid-match return
/// waits as a late joiner.
async fn rejoin_lobby<Conn, A, C>(
    state: &ServerState<A, C>,
    outbox: &mut Outbox<'_, Conn, A, C>,
    player_id: PlayerId,
    code: LobbyCode,
    events: &mpsc::UnboundedSender<GameEvent>,
) -> Result<(), SkulkError>
where
    Conn: Connection,
    A: Authenticator,
    C: Codec,
{
    let result = {
        let mut lobbies = state.lobbies.lock().await;
        lobbies.join_by_code(player_id, &code, events.clone()).await
    };
    match result {
        Ok(()) => {
            tracing::info!(%player_id, %code, "resumed player rejoined lobby");
            outbox.system(SystemMessage::LobbyJoined { code }).await
        }
        Err(e) => {
            tracing::debug!(%player_id, %code, error = %e, "could not rejoin lobby");
            let _ = state.sessions.lock().await.set_lobby(player_id, None);
            outbox.system(SystemMessage::LobbyLeft).await
        }
    }
}

/// Handles a system message. Returns `true` if the connection should close.
async fn handle_system_message<Conn, A, C>(
    state: &ServerState<A, C>,
    outbox: &mut Outbox<'_, Conn, A, C>,
    player_id: PlayerId,
    msg: SystemMessage,
    events: &mpsc::UnboundedSender<GameEvent>,
) -> Result<bool, SkulkError>
where
    Conn: Connection,
    A: Authenticator,
    C: Codec,
{
    match msg {
        SystemMessage::Heartbeat { client_time } => {
            outbox
                .system(SystemMessage::HeartbeatAck {
                    client_time,
                    server_time: state.server_time(),
                })
                .await?;
        }

        SystemMessage::HostLobby => {
            // Lock only for the directory operation, drop before network I/O.
            let result = {
                let mut lobbies = state.lobbies.lock().await;
                lobbies.create(player_id, events.clone()).await
            };
            entered_lobby(state, outbox, player_id, result).await?;
        }

        SystemMessage::JoinLobby { code } => {
            let result = {
                let mut lobbies = state.lobbies.lock().await;
                lobbies
                    .join_by_code(player_id, &code, events.clone())
                    .await
                    .map(|()| code)
            };
            entered_lobby(state, outbox, player_id, result).await?;
        }

        SystemMessage::QuickJoin => {
            let result = {
                let mut lobbies = state.lobbies.lock().await;
                lobbies.quick_join(player_id, events.clone()).await
            };
            entered_lobby(state, outbox, player_id, result).await?;
        }

        SystemMessage::LeaveLobby => {
            let result = state.lobbies.lock().await.leave(player_id).await;
            match result {
                Ok(code) => {
                    tracing::info!(%player_id, %code, "player left lobby");
                    let _ = state.sessions.lock().await.set_lobby(player_id, None);
                    outbox.system(SystemMessage::LobbyLeft).await?;
                }
                Err(e) => outbox.error(error_code(&e), e.to_string()).await?,
            }
        }

        SystemMessage::ListLobbies => {
            let infos = state.lobbies.lock().await.list().await;
            let lobbies = infos.iter().map(|info| info.to_entry()).collect();
            outbox.system(SystemMessage::LobbyList { lobbies }).await?;
        }

        SystemMessage::Disconnect { reason } => {
            tracing::info!(%player_id, %reason, "client disconnected");
            return Ok(true);
        }

        _ => {
            tracing::debug!(%player_id, "ignoring unexpected system message");
        }
    }

    Ok(false)
}

/// Confirms a create/join/quick-join to the client, or reports why it
/// failed.
async fn entered_lobby<Conn, A, C>(
    state: &ServerState<A, C>,
    outbox: &mut Outbox<'_, Conn, A, C>,
    player_id: PlayerId,
    result: Result<LobbyCode, LobbyError>,
) -> Result<(), SkulkError>
where
    Conn: Connection,
    A: Authenticator,
    C: Codec,
{
    match result {
        Ok(code) => {
            let _ = state
                .sessions
                .lock()
                .await
                .set_lobby(player_id, Some(code.clone()));
            outbox.system(SystemMessage::LobbyJoined { code }).await
        }
        Err(e) => {
            tracing::debug!(%player_id, error = %e, "lobby entry refused");
            outbox.error(error_code(&e), e.to_string()).await
        }
    }
}

/// Decodes a game action and routes it to the player's lobby.
///
/// Whether the lobby accepts it is never reported back.
async fn handle_game_message<Conn, A, C>(
    state: &ServerState<A, C>,
    outbox: &mut Outbox<'_, Conn, A, C>,
    player_id: PlayerId,
    data: &[u8],
) -> Result<(), SkulkError>
where
    Conn: Connection,
    A: Authenticator,
    C: Codec,
{
    let action: GameAction = match state.codec.decode(data) {
        Ok(action) => action,
        Err(e) => {
            outbox.error(400, format!("invalid game message: {e}")).await?;
            return Ok(());
        }
    };

    // The handle is cloned out so the directory lock isn't held while the
    // actor's queue is full.
    let handle = {
        let lobbies = state.lobbies.lock().await;
        lobbies
            .lobby_of(player_id)
            .and_then(|code| lobbies.handle(code))
    };
    let Some(handle) = handle else {
        let e = LobbyError::NotInLobby(player_id);
        return outbox.error(error_code(&e), e.to_string()).await;
    };

    if let Err(e) = handle.send_action(player_id, action).await {
        outbox.error(error_code(&e), e.to_string()).await?;
    }
    Ok(())
}

/// HTTP-style status for an operational lobby failure.
fn error_code(e: &LobbyError) -> u16 {
    match e {
        LobbyError::NotFound(_) | LobbyError::NotInLobby(_) => 404,
        LobbyError::LobbyFull(_) | LobbyError::AlreadyInLobby(_, _) => 409,
        LobbyError::Unavailable(_) => 503,
    }
}
