//! `SkulkServer` builder and server loop.
//!
//! This is the entry point for running a Skulk lobby server. It ties
//! together all the layers: transport → protocol → session → lobby.

use std::sync::Arc;
use std::time::{Duration, Instant};

use skulk_lobby::{LobbyConfig, LobbyDirectory};
use skulk_protocol::{Codec, JsonCodec};
use skulk_session::{Authenticator, SessionConfig, SessionManager};
use skulk_transport::{Transport, TransportError, WebSocketTransport};
use tokio::sync::Mutex;

use crate::SkulkError;
use crate::handler::handle_connection;

/// The current protocol version. Clients must send this in their
/// handshake or be rejected.
pub const PROTOCOL_VERSION: u32 = 1;

/// How often disconnected sessions past their grace period are swept.
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(10);

/// Connection timing knobs.
#[derive(Debug, Clone, Copy)]
pub struct ServerTimeouts {
    /// A connection that sends nothing for this long is dropped.
    pub idle: Duration,

    /// Time allowed between accept and the first `Handshake`.
    pub handshake: Duration,
}

impl Default for ServerTimeouts {
    fn default() -> Self {
        Self {
            idle: Duration::from_secs(15),
            handshake: Duration::from_secs(5),
        }
    }
}

/// Shared server state passed to each connection handler task.
///
/// Registries sit behind `Mutex`es that are held for one registry
/// operation at a time.
pub(crate) struct ServerState<A: Authenticator, C: Codec> {
    pub(crate) sessions: Mutex<SessionManager>,
    pub(crate) lobbies: Mutex<LobbyDirectory>,
    pub(crate) auth: A,
    pub(crate) codec: C,
    pub(crate) timeouts: ServerTimeouts,
    pub(crate) started: Instant,
}

impl<A: Authenticator, C: Codec> ServerState<A, C> {
    /// Milliseconds since the server started.
    pub(crate) fn server_time(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

/// Builder for configuring and starting a Skulk server.
///
/// # Example
///
/// ```rust,ignore
/// use skulk::prelude::*;
///
/// let server = SkulkServer::builder()
///     .bind("0.0.0.0:8080")
///     .build(GuestAuthenticator::default())
///     .await?;
/// server.run().await
/// ```
pub struct SkulkServerBuilder {
    bind_addr: String,
    session_config: SessionConfig,
    lobby_config: LobbyConfig,
    timeouts: ServerTimeouts,
}

impl SkulkServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            session_config: SessionConfig::default(),
            lobby_config: LobbyConfig::default(),
            timeouts: ServerTimeouts::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the session configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Sets the configuration every new lobby is created with.
    pub fn lobby_config(mut self, config: LobbyConfig) -> Self {
        self.lobby_config = config;
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.idle = timeout;
        self
    }

    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.handshake = timeout;
        self
    }

    /// Binds a WebSocket listener and builds the server.
    pub async fn build<A: Authenticator>(
        self,
        auth: A,
    ) -> Result<SkulkServer<WebSocketTransport, A, JsonCodec>, SkulkError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        Ok(self.build_with_transport(transport, auth))
    }

    /// Builds the server on an already-listening transport.
    pub fn build_with_transport<T: Transport, A: Authenticator>(
        self,
        transport: T,
        auth: A,
    ) -> SkulkServer<T, A, JsonCodec> {
        let state = Arc::new(ServerState {
            sessions: Mutex::new(SessionManager::new(self.session_config)),
            lobbies: Mutex::new(LobbyDirectory::new(self.lobby_config)),
            auth,
            codec: JsonCodec,
            timeouts: self.timeouts,
            started: Instant::now(),
        });
        SkulkServer { transport, state }
    }
}

impl Default for SkulkServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A Skulk lobby server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct SkulkServer<T: Transport, A: Authenticator, C: Codec> {
    transport: T,
    state: Arc<ServerState<A, C>>,
}

impl SkulkServer<WebSocketTransport, skulk_session::GuestAuthenticator, JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> SkulkServerBuilder {
        SkulkServerBuilder::new()
    }
}

impl<A: Authenticator, C: Codec> SkulkServer<WebSocketTransport, A, C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }
}

impl<T, A, C> SkulkServer<T, A, C>
where
    T: Transport,
    A: Authenticator,
    C: Codec,
{
    /// Runs the accept loop.
    ///
    /// Spawns a handler task per connection and periodically expires
    /// sessions whose resume grace has run out. Returns when the transport
    /// shuts down.
    pub async fn run(mut self) -> Result<(), SkulkError> {
        tracing::info!(version = PROTOCOL_VERSION, "skulk server running");
        let mut sweep = tokio::time::interval(SESSION_SWEEP_INTERVAL);

        loop {
            tokio::select! {
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(TransportError::Shutdown) => {
                        tracing::info!("transport shut down, server stopping");
                        return Ok(());
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
                _ = sweep.tick() => self.sweep_sessions().await,
            }
        }
    }

    async fn sweep_sessions(&self) {
        let mut sessions = self.state.sessions.lock().await;
        let expired = sessions.expire_stale();
        if !expired.is_empty() {
            tracing::debug!(count = expired.len(), "expired stale sessions");
        }
        sessions.cleanup_expired();
    }
}
