//! In-process loopback transport.
//!
//! [`memory_transport`] returns a listening [`MemoryTransport`] and a
//! [`MemoryConnector`]. Each `connect()` creates a pair of linked
//! [`MemoryConnection`]s: the server half is queued for `accept()`, the
//! client half is returned to the caller. Bytes sent on one half arrive on
//! the other unchanged.

use tokio::sync::{Mutex, mpsc};

use crate::{Connection, ConnectionId, Transport, TransportError};

/// Creates a connected transport/connector pair.
pub fn memory_transport() -> (MemoryTransport, MemoryConnector) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        MemoryTransport { incoming: rx },
        MemoryConnector { outgoing: tx },
    )
}

/// The accepting side of an in-memory transport.
pub struct MemoryTransport {
    incoming: mpsc::UnboundedReceiver<MemoryConnection>,
}

impl Transport for MemoryTransport {
    type Connection = MemoryConnection;

    async fn accept(&mut self) -> Result<MemoryConnection, TransportError> {
        self.incoming.recv().await.ok_or(TransportError::Shutdown)
    }
}

/// Dials an in-memory transport. Cheap to clone.
#[derive(Clone)]
pub struct MemoryConnector {
    outgoing: mpsc::UnboundedSender<MemoryConnection>,
}

impl MemoryConnector {
    /// Opens a new connection and returns the client half.
    pub fn connect(&self) -> Result<MemoryConnection, TransportError> {
        let (client_tx, server_rx) = mpsc::unbounded_channel();
        let (server_tx, client_rx) = mpsc::unbounded_channel();

        let server = MemoryConnection::new(server_tx, server_rx);
        let client = MemoryConnection::new(client_tx, client_rx);

        self.outgoing
            .send(server)
            .map_err(|_| TransportError::Shutdown)?;
        tracing::debug!(id = %client.id(), "memory connection opened");
        Ok(client)
    }
}

/// One half of an in-memory connection.
pub struct MemoryConnection {
    id: ConnectionId,
    tx: Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>,
    rx: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
}

impl MemoryConnection {
    fn new(
        tx: mpsc::UnboundedSender<Vec<u8>>,
        rx: mpsc::UnboundedReceiver<Vec<u8>>,
    ) -> Self {
        Self {
            id: ConnectionId::next(),
            tx: Mutex::new(Some(tx)),
            rx: Mutex::new(rx),
        }
    }
}

impl Connection for MemoryConnection {
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let guard = self.tx.lock().await;
        let tx = guard.as_ref().ok_or_else(|| {
            TransportError::ConnectionClosed("closed locally".into())
        })?;
        tx.send(data.to_vec()).map_err(|_| {
            TransportError::ConnectionClosed("peer dropped".into())
        })
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        Ok(self.rx.lock().await.recv().await)
    }

    async fn close(&self) -> Result<(), TransportError> {
        // Dropping our sender ends the peer's receive stream.
        self.tx.lock().await.take();
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_round_trip_both_directions() {
        let (mut transport, connector) = memory_transport();
        let client = connector.connect().unwrap();
        let server = transport.accept().await.unwrap();

        client.send(b"ping").await.unwrap();
        assert_eq!(server.recv().await.unwrap(), Some(b"ping".to_vec()));

        server.send(b"pong").await.unwrap();
        assert_eq!(client.recv().await.unwrap(), Some(b"pong".to_vec()));
    }

    #[tokio::test]
    async fn test_memory_close_ends_peer_stream() {
        let (mut transport, connector) = memory_transport();
        let client = connector.connect().unwrap();
        let server = transport.accept().await.unwrap();

        client.close().await.unwrap();
        assert_eq!(server.recv().await.unwrap(), None);
        assert!(client.send(b"late").await.is_err());
    }

    #[tokio::test]
    async fn test_memory_accept_after_connector_dropped_is_shutdown() {
        let (mut transport, connector) = memory_transport();
        drop(connector);
        assert!(matches!(
            transport.accept().await,
            Err(TransportError::Shutdown)
        ));
    }

    #[test]
    fn test_memory_halves_have_distinct_ids() {
        let (_transport, connector) = memory_transport();
        let a = connector.connect().unwrap();
        let b = connector.connect().unwrap();
        assert_ne!(a.id(), b.id());
    }
}
