//! Connection tracking and outbound message routing
//!
//! This module handles the server-side bookkeeping for connected terminals:
//! - Connection lifecycle (accept, bind to a username, disconnect)
//! - Capacity enforcement for concurrent connections
//! - Routing text lines to a connection or to a named player
//!
//! Every connection owns an unbounded outbox drained by its writer task, so
//! game logic can queue lines without ever awaiting a socket.

use log::{debug, info};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};

/// Sending half of a connection's outgoing line queue.
pub type Outbox = mpsc::UnboundedSender<String>;

/// Registry shared between connection tasks and the game layer.
pub type SharedConnections = Arc<RwLock<ConnectionRegistry>>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("unknown connection {0}")]
    UnknownConnection(u32),

    #[error("{0} is already connected")]
    UsernameInUse(String),

    #[error("you already joined as {0}")]
    AlreadyBound(String),
}

/// A connected terminal
///
/// Each connection keeps:
/// - Metadata for logging (ID, remote address, connect time)
/// - The username it joined as, once `join` succeeded
/// - The outbox its writer task drains
#[derive(Debug)]
pub struct Connection {
    /// Unique connection identifier assigned by the server
    pub id: u32,
    /// Remote address, used in log lines only
    pub addr: SocketAddr,
    /// When the connection was accepted
    pub connected_at: Instant,
    /// Player name bound by a successful `join`
    pub username: Option<String>,
    outbox: Outbox,
}

impl Connection {
    pub fn new(id: u32, addr: SocketAddr, outbox: Outbox) -> Self {
        Self {
            id,
            addr,
            connected_at: Instant::now(),
            username: None,
            outbox,
        }
    }

    /// Queues one line for the writer task
    ///
    /// Returns false once the writer task has gone away, which happens only
    /// while the connection is being torn down.
    pub fn send(&self, line: impl Into<String>) -> bool {
        self.outbox.send(line.into()).is_ok()
    }
}

/// Manages all live connections and their usernames
///
/// The registry enforces the connection limit, guarantees a username is
/// bound to at most one connection at a time, and resolves usernames to
/// outboxes when the game layer addresses a player by name.
pub struct ConnectionRegistry {
    /// Live connections indexed by their unique ID
    connections: HashMap<u32, Connection>,
    /// Username to connection ID for bound connections
    by_username: HashMap<String, u32>,
    /// Next available connection ID
    next_connection_id: u32,
    /// Maximum number of concurrent connections allowed
    max_connections: usize,
}

impl ConnectionRegistry {
    /// Creates an empty registry with the given capacity limit
    ///
    /// Connection IDs start from 1 and increment for each accepted connection.
    pub fn new(max_connections: usize) -> Self {
        Self {
            connections: HashMap::new(),
            by_username: HashMap::new(),
            next_connection_id: 1,
            max_connections,
        }
    }

    pub fn shared(max_connections: usize) -> SharedConnections {
        Arc::new(RwLock::new(Self::new(max_connections)))
    }

    /// Registers a freshly accepted connection
    ///
    /// Returns Some(connection_id) if successful, None if the server is at
    /// capacity.
    pub fn add_connection(&mut self, addr: SocketAddr, outbox: Outbox) -> Option<u32> {
        if self.connections.len() >= self.max_connections {
            return None;
        }

        let id = self.next_connection_id;
        self.next_connection_id += 1;

        info!("Connection {} accepted from {}", id, addr);
        self.connections.insert(id, Connection::new(id, addr, outbox));
        Some(id)
    }

    /// Removes a connection and releases its username
    ///
    /// Returns the removed connection so the caller can clean up game state
    /// for the player it was bound to.
    pub fn remove_connection(&mut self, id: u32) -> Option<Connection> {
        let connection = self.connections.remove(&id)?;
        if let Some(username) = &connection.username {
            self.by_username.remove(username);
        }
        info!(
            "Connection {} from {} closed after {:.1}s",
            id,
            connection.addr,
            connection.connected_at.elapsed().as_secs_f32()
        );
        Some(connection)
    }

    /// Binds `username` to connection `id`
    ///
    /// Binding the same name twice on one connection is accepted so `join`
    /// stays idempotent. A name held by another live connection, or a second
    /// name on an already bound connection, is rejected.
    pub fn bind_username(&mut self, id: u32, username: &str) -> Result<(), RegistryError> {
        match self.by_username.get(username) {
            Some(&owner) if owner == id => return Ok(()),
            Some(_) => return Err(RegistryError::UsernameInUse(username.to_string())),
            None => {}
        }

        let connection = self
            .connections
            .get_mut(&id)
            .ok_or(RegistryError::UnknownConnection(id))?;
        if let Some(existing) = &connection.username {
            return Err(RegistryError::AlreadyBound(existing.clone()));
        }

        connection.username = Some(username.to_string());
        self.by_username.insert(username.to_string(), id);
        debug!("Connection {} bound to {}", id, username);
        Ok(())
    }

    pub fn username_of(&self, id: u32) -> Option<&str> {
        self.connections.get(&id)?.username.as_deref()
    }

    pub fn connection_of(&self, username: &str) -> Option<u32> {
        self.by_username.get(username).copied()
    }

    /// Queues `line` for one connection. Returns false if it is gone.
    pub fn send_to_connection(&self, id: u32, line: impl Into<String>) -> bool {
        self.connections
            .get(&id)
            .is_some_and(|connection| connection.send(line))
    }

    /// Queues `line` for the connection bound to `username`.
    pub fn send_to_user(&self, username: &str, line: impl Into<String>) -> bool {
        match self.connection_of(username) {
            Some(id) => self.send_to_connection(id, line),
            None => false,
        }
    }

    /// Queues `line` for every joined player except `exclude`, returning how
    /// many outboxes accepted it.
    pub fn broadcast(&self, line: &str, exclude: Option<u32>) -> usize {
        self.connections
            .values()
            .filter(|c| c.username.is_some() && Some(c.id) != exclude)
            .filter(|c| c.send(line))
            .count()
    }

    /// Returns the number of live connections
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:7000".parse().unwrap()
    }

    fn outbox() -> (Outbox, mpsc::UnboundedReceiver<String>) {
        mpsc::unbounded_channel()
    }

    #[test]
    fn test_capacity_limit() {
        let mut registry = ConnectionRegistry::new(2);
        let (tx, _rx) = outbox();

        assert_eq!(registry.add_connection(test_addr(), tx.clone()), Some(1));
        assert_eq!(registry.add_connection(test_addr(), tx.clone()), Some(2));
        assert_eq!(registry.add_connection(test_addr(), tx.clone()), None);
        assert_eq!(registry.len(), 2);

        registry.remove_connection(1);
        assert_eq!(registry.add_connection(test_addr(), tx), Some(3));
    }

    #[test]
    fn test_bind_username_rules() {
        let mut registry = ConnectionRegistry::new(4);
        let (tx, _rx) = outbox();
        let first = registry.add_connection(test_addr(), tx.clone()).unwrap();
        let second = registry.add_connection(test_addr(), tx).unwrap();

        assert_eq!(registry.bind_username(first, "ash"), Ok(()));
        assert_eq!(registry.bind_username(first, "ash"), Ok(()));
        assert_eq!(
            registry.bind_username(second, "ash"),
            Err(RegistryError::UsernameInUse("ash".to_string()))
        );
        assert_eq!(
            registry.bind_username(first, "gary"),
            Err(RegistryError::AlreadyBound("ash".to_string()))
        );
        assert_eq!(
            registry.bind_username(99, "misty"),
            Err(RegistryError::UnknownConnection(99))
        );
        assert_eq!(registry.username_of(first), Some("ash"));
        assert_eq!(registry.username_of(second), None);
    }

    #[test]
    fn test_remove_releases_username() {
        let mut registry = ConnectionRegistry::new(4);
        let (tx, _rx) = outbox();
        let first = registry.add_connection(test_addr(), tx.clone()).unwrap();
        registry.bind_username(first, "brock").unwrap();

        let removed = registry.remove_connection(first).unwrap();
        assert_eq!(removed.username.as_deref(), Some("brock"));
        assert!(registry.remove_connection(first).is_none());
        assert_eq!(registry.connection_of("brock"), None);

        let second = registry.add_connection(test_addr(), tx).unwrap();
        assert_eq!(registry.bind_username(second, "brock"), Ok(()));
    }

    #[test]
    fn test_routing() {
        let mut registry = ConnectionRegistry::new(4);
        let (tx_a, mut rx_a) = outbox();
        let (tx_b, mut rx_b) = outbox();
        let (tx_c, mut rx_c) = outbox();
        let a = registry.add_connection(test_addr(), tx_a).unwrap();
        let b = registry.add_connection(test_addr(), tx_b).unwrap();
        registry.add_connection(test_addr(), tx_c).unwrap();
        registry.bind_username(a, "ash").unwrap();
        registry.bind_username(b, "misty").unwrap();

        assert!(registry.send_to_user("misty", "hello"));
        assert!(!registry.send_to_user("nobody", "hello"));
        assert_eq!(rx_b.try_recv().unwrap(), "hello");

        // unjoined connections and the excluded one are skipped
        assert_eq!(registry.broadcast("news", Some(a)), 1);
        assert_eq!(rx_b.try_recv().unwrap(), "news");
        assert!(rx_a.try_recv().is_err());
        assert!(rx_c.try_recv().is_err());
    }

    #[test]
    fn test_send_to_closed_outbox() {
        let mut registry = ConnectionRegistry::new(1);
        let (tx, rx) = outbox();
        let id = registry.add_connection(test_addr(), tx).unwrap();
        drop(rx);

        assert!(!registry.send_to_connection(id, "lost"));
        assert!(!registry.send_to_connection(id + 1, "lost"));
    }
}
