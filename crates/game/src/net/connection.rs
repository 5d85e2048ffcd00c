use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use super::transport::{ConnectionId, TransportError};

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug)]
pub struct ClientConnection {
    pub id: ConnectionId,
    pub addr: SocketAddr,
    pub connected_at: Instant,
    pub last_receive_time: Instant,
}

impl ClientConnection {
    pub fn new(id: ConnectionId, addr: SocketAddr) -> Self {
        let now = Instant::now();
        Self {
            id,
            addr,
            connected_at: now,
            last_receive_time: now,
        }
    }

    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_receive_time.elapsed() > timeout
    }

    pub fn touch(&mut self) {
        self.last_receive_time = Instant::now();
    }
}

/// Maps peer addresses to connection handles. A connection exists from its
/// first datagram until it times out or is closed.
#[derive(Debug)]
pub struct ConnectionManager {
    clients_by_addr: HashMap<SocketAddr, ConnectionId>,
    clients: HashMap<ConnectionId, ClientConnection>,
    next_client_id: u32,
    max_clients: usize,
    timeout: Duration,
}

impl ConnectionManager {
    pub fn new(max_clients: usize) -> Self {
        Self::with_timeout(max_clients, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(max_clients: usize, timeout: Duration) -> Self {
        Self {
            clients_by_addr: HashMap::new(),
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
            timeout,
        }
    }

    /// Returns the connection for `addr`, creating it on first contact.
    /// The flag is true for a newly created connection.
    pub fn get_or_create(
        &mut self,
        addr: SocketAddr,
    ) -> Result<(ConnectionId, bool), TransportError> {
        if let Some(&id) = self.clients_by_addr.get(&addr) {
            if let Some(client) = self.clients.get_mut(&id) {
                client.touch();
            }
            return Ok((id, false));
        }

        if self.clients.len() >= self.max_clients {
            return Err(TransportError::ConnectionLimit(self.max_clients));
        }

        let id = ConnectionId::new(self.next_client_id);
        self.next_client_id = self.next_client_id.wrapping_add(1).max(1);

        self.clients.insert(id, ClientConnection::new(id, addr));
        self.clients_by_addr.insert(addr, id);

        Ok((id, true))
    }

    pub fn get(&self, id: ConnectionId) -> Option<&ClientConnection> {
        self.clients.get(&id)
    }

    pub fn addr_of(&self, id: ConnectionId) -> Option<SocketAddr> {
        self.clients.get(&id).map(|client| client.addr)
    }

    pub fn id_of(&self, addr: &SocketAddr) -> Option<ConnectionId> {
        self.clients_by_addr.get(addr).copied()
    }

    pub fn remove(&mut self, id: ConnectionId) -> Option<ClientConnection> {
        let connection = self.clients.remove(&id)?;
        self.clients_by_addr.remove(&connection.addr);
        Some(connection)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClientConnection> {
        self.clients.values()
    }

    pub fn cleanup_timed_out(&mut self) -> Vec<ConnectionId> {
        let timed_out: Vec<ConnectionId> = self
            .clients
            .values()
            .filter(|c| c.is_timed_out(self.timeout))
            .map(|c| c.id)
            .collect();

        for id in &timed_out {
            self.remove(*id);
        }

        timed_out
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
