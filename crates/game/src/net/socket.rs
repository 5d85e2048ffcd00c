use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use log::{debug, trace, warn};

use super::connection::ConnectionManager;
use super::endpoint::UdpEndpoint;
use super::stats::NetworkStats;
use super::transport::{ConnectionId, Delivery, Transport, TransportError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    Connected(ConnectionId),
    Frame { from: ConnectionId, frame: Vec<u8> },
    TimedOut(ConnectionId),
}

/// Server-side UDP transport. Peers are identified by address and become
/// connections on their first datagram.
pub struct ServerSocket {
    endpoint: UdpEndpoint,
    connections: ConnectionManager,
}

impl ServerSocket {
    pub fn bind<A: ToSocketAddrs>(
        addr: A,
        max_clients: usize,
        timeout: Duration,
    ) -> io::Result<Self> {
        Ok(Self {
            endpoint: UdpEndpoint::bind(addr)?,
            connections: ConnectionManager::with_timeout(max_clients, timeout),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.endpoint.local_addr()
    }

    pub fn stats(&self) -> &NetworkStats {
        self.endpoint.stats()
    }

    pub fn connections(&self) -> &ConnectionManager {
        &self.connections
    }

    pub fn running(&self) -> Arc<AtomicBool> {
        self.endpoint.running()
    }

    pub fn poll(&mut self) -> io::Result<Vec<SocketEvent>> {
        let mut events = Vec::new();

        for (frame, addr) in self.endpoint.receive()? {
            match self.connections.get_or_create(addr) {
                Ok((from, created)) => {
                    if created {
                        debug!("new connection {from} from {addr}");
                        events.push(SocketEvent::Connected(from));
                    }
                    events.push(SocketEvent::Frame { from, frame });
                }
                Err(e) => warn!("ignoring datagram from {addr}: {e}"),
            }
        }

        for id in self.connections.cleanup_timed_out() {
            debug!("connection {id} timed out");
            events.push(SocketEvent::TimedOut(id));
        }

        Ok(events)
    }

    /// Forgets a connection without waiting for its timeout.
    pub fn close(&mut self, id: ConnectionId) {
        if let Some(connection) = self.connections.remove(id) {
            debug!("closed {id} ({})", connection.addr);
        }
    }
}

impl Transport for ServerSocket {
    fn send(
        &mut self,
        to: ConnectionId,
        _delivery: Delivery,
        frame: &[u8],
    ) -> Result<(), TransportError> {
        let addr = self
            .connections
            .addr_of(to)
            .ok_or(TransportError::UnknownConnection(to))?;
        self.endpoint.send_to(frame, addr)?;
        Ok(())
    }
}

/// Client-side UDP transport talking to exactly one server.
pub struct ClientSocket {
    endpoint: UdpEndpoint,
    server: SocketAddr,
}

impl ClientSocket {
    pub fn connect<A: ToSocketAddrs>(bind: A, server: SocketAddr) -> io::Result<Self> {
        Ok(Self {
            endpoint: UdpEndpoint::bind(bind)?,
            server,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.endpoint.local_addr()
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server
    }

    pub fn stats(&self) -> &NetworkStats {
        self.endpoint.stats()
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.endpoint.set_timeout(timeout);
    }

    pub fn is_timed_out(&self) -> bool {
        self.endpoint.is_timed_out()
    }

    /// Frames received from the server since the last poll. Datagrams from
    /// any other address are discarded.
    pub fn poll(&mut self) -> io::Result<Vec<Vec<u8>>> {
        let server = self.server;
        Ok(self
            .endpoint
            .receive()?
            .into_iter()
            .filter_map(|(frame, addr)| {
                if addr == server {
                    Some(frame)
                } else {
                    trace!("dropping datagram from stranger {addr}");
                    None
                }
            })
            .collect())
    }
}

impl Transport for ClientSocket {
    fn send(
        &mut self,
        to: ConnectionId,
        _delivery: Delivery,
        frame: &[u8],
    ) -> Result<(), TransportError> {
        if to != ConnectionId::SERVER {
            return Err(TransportError::UnknownConnection(to));
        }
        self.endpoint.send_to(frame, self.server)?;
        Ok(())
    }
}
