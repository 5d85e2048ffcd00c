use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use log::trace;

use super::protocol::MAX_FRAME_SIZE;
use super::stats::NetworkStats;
use super::transport::{TransportError, check_frame_size};

const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Non-blocking UDP socket moving raw frames. No retransmission or ordering.
pub struct UdpEndpoint {
    socket: UdpSocket,
    local_addr: SocketAddr,
    stats: NetworkStats,
    recv_buffer: [u8; MAX_FRAME_SIZE],
    timeout: Duration,
    last_receive_time: Instant,
    running: Arc<AtomicBool>,
}

impl UdpEndpoint {
    pub fn bind<A: ToSocketAddrs>(addr: A) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_nonblocking(true)?;

        let local_addr = socket.local_addr()?;

        Ok(Self {
            socket,
            local_addr,
            stats: NetworkStats::default(),
            recv_buffer: [0u8; MAX_FRAME_SIZE],
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            last_receive_time: Instant::now(),
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn stats(&self) -> &NetworkStats {
        &self.stats
    }

    pub fn send_to(&mut self, frame: &[u8], addr: SocketAddr) -> Result<usize, TransportError> {
        check_frame_size(frame)?;

        let bytes = self.socket.send_to(frame, addr)?;
        self.stats.record_sent(bytes);

        Ok(bytes)
    }

    /// Drains every datagram currently queued on the socket.
    pub fn receive(&mut self) -> io::Result<Vec<(Vec<u8>, SocketAddr)>> {
        let mut frames = Vec::new();

        loop {
            match self.socket.recv_from(&mut self.recv_buffer) {
                Ok((0, addr)) => trace!("empty datagram from {addr}"),
                Ok((size, addr)) => {
                    self.stats.record_received(size);
                    self.last_receive_time = Instant::now();
                    frames.push((self.recv_buffer[..size].to_vec(), addr));
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                // ICMP port unreachable from a peer that went away
                Err(ref e) if e.kind() == io::ErrorKind::ConnectionReset => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(frames)
    }

    pub fn is_timed_out(&self) -> bool {
        self.last_receive_time.elapsed() > self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub fn running(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }
}
