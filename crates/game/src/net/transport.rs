use std::fmt;
use std::io;

use super::protocol::{MAX_FRAME_SIZE, Message, ProtocolError};

/// Handle of one remote peer as seen by a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u32);

impl ConnectionId {
    /// The single peer of a client-side transport.
    pub const SERVER: Self = Self(0);

    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// How a frame must be treated on the way. Transports only pass the tag
/// on; retransmission and ordering of reliable frames live in
/// [`ReliableChannel`](super::ReliableChannel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Delivery {
    Reliable,
    Unreliable,
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("frame of {size} bytes exceeds mtu of {max}")]
    FrameTooLarge { size: usize, max: usize },
    #[error("unknown connection {0}")]
    UnknownConnection(ConnectionId),
    #[error("connection limit of {0} reached")]
    ConnectionLimit(usize),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Fire-and-forget datagram delivery. Implementations never block on the
/// peer and never retransmit; [`ReliableChannel`](super::ReliableChannel)
/// does that on top.
pub trait Transport {
    fn send(
        &mut self,
        to: ConnectionId,
        delivery: Delivery,
        frame: &[u8],
    ) -> Result<(), TransportError>;

    fn send_message(&mut self, to: ConnectionId, message: &Message) -> Result<(), TransportError> {
        let frame = message.encode()?;
        self.send(to, message.delivery(), &frame)
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send(
        &mut self,
        to: ConnectionId,
        delivery: Delivery,
        frame: &[u8],
    ) -> Result<(), TransportError> {
        (**self).send(to, delivery, frame)
    }
}

pub(crate) fn check_frame_size(frame: &[u8]) -> Result<(), TransportError> {
    if frame.len() > MAX_FRAME_SIZE {
        return Err(TransportError::FrameTooLarge {
            size: frame.len(),
            max: MAX_FRAME_SIZE,
        });
    }
    Ok(())
}
