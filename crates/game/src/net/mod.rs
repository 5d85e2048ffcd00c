mod connection;
mod endpoint;
mod loopback;
mod protocol;
mod reliable;
mod socket;
mod stats;
mod sync;
mod transport;

pub use connection::{ClientConnection, ConnectionManager};
pub use endpoint::UdpEndpoint;
pub use loopback::{Datagram, Loopback};
pub use protocol::{
    ClientShipState, ControlMessage, DEFAULT_PORT, DEFAULT_TICK_RATE, MAX_FRAME_SIZE, MSG_ACK,
    MSG_CLIENT_SHIP_STATE, MSG_CONTROL, MSG_REGISTER_FAILED, MSG_RELIABLE, MSG_SERVER_SHIP_STATE,
    Message, Packet, ProtocolError, RosterEntry, ServerShipState, encode_sequenced, pack_quat,
    reliable_sequence_newer, sequence_newer, unpack_quat,
};
pub use reliable::{DEFAULT_RESEND_TICKS, ReliableChannel};
pub use socket::{ClientSocket, ServerSocket, SocketEvent};
pub use stats::{NetworkStats, PacketLossSimulation};
pub use sync::{ClientLocalShipSync, ClientRemoteShipSync, SequenceGate, ServerShipSync};
pub use transport::{ConnectionId, Delivery, Transport, TransportError};
