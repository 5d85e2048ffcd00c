use glam::{Quat, Vec4};
use rkyv::util::AlignedVec;
use rkyv::{Archive, Deserialize, Serialize, rancor};

use crate::session::{Guid, RegisterFailure};

use super::transport::Delivery;

pub const MAX_FRAME_SIZE: usize = 1200;
pub const DEFAULT_PORT: u16 = 27015;
pub const DEFAULT_TICK_RATE: u32 = 60;

pub const MSG_CLIENT_SHIP_STATE: u8 = 0x17;
pub const MSG_SERVER_SHIP_STATE: u8 = 0x18;
pub const MSG_REGISTER_FAILED: u8 = 0x19;
pub const MSG_RELIABLE: u8 = 0x20;
pub const MSG_CONTROL: u8 = 0x21;
pub const MSG_ACK: u8 = 0x22;

pub const REASON_TOO_LONG: u8 = 0;
pub const REASON_EMPTY: u8 = 1;
pub const REASON_ALREADY_TAKEN: u8 = 2;
pub const REASON_BANNED: u8 = 3;
pub const REASON_SERVER_FULL: u8 = 4;

const CLIENT_SHIP_STATE_LEN: usize = 5;
const SERVER_SHIP_STATE_LEN: usize = 15;
const QUAT_SCALE: f32 = 32767.0;
// sequence plus the wrapped message id
const MIN_RELIABLE_BODY_LEN: usize = 3;
const ACK_LEN: usize = 2;

/// True when `new` follows `last` on the 8-bit sequence circle, i.e. it is
/// less than half the range ahead.
#[inline]
pub fn sequence_newer(new: u8, last: u8) -> bool {
    (new.wrapping_sub(last) as i8) > 0
}

/// 16-bit counterpart of [`sequence_newer`], used by the reliable channel.
#[inline]
pub fn reliable_sequence_newer(new: u16, last: u16) -> bool {
    (new.wrapping_sub(last) as i16) > 0
}

/// Packs a rotation as four signed 16-bit components in `w, x, y, z` order.
pub fn pack_quat(q: Quat) -> [i16; 4] {
    let q = q.normalize();
    [q.w, q.x, q.y, q.z].map(|c| (c.clamp(-1.0, 1.0) * QUAT_SCALE).round() as i16)
}

/// Inverse of [`pack_quat`]. The result is renormalized; a zero quaternion
/// decodes to identity.
pub fn unpack_quat(packed: [i16; 4]) -> Quat {
    let [w, x, y, z] = packed.map(|c| c as f32 / QUAT_SCALE);
    Vec4::new(x, y, z, w)
        .try_normalize()
        .map(Quat::from_vec4)
        .unwrap_or(Quat::IDENTITY)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientShipState {
    pub guid: Guid,
    pub sequence: u8,
    pub action: u16,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServerShipState {
    pub guid: Guid,
    pub sequence: u8,
    pub pivot: Quat,
    pub facing_deg: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct RosterEntry {
    pub guid: Guid,
    pub username: String,
}

/// Session-management messages. Their bodies are rkyv archives.
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum ControlMessage {
    RegisterRequest { username: String },
    RegisterSucceeded { guid: Guid },
    UserJoined { guid: Guid, username: String },
    UserLeft { guid: Guid },
    UserList(Vec<RosterEntry>),
    Disconnect,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    ClientShipState(ClientShipState),
    ServerShipState(ServerShipState),
    RegisterFailed(RegisterFailure),
    Control(ControlMessage),
}

/// One datagram: a bare message, a message carrying a reliable sequence
/// number, or a cumulative acknowledgement of reliable sequences.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Bare(Message),
    Sequenced { sequence: u16, message: Message },
    Ack { sequence: u16 },
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("empty frame")]
    Empty,
    #[error("unknown message id {0:#04x}")]
    UnknownMessage(u8),
    #[error("message {id:#04x} has {actual} body bytes, expected {expected}")]
    BadLength {
        id: u8,
        expected: usize,
        actual: usize,
    },
    #[error("unknown register failure reason {0}")]
    UnknownReason(u8),
    #[error("frame of {0} bytes exceeds {max}", max = MAX_FRAME_SIZE)]
    TooLarge(usize),
    #[error("serialization failed: {0}")]
    Serialize(rancor::Error),
    #[error("deserialization failed: {0}")]
    Deserialize(rancor::Error),
}

impl Message {
    pub fn id(&self) -> u8 {
        match self {
            Self::ClientShipState(_) => MSG_CLIENT_SHIP_STATE,
            Self::ServerShipState(_) => MSG_SERVER_SHIP_STATE,
            Self::RegisterFailed(_) => MSG_REGISTER_FAILED,
            Self::Control(_) => MSG_CONTROL,
        }
    }

    /// Ship states are superseded every tick; everything else changes
    /// session membership and must arrive.
    pub fn delivery(&self) -> Delivery {
        match self {
            Self::ClientShipState(_) | Self::ServerShipState(_) => Delivery::Unreliable,
            Self::RegisterFailed(_) | Self::Control(_) => Delivery::Reliable,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut frame = Vec::with_capacity(1 + SERVER_SHIP_STATE_LEN);
        frame.push(self.id());

        match self {
            Self::ClientShipState(msg) => {
                frame.extend_from_slice(&msg.guid.raw().to_le_bytes());
                frame.push(msg.sequence);
                frame.extend_from_slice(&msg.action.to_le_bytes());
            }
            Self::ServerShipState(msg) => {
                frame.extend_from_slice(&msg.guid.raw().to_le_bytes());
                frame.push(msg.sequence);
                for component in pack_quat(msg.pivot) {
                    frame.extend_from_slice(&component.to_le_bytes());
                }
                frame.extend_from_slice(&msg.facing_deg.to_le_bytes());
            }
            Self::RegisterFailed(reason) => {
                frame.push(reason_code(*reason));
                if let RegisterFailure::UsernameTooLong { max_length } = reason {
                    frame.push(*max_length);
                }
            }
            Self::Control(control) => {
                let body =
                    rkyv::to_bytes::<rancor::Error>(control).map_err(ProtocolError::Serialize)?;
                frame.extend_from_slice(&body);
            }
        }

        if frame.len() > MAX_FRAME_SIZE {
            return Err(ProtocolError::TooLarge(frame.len()));
        }
        Ok(frame)
    }

    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let (&id, body) = frame.split_first().ok_or(ProtocolError::Empty)?;
        if frame.len() > MAX_FRAME_SIZE {
            return Err(ProtocolError::TooLarge(frame.len()));
        }

        match id {
            MSG_CLIENT_SHIP_STATE => {
                let body = fixed_body(id, body, CLIENT_SHIP_STATE_LEN)?;
                Ok(Self::ClientShipState(ClientShipState {
                    guid: Guid::new(u16::from_le_bytes([body[0], body[1]])),
                    sequence: body[2],
                    action: u16::from_le_bytes([body[3], body[4]]),
                }))
            }
            MSG_SERVER_SHIP_STATE => {
                let body = fixed_body(id, body, SERVER_SHIP_STATE_LEN)?;
                let mut packed = [0i16; 4];
                for (i, component) in packed.iter_mut().enumerate() {
                    let at = 3 + i * 2;
                    *component = i16::from_le_bytes([body[at], body[at + 1]]);
                }
                Ok(Self::ServerShipState(ServerShipState {
                    guid: Guid::new(u16::from_le_bytes([body[0], body[1]])),
                    sequence: body[2],
                    pivot: unpack_quat(packed),
                    facing_deg: f32::from_le_bytes([body[11], body[12], body[13], body[14]]),
                }))
            }
            MSG_REGISTER_FAILED => decode_register_failed(body).map(Self::RegisterFailed),
            MSG_CONTROL => {
                let mut aligned = AlignedVec::<16>::with_capacity(body.len());
                aligned.extend_from_slice(body);
                rkyv::from_bytes::<ControlMessage, rancor::Error>(&aligned)
                    .map(Self::Control)
                    .map_err(ProtocolError::Deserialize)
            }
            other => Err(ProtocolError::UnknownMessage(other)),
        }
    }
}

impl Packet {
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        match self {
            Self::Bare(message) => message.encode(),
            Self::Sequenced { sequence, message } => encode_sequenced(*sequence, message),
            Self::Ack { sequence } => {
                let mut frame = Vec::with_capacity(1 + ACK_LEN);
                frame.push(MSG_ACK);
                frame.extend_from_slice(&sequence.to_le_bytes());
                Ok(frame)
            }
        }
    }

    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let (&id, body) = frame.split_first().ok_or(ProtocolError::Empty)?;
        match id {
            MSG_RELIABLE => {
                if frame.len() > MAX_FRAME_SIZE {
                    return Err(ProtocolError::TooLarge(frame.len()));
                }
                if body.len() < MIN_RELIABLE_BODY_LEN {
                    return Err(ProtocolError::BadLength {
                        id,
                        expected: MIN_RELIABLE_BODY_LEN,
                        actual: body.len(),
                    });
                }
                Ok(Self::Sequenced {
                    sequence: u16::from_le_bytes([body[0], body[1]]),
                    message: Message::decode(&body[2..])?,
                })
            }
            MSG_ACK => {
                let body = fixed_body(id, body, ACK_LEN)?;
                Ok(Self::Ack {
                    sequence: u16::from_le_bytes([body[0], body[1]]),
                })
            }
            _ => Message::decode(frame).map(Self::Bare),
        }
    }

    pub fn into_message(self) -> Option<Message> {
        match self {
            Self::Bare(message) | Self::Sequenced { message, .. } => Some(message),
            Self::Ack { .. } => None,
        }
    }
}

/// Wraps an encoded message as `[MSG_RELIABLE, sequence (u16 LE), message..]`.
pub fn encode_sequenced(sequence: u16, message: &Message) -> Result<Vec<u8>, ProtocolError> {
    let inner = message.encode()?;
    let mut frame = Vec::with_capacity(3 + inner.len());
    frame.push(MSG_RELIABLE);
    frame.extend_from_slice(&sequence.to_le_bytes());
    frame.extend_from_slice(&inner);

    if frame.len() > MAX_FRAME_SIZE {
        return Err(ProtocolError::TooLarge(frame.len()));
    }
    Ok(frame)
}

fn fixed_body(id: u8, body: &[u8], expected: usize) -> Result<&[u8], ProtocolError> {
    if body.len() != expected {
        return Err(ProtocolError::BadLength {
            id,
            expected,
            actual: body.len(),
        });
    }
    Ok(body)
}

fn reason_code(reason: RegisterFailure) -> u8 {
    match reason {
        RegisterFailure::UsernameTooLong { .. } => REASON_TOO_LONG,
        RegisterFailure::UsernameEmpty => REASON_EMPTY,
        RegisterFailure::UsernameAlreadyTaken => REASON_ALREADY_TAKEN,
        RegisterFailure::UsernameBanned => REASON_BANNED,
        RegisterFailure::ServerFull => REASON_SERVER_FULL,
    }
}

fn decode_register_failed(body: &[u8]) -> Result<RegisterFailure, ProtocolError> {
    let (&code, rest) = body.split_first().ok_or(ProtocolError::BadLength {
        id: MSG_REGISTER_FAILED,
        expected: 1,
        actual: 0,
    })?;
    let expected = if code == REASON_TOO_LONG { 1 } else { 0 };
    if rest.len() != expected {
        return Err(ProtocolError::BadLength {
            id: MSG_REGISTER_FAILED,
            expected: 1 + expected,
            actual: body.len(),
        });
    }

    match code {
        REASON_TOO_LONG => Ok(RegisterFailure::UsernameTooLong {
            max_length: rest[0],
        }),
        REASON_EMPTY => Ok(RegisterFailure::UsernameEmpty),
        REASON_ALREADY_TAKEN => Ok(RegisterFailure::UsernameAlreadyTaken),
        REASON_BANNED => Ok(RegisterFailure::UsernameBanned),
        REASON_SERVER_FULL => Ok(RegisterFailure::ServerFull),
        other => Err(ProtocolError::UnknownReason(other)),
    }
}
