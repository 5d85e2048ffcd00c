use std::collections::{HashMap, VecDeque};

use log::{trace, warn};

use super::protocol::{Message, Packet, encode_sequenced, reliable_sequence_newer};
use super::transport::{ConnectionId, Delivery, Transport, TransportError};

/// Ticks a reliable frame waits for its ack before going out again.
pub const DEFAULT_RESEND_TICKS: u32 = 12;

/// Frames further ahead of the next expected sequence are discarded; the
/// sender resends them once the gap closes.
const RECEIVE_WINDOW: u16 = 1024;

const UNACKED_WARN_THRESHOLD: usize = 256;

#[derive(Debug, Clone)]
struct PendingFrame {
    sequence: u16,
    frame: Vec<u8>,
    sent_at: u64,
    attempts: u32,
}

/// Acknowledged, in-order delivery of [`Delivery::Reliable`] messages to
/// one peer over a transport that may drop, duplicate or reorder.
///
/// Every reliable message gets a 16-bit sequence and stays queued until the
/// peer acknowledges it, going out again each `resend_ticks`. Incoming
/// sequenced messages are deduplicated and released strictly in order. Acks
/// are cumulative: the last sequence released so far.
#[derive(Debug)]
pub struct ReliableChannel {
    next_sequence: u16,
    pending: VecDeque<PendingFrame>,
    next_expected: u16,
    early: HashMap<u16, Message>,
    ack_due: bool,
    now: u64,
    resend_ticks: u32,
}

impl Default for ReliableChannel {
    fn default() -> Self {
        Self::new(DEFAULT_RESEND_TICKS)
    }
}

impl ReliableChannel {
    pub fn new(resend_ticks: u32) -> Self {
        Self {
            next_sequence: 0,
            pending: VecDeque::new(),
            next_expected: 0,
            early: HashMap::new(),
            ack_due: false,
            now: 0,
            resend_ticks: resend_ticks.max(1),
        }
    }

    /// Moves the resend clock forward by one simulation tick.
    pub fn advance(&mut self) {
        self.now += 1;
    }

    /// Reliable messages sent but not yet acknowledged.
    pub fn unacked(&self) -> usize {
        self.pending.len()
    }

    /// Sends `message`; reliable ones are sequenced and kept for resending.
    pub fn send<X: Transport + ?Sized>(
        &mut self,
        transport: &mut X,
        to: ConnectionId,
        message: &Message,
    ) -> Result<(), TransportError> {
        if message.delivery() == Delivery::Unreliable {
            return transport.send_message(to, message);
        }

        let sequence = self.next_sequence;
        let frame = encode_sequenced(sequence, message)?;
        self.next_sequence = sequence.wrapping_add(1);

        let result = transport.send(to, Delivery::Reliable, &frame);
        self.pending.push_back(PendingFrame {
            sequence,
            frame,
            sent_at: self.now,
            attempts: 1,
        });
        if self.pending.len() == UNACKED_WARN_THRESHOLD {
            warn!("{to} has {UNACKED_WARN_THRESHOLD} unacknowledged messages");
        }
        result
    }

    /// Resends overdue frames, then acknowledges what arrived since the
    /// last flush.
    pub fn flush<X: Transport + ?Sized>(
        &mut self,
        transport: &mut X,
        to: ConnectionId,
    ) -> Result<(), TransportError> {
        for pending in &mut self.pending {
            if self.now - pending.sent_at < u64::from(self.resend_ticks) {
                continue;
            }
            pending.sent_at = self.now;
            pending.attempts += 1;
            trace!(
                "resending #{} to {to}, attempt {}",
                pending.sequence, pending.attempts
            );
            transport.send(to, Delivery::Reliable, &pending.frame)?;
        }

        if self.ack_due {
            self.ack_due = false;
            let ack = Packet::Ack {
                sequence: self.next_expected.wrapping_sub(1),
            };
            transport.send(to, Delivery::Unreliable, &ack.encode()?)?;
        }
        Ok(())
    }

    /// Forgets every pending frame up to and including `sequence`.
    pub fn acknowledge(&mut self, sequence: u16) -> usize {
        let before = self.pending.len();
        while self
            .pending
            .front()
            .is_some_and(|pending| !reliable_sequence_newer(pending.sequence, sequence))
        {
            self.pending.pop_front();
        }
        before - self.pending.len()
    }

    /// Accepts one sequenced message and returns every message that is now
    /// deliverable, oldest first.
    pub fn receive(&mut self, sequence: u16, message: Message) -> Vec<Message> {
        self.ack_due = true;

        let ahead = sequence.wrapping_sub(self.next_expected);
        if ahead >= RECEIVE_WINDOW {
            trace!("reliable #{sequence} is a duplicate or outside the window");
            return Vec::new();
        }
        self.early.insert(sequence, message);

        let mut ready = Vec::new();
        while let Some(message) = self.early.remove(&self.next_expected) {
            ready.push(message);
            self.next_expected = self.next_expected.wrapping_add(1);
        }
        ready
    }
}
