use std::collections::VecDeque;

use super::stats::{NetworkStats, PacketLossSimulation};
use super::transport::{ConnectionId, Delivery, Transport, TransportError, check_frame_size};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    pub to: ConnectionId,
    pub delivery: Delivery,
    pub frame: Vec<u8>,
}

/// In-memory transport: frames queue up until the owner routes them.
#[derive(Debug, Default)]
pub struct Loopback {
    queue: VecDeque<Datagram>,
    sim: PacketLossSimulation,
    impaired_sent: u64,
    stats: NetworkStats,
}

impl Loopback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_simulation(sim: PacketLossSimulation) -> Self {
        Self {
            sim,
            ..Self::default()
        }
    }

    pub fn set_simulation(&mut self, sim: PacketLossSimulation) {
        self.sim = sim;
    }

    pub fn stats(&self) -> &NetworkStats {
        &self.stats
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Hands over everything queued so far. Unimpaired frames keep their
    /// order and come first; impaired ones are reversed when reordering is on.
    pub fn take_all(&mut self) -> Vec<Datagram> {
        let sim = &self.sim;
        let (intact, mut impaired): (Vec<Datagram>, Vec<Datagram>) = self
            .queue
            .drain(..)
            .partition(|datagram| !sim.impairs(datagram.delivery));

        if sim.reverse_order {
            impaired.reverse();
        }

        intact.into_iter().chain(impaired).collect()
    }

    pub fn take_for(&mut self, connection: ConnectionId) -> Vec<Vec<u8>> {
        let (mine, rest): (Vec<Datagram>, Vec<Datagram>) = self
            .take_all()
            .into_iter()
            .partition(|datagram| datagram.to == connection);
        self.queue.extend(rest);
        mine.into_iter().map(|datagram| datagram.frame).collect()
    }
}

impl Transport for Loopback {
    fn send(
        &mut self,
        to: ConnectionId,
        delivery: Delivery,
        frame: &[u8],
    ) -> Result<(), TransportError> {
        check_frame_size(frame)?;

        if self.sim.impairs(delivery) {
            let index = self.impaired_sent;
            self.impaired_sent += 1;
            if self.sim.should_drop(index) {
                self.stats.packets_dropped += 1;
                return Ok(());
            }
        }

        self.stats.record_sent(frame.len());
        self.queue.push_back(Datagram {
            to,
            delivery,
            frame: frame.to_vec(),
        });
        Ok(())
    }
}
