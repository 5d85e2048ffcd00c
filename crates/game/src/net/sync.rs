use log::trace;

use crate::input::ActionState;
use crate::session::Guid;
use crate::ship::Ship;
use crate::surface::{SurfacePose, TerrainQuery};

use super::protocol::{ClientShipState, ServerShipState, sequence_newer};

/// Last-accepted sequence of one inbound ship-state stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequenceGate {
    /// Nothing received yet; the first message is always accepted.
    #[default]
    Unsynced,
    Synced(u8),
}

impl SequenceGate {
    /// Accepts `sequence` if it is newer than the last accepted one and
    /// records it. Duplicates and stale messages are refused.
    pub fn accept(&mut self, sequence: u8) -> bool {
        let fresh = match *self {
            Self::Unsynced => true,
            Self::Synced(last) => sequence_newer(sequence, last),
        };
        if fresh {
            *self = Self::Synced(sequence);
        }
        fresh
    }

    pub fn last(&self) -> Option<u8> {
        match *self {
            Self::Unsynced => None,
            Self::Synced(last) => Some(last),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::Unsynced;
    }
}

/// Server end of one ship's sync channel.
#[derive(Debug, Clone)]
pub struct ServerShipSync {
    guid: Guid,
    gate: SequenceGate,
    own_sequence: u8,
}

impl ServerShipSync {
    pub fn new(guid: Guid) -> Self {
        Self {
            guid,
            gate: SequenceGate::Unsynced,
            own_sequence: 0,
        }
    }

    pub fn guid(&self) -> Guid {
        self.guid
    }

    pub fn last_accepted(&self) -> Option<u8> {
        self.gate.last()
    }

    /// Validates a client message sent by the user owning `sender` and
    /// returns the action bits to feed into the simulation.
    pub fn receive(&mut self, sender: Guid, msg: &ClientShipState) -> Option<u16> {
        if msg.guid != self.guid || sender != self.guid {
            trace!(
                "{sender} sent state for {} on channel {}, dropped",
                msg.guid, self.guid
            );
            return None;
        }
        if !self.gate.accept(msg.sequence) {
            trace!("stale client state {} for {}, dropped", msg.sequence, self.guid);
            return None;
        }
        Some(msg.action)
    }

    /// Authoritative state for this tick. Player ships echo the last accepted
    /// client sequence; non-player ships count their own ticks.
    pub fn outgoing(&mut self, pose: &SurfacePose) -> ServerShipState {
        let sequence = if self.guid.is_player() {
            self.gate.last().unwrap_or(0)
        } else {
            self.own_sequence = self.own_sequence.wrapping_add(1);
            self.own_sequence
        };

        ServerShipState {
            guid: self.guid,
            sequence,
            pivot: pose.pivot,
            facing_deg: pose.facing_deg,
        }
    }
}

/// Client end for the ship this client controls.
#[derive(Debug, Clone)]
pub struct ClientLocalShipSync {
    guid: Guid,
    sequence: u8,
    gate: SequenceGate,
}

impl ClientLocalShipSync {
    pub fn new(guid: Guid) -> Self {
        Self {
            guid,
            sequence: 0,
            gate: SequenceGate::Unsynced,
        }
    }

    pub fn guid(&self) -> Guid {
        self.guid
    }

    pub fn sequence(&self) -> u8 {
        self.sequence
    }

    /// Stamps the current input with the next sequence number.
    pub fn outgoing(&mut self, action: &ActionState) -> ClientShipState {
        self.sequence = self.sequence.wrapping_add(1);
        ClientShipState {
            guid: self.guid,
            sequence: self.sequence,
            action: action.state(),
        }
    }

    /// Overwrites the local ship with the server's view when the echo is
    /// newer than anything applied before.
    pub fn receive<T: TerrainQuery + ?Sized>(
        &mut self,
        msg: &ServerShipState,
        ship: &mut Ship,
        terrain: &T,
    ) -> bool {
        if msg.guid != self.guid {
            trace!("state for {} on local channel {}, dropped", msg.guid, self.guid);
            return false;
        }
        if !self.gate.accept(msg.sequence) {
            trace!("stale echo {} for {}, dropped", msg.sequence, self.guid);
            return false;
        }
        apply(msg, ship, terrain);
        true
    }
}

/// Client end for a ship controlled by someone else.
#[derive(Debug, Clone)]
pub struct ClientRemoteShipSync {
    guid: Guid,
    gate: SequenceGate,
}

impl ClientRemoteShipSync {
    pub fn new(guid: Guid) -> Self {
        Self {
            guid,
            gate: SequenceGate::Unsynced,
        }
    }

    pub fn guid(&self) -> Guid {
        self.guid
    }

    pub fn receive<T: TerrainQuery + ?Sized>(
        &mut self,
        msg: &ServerShipState,
        ship: &mut Ship,
        terrain: &T,
    ) -> bool {
        if msg.guid != self.guid {
            trace!("state for {} on remote channel {}, dropped", msg.guid, self.guid);
            return false;
        }
        if !self.gate.accept(msg.sequence) {
            trace!("stale state {} for {}, dropped", msg.sequence, self.guid);
            return false;
        }
        apply(msg, ship, terrain);
        true
    }
}

fn apply<T: TerrainQuery + ?Sized>(msg: &ServerShipState, ship: &mut Ship, terrain: &T) {
    ship.apply_pose(msg.pivot, msg.facing_deg);
    ship.body.sample_height(terrain);
}

#[cfg(test)]
mod tests {
    use glam::Quat;

    use super::*;
    use crate::ship::ShipConfig;
    use crate::surface::NoTerrain;

    fn client_msg(guid: Guid, sequence: u8, action: u16) -> ClientShipState {
        ClientShipState {
            guid,
            sequence,
            action,
        }
    }

    fn server_msg(guid: Guid, sequence: u8, angle: f32) -> ServerShipState {
        ServerShipState {
            guid,
            sequence,
            pivot: Quat::from_rotation_x(angle),
            facing_deg: angle * 10.0,
        }
    }

    #[test]
    fn gate_accepts_first_then_only_newer() {
        let mut gate = SequenceGate::default();
        assert!(gate.accept(200));
        assert!(!gate.accept(200));
        assert!(!gate.accept(199));
        assert!(gate.accept(201));
        assert_eq!(gate.last(), Some(201));

        gate.reset();
        assert!(gate.accept(3));
    }

    #[test]
    fn gate_survives_wraparound() {
        let mut gate = SequenceGate::Synced(255);
        assert!(gate.accept(0));
        assert!(!gate.accept(255));
    }

    #[test]
    fn server_accepts_newer_and_drops_reordered() {
        let guid = Guid::new(5);
        let mut sync = ServerShipSync::new(guid);

        assert_eq!(sync.receive(guid, &client_msg(guid, 10, 0x3000)), Some(0x3000));
        assert_eq!(sync.receive(guid, &client_msg(guid, 12, 0x1000)), Some(0x1000));
        assert_eq!(sync.receive(guid, &client_msg(guid, 11, 0x2000)), None);
        assert_eq!(sync.last_accepted(), Some(12));
    }

    #[test]
    fn server_drops_spoofed_identity() {
        let guid = Guid::new(5);
        let mut sync = ServerShipSync::new(guid);
        assert_eq!(sync.receive(Guid::new(6), &client_msg(guid, 1, 0x3000)), None);
        assert_eq!(sync.receive(guid, &client_msg(Guid::new(6), 1, 0x3000)), None);
        assert_eq!(sync.last_accepted(), None);
    }

    #[test]
    fn outgoing_sequences() {
        let player = Guid::new(1);
        let mut sync = ServerShipSync::new(player);
        let pose = SurfacePose::default();
        assert_eq!(sync.outgoing(&pose).sequence, 0);
        sync.receive(player, &client_msg(player, 42, 0));
        assert_eq!(sync.outgoing(&pose).sequence, 42);
        assert_eq!(sync.outgoing(&pose).sequence, 42);

        let npc = Guid::new(0x8000);
        let mut sync = ServerShipSync::new(npc);
        let first = sync.outgoing(&pose).sequence;
        let second = sync.outgoing(&pose).sequence;
        assert!(sequence_newer(second, first));
    }

    #[test]
    fn local_sequence_wraps() {
        let mut sync = ClientLocalShipSync::new(Guid::new(1));
        let action = ActionState::new();
        let mut last = 0;
        for _ in 0..300 {
            let msg = sync.outgoing(&action);
            assert!(sequence_newer(msg.sequence, last));
            last = msg.sequence;
        }
    }

    #[test]
    fn remote_overwrites_only_with_newer_state() {
        let guid = Guid::new(0x8002);
        let mut ship = Ship::new(guid, Quat::IDENTITY, ShipConfig::default());
        let mut sync = ClientRemoteShipSync::new(guid);

        assert!(sync.receive(&server_msg(guid, 255, 0.5), &mut ship, &NoTerrain));
        assert!(sync.receive(&server_msg(guid, 0, 0.7), &mut ship, &NoTerrain));
        assert!(!sync.receive(&server_msg(guid, 254, 0.1), &mut ship, &NoTerrain));

        assert!(ship.body.pivot().abs_diff_eq(Quat::from_rotation_x(0.7), 1e-6));
        assert!((ship.controller.facing_deg() - 7.0).abs() < 1e-4);
        assert_eq!(ship.body.planet_height(), 1.0);
    }

    #[test]
    fn local_ignores_other_guids() {
        let guid = Guid::new(1);
        let mut ship = Ship::new(guid, Quat::IDENTITY, ShipConfig::default());
        let mut sync = ClientLocalShipSync::new(guid);
        assert!(!sync.receive(&server_msg(Guid::new(2), 1, 0.3), &mut ship, &NoTerrain));
        assert!(ship.body.pivot().abs_diff_eq(Quat::IDENTITY, 1e-6));
    }
}
