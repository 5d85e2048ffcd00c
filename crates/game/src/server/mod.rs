use std::collections::{HashMap, VecDeque};

use log::{debug, error, trace, warn};

use crate::event::{EventQueue, GameEvent};
use crate::input::{InputSource, ScriptedInput};
use crate::net::{
    ClientShipState, ConnectionId, ControlMessage, Delivery, Message, Packet, ProtocolError,
    ReliableChannel, ServerShipSync, Transport,
};
use crate::session::{Guid, JoinProtocol, Outbound, RegistryError, UserRegistry};
use crate::ship::Ship;
use crate::simulation::ShipWorld;
use crate::surface::TerrainQuery;

/// Authoritative game state: sessions, ships and their sync channels.
/// Driven by one thread; the caller feeds in frames and drives ticks.
pub struct ServerState<T> {
    join: JoinProtocol,
    world: ShipWorld,
    syncs: HashMap<Guid, ServerShipSync>,
    channels: HashMap<ConnectionId, ReliableChannel>,
    lost: Vec<ConnectionId>,
    npc_inputs: HashMap<Guid, ScriptedInput>,
    terrain: T,
    outbound: VecDeque<Outbound>,
    events: EventQueue,
    closed: Vec<ConnectionId>,
}

impl<T: TerrainQuery> ServerState<T> {
    pub fn new(registry: UserRegistry, world: ShipWorld, terrain: T) -> Self {
        Self {
            join: JoinProtocol::new(registry),
            world,
            syncs: HashMap::new(),
            channels: HashMap::new(),
            lost: Vec::new(),
            npc_inputs: HashMap::new(),
            terrain,
            outbound: VecDeque::new(),
            events: EventQueue::default(),
            closed: Vec::new(),
        }
    }

    pub fn join(&self) -> &JoinProtocol {
        &self.join
    }

    pub fn world(&self) -> &ShipWorld {
        &self.world
    }

    pub fn terrain(&self) -> &T {
        &self.terrain
    }

    /// Decodes one frame from `connection` and dispatches whatever it
    /// releases: sequenced messages only go through once and in order.
    pub fn handle_message(
        &mut self,
        connection: ConnectionId,
        frame: &[u8],
    ) -> Result<(), ProtocolError> {
        match Packet::decode(frame)? {
            Packet::Bare(message) => self.dispatch(connection, message),
            Packet::Sequenced { sequence, message } => {
                let ready = self
                    .channels
                    .entry(connection)
                    .or_default()
                    .receive(sequence, message);
                for message in ready {
                    self.dispatch(connection, message);
                }
            }
            Packet::Ack { sequence } => match self.channels.get_mut(&connection) {
                Some(channel) => {
                    channel.acknowledge(sequence);
                }
                None => trace!("ack from {connection} without a channel"),
            },
        }
        Ok(())
    }

    /// Reliable messages to `connection` still waiting for an ack.
    pub fn unacked(&self, connection: ConnectionId) -> usize {
        self.channels
            .get(&connection)
            .map_or(0, ReliableChannel::unacked)
    }

    fn dispatch(&mut self, connection: ConnectionId, message: Message) {
        match message {
            Message::ClientShipState(msg) => self.handle_ship_state(connection, &msg),
            Message::Control(ControlMessage::RegisterRequest { username }) => {
                // failures are already queued for the requester
                let _ = self.join.handle_register(connection, &username);
                self.apply_session_changes();
            }
            Message::Control(ControlMessage::Disconnect) => {
                self.connection_lost(connection);
                self.closed.push(connection);
            }
            other => debug!("unexpected message {:#04x} from {connection}", other.id()),
        }
    }

    /// Removes the session, ship and sync channel bound to `connection`.
    /// Its reliable channel goes away after the next flush.
    pub fn connection_lost(&mut self, connection: ConnectionId) {
        if self.join.handle_disconnect(connection).is_some() {
            self.apply_session_changes();
        }
        self.lost.push(connection);
    }

    /// Adds a simulated ship that patrols on its own.
    pub fn spawn_npc(&mut self, username: &str) -> Result<Guid, RegistryError> {
        let guid = self.join.add_npc(username)?;
        self.npc_inputs.insert(guid, ScriptedInput::patrol());
        self.apply_session_changes();
        Ok(guid)
    }

    pub fn despawn_npc(&mut self, guid: Guid) -> bool {
        let removed = self.join.remove_npc(guid).is_some();
        if removed {
            self.apply_session_changes();
        }
        removed
    }

    /// One simulation step followed by a state message per ship.
    pub fn tick(&mut self, dt: f32) {
        for channel in self.channels.values_mut() {
            channel.advance();
        }

        for (guid, input) in &mut self.npc_inputs {
            if let Some(ship) = registered_ship(self.join.registry(), &mut self.world, *guid) {
                ship.action.set_state(input.poll());
            }
        }

        for (guid, triggers) in self.world.tick(&self.terrain, dt) {
            self.events.push(GameEvent::ActionTriggered { guid, triggers });
        }

        for ship in self.world.iter() {
            if let Err(e) = self.join.registry().expect_guid(ship.guid()) {
                error!("not broadcasting ship: {e}");
                continue;
            }
            let Some(sync) = self.syncs.get_mut(&ship.guid()) else {
                error!("ship {} has no sync channel", ship.guid());
                continue;
            };
            let state = sync.outgoing(&ship.pose());
            self.outbound.push_back(Outbound::Broadcast {
                except: None,
                message: Message::ServerShipState(state),
            });
        }
    }

    /// Sends everything queued since the last flush, then resends overdue
    /// reliable messages and acknowledges received ones. Send failures are
    /// logged and do not stop the flush.
    pub fn flush<X: Transport + ?Sized>(&mut self, transport: &mut X) {
        while let Some(outbound) = self.outbound.pop_front() {
            match outbound {
                Outbound::Send { to, message } => self.send(transport, to, &message),
                Outbound::Broadcast { except, message } => {
                    for to in self.join.recipients(except) {
                        self.send(transport, to, &message);
                    }
                }
            }
        }

        for (to, channel) in &mut self.channels {
            if let Err(e) = channel.flush(transport, *to) {
                warn!("failed to flush reliable channel to {to}: {e}");
            }
        }

        for connection in self.lost.drain(..) {
            self.channels.remove(&connection);
        }
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = GameEvent> + '_ {
        self.events.drain()
    }

    /// Connections that said goodbye explicitly since the last call.
    pub fn take_closed(&mut self) -> Vec<ConnectionId> {
        std::mem::take(&mut self.closed)
    }

    fn handle_ship_state(&mut self, connection: ConnectionId, msg: &ClientShipState) {
        let Some(sender) = self
            .join
            .registry()
            .get_by_connection(connection)
            .map(|user| user.guid())
        else {
            trace!("ship state from unregistered {connection}, dropped");
            return;
        };
        let Some(sync) = self.syncs.get_mut(&msg.guid) else {
            trace!("ship state for unknown {}, dropped", msg.guid);
            return;
        };

        let Some(bits) = sync.receive(sender, msg) else {
            return;
        };
        if let Some(ship) = registered_ship(self.join.registry(), &mut self.world, msg.guid) {
            ship.action.set_state(bits);
        }
    }

    fn send<X: Transport + ?Sized>(
        &mut self,
        transport: &mut X,
        to: ConnectionId,
        message: &Message,
    ) {
        let result = match message.delivery() {
            Delivery::Reliable => self
                .channels
                .entry(to)
                .or_default()
                .send(transport, to, message),
            Delivery::Unreliable => transport.send_message(to, message),
        };
        if let Err(e) = result {
            warn!("failed to send {:#04x} to {to}: {e}", message.id());
        }
    }

    fn apply_session_changes(&mut self) {
        self.outbound.extend(self.join.drain_outbound());

        let events: Vec<GameEvent> = self.join.drain_events().collect();
        for event in events {
            match &event {
                GameEvent::UserJoined { guid, .. } => {
                    self.world.spawn(*guid, &self.terrain);
                    self.syncs.insert(*guid, ServerShipSync::new(*guid));
                }
                GameEvent::UserLeft { guid } => {
                    self.world.despawn(*guid);
                    self.syncs.remove(guid);
                    self.npc_inputs.remove(guid);
                }
                _ => {}
            }
            self.events.push(event);
        }
    }
}

/// The ship of a user the registry knows. A miss on either side means the
/// registry and the world drifted apart, which is a bug.
fn registered_ship<'w>(
    registry: &UserRegistry,
    world: &'w mut ShipWorld,
    guid: Guid,
) -> Option<&'w mut Ship> {
    if let Err(e) = registry.expect_guid(guid) {
        error!("ship lookup failed: {e}");
        return None;
    }
    let ship = world.get_mut(guid);
    if ship.is_none() {
        error!("user {guid} has no ship");
    }
    ship
}
