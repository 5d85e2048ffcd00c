use std::collections::{HashMap, VecDeque};

use log::{debug, info, trace, warn};

use crate::event::{EventQueue, GameEvent};
use crate::net::{
    ClientLocalShipSync, ClientRemoteShipSync, ConnectionId, ControlMessage, Message, Packet,
    ProtocolError, ReliableChannel, RosterEntry, ServerShipState, Transport,
};
use crate::session::{ClientUserRegistry, Guid};
use crate::ship::Ship;
use crate::simulation::ShipWorld;
use crate::surface::TerrainQuery;

/// One player's view of the match. Only the local ship and its projectiles
/// are simulated; remote ships move exclusively through server updates.
pub struct ClientState<T> {
    username: String,
    registry: ClientUserRegistry,
    world: ShipWorld,
    local: Option<ClientLocalShipSync>,
    remotes: HashMap<Guid, ClientRemoteShipSync>,
    terrain: T,
    link: ReliableChannel,
    outbound: VecDeque<Message>,
    events: EventQueue,
    closed: bool,
}

impl<T: TerrainQuery> ClientState<T> {
    pub fn new(username: impl Into<String>, world: ShipWorld, terrain: T) -> Self {
        Self {
            username: username.into(),
            registry: ClientUserRegistry::new(),
            world,
            local: None,
            remotes: HashMap::new(),
            terrain,
            link: ReliableChannel::default(),
            outbound: VecDeque::new(),
            events: EventQueue::default(),
            closed: false,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn registry(&self) -> &ClientUserRegistry {
        &self.registry
    }

    pub fn world(&self) -> &ShipWorld {
        &self.world
    }

    pub fn local_guid(&self) -> Option<Guid> {
        self.registry.local_guid()
    }

    pub fn local_ship(&self) -> Option<&Ship> {
        self.local_guid().and_then(|guid| self.world.get(guid))
    }

    pub fn is_registered(&self) -> bool {
        self.local.is_some()
    }

    /// Set once the server has said goodbye.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Queues a join request. It is resent until the server acknowledges it.
    pub fn request_join(&mut self) {
        self.outbound
            .push_back(Message::Control(ControlMessage::RegisterRequest {
                username: self.username.clone(),
            }));
    }

    pub fn leave(&mut self) {
        self.outbound
            .push_back(Message::Control(ControlMessage::Disconnect));
    }

    pub fn handle_message(&mut self, frame: &[u8]) -> Result<(), ProtocolError> {
        match Packet::decode(frame)? {
            Packet::Bare(message) => self.dispatch(message),
            Packet::Sequenced { sequence, message } => {
                for message in self.link.receive(sequence, message) {
                    self.dispatch(message);
                }
            }
            Packet::Ack { sequence } => {
                self.link.acknowledge(sequence);
            }
        }
        Ok(())
    }

    /// Control messages sent to the server and not yet acknowledged.
    pub fn unacked(&self) -> usize {
        self.link.unacked()
    }

    fn dispatch(&mut self, message: Message) {
        match message {
            Message::ServerShipState(msg) => self.handle_ship_state(&msg),
            Message::RegisterFailed(reason) => {
                let text = self.registry.apply_register_failed(reason);
                warn!("join as {} refused: {text}", self.username);
                self.events.push(GameEvent::RegisterFailed { reason });
            }
            Message::Control(control) => self.handle_control(control),
            other => debug!("unexpected message {:#04x} from server", other.id()),
        }
    }

    /// Applies this tick's input to the local ship and queues it for the
    /// server. Before registration only the resend clock moves.
    pub fn tick(&mut self, dt: f32, action_bits: u16) {
        self.link.advance();

        let Some(local) = self.local.as_mut() else {
            return;
        };
        let guid = local.guid();
        self.world.tick_projectiles(&self.terrain, dt);

        let ship = self.world.spawn(guid, &self.terrain);
        ship.action.set_state(action_bits);
        let msg = local.outgoing(&ship.action);

        let triggers = self
            .world
            .tick_ship(guid, &self.terrain, dt)
            .unwrap_or_default();
        if !triggers.is_empty() {
            self.events
                .push(GameEvent::ActionTriggered { guid, triggers });
        }
        self.outbound.push_back(Message::ClientShipState(msg));
    }

    pub fn flush<X: Transport + ?Sized>(&mut self, transport: &mut X) {
        while let Some(message) = self.outbound.pop_front() {
            if let Err(e) = self.link.send(transport, ConnectionId::SERVER, &message) {
                warn!("failed to send {:#04x} to server: {e}", message.id());
            }
        }
        if let Err(e) = self.link.flush(transport, ConnectionId::SERVER) {
            warn!("failed to flush reliable channel: {e}");
        }
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = GameEvent> + '_ {
        self.events.drain()
    }

    fn handle_ship_state(&mut self, msg: &ServerShipState) {
        let Some(ship) = self.world.get_mut(msg.guid) else {
            trace!("state for unknown ship {}, dropped", msg.guid);
            return;
        };

        match self.local.as_mut() {
            Some(local) if local.guid() == msg.guid => {
                local.receive(msg, ship, &self.terrain);
            }
            _ => match self.remotes.get_mut(&msg.guid) {
                Some(remote) => {
                    remote.receive(msg, ship, &self.terrain);
                }
                None => trace!("no channel for {}, dropped", msg.guid),
            },
        }
    }

    fn handle_control(&mut self, control: ControlMessage) {
        match control {
            ControlMessage::RegisterSucceeded { guid } => self.registered(guid),
            ControlMessage::UserJoined { guid, username } => {
                if self.registry.apply_joined(guid, &username) {
                    info!("{username} joined");
                    self.track(guid);
                    self.events.push(GameEvent::UserJoined { guid, username });
                }
            }
            ControlMessage::UserLeft { guid } => {
                if let Some(user) = self.registry.apply_left(guid) {
                    info!("{} left", user.username());
                    self.untrack(guid);
                    self.events.push(GameEvent::UserLeft { guid });
                }
            }
            ControlMessage::UserList(roster) => self.reset_roster(&roster),
            ControlMessage::Disconnect => {
                info!("server closed the session");
                self.closed = true;
            }
            ControlMessage::RegisterRequest { .. } => {
                debug!("ignoring server-bound control message {control:?}");
            }
        }
    }

    fn registered(&mut self, guid: Guid) {
        // the server resends the welcome when our request was retransmitted
        if self.local.as_ref().is_some_and(|local| local.guid() == guid) {
            return;
        }

        info!("registered as {} with {guid}", self.username);
        self.registry.set_local(guid);
        self.remotes.remove(&guid);
        self.local = Some(ClientLocalShipSync::new(guid));
        self.world.spawn(guid, &self.terrain);
        self.events.push(GameEvent::RegisterSucceeded { guid });
    }

    /// Replaces the roster. Ships and sync channels of users still listed
    /// are kept so their sequence gates keep rejecting stale states.
    fn reset_roster(&mut self, roster: &[RosterEntry]) {
        self.registry.apply_roster(roster);

        let local_guid = self.local.as_ref().map(ClientLocalShipSync::guid);
        let listed = |guid: Guid| roster.iter().any(|entry| entry.guid == guid);
        self.remotes.retain(|guid, _| listed(*guid));
        self.world
            .retain(|ship| Some(ship.guid()) == local_guid || listed(ship.guid()));

        for entry in roster {
            self.track(entry.guid);
        }

        self.events.push(GameEvent::RosterReset {
            users: self.registry.len(),
        });
    }

    fn track(&mut self, guid: Guid) {
        self.world.spawn(guid, &self.terrain);
        if self.local_guid() != Some(guid) {
            self.remotes
                .entry(guid)
                .or_insert_with(|| ClientRemoteShipSync::new(guid));
        }
    }

    fn untrack(&mut self, guid: Guid) {
        self.remotes.remove(&guid);
        self.world.despawn(guid);
    }
}

#[cfg(test)]
mod tests {
    use glam::Quat;

    use super::*;
    use crate::net::{ClientShipState, DEFAULT_RESEND_TICKS, Loopback, encode_sequenced};
    use crate::surface::NoTerrain;

    fn client() -> ClientState<NoTerrain> {
        ClientState::new("Alice", ShipWorld::default(), NoTerrain)
    }

    fn deliver(client: &mut ClientState<NoTerrain>, message: Message) {
        client.handle_message(&message.encode().unwrap()).unwrap();
    }

    fn roster(entries: &[(u16, &str)]) -> Message {
        Message::Control(ControlMessage::UserList(
            entries
                .iter()
                .map(|(raw, name)| RosterEntry {
                    guid: Guid::new(*raw),
                    username: name.to_string(),
                })
                .collect(),
        ))
    }

    #[test]
    fn welcome_then_roster_sets_up_channels() {
        let mut client = client();
        deliver(
            &mut client,
            Message::Control(ControlMessage::RegisterSucceeded { guid: Guid::new(1) }),
        );
        deliver(&mut client, roster(&[(0, "Bob"), (1, "Alice")]));

        assert_eq!(client.local_guid(), Some(Guid::new(1)));
        assert_eq!(client.registry().local_user().unwrap().username(), "Alice");
        assert_eq!(client.world().len(), 2);
        assert!(client.remotes.contains_key(&Guid::new(0)));
        assert!(!client.remotes.contains_key(&Guid::new(1)));
    }

    #[test]
    fn roster_before_welcome_promotes_channel() {
        let mut client = client();
        deliver(&mut client, roster(&[(0, "Bob"), (1, "Alice")]));
        assert!(client.remotes.contains_key(&Guid::new(1)));

        deliver(
            &mut client,
            Message::Control(ControlMessage::RegisterSucceeded { guid: Guid::new(1) }),
        );
        assert!(!client.remotes.contains_key(&Guid::new(1)));
        assert!(client.is_registered());
    }

    #[test]
    fn tick_sends_input_with_increasing_sequence() {
        let mut client = client();
        client.tick(1.0 / 60.0, 0x2000);
        assert!(client.outbound.is_empty());

        deliver(
            &mut client,
            Message::Control(ControlMessage::RegisterSucceeded { guid: Guid::new(4) }),
        );
        client.tick(1.0 / 60.0, 0x2000);
        client.tick(1.0 / 60.0, 0x2000);

        let mut loopback = Loopback::new();
        client.flush(&mut loopback);
        let sent: Vec<Message> = loopback
            .take_for(ConnectionId::SERVER)
            .iter()
            .map(|frame| Message::decode(frame).unwrap())
            .collect();
        assert_eq!(
            sent,
            vec![
                Message::ClientShipState(ClientShipState {
                    guid: Guid::new(4),
                    sequence: 1,
                    action: 0x2000,
                }),
                Message::ClientShipState(ClientShipState {
                    guid: Guid::new(4),
                    sequence: 2,
                    action: 0x2000,
                }),
            ]
        );
        assert!(client.local_ship().unwrap().controller.velocity().length() > 0.0);
    }

    #[test]
    fn local_fire_spawns_projectiles() {
        let mut client = client();
        deliver(
            &mut client,
            Message::Control(ControlMessage::RegisterSucceeded { guid: Guid::new(4) }),
        );
        client.tick(1.0 / 60.0, 0x1000);

        let fired = client.world().projectiles();
        assert_eq!(fired.len(), 3);
        assert!(fired.iter().all(|p| p.owner() == Guid::new(4)));
    }

    #[test]
    fn remote_ships_only_move_through_server_state() {
        let mut client = client();
        deliver(
            &mut client,
            Message::Control(ControlMessage::RegisterSucceeded { guid: Guid::new(1) }),
        );
        deliver(
            &mut client,
            Message::Control(ControlMessage::UserJoined {
                guid: Guid::new(0x8000),
                username: "drone-1".to_string(),
            }),
        );
        let before = client.world().get(Guid::new(0x8000)).unwrap().body.pivot();

        client.tick(1.0, 0x2000);
        assert!(
            client
                .world()
                .get(Guid::new(0x8000))
                .unwrap()
                .body
                .pivot()
                .abs_diff_eq(before, 1e-6)
        );

        let pivot = Quat::from_rotation_z(0.8);
        deliver(
            &mut client,
            Message::ServerShipState(ServerShipState {
                guid: Guid::new(0x8000),
                sequence: 9,
                pivot,
                facing_deg: 90.0,
            }),
        );
        let ship = client.world().get(Guid::new(0x8000)).unwrap();
        assert!(ship.body.pivot().angle_between(pivot) < 1e-3);
        assert_eq!(ship.controller.facing_deg(), 90.0);
    }

    fn bob_state(sequence: u8, pivot: Quat) -> Message {
        Message::ServerShipState(ServerShipState {
            guid: Guid::new(0),
            sequence,
            pivot,
            facing_deg: 0.0,
        })
    }

    #[test]
    fn resent_roster_keeps_sequence_gates() {
        let mut client = client();
        deliver(
            &mut client,
            Message::Control(ControlMessage::RegisterSucceeded { guid: Guid::new(1) }),
        );
        deliver(&mut client, roster(&[(0, "Bob"), (1, "Alice")]));

        let fresh = Quat::from_rotation_x(0.4);
        deliver(&mut client, bob_state(10, fresh));
        deliver(&mut client, roster(&[(0, "Bob"), (1, "Alice")]));
        let bob = |client: &ClientState<NoTerrain>| {
            client.world().get(Guid::new(0)).unwrap().body.pivot()
        };
        assert!(bob(&client).angle_between(fresh) < 1e-3);

        deliver(&mut client, bob_state(9, Quat::from_rotation_x(1.4)));
        assert!(bob(&client).angle_between(fresh) < 1e-3);
        assert!(client.local_ship().is_some());
    }

    #[test]
    fn roster_drops_users_no_longer_listed() {
        let mut client = client();
        deliver(&mut client, roster(&[(0, "Bob"), (2, "Carol")]));
        deliver(&mut client, roster(&[(0, "Bob")]));

        assert!(!client.remotes.contains_key(&Guid::new(2)));
        assert!(!client.world().contains(Guid::new(2)));
        assert!(client.world().contains(Guid::new(0)));
    }

    #[test]
    fn join_request_repeats_until_acknowledged() {
        let mut client = client();
        client.request_join();
        let mut loopback = Loopback::new();
        client.flush(&mut loopback);
        let first = loopback.take_for(ConnectionId::SERVER);
        assert_eq!(first.len(), 1);

        for _ in 0..DEFAULT_RESEND_TICKS {
            client.tick(1.0 / 60.0, 0);
        }
        client.flush(&mut loopback);
        assert_eq!(loopback.take_for(ConnectionId::SERVER), first);

        client
            .handle_message(&Packet::Ack { sequence: 0 }.encode().unwrap())
            .unwrap();
        assert_eq!(client.unacked(), 0);
    }

    #[test]
    fn sequenced_control_applies_once_and_in_order() {
        let mut client = client();
        let joined = Message::Control(ControlMessage::UserJoined {
            guid: Guid::new(5),
            username: "Dave".to_string(),
        });
        let left = Message::Control(ControlMessage::UserLeft { guid: Guid::new(5) });

        client
            .handle_message(&encode_sequenced(1, &left).unwrap())
            .unwrap();
        assert!(client.registry().is_empty());
        client
            .handle_message(&encode_sequenced(0, &joined).unwrap())
            .unwrap();
        client
            .handle_message(&encode_sequenced(0, &joined).unwrap())
            .unwrap();

        assert!(client.registry().is_empty());
        assert!(client.world().is_empty());
        let events: Vec<GameEvent> = client.drain_events().collect();
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn leave_removes_ship() {
        let mut client = client();
        deliver(&mut client, roster(&[(0, "Bob")]));
        deliver(
            &mut client,
            Message::Control(ControlMessage::UserLeft { guid: Guid::new(0) }),
        );
        assert!(client.world().is_empty());
        assert!(client.registry().is_empty());

        let events: Vec<GameEvent> = client.drain_events().collect();
        assert_eq!(
            events,
            vec![
                GameEvent::RosterReset { users: 1 },
                GameEvent::UserLeft { guid: Guid::new(0) },
            ]
        );
    }

    #[test]
    fn server_goodbye_closes_session() {
        let mut client = client();
        assert!(!client.is_closed());
        deliver(&mut client, Message::Control(ControlMessage::Disconnect));
        assert!(client.is_closed());
    }

    #[test]
    fn refused_join_is_reported() {
        let mut client = client();
        deliver(
            &mut client,
            Message::RegisterFailed(crate::session::RegisterFailure::UsernameAlreadyTaken),
        );
        assert!(!client.is_registered());
        assert!(matches!(
            client.drain_events().next(),
            Some(GameEvent::RegisterFailed { .. })
        ));
    }
}
