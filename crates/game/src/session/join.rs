use std::collections::VecDeque;

use log::{info, warn};

use crate::event::{EventQueue, GameEvent};
use crate::net::{ConnectionId, ControlMessage, Message, RosterEntry};

use super::{Guid, RegisterFailure, RegistryError, User, UserRegistry};

/// A message the join protocol wants delivered. Broadcast recipients are
/// resolved against the registry when the message is flushed.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Send {
        to: ConnectionId,
        message: Message,
    },
    Broadcast {
        except: Option<ConnectionId>,
        message: Message,
    },
}

/// Server side of the join/leave handshake.
pub struct JoinProtocol {
    registry: UserRegistry,
    outbound: VecDeque<Outbound>,
    events: EventQueue,
}

impl JoinProtocol {
    pub fn new(registry: UserRegistry) -> Self {
        Self {
            registry,
            outbound: VecDeque::new(),
            events: EventQueue::default(),
        }
    }

    pub fn registry(&self) -> &UserRegistry {
        &self.registry
    }

    pub fn handle_register(
        &mut self,
        connection: ConnectionId,
        username: &str,
    ) -> Result<Guid, RegisterFailure> {
        // A retransmitted request must not fail against the caller's own entry.
        if let Some(existing) = self.registry.get_by_connection(connection) {
            let guid = existing.guid();
            if existing.username() != username {
                warn!(
                    "{connection} is registered as {} and asked for {username}",
                    existing.username()
                );
            }
            self.send_welcome(connection, guid);
            return Ok(guid);
        }

        match self.registry.validate_and_register(username, connection) {
            Ok(user) => {
                info!("{} joined as {} from {connection}", user.username(), user.guid());
                self.send_welcome(connection, user.guid());
                self.announce_join(&user, Some(connection));
                Ok(user.guid())
            }
            Err(reason) => {
                warn!("rejected registration of {username:?} from {connection}: {reason}");
                self.outbound.push_back(Outbound::Send {
                    to: connection,
                    message: Message::RegisterFailed(reason),
                });
                Err(reason)
            }
        }
    }

    /// Adds a simulated user and announces it to every connected player.
    pub fn add_npc(&mut self, username: &str) -> Result<Guid, RegistryError> {
        let user = self.registry.register_npc(username)?;
        info!("spawned non-player {} as {}", user.username(), user.guid());
        self.announce_join(&user, None);
        Ok(user.guid())
    }

    /// Tears down the session bound to `connection`. Unknown connections are
    /// a no-op so a late timeout after an explicit disconnect is harmless.
    pub fn handle_disconnect(&mut self, connection: ConnectionId) -> Option<User> {
        let user = self.registry.remove_by_connection(connection)?;
        info!("{} ({}) left", user.username(), user.guid());
        self.announce_leave(user.guid());
        Some(user)
    }

    pub fn remove_npc(&mut self, guid: Guid) -> Option<User> {
        if guid.is_player() {
            return None;
        }
        let user = self.registry.remove_by_guid(guid)?;
        info!("removed non-player {} ({})", user.username(), guid);
        self.announce_leave(guid);
        Some(user)
    }

    /// Snapshot of every live user, ordered by guid.
    pub fn roster(&self) -> Vec<RosterEntry> {
        let mut roster: Vec<RosterEntry> = self
            .registry
            .users()
            .map(|user| RosterEntry {
                guid: user.guid(),
                username: user.username().to_owned(),
            })
            .collect();
        roster.sort_by_key(|entry| entry.guid);
        roster
    }

    /// Recipients of a broadcast: every registered connection except one.
    pub fn recipients(&self, except: Option<ConnectionId>) -> Vec<ConnectionId> {
        self.registry
            .connections()
            .filter(|connection| Some(*connection) != except)
            .collect()
    }

    pub fn drain_outbound(&mut self) -> impl Iterator<Item = Outbound> + '_ {
        self.outbound.drain(..)
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = GameEvent> + '_ {
        self.events.drain()
    }

    fn send_welcome(&mut self, connection: ConnectionId, guid: Guid) {
        self.outbound.push_back(Outbound::Send {
            to: connection,
            message: Message::Control(ControlMessage::RegisterSucceeded { guid }),
        });
        self.outbound.push_back(Outbound::Send {
            to: connection,
            message: Message::Control(ControlMessage::UserList(self.roster())),
        });
    }

    fn announce_join(&mut self, user: &User, except: Option<ConnectionId>) {
        self.outbound.push_back(Outbound::Broadcast {
            except,
            message: Message::Control(ControlMessage::UserJoined {
                guid: user.guid(),
                username: user.username().to_owned(),
            }),
        });
        self.events.push(GameEvent::UserJoined {
            guid: user.guid(),
            username: user.username().to_owned(),
        });
    }

    fn announce_leave(&mut self, guid: Guid) {
        self.outbound.push_back(Outbound::Broadcast {
            except: None,
            message: Message::Control(ControlMessage::UserLeft { guid }),
        });
        self.events.push(GameEvent::UserLeft { guid });
    }
}
