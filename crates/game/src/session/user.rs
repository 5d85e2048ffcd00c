use crate::net::ConnectionId;

use super::Guid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    guid: Guid,
    username: String,
    connection: Option<ConnectionId>,
}

impl User {
    pub fn new(guid: Guid, username: impl Into<String>, connection: Option<ConnectionId>) -> Self {
        Self {
            guid,
            username: username.into(),
            connection,
        }
    }

    pub fn guid(&self) -> Guid {
        self.guid
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Transport session of the user. Always `None` for simulated users and
    /// for every entry of a client-side mirror.
    pub fn connection(&self) -> Option<ConnectionId> {
        self.connection
    }

    pub fn is_player_controlled(&self) -> bool {
        self.guid.is_player()
    }
}
