use std::collections::{HashMap, HashSet};

use log::debug;

use crate::net::ConnectionId;

use super::{Guid, GuidAllocator, GuidRange, User};

pub const DEFAULT_MAX_USERNAME_LEN: u8 = 32;
pub const DEFAULT_MAX_PLAYERS: usize = 32;

/// Why a join request was refused. Reported to the requesting client only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RegisterFailure {
    #[error("username exceeds {max_length} characters")]
    UsernameTooLong { max_length: u8 },
    #[error("username is empty")]
    UsernameEmpty,
    #[error("username already taken")]
    UsernameAlreadyTaken,
    #[error("username banned")]
    UsernameBanned,
    #[error("server is full")]
    ServerFull,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("no user registered with guid {0}")]
    UnknownGuid(Guid),
    #[error("guid {0} is already registered")]
    GuidInUse(Guid),
    #[error("{0} guid range exhausted")]
    RangeExhausted(GuidRange),
    #[error(transparent)]
    Rejected(#[from] RegisterFailure),
}

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub max_username_len: u8,
    pub max_players: usize,
    pub banned_usernames: HashSet<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_username_len: DEFAULT_MAX_USERNAME_LEN,
            max_players: DEFAULT_MAX_PLAYERS,
            banned_usernames: HashSet::new(),
        }
    }
}

/// Authoritative mapping between guids, usernames and transport connections.
///
/// Mutations are expected from a single event-processing path; the registry
/// holds no locks.
#[derive(Debug, Default)]
pub struct UserRegistry {
    users: HashMap<Guid, User>,
    by_name: HashMap<String, Guid>,
    by_connection: HashMap<ConnectionId, Guid>,
    allocator: GuidAllocator,
    config: RegistryConfig,
}

impl UserRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Checks a candidate name without touching the registry.
    pub fn validate(&self, username: &str) -> Result<(), RegisterFailure> {
        if username.is_empty() {
            return Err(RegisterFailure::UsernameEmpty);
        }
        if username.chars().count() > self.config.max_username_len as usize {
            return Err(RegisterFailure::UsernameTooLong {
                max_length: self.config.max_username_len,
            });
        }
        if self.config.banned_usernames.contains(username) {
            return Err(RegisterFailure::UsernameBanned);
        }
        if self.by_name.contains_key(username) {
            return Err(RegisterFailure::UsernameAlreadyTaken);
        }
        Ok(())
    }

    pub fn validate_and_register(
        &mut self,
        username: &str,
        connection: ConnectionId,
    ) -> Result<User, RegisterFailure> {
        self.validate(username)?;

        if self.player_count() >= self.config.max_players {
            return Err(RegisterFailure::ServerFull);
        }

        let guid = self
            .allocate(GuidRange::Player)
            .ok_or(RegisterFailure::ServerFull)?;
        let user = User::new(guid, username, Some(connection));
        self.insert(user.clone());
        Ok(user)
    }

    /// Registers a simulated user. Name rules are the same as for players.
    pub fn register_npc(&mut self, username: &str) -> Result<User, RegistryError> {
        self.validate(username)?;

        let guid = self
            .allocate(GuidRange::NonPlayer)
            .ok_or(RegistryError::RangeExhausted(GuidRange::NonPlayer))?;
        let user = User::new(guid, username, None);
        self.insert(user.clone());
        Ok(user)
    }

    /// Mirrors a user announced by the server under its existing guid.
    pub fn insert_known(&mut self, guid: Guid, username: &str) -> Result<&User, RegistryError> {
        if self.users.contains_key(&guid) {
            return Err(RegistryError::GuidInUse(guid));
        }
        if username.is_empty() {
            return Err(RegisterFailure::UsernameEmpty.into());
        }
        if self.by_name.contains_key(username) {
            return Err(RegisterFailure::UsernameAlreadyTaken.into());
        }

        self.insert(User::new(guid, username, None));
        self.expect_guid(guid)
    }

    /// Removes the user bound to `connection`. `None` when it was already gone.
    pub fn remove_by_connection(&mut self, connection: ConnectionId) -> Option<User> {
        let guid = self.by_connection.get(&connection).copied()?;
        self.remove_by_guid(guid)
    }

    pub fn remove_by_guid(&mut self, guid: Guid) -> Option<User> {
        let user = self.users.remove(&guid)?;
        self.by_name.remove(user.username());
        if let Some(connection) = user.connection() {
            self.by_connection.remove(&connection);
        }
        debug!("removed user {} ({})", user.username(), guid);
        Some(user)
    }

    pub fn find_by_username(&self, username: &str) -> Option<&User> {
        self.by_name
            .get(username)
            .and_then(|guid| self.users.get(guid))
    }

    pub fn get_by_guid(&self, guid: Guid) -> Option<&User> {
        self.users.get(&guid)
    }

    /// Lookup for guids the registry handed out itself. A miss means the
    /// registry and the simulation disagree, which callers treat as a bug.
    pub fn expect_guid(&self, guid: Guid) -> Result<&User, RegistryError> {
        self.users.get(&guid).ok_or(RegistryError::UnknownGuid(guid))
    }

    pub fn get_by_connection(&self, connection: ConnectionId) -> Option<&User> {
        self.by_connection
            .get(&connection)
            .and_then(|guid| self.users.get(guid))
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    pub fn connections(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.by_connection.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn player_count(&self) -> usize {
        self.users.keys().filter(|guid| guid.is_player()).count()
    }

    /// Drops every entry. Allocation counters keep running so guids handed
    /// out before the reset are not repeated.
    pub fn clear(&mut self) {
        self.users.clear();
        self.by_name.clear();
        self.by_connection.clear();
    }

    fn allocate(&mut self, range: GuidRange) -> Option<Guid> {
        let users = &self.users;
        self.allocator
            .allocate(range, |guid| users.contains_key(&guid))
    }

    fn insert(&mut self, user: User) {
        let guid = user.guid();
        self.by_name.insert(user.username().to_owned(), guid);
        if let Some(connection) = user.connection() {
            self.by_connection.insert(connection, guid);
        }
        self.users.insert(guid, user);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn conn(id: u32) -> ConnectionId {
        ConnectionId::new(id)
    }

    #[test]
    fn validation_order() {
        let mut config = RegistryConfig {
            max_username_len: 5,
            ..Default::default()
        };
        config.banned_usernames.insert("root".to_string());
        let mut registry = UserRegistry::new(config);

        assert_eq!(
            registry.validate_and_register("", conn(1)),
            Err(RegisterFailure::UsernameEmpty)
        );
        assert_eq!(
            registry.validate_and_register("abcdef", conn(1)),
            Err(RegisterFailure::UsernameTooLong { max_length: 5 })
        );
        assert_eq!(
            registry.validate_and_register("root", conn(1)),
            Err(RegisterFailure::UsernameBanned)
        );
        assert!(registry.validate_and_register("Alice", conn(1)).is_ok());
        assert_eq!(
            registry.validate_and_register("Alice", conn(2)),
            Err(RegisterFailure::UsernameAlreadyTaken)
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let mut registry = UserRegistry::new(RegistryConfig {
            max_username_len: 4,
            ..Default::default()
        });
        assert!(registry.validate_and_register("ÅÄÖü", conn(1)).is_ok());
    }

    #[test]
    fn usernames_are_case_sensitive() {
        let mut registry = UserRegistry::default();
        assert!(registry.validate_and_register("alice", conn(1)).is_ok());
        assert!(registry.validate_and_register("Alice", conn(2)).is_ok());
    }

    #[test]
    fn removal_frees_name_but_not_guid() {
        let mut registry = UserRegistry::default();
        let first = registry.validate_and_register("Bob", conn(1)).unwrap();

        let removed = registry.remove_by_connection(conn(1)).unwrap();
        assert_eq!(removed.guid(), first.guid());
        assert!(registry.remove_by_connection(conn(1)).is_none());

        let second = registry.validate_and_register("Bob", conn(1)).unwrap();
        assert_ne!(second.guid(), first.guid());
    }

    #[test]
    fn live_guids_stay_unique_and_ranged() {
        let mut registry = UserRegistry::new(RegistryConfig {
            max_players: 1000,
            ..Default::default()
        });

        for round in 0..50u32 {
            registry
                .validate_and_register(&format!("player{round}"), conn(round))
                .unwrap();
            registry.register_npc(&format!("bot{round}")).unwrap();
            if round % 3 == 0 {
                registry.remove_by_connection(conn(round / 2));
            }
        }

        let guids: HashSet<Guid> = registry.users().map(User::guid).collect();
        assert_eq!(guids.len(), registry.len());
        for user in registry.users() {
            assert_eq!(user.guid().is_player(), user.connection().is_some());
            assert_eq!(user.guid().raw() & Guid::NON_PLAYER_BIT == 0, user.is_player_controlled());
        }
    }

    #[test]
    fn lookups() {
        let mut registry = UserRegistry::default();
        let alice = registry.validate_and_register("Alice", conn(7)).unwrap();

        assert_eq!(registry.find_by_username("Alice"), Some(&alice));
        assert!(registry.find_by_username("alice").is_none());
        assert_eq!(registry.get_by_guid(alice.guid()), Some(&alice));
        assert_eq!(registry.get_by_connection(conn(7)), Some(&alice));

        let missing = Guid::new(0x1234);
        assert_eq!(
            registry.expect_guid(missing),
            Err(RegistryError::UnknownGuid(missing))
        );
    }

    #[test]
    fn player_limit_reports_server_full() {
        let mut registry = UserRegistry::new(RegistryConfig {
            max_players: 1,
            ..Default::default()
        });
        registry.validate_and_register("a", conn(1)).unwrap();
        registry.register_npc("bot").unwrap();
        assert_eq!(
            registry.validate_and_register("b", conn(2)),
            Err(RegisterFailure::ServerFull)
        );
    }

    #[test]
    fn known_users_are_mirrored_with_their_guid() {
        let mut registry = UserRegistry::default();
        registry.insert_known(Guid::new(0x8003), "bot").unwrap();
        assert!(!registry.find_by_username("bot").unwrap().is_player_controlled());

        assert_eq!(
            registry.insert_known(Guid::new(0x8003), "other").unwrap_err(),
            RegistryError::GuidInUse(Guid::new(0x8003))
        );

        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.insert_known(Guid::new(0x8003), "bot").is_ok());
    }
}
