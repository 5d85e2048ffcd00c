use log::{debug, warn};

use crate::net::RosterEntry;

use super::{Guid, RegisterFailure, User, UserRegistry};

/// Client-side mirror of the server's user registry. Entries arrive with
/// their guids already assigned.
#[derive(Debug, Default)]
pub struct ClientUserRegistry {
    users: UserRegistry,
    local_guid: Option<Guid>,
    last_failure: Option<RegisterFailure>,
}

impl ClientUserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn local_guid(&self) -> Option<Guid> {
        self.local_guid
    }

    pub fn local_user(&self) -> Option<&User> {
        self.local_guid.and_then(|guid| self.users.get_by_guid(guid))
    }

    pub fn set_local(&mut self, guid: Guid) {
        self.local_guid = Some(guid);
        self.last_failure = None;
    }

    pub fn last_failure(&self) -> Option<RegisterFailure> {
        self.last_failure
    }

    /// Records a refused join and returns a line suitable for the player.
    pub fn apply_register_failed(&mut self, reason: RegisterFailure) -> String {
        self.last_failure = Some(reason);
        describe_failure(reason)
    }

    pub fn apply_joined(&mut self, guid: Guid, username: &str) -> bool {
        match self.users.insert_known(guid, username) {
            Ok(_) => true,
            Err(err) => {
                debug!("ignoring join of {username} ({guid}): {err}");
                false
            }
        }
    }

    pub fn apply_left(&mut self, guid: Guid) -> Option<User> {
        let user = self.users.remove_by_guid(guid);
        if user.is_none() {
            debug!("leave for unknown user {guid}");
        }
        user
    }

    /// Replaces the whole mirror with a server roster.
    pub fn apply_roster(&mut self, roster: &[RosterEntry]) {
        self.users.clear();
        for entry in roster {
            if let Err(err) = self.users.insert_known(entry.guid, &entry.username) {
                warn!("inconsistent roster entry {} ({}): {err}", entry.username, entry.guid);
            }
        }
    }

    pub fn get(&self, guid: Guid) -> Option<&User> {
        self.users.get_by_guid(guid)
    }

    pub fn find_by_username(&self, username: &str) -> Option<&User> {
        self.users.find_by_username(username)
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.users()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

pub fn describe_failure(reason: RegisterFailure) -> String {
    match reason {
        RegisterFailure::UsernameTooLong { max_length } => {
            format!("That name is too long. Use at most {max_length} characters.")
        }
        RegisterFailure::UsernameEmpty => "Please enter a name.".to_string(),
        RegisterFailure::UsernameAlreadyTaken => {
            "Somebody is already playing under that name.".to_string()
        }
        RegisterFailure::UsernameBanned => "That name is not allowed.".to_string(),
        RegisterFailure::ServerFull => "The server is full, try again later.".to_string(),
    }
}
