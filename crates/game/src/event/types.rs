use crate::input::ActionTriggers;
use crate::session::{Guid, RegisterFailure};

/// Things the owner of a session or simulation reacts to, drained once per
/// processing step.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    UserJoined {
        guid: Guid,
        username: String,
    },
    UserLeft {
        guid: Guid,
    },
    RegisterSucceeded {
        guid: Guid,
    },
    RegisterFailed {
        reason: RegisterFailure,
    },
    /// The client mirror was rebuilt from a full roster.
    RosterReset {
        users: usize,
    },
    ActionTriggered {
        guid: Guid,
        triggers: ActionTriggers,
    },
}

impl GameEvent {
    pub fn guid(&self) -> Option<Guid> {
        match self {
            Self::UserJoined { guid, .. }
            | Self::UserLeft { guid }
            | Self::RegisterSucceeded { guid }
            | Self::ActionTriggered { guid, .. } => Some(*guid),
            Self::RegisterFailed { .. } | Self::RosterReset { .. } => None,
        }
    }

    /// Membership changes must never be evicted from a full queue.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ActionTriggered { .. })
    }
}
