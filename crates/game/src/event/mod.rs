mod queue;
mod types;

pub use queue::{DEFAULT_MAX_PENDING, EventQueue};
pub use types::GameEvent;
