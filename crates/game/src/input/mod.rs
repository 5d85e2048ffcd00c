mod action_state;
mod source;

pub use action_state::{ActionButtons, ActionState, ActionTriggers};
pub use source::{InputSource, ScriptedInput, ScriptStep};
