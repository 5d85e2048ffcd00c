mod client;
mod guid;
mod join;
mod registry;
mod user;

pub use client::{ClientUserRegistry, describe_failure};
pub use guid::{Guid, GuidAllocator, GuidRange};
pub use join::{JoinProtocol, Outbound};
pub use registry::{
    DEFAULT_MAX_PLAYERS, DEFAULT_MAX_USERNAME_LEN, RegisterFailure, RegistryConfig,
    RegistryError, UserRegistry,
};
pub use user::User;
