pub mod client;
pub mod event;
pub mod input;
pub mod net;
pub mod physics;
pub mod server;
pub mod session;
pub mod ship;
pub mod simulation;
pub mod surface;
pub mod weapon;

pub use client::ClientState;
pub use event::{EventQueue, GameEvent};
pub use input::{ActionButtons, ActionState, ActionTriggers, InputSource, ScriptStep, ScriptedInput};
pub use net::{
    ClientSocket, ConnectionId, ControlMessage, DEFAULT_PORT, DEFAULT_TICK_RATE, Delivery,
    Loopback, Message, NetworkStats, PacketLossSimulation, ProtocolError, ServerSocket,
    SocketEvent, Transport, TransportError,
};
pub use physics::TerrainWorld;
pub use server::ServerState;
pub use session::{Guid, RegisterFailure, RegistryConfig, User, UserRegistry};
pub use ship::{Ship, ShipConfig};
pub use simulation::{FixedTimestep, ShipWorld};
pub use surface::{CollisionMask, NoTerrain, SurfaceBody, SurfacePose, TerrainQuery};
pub use weapon::{Projectile, ProjectileKind, WeaponConfig, WeaponSpawner};
