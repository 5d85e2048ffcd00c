mod tick;
mod world;

pub use tick::FixedTimestep;
pub use world::{ShipWorld, spawn_pivot};
