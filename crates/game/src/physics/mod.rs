mod world;

pub use world::TerrainWorld;
