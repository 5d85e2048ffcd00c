mod body;
mod terrain;

pub use body::{
    LOCAL_BACK, LOCAL_RIGHT, LOCAL_UP, MAX_PLANET_RADIUS, MIN_PLANET_HEIGHT, SurfaceBody,
    SurfacePose, advance_pivot,
};
pub use terrain::{CollisionMask, NoTerrain, TerrainQuery};
