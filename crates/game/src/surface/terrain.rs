use bitflags::bitflags;
use glam::Vec3;

bitflags! {
    /// Collision categories used to restrict terrain queries.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CollisionMask: u32 {
        const PLANET_TERRAIN = 0x0001;
        const PLAYERS = 0x0002;
        const WALLS = 0x0004;
    }
}

/// Ray queries against the planet's collision geometry.
pub trait TerrainQuery {
    /// Distance along `direction` to the first hit within `max_distance`, if any.
    /// `direction` is expected to be normalized.
    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: CollisionMask,
    ) -> Option<f32>;
}

/// Open space: every cast misses.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTerrain;

impl TerrainQuery for NoTerrain {
    fn raycast(&self, _: Vec3, _: Vec3, _: f32, _: CollisionMask) -> Option<f32> {
        None
    }
}

impl<T: TerrainQuery + ?Sized> TerrainQuery for &T {
    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: CollisionMask,
    ) -> Option<f32> {
        (**self).raycast(origin, direction, max_distance, mask)
    }
}

impl<T: TerrainQuery + ?Sized> TerrainQuery for Box<T> {
    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: CollisionMask,
    ) -> Option<f32> {
        (**self).raycast(origin, direction, max_distance, mask)
    }
}
