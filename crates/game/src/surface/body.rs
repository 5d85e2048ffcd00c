use glam::{Quat, Vec2, Vec3};

use super::{CollisionMask, TerrainQuery};

pub const MAX_PLANET_RADIUS: f32 = 1000.0;
pub const MIN_PLANET_HEIGHT: f32 = 1.0;

/// Local tangent frame of a pivot: +Y points away from the planet centre,
/// +Z is forward and +X is right.
pub const LOCAL_UP: Vec3 = Vec3::Y;
pub const LOCAL_RIGHT: Vec3 = Vec3::X;
pub const LOCAL_BACK: Vec3 = Vec3::NEG_Z;

/// Where an entity sits on the sphere and which way it faces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfacePose {
    pub pivot: Quat,
    /// Heading around the local up axis, degrees in `[0, 360)`.
    pub facing_deg: f32,
    pub planet_height: f32,
}

impl Default for SurfacePose {
    fn default() -> Self {
        Self {
            pivot: Quat::IDENTITY,
            facing_deg: 0.0,
            planet_height: MIN_PLANET_HEIGHT,
        }
    }
}

/// Rotates `pivot` so that a point `height` units from the centre travels
/// `local_velocity * dt` along the surface. Angles are arc length over radius.
pub fn advance_pivot(pivot: Quat, local_velocity: Vec2, dt: f32, height: f32) -> Quat {
    let height = height.max(MIN_PLANET_HEIGHT);
    let xrot = Quat::from_axis_angle(LOCAL_RIGHT, local_velocity.y / height * dt);
    let zrot = Quat::from_axis_angle(LOCAL_BACK, local_velocity.x / height * dt);
    (pivot * (xrot * zrot)).normalize()
}

/// An object bound to the planet surface. Its position is a rotation of the
/// planet pivot plus a distance from the centre, which avoids the poles of a
/// latitude/longitude encoding.
#[derive(Debug, Clone)]
pub struct SurfaceBody {
    center: Vec3,
    pivot: Quat,
    planet_height: f32,
    surface_offset: f32,
}

impl Default for SurfaceBody {
    fn default() -> Self {
        Self::new(Quat::IDENTITY)
    }
}

impl SurfaceBody {
    pub fn new(pivot: Quat) -> Self {
        Self {
            center: Vec3::ZERO,
            pivot: pivot.normalize(),
            planet_height: MIN_PLANET_HEIGHT,
            surface_offset: 0.0,
        }
    }

    pub fn with_center(mut self, center: Vec3) -> Self {
        self.center = center;
        self
    }

    pub fn with_surface_offset(mut self, offset: f32) -> Self {
        self.surface_offset = offset;
        self
    }

    pub fn pivot(&self) -> Quat {
        self.pivot
    }

    pub fn set_pivot(&mut self, pivot: Quat) {
        self.pivot = pivot.normalize();
    }

    pub fn planet_height(&self) -> f32 {
        self.planet_height
    }

    pub fn set_planet_height(&mut self, height: f32) {
        self.planet_height = height.max(MIN_PLANET_HEIGHT);
    }

    pub fn surface_offset(&self) -> f32 {
        self.surface_offset
    }

    pub fn offset_from_center(&self) -> f32 {
        self.planet_height + self.surface_offset
    }

    /// Unit vector from the planet centre through the entity.
    pub fn up(&self) -> Vec3 {
        (self.pivot * LOCAL_UP).normalize()
    }

    pub fn world_position(&self) -> Vec3 {
        self.center + self.up() * self.offset_from_center()
    }

    pub fn advance(&mut self, local_velocity: Vec2, dt: f32) {
        self.pivot = advance_pivot(self.pivot, local_velocity, dt, self.planet_height);
    }

    /// Casts from `MAX_PLANET_RADIUS` outside the entity back toward the
    /// centre and stores the distance from the centre to the terrain hit.
    /// A miss means open space and yields the minimum height.
    pub fn sample_height<T: TerrainQuery + ?Sized>(&mut self, terrain: &T) -> f32 {
        let direction = -self.up();
        let origin = self.center - direction * MAX_PLANET_RADIUS;

        self.planet_height = terrain
            .raycast(
                origin,
                direction,
                MAX_PLANET_RADIUS,
                CollisionMask::PLANET_TERRAIN,
            )
            .map(|toi| {
                let hit = origin + direction * toi;
                (hit - self.center).length().max(MIN_PLANET_HEIGHT)
            })
            .unwrap_or(MIN_PLANET_HEIGHT);

        self.planet_height
    }
}
