use glam::Vec2;

use crate::session::Guid;
use crate::surface::{SurfaceBody, TerrainQuery};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectileKind {
    Bullet,
    Mine,
}

/// A short-lived object sliding along the planet surface.
#[derive(Debug, Clone)]
pub struct Projectile {
    owner: Guid,
    kind: ProjectileKind,
    pub body: SurfaceBody,
    velocity: Vec2,
    life: f32,
    deceleration: f32,
}

impl Projectile {
    pub fn new(
        owner: Guid,
        kind: ProjectileKind,
        body: SurfaceBody,
        velocity: Vec2,
        life: f32,
    ) -> Self {
        Self {
            owner,
            kind,
            body,
            velocity,
            life,
            deceleration: 0.0,
        }
    }

    pub fn with_deceleration(mut self, deceleration: f32) -> Self {
        self.deceleration = deceleration.max(0.0);
        self
    }

    pub fn owner(&self) -> Guid {
        self.owner
    }

    pub fn kind(&self) -> ProjectileKind {
        self.kind
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    /// Seconds left before the projectile burns out.
    pub fn life(&self) -> f32 {
        self.life
    }

    /// Moves one step. Returns `false` once the projectile has burnt out.
    pub fn tick<T: TerrainQuery + ?Sized>(&mut self, terrain: &T, dt: f32) -> bool {
        if self.deceleration > 0.0 {
            let speed = self.velocity.length();
            // a long step brings the projectile to rest, never backwards
            let decay = (speed * dt * self.deceleration).min(speed);
            self.velocity -= self.velocity.normalize_or_zero() * decay;
        }

        self.body.advance(self.velocity, dt);
        self.body.sample_height(terrain);

        self.life -= dt;
        self.life >= 0.0
    }
}

#[cfg(test)]
mod tests {
    use glam::Quat;

    use super::*;
    use crate::surface::NoTerrain;

    #[test]
    fn burns_out_after_its_life() {
        let mut bullet = Projectile::new(
            Guid::new(1),
            ProjectileKind::Bullet,
            SurfaceBody::default(),
            Vec2::new(0.0, 30.0),
            0.5,
        );

        let mut ticks = 0;
        while bullet.tick(&NoTerrain, 0.125) {
            ticks += 1;
        }
        assert_eq!(ticks, 4);
        assert!(bullet.body.up().z > 0.0);
    }

    #[test]
    fn deceleration_slows_without_reversing() {
        let mut mine = Projectile::new(
            Guid::new(1),
            ProjectileKind::Mine,
            SurfaceBody::new(Quat::from_rotation_x(0.2)),
            Vec2::new(0.0, -3.0),
            10.0,
        )
        .with_deceleration(2.5);

        mine.tick(&NoTerrain, 1.0 / 60.0);
        let after = mine.velocity();
        assert!(after.length() < 3.0);
        assert!(after.y < 0.0);

        mine.tick(&NoTerrain, 100.0);
        assert!(mine.velocity().length() < 1e-5);
    }
}
