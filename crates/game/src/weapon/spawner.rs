use glam::{Quat, Vec2};
use log::debug;

use crate::input::ActionTriggers;
use crate::session::Guid;
use crate::surface::{SurfaceBody, TerrainQuery};

use super::{Projectile, ProjectileKind, WeaponConfig};

/// Where a ship's weapons fire from during one step.
#[derive(Debug, Clone, Copy)]
pub struct Muzzle {
    pub owner: Guid,
    pub pivot: Quat,
    pub facing_deg: f32,
    pub velocity: Vec2,
    pub surface_offset: f32,
}

/// Turns the fire button and the use-item trigger into projectiles. Holding
/// fire lets off a volley every spread cooldown; each use-item edge ejects a
/// mine behind the ship unless the last one is still cooling down.
#[derive(Debug, Clone)]
pub struct WeaponSpawner {
    config: WeaponConfig,
    fire_cooldown: f32,
    mine_cooldown: f32,
}

impl Default for WeaponSpawner {
    fn default() -> Self {
        Self::new(WeaponConfig::default())
    }
}

impl WeaponSpawner {
    pub fn new(config: WeaponConfig) -> Self {
        Self {
            config,
            fire_cooldown: 0.0,
            mine_cooldown: 0.0,
        }
    }

    pub fn config(&self) -> &WeaponConfig {
        &self.config
    }

    /// Seconds until the next volley may leave.
    pub fn fire_cooldown(&self) -> f32 {
        self.fire_cooldown
    }

    pub fn tick<T: TerrainQuery + ?Sized>(
        &mut self,
        muzzle: &Muzzle,
        firing: bool,
        triggers: ActionTriggers,
        terrain: &T,
        dt: f32,
    ) -> Vec<Projectile> {
        let mut launched = Vec::new();
        self.fire_cooldown = (self.fire_cooldown - dt).max(0.0);
        self.mine_cooldown = (self.mine_cooldown - dt).max(0.0);

        if firing && self.fire_cooldown <= 0.0 {
            self.fire_cooldown = self.config.spread.cooldown;
            self.volley(muzzle, terrain, &mut launched);
        }

        if triggers.contains(ActionTriggers::USE_ITEM) {
            if self.mine_cooldown <= 0.0 {
                self.mine_cooldown = self.config.mine.cooldown;
                launched.push(self.mine(muzzle, terrain));
            } else {
                debug!("{} tried to drop a mine during cooldown", muzzle.owner);
            }
        }

        launched
    }

    fn volley<T: TerrainQuery + ?Sized>(
        &self,
        muzzle: &Muzzle,
        terrain: &T,
        launched: &mut Vec<Projectile>,
    ) {
        let bullet = self.config.bullet;
        let spread = self.config.spread;
        let count = spread.count.max(2);
        let step = spread.spread_deg / (count - 1) as f32;

        for i in 0..count {
            let angle = muzzle.facing_deg - spread.spread_deg / 2.0 + step * i as f32;
            let velocity = heading(angle) * bullet.speed + muzzle.velocity;
            let body = launch_body(muzzle, velocity, bullet.initial_offset, terrain);
            launched.push(Projectile::new(
                muzzle.owner,
                ProjectileKind::Bullet,
                body,
                velocity,
                bullet.life,
            ));
        }
    }

    fn mine<T: TerrainQuery + ?Sized>(&self, muzzle: &Muzzle, terrain: &T) -> Projectile {
        let mine = self.config.mine;
        let velocity = -heading(muzzle.facing_deg) * mine.eject_speed + muzzle.velocity;
        let body = launch_body(muzzle, velocity, mine.initial_offset, terrain);
        Projectile::new(
            muzzle.owner,
            ProjectileKind::Mine,
            body,
            velocity,
            mine.life,
        )
        .with_deceleration(mine.deceleration)
    }
}

/// Unit vector in the pivot's tangent plane for a heading in degrees.
fn heading(angle_deg: f32) -> Vec2 {
    let (sin, cos) = angle_deg.to_radians().sin_cos();
    Vec2::new(sin, cos)
}

/// Places a projectile `offset` units from the muzzle along its direction of
/// travel. Height is sampled first because the move depends on the radius.
fn launch_body<T: TerrainQuery + ?Sized>(
    muzzle: &Muzzle,
    velocity: Vec2,
    offset: f32,
    terrain: &T,
) -> SurfaceBody {
    let mut body = SurfaceBody::new(muzzle.pivot).with_surface_offset(muzzle.surface_offset);
    body.sample_height(terrain);
    body.advance(velocity.normalize_or_zero() * offset, 1.0);
    body.sample_height(terrain);
    body
}
