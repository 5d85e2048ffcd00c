use glam::Vec2;

use crate::input::ActionState;
use crate::surface::{SurfaceBody, TerrainQuery};

use super::ShipConfig;

/// Flight model: turns the packed input into a heading and a tangential
/// velocity, then moves the surface body.
#[derive(Debug, Clone)]
pub struct ShipController {
    config: ShipConfig,
    facing_deg: f32,
    velocity: Vec2,
}

impl Default for ShipController {
    fn default() -> Self {
        Self::new(ShipConfig::default())
    }
}

impl ShipController {
    pub fn new(config: ShipConfig) -> Self {
        Self {
            config,
            facing_deg: 0.0,
            velocity: Vec2::ZERO,
        }
    }

    pub fn config(&self) -> &ShipConfig {
        &self.config
    }

    pub fn facing_deg(&self) -> f32 {
        self.facing_deg
    }

    pub fn set_facing_deg(&mut self, angle: f32) {
        self.facing_deg = wrap_degrees(angle);
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn process<T: TerrainQuery + ?Sized>(
        &mut self,
        input: &ActionState,
        body: &mut SurfaceBody,
        terrain: &T,
        dt: f32,
    ) {
        self.tick_heading(input, dt);
        self.tick_velocity(input, dt);

        body.advance(self.velocity, dt);
        body.sample_height(terrain);
    }

    fn tick_heading(&mut self, input: &ActionState, dt: f32) {
        let turn = input.right() - input.left();
        self.set_facing_deg(self.facing_deg + turn * self.config.rotation_speed * dt);
    }

    fn tick_velocity(&mut self, input: &ActionState, dt: f32) {
        if input.is_thrusting() {
            let (sin, cos) = self.facing_deg.to_radians().sin_cos();
            self.velocity += Vec2::new(sin, cos) * self.config.acceleration * dt;
            self.velocity = self.velocity.clamp_length_max(self.config.max_velocity);
        } else {
            let speed = self.velocity.length();
            // large timesteps must not reverse the trajectory
            let decay = (speed * dt * self.config.velocity_decay).min(speed);
            self.velocity -= self.velocity.normalize_or_zero() * decay;
        }
    }
}

fn wrap_degrees(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(360.0);
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}
