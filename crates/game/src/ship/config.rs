use crate::weapon::WeaponConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShipConfig {
    /// Degrees per second at full left/right input.
    pub rotation_speed: f32,
    /// Surface units per second squared while thrusting.
    pub acceleration: f32,
    pub max_velocity: f32,
    /// Fraction of speed lost per second while coasting.
    pub velocity_decay: f32,
    /// Rest height of the hull above the terrain.
    pub surface_offset: f32,
    pub weapons: WeaponConfig,
}

impl Default for ShipConfig {
    fn default() -> Self {
        Self {
            rotation_speed: 270.0,
            acceleration: 12.0,
            max_velocity: 9.0,
            velocity_decay: 1.5,
            surface_offset: 0.5,
            weapons: WeaponConfig::default(),
        }
    }
}
