#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BulletConfig {
    /// Surface units per second, on top of the ship's own velocity.
    pub speed: f32,
    /// Seconds before the bullet burns out.
    pub life: f32,
    /// Distance from the ship's pivot at which a bullet appears.
    pub initial_offset: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpreadConfig {
    /// Angle in degrees between the outermost bullets.
    pub spread_deg: f32,
    /// Bullets per volley, at least two.
    pub count: u32,
    /// Seconds between volleys while fire is held.
    pub cooldown: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MineConfig {
    /// Speed at which a mine leaves the back of the ship.
    pub eject_speed: f32,
    /// Fraction of speed lost per second.
    pub deceleration: f32,
    pub life: f32,
    pub cooldown: f32,
    pub initial_offset: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WeaponConfig {
    pub bullet: BulletConfig,
    pub spread: SpreadConfig,
    pub mine: MineConfig,
}

impl Default for BulletConfig {
    fn default() -> Self {
        Self {
            speed: 30.0,
            life: 0.6,
            initial_offset: 0.6,
        }
    }
}

impl Default for SpreadConfig {
    fn default() -> Self {
        Self {
            spread_deg: 20.0,
            count: 3,
            cooldown: 0.15,
        }
    }
}

impl Default for MineConfig {
    fn default() -> Self {
        Self {
            eject_speed: 3.0,
            deceleration: 2.5,
            life: 8.0,
            cooldown: 0.5,
            initial_offset: 0.6,
        }
    }
}
