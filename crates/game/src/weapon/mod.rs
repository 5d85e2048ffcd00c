mod config;
mod projectile;
mod spawner;

pub use config::{BulletConfig, MineConfig, SpreadConfig, WeaponConfig};
pub use projectile::{Projectile, ProjectileKind};
pub use spawner::{Muzzle, WeaponSpawner};
