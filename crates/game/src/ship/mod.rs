mod config;
mod controller;

pub use config::ShipConfig;
pub use controller::ShipController;

use glam::Quat;

use crate::input::{ActionState, ActionTriggers};
use crate::session::Guid;
use crate::surface::{SurfaceBody, SurfacePose, TerrainQuery};
use crate::weapon::{Muzzle, Projectile, WeaponSpawner};

/// One ship: its input, flight model, weapons and place on the planet.
#[derive(Debug, Clone)]
pub struct Ship {
    guid: Guid,
    pub action: ActionState,
    pub controller: ShipController,
    pub body: SurfaceBody,
    pub weapon: WeaponSpawner,
}

impl Ship {
    pub fn new(guid: Guid, pivot: Quat, config: ShipConfig) -> Self {
        Self {
            guid,
            action: ActionState::new(),
            controller: ShipController::new(config),
            body: SurfaceBody::new(pivot).with_surface_offset(config.surface_offset),
            weapon: WeaponSpawner::new(config.weapons),
        }
    }

    pub fn guid(&self) -> Guid {
        self.guid
    }

    pub fn pose(&self) -> SurfacePose {
        SurfacePose {
            pivot: self.body.pivot(),
            facing_deg: self.controller.facing_deg(),
            planet_height: self.body.planet_height(),
        }
    }

    /// Overwrites the pivot and heading with authoritative values.
    pub fn apply_pose(&mut self, pivot: Quat, facing_deg: f32) {
        self.body.set_pivot(pivot);
        self.controller.set_facing_deg(facing_deg);
    }

    /// Runs one simulation step and returns the momentary actions raised since the last one.
    pub fn tick<T: TerrainQuery + ?Sized>(&mut self, terrain: &T, dt: f32) -> ActionTriggers {
        self.controller
            .process(&self.action, &mut self.body, terrain, dt);
        self.action.take_triggers()
    }

    pub fn muzzle(&self) -> Muzzle {
        Muzzle {
            owner: self.guid,
            pivot: self.body.pivot(),
            facing_deg: self.controller.facing_deg(),
            velocity: self.controller.velocity(),
            surface_offset: self.body.surface_offset(),
        }
    }

    /// Runs the weapons after a [`Ship::tick`] that raised `triggers`.
    pub fn fire_weapons<T: TerrainQuery + ?Sized>(
        &mut self,
        triggers: ActionTriggers,
        terrain: &T,
        dt: f32,
    ) -> Vec<Projectile> {
        let muzzle = self.muzzle();
        self.weapon
            .tick(&muzzle, self.action.is_firing(), triggers, terrain, dt)
    }
}
