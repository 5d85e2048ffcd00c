use std::collections::BTreeMap;

use glam::Quat;

use crate::input::ActionTriggers;
use crate::session::Guid;
use crate::ship::{Ship, ShipConfig};
use crate::surface::TerrainQuery;
use crate::weapon::Projectile;

const GOLDEN_ANGLE: f32 = 2.399_963;

/// Deterministic starting orientation for a guid, spread around the planet
/// so consecutive joins do not stack on top of each other.
pub fn spawn_pivot(guid: Guid) -> Quat {
    let index = (guid.raw() & !Guid::NON_PLAYER_BIT) as f32;
    let ring = if guid.is_player() { 0.35 } else { -0.35 };
    Quat::from_rotation_y(index * GOLDEN_ANGLE) * Quat::from_rotation_x(ring)
}

/// Every ship in the match, keyed by the owning user's guid, and the
/// projectiles they have fired.
#[derive(Debug, Default)]
pub struct ShipWorld {
    ships: BTreeMap<Guid, Ship>,
    projectiles: Vec<Projectile>,
    config: ShipConfig,
}

impl ShipWorld {
    pub fn new(config: ShipConfig) -> Self {
        Self {
            ships: BTreeMap::new(),
            projectiles: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &ShipConfig {
        &self.config
    }

    /// Spawns a ship for `guid`, or returns the existing one.
    pub fn spawn<T: TerrainQuery + ?Sized>(&mut self, guid: Guid, terrain: &T) -> &mut Ship {
        let config = self.config;
        self.ships.entry(guid).or_insert_with(|| {
            let mut ship = Ship::new(guid, spawn_pivot(guid), config);
            ship.body.sample_height(terrain);
            ship
        })
    }

    pub fn despawn(&mut self, guid: Guid) -> Option<Ship> {
        self.ships.remove(&guid)
    }

    pub fn get(&self, guid: Guid) -> Option<&Ship> {
        self.ships.get(&guid)
    }

    pub fn get_mut(&mut self, guid: Guid) -> Option<&mut Ship> {
        self.ships.get_mut(&guid)
    }

    pub fn contains(&self, guid: Guid) -> bool {
        self.ships.contains_key(&guid)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ship> {
        self.ships.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Ship> {
        self.ships.values_mut()
    }

    pub fn len(&self) -> usize {
        self.ships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ships.is_empty()
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&Ship) -> bool) {
        self.ships.retain(|_, ship| keep(ship));
    }

    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    /// Steps every projectile, then every ship and its weapons, and collects
    /// the triggers the ships raised.
    pub fn tick<T: TerrainQuery + ?Sized>(
        &mut self,
        terrain: &T,
        dt: f32,
    ) -> Vec<(Guid, ActionTriggers)> {
        self.tick_projectiles(terrain, dt);

        let mut raised = Vec::new();
        for ship in self.ships.values_mut() {
            let triggers = step_ship(ship, &mut self.projectiles, terrain, dt);
            if !triggers.is_empty() {
                raised.push((ship.guid(), triggers));
            }
        }
        raised
    }

    /// Steps a single ship and its weapons; `None` if there is no such ship.
    pub fn tick_ship<T: TerrainQuery + ?Sized>(
        &mut self,
        guid: Guid,
        terrain: &T,
        dt: f32,
    ) -> Option<ActionTriggers> {
        let ship = self.ships.get_mut(&guid)?;
        Some(step_ship(ship, &mut self.projectiles, terrain, dt))
    }

    /// Moves every projectile and drops the ones that burnt out.
    pub fn tick_projectiles<T: TerrainQuery + ?Sized>(&mut self, terrain: &T, dt: f32) {
        self.projectiles
            .retain_mut(|projectile| projectile.tick(terrain, dt));
    }
}

fn step_ship<T: TerrainQuery + ?Sized>(
    ship: &mut Ship,
    projectiles: &mut Vec<Projectile>,
    terrain: &T,
    dt: f32,
) -> ActionTriggers {
    let triggers = ship.tick(terrain, dt);
    projectiles.extend(ship.fire_weapons(triggers, terrain, dt));
    triggers
}
