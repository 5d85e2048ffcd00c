use glam::Vec3;
use rapier3d::prelude::*;

use crate::surface::{CollisionMask, TerrainQuery};

/// Static collision geometry of a planet. Only answers ray casts; nothing here is simulated.
pub struct TerrainWorld {
    pipeline: PhysicsPipeline,
    integration_parameters: IntegrationParameters,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
}

impl Default for TerrainWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl TerrainWorld {
    pub fn new() -> Self {
        Self {
            pipeline: PhysicsPipeline::new(),
            integration_parameters: IntegrationParameters::default(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
        }
    }

    /// A planet with a perfectly round terrain shell centred on the origin.
    pub fn with_planet(radius: Real) -> Self {
        let mut world = Self::new();
        world.add_planet(Vec3::ZERO, radius);
        world
    }

    pub fn add_planet(&mut self, center: Vec3, radius: Real) -> ColliderHandle {
        let collider = ColliderBuilder::ball(radius)
            .translation(Vector::new(center.x, center.y, center.z))
            .collision_groups(Self::groups_for(CollisionMask::PLANET_TERRAIN))
            .build();
        self.insert(collider)
    }

    /// A box resting on the terrain layer, e.g. a mountain or crater rim.
    pub fn add_terrain_box(&mut self, position: Vec3, half_extents: Vec3) -> ColliderHandle {
        self.add_box(position, half_extents, CollisionMask::PLANET_TERRAIN)
    }

    pub fn add_wall(&mut self, position: Vec3, half_extents: Vec3) -> ColliderHandle {
        self.add_box(position, half_extents, CollisionMask::WALLS)
    }

    pub fn add_box(
        &mut self,
        position: Vec3,
        half_extents: Vec3,
        layer: CollisionMask,
    ) -> ColliderHandle {
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .translation(Vector::new(position.x, position.y, position.z))
            .collision_groups(Self::groups_for(layer))
            .build();
        self.insert(collider)
    }

    pub fn remove(&mut self, handle: ColliderHandle) {
        self.colliders
            .remove(handle, &mut self.islands, &mut self.bodies, false);
        self.refresh();
    }

    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }

    fn insert(&mut self, collider: Collider) -> ColliderHandle {
        let handle = self.colliders.insert(collider);
        self.refresh();
        handle
    }

    fn groups_for(layer: CollisionMask) -> InteractionGroups {
        InteractionGroups::all().with_memberships(Group::from_bits_truncate(layer.bits()))
    }

    // The broad phase only sees colliders after a step.
    fn refresh(&mut self) {
        self.pipeline.step(
            Vector::new(0.0, 0.0, 0.0),
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            &(),
            &(),
        );
    }

    fn query_pipeline(&self, mask: CollisionMask) -> QueryPipeline<'_> {
        let filter = InteractionGroups::all().with_filter(Group::from_bits_truncate(mask.bits()));
        self.broad_phase.as_query_pipeline(
            self.narrow_phase.query_dispatcher(),
            &self.bodies,
            &self.colliders,
            QueryFilter::default().groups(filter),
        )
    }
}

impl TerrainQuery for TerrainWorld {
    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: CollisionMask,
    ) -> Option<f32> {
        let query = self.query_pipeline(mask);
        let ray = Ray::new(
            Vector::new(origin.x, origin.y, origin.z),
            Vector::new(direction.x, direction.y, direction.z),
        );

        query
            .cast_ray(&ray, max_distance, true)
            .map(|(_, toi)| toi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ray_hits_planet_shell() {
        let world = TerrainWorld::with_planet(42.0);

        let toi = world
            .raycast(
                Vec3::new(0.0, 100.0, 0.0),
                Vec3::NEG_Y,
                200.0,
                CollisionMask::PLANET_TERRAIN,
            )
            .expect("planet should be hit");
        assert!((toi - 58.0).abs() < 1e-3);
    }

    #[test]
    fn mask_excludes_other_layers() {
        let mut world = TerrainWorld::new();
        world.add_wall(Vec3::new(0.0, 10.0, 0.0), Vec3::splat(1.0));
        assert_eq!(world.collider_count(), 1);

        let hit = world.raycast(
            Vec3::new(0.0, 100.0, 0.0),
            Vec3::NEG_Y,
            200.0,
            CollisionMask::PLANET_TERRAIN,
        );
        assert!(hit.is_none());

        let hit = world.raycast(
            Vec3::new(0.0, 100.0, 0.0),
            Vec3::NEG_Y,
            200.0,
            CollisionMask::WALLS,
        );
        assert!(hit.is_some());
    }

    #[test]
    fn removed_terrain_is_no_longer_hit() {
        let mut world = TerrainWorld::new();
        let handle = world.add_planet(Vec3::ZERO, 10.0);
        world.remove(handle);

        let hit = world.raycast(
            Vec3::new(0.0, 100.0, 0.0),
            Vec3::NEG_Y,
            200.0,
            CollisionMask::PLANET_TERRAIN,
        );
        assert!(hit.is_none());
    }
}
