use avian3d::prelude::*;
use bevy::prelude::*;

use super::layers::GameLayer;
use super::world::{CollisionWorld, QUERY_CAPACITY, RayHit};

/// Collider shapes and poses, used for closest-point queries
pub type ColliderQuery<'w, 's> = Query<'w, 's, (&'static Collider, &'static GlobalTransform)>;

/// [`CollisionWorld`] backed by Avian's spatial query pipeline.
///
/// Only world geometry is considered and the querying character is excluded.
pub struct AvianWorld<'a, 'w, 's> {
    spatial_query: &'a SpatialQuery<'w, 's>,
    colliders: &'a ColliderQuery<'w, 's>,
    filter: SpatialQueryFilter,
}

impl<'a, 'w, 's> AvianWorld<'a, 'w, 's> {
    pub fn new(
        spatial_query: &'a SpatialQuery<'w, 's>,
        colliders: &'a ColliderQuery<'w, 's>,
        character: Entity,
    ) -> Self {
        let filter = SpatialQueryFilter::default()
            .with_mask(GameLayer::World)
            .with_excluded_entities([character]);

        Self {
            spatial_query,
            colliders,
            filter,
        }
    }

    fn overlaps_any(&self, shape: &Collider, position: Vec3, rotation: Quat) -> bool {
        !self
            .spatial_query
            .shape_intersections(shape, position, rotation, &self.filter)
            .is_empty()
    }
}

impl CollisionWorld for AvianWorld<'_, '_, '_> {
    fn raycast(&self, origin: Vec3, direction: Dir3, max_distance: f32, hits: &mut Vec<RayHit>) {
        hits.clear();
        let found = self.spatial_query.ray_hits(
            origin,
            direction,
            max_distance,
            QUERY_CAPACITY as u32,
            true,
            &self.filter,
        );
        hits.extend(found.into_iter().take(QUERY_CAPACITY).map(|hit| RayHit {
            entity: hit.entity,
            point: origin + direction * hit.distance,
            normal: hit.normal,
        }));
    }

    fn overlap_box(&self, center: Vec3, half_extents: Vec3, rotation: Quat, out: &mut Vec<Entity>) {
        out.clear();
        let size = half_extents * 2.0;
        let shape = Collider::cuboid(size.x, size.y, size.z);
        let found = self
            .spatial_query
            .shape_intersections(&shape, center, rotation, &self.filter);
        out.extend(found.into_iter().take(QUERY_CAPACITY));
    }

    fn closest_point(&self, collider: Entity, target: Vec3) -> Option<Vec3> {
        let (shape, transform) = self.colliders.get(collider).ok()?;
        let (_, rotation, translation) = transform.to_scale_rotation_translation();
        let (point, _inside) = shape.project_point(translation, rotation, target, true);
        Some(point)
    }

    fn check_capsule(&self, a: Vec3, b: Vec3, radius: f32) -> bool {
        let shape = Collider::capsule_endpoints(radius, a, b);
        self.overlaps_any(&shape, Vec3::ZERO, Quat::IDENTITY)
    }

    fn check_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.overlaps_any(&Collider::sphere(radius), center, Quat::IDENTITY)
    }
}
