//! Axis-aligned box world used by unit tests in place of a physics backend.

use bevy::prelude::*;

use super::world::{CollisionWorld, QUERY_CAPACITY, RayHit};

#[derive(Clone, Copy, Debug)]
pub struct TestBox {
    pub entity: Entity,
    pub min: Vec3,
    pub max: Vec3,
}

impl TestBox {
    fn closest(&self, point: Vec3) -> Vec3 {
        point.clamp(self.min, self.max)
    }

    fn distance(&self, point: Vec3) -> f32 {
        self.closest(point).distance(point)
    }

    /// Slab test returning the entry distance and face normal
    fn ray(&self, origin: Vec3, dir: Vec3, max_distance: f32) -> Option<(f32, Vec3)> {
        let mut t_min = 0.0_f32;
        let mut t_max = max_distance;
        let mut normal = Vec3::ZERO;

        for axis in 0..3 {
            let o = origin[axis];
            let d = dir[axis];
            if d.abs() < 1e-8 {
                if o < self.min[axis] || o > self.max[axis] {
                    return None;
                }
                continue;
            }
            let mut t0 = (self.min[axis] - o) / d;
            let mut t1 = (self.max[axis] - o) / d;
            let mut face = Vec3::ZERO;
            face[axis] = -d.signum();
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            if t0 > t_min {
                t_min = t0;
                normal = face;
            }
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }

        // Rays starting inside a box report nothing, like a solid-less query
        (normal != Vec3::ZERO).then_some((t_min, normal))
    }
}

/// A static world made of axis-aligned boxes
#[derive(Default)]
pub struct BoxWorld {
    entities: World,
    pub boxes: Vec<TestBox>,
}

impl BoxWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a box spanning `min..max` and returns its collider id
    pub fn add_box(&mut self, min: Vec3, max: Vec3) -> Entity {
        let entity = self.entities.spawn_empty().id();
        self.boxes.push(TestBox { entity, min, max });
        entity
    }

    /// Adds a large floor whose top surface sits at `height`
    pub fn add_floor(&mut self, height: f32) -> Entity {
        self.add_box(
            Vec3::new(-50.0, height - 1.0, -50.0),
            Vec3::new(50.0, height, 50.0),
        )
    }
}

impl CollisionWorld for BoxWorld {
    fn raycast(&self, origin: Vec3, direction: Dir3, max_distance: f32, hits: &mut Vec<RayHit>) {
        hits.clear();
        let mut found: Vec<(f32, RayHit)> = self
            .boxes
            .iter()
            .filter_map(|b| {
                b.ray(origin, *direction, max_distance).map(|(t, normal)| {
                    (
                        t,
                        RayHit {
                            entity: b.entity,
                            point: origin + *direction * t,
                            normal,
                        },
                    )
                })
            })
            .collect();
        found.sort_by(|a, b| a.0.total_cmp(&b.0));
        hits.extend(found.into_iter().take(QUERY_CAPACITY).map(|(_, hit)| hit));
    }

    fn overlap_box(&self, center: Vec3, half_extents: Vec3, rotation: Quat, out: &mut Vec<Entity>) {
        out.clear();
        // Bounding box of the rotated probe
        let mut extent = Vec3::ZERO;
        for axis in [Vec3::X, Vec3::Y, Vec3::Z] {
            let local = rotation * (axis * half_extents);
            extent += local.abs();
        }
        let (min, max) = (center - extent, center + extent);

        out.extend(
            self.boxes
                .iter()
                .filter(|b| b.min.cmplt(max).all() && b.max.cmpgt(min).all())
                .map(|b| b.entity)
                .take(QUERY_CAPACITY),
        );
    }

    fn closest_point(&self, collider: Entity, target: Vec3) -> Option<Vec3> {
        self.boxes
            .iter()
            .find(|b| b.entity == collider)
            .map(|b| b.closest(target))
    }

    fn check_capsule(&self, a: Vec3, b: Vec3, radius: f32) -> bool {
        const SAMPLES: usize = 64;
        (0..=SAMPLES).any(|i| {
            let point = a.lerp(b, i as f32 / SAMPLES as f32);
            self.boxes.iter().any(|bx| bx.distance(point) < radius)
        })
    }

    fn check_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.boxes.iter().any(|b| b.distance(center) < radius)
    }
}

/// Records which queries ran, forwarding them to an inner world
pub struct CountingWorld<'a, W> {
    pub inner: &'a W,
    pub capsule_checks: std::cell::Cell<usize>,
}

impl<'a, W: CollisionWorld> CountingWorld<'a, W> {
    pub fn new(inner: &'a W) -> Self {
        Self {
            inner,
            capsule_checks: std::cell::Cell::new(0),
        }
    }
}

impl<W: CollisionWorld> CollisionWorld for CountingWorld<'_, W> {
    fn raycast(&self, origin: Vec3, direction: Dir3, max_distance: f32, hits: &mut Vec<RayHit>) {
        self.inner.raycast(origin, direction, max_distance, hits);
    }

    fn overlap_box(&self, center: Vec3, half_extents: Vec3, rotation: Quat, out: &mut Vec<Entity>) {
        self.inner.overlap_box(center, half_extents, rotation, out);
    }

    fn closest_point(&self, collider: Entity, target: Vec3) -> Option<Vec3> {
        self.inner.closest_point(collider, target)
    }

    fn check_capsule(&self, a: Vec3, b: Vec3, radius: f32) -> bool {
        self.capsule_checks.set(self.capsule_checks.get() + 1);
        self.inner.check_capsule(a, b, radius)
    }

    fn check_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.inner.check_sphere(center, radius)
    }
}
