use bevy::prelude::*;

/// Maximum number of results any single geometry query reports.
///
/// Queries that find more than this silently drop the rest.
pub const QUERY_CAPACITY: usize = 8;

/// A single ray intersection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub entity: Entity,
    pub point: Vec3,
    pub normal: Vec3,
}

/// Geometry queries the controller needs from a physics backend.
///
/// Implementations must not report the querying character itself and must
/// truncate result lists to [`QUERY_CAPACITY`].
pub trait CollisionWorld {
    /// Casts a ray and writes up to [`QUERY_CAPACITY`] hits into `hits` (cleared first).
    fn raycast(&self, origin: Vec3, direction: Dir3, max_distance: f32, hits: &mut Vec<RayHit>);

    /// Collects colliders overlapping an oriented box into `out` (cleared first).
    fn overlap_box(&self, center: Vec3, half_extents: Vec3, rotation: Quat, out: &mut Vec<Entity>);

    /// Closest point on `collider` to `target`, or `None` if the collider is unknown.
    fn closest_point(&self, collider: Entity, target: Vec3) -> Option<Vec3>;

    /// Returns true if a capsule between `a` and `b` overlaps any geometry.
    fn check_capsule(&self, a: Vec3, b: Vec3, radius: f32) -> bool;

    /// Returns true if a sphere overlaps any geometry.
    fn check_sphere(&self, center: Vec3, radius: f32) -> bool;
}

/// Per-character result buffers reused by every query in a tick.
#[derive(Component, Debug)]
pub struct QueryScratch {
    pub hits: Vec<RayHit>,
    pub overlaps: Vec<Entity>,
}

impl Default for QueryScratch {
    fn default() -> Self {
        Self {
            hits: Vec::with_capacity(QUERY_CAPACITY),
            overlaps: Vec::with_capacity(QUERY_CAPACITY),
        }
    }
}
