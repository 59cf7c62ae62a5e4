use bevy::prelude::*;

use super::world::{CollisionWorld, QueryScratch};

/// Result of a downward ground probe
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayInfo {
    pub hit: bool,
    pub point: Vec3,
    pub normal: Vec3,
}

impl RayInfo {
    /// A probe that found nothing
    pub fn miss(origin: Vec3) -> Self {
        Self {
            hit: false,
            point: origin,
            normal: Vec3::Y,
        }
    }

    /// Surface normal, or straight up when nothing was hit
    pub fn normal_or_up(&self) -> Vec3 {
        if self.hit { self.normal } else { Vec3::Y }
    }
}

/// Casts straight down from `lift` above `base` over `lift + length` and
/// keeps the highest intersection, which is the surface actually supporting
/// the character.
pub fn sample_ground(
    world: &impl CollisionWorld,
    scratch: &mut QueryScratch,
    base: Vec3,
    lift: f32,
    length: f32,
) -> RayInfo {
    let origin = base + Vec3::Y * lift;
    world.raycast(origin, Dir3::NEG_Y, lift + length, &mut scratch.hits);

    scratch
        .hits
        .iter()
        .max_by(|a, b| a.point.y.total_cmp(&b.point.y))
        .map(|hit| RayInfo {
            hit: true,
            point: hit.point,
            normal: hit.normal.normalize_or(Vec3::Y),
        })
        .unwrap_or(RayInfo::miss(base))
}
