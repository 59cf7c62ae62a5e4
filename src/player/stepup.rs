use avian3d::prelude::*;
use bevy::prelude::*;

use super::config::ControllerConfig;
use super::movement::world_input;
use super::state::*;
use crate::physics::{AvianWorld, ColliderQuery, CollisionWorld, QueryScratch, RayInfo};

/// Gap between the character and the near face of the step probe box
const PROBE_FORWARD_GAP: f32 = 0.05;

/// Vertical clearance kept between clearance capsules and the step surface
const STEP_SKIN: f32 = 0.05;

/// Radius of the forward corner check relative to the body radius
const NARROW_RADIUS_SCALE: f32 = 0.25;

/// A ledge point proposed in the direction of travel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepCandidate {
    pub point: Vec3,
    pub valid: bool,
}

/// Result of a step attempt
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StepOutcome {
    pub stepped: bool,
    pub vertical_offset: f32,
}

/// The parts of a rigid body a step rewrites
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    /// Body center
    pub position: Vec3,
    pub velocity: Vec3,
}

/// Emitted when a character climbs a step
#[derive(Message, Debug, Clone, Copy)]
pub struct SteppedUp {
    pub character: Entity,
    pub height: f32,
}

fn in_step_band(config: &ControllerConfig, foot: Vec3, y: f32) -> bool {
    let settings = config.settings();
    y > foot.y + settings.step_clearance && y <= foot.y + settings.step_height
}

/// Scans a box in front of the character for the highest climbable point.
///
/// Returns the box's upper forward anchor with `valid = false` when nothing
/// qualifies, so callers can still raycast down from it.
pub fn detect_step(
    world: &impl CollisionWorld,
    scratch: &mut QueryScratch,
    config: &ControllerConfig,
    foot: Vec3,
    direction: Vec3,
) -> StepCandidate {
    let Some(direction) = Vec3::new(direction.x, 0.0, direction.z).try_normalize() else {
        return StepCandidate {
            point: foot,
            valid: false,
        };
    };
    let settings = config.settings();

    let half_extents = Vec3::new(
        settings.radius,
        settings.step_height - settings.step_clearance,
        settings.radius,
    ) * 0.5;
    let center = foot
        + Vec3::Y * (settings.step_height - half_extents.y)
        + direction * (half_extents.z + PROBE_FORWARD_GAP);
    let rotation = Quat::from_rotation_y(f32::atan2(-direction.x, -direction.z));
    let anchor = center + Vec3::Y * half_extents.y + direction * half_extents.z;

    world.overlap_box(center, half_extents, rotation, &mut scratch.overlaps);

    let mut best: Option<Vec3> = None;
    for &collider in &scratch.overlaps {
        let Some(point) = world.closest_point(collider, anchor) else {
            continue;
        };
        if in_step_band(config, foot, point.y) && best.is_none_or(|b| point.y > b.y) {
            best = Some(point);
        }
    }

    match best {
        Some(point) => StepCandidate { point, valid: true },
        None => StepCandidate {
            point: anchor,
            valid: false,
        },
    }
}

/// Samples the surface beneath a step candidate.
///
/// An invalid candidate is upgraded to the ray hit when that hit lies inside
/// the climbable height band.
pub fn probe_step_surface(
    world: &impl CollisionWorld,
    scratch: &mut QueryScratch,
    config: &ControllerConfig,
    foot: Vec3,
    candidate: StepCandidate,
) -> (StepCandidate, RayInfo) {
    let settings = config.settings();
    let origin = Vec3::new(
        candidate.point.x,
        foot.y + settings.step_height + STEP_SKIN,
        candidate.point.z,
    );
    let length = settings.step_height - settings.step_clearance + STEP_SKIN;
    world.raycast(origin, Dir3::NEG_Y, length, &mut scratch.hits);

    let front = scratch
        .hits
        .iter()
        .filter(|hit| in_step_band(config, foot, hit.point.y))
        .max_by(|a, b| a.point.y.total_cmp(&b.point.y))
        .map(|hit| RayInfo {
            hit: true,
            point: hit.point,
            normal: hit.normal.normalize_or(Vec3::Y),
        })
        .unwrap_or(RayInfo::miss(origin));

    if !candidate.valid && front.hit {
        return (
            StepCandidate {
                point: front.point,
                valid: true,
            },
            front,
        );
    }
    (candidate, front)
}

/// Validates a step candidate and, if every check passes, lifts the body onto
/// it and lowers the visual root by the same amount.
///
/// `visual_root` is the root's offset from the body, so lowering it keeps the
/// root's world position where it was. Nothing is modified unless the step is
/// taken.
#[allow(clippy::too_many_arguments)]
pub fn try_resolve_step(
    world: &impl CollisionWorld,
    config: &ControllerConfig,
    body: &mut BodyState,
    visual_root: &mut Vec3,
    ground: &RayInfo,
    candidate: StepCandidate,
    front: &RayInfo,
    direction: Vec3,
) -> StepOutcome {
    let rejected = StepOutcome::default();
    if !candidate.valid {
        return rejected;
    }
    let Some(direction) = Vec3::new(direction.x, 0.0, direction.z).try_normalize() else {
        return rejected;
    };
    let settings = config.settings();
    let foot = config.foot(body.position);

    // Steep step faces are not climbable
    if front.normal_or_up().dot(Vec3::Y) < config.step_max_slope_cos() {
        return rejected;
    }

    // A slope that simply continues ahead is not a step: the rise is measured
    // from the plane the character stands on
    if ground.hit && ground.normal.y > f32::EPSILON {
        let n = ground.normal;
        let d = candidate.point - ground.point;
        let plane_y = ground.point.y - (n.x * d.x + n.z * d.z) / n.y;
        if candidate.point.y - plane_y <= settings.step_clearance {
            return rejected;
        }
    }

    // The step must sit under the character's support footprint
    let contact = if ground.hit { ground.point } else { foot };
    let midpoint = (contact + candidate.point) * 0.5;
    let reach = Vec2::new(midpoint.x - foot.x, midpoint.z - foot.z).length();
    if reach > settings.ground_radius {
        return rejected;
    }

    let step_y = candidate.point.y;
    let capsule_at = |base: Vec3, radius: f32| {
        let low = Vec3::new(base.x, step_y + radius + STEP_SKIN, base.z);
        let high_y = (step_y + settings.height - radius - STEP_SKIN).max(low.y);
        (low, Vec3::new(base.x, high_y, base.z))
    };

    let (a, b) = capsule_at(foot, settings.radius);
    if world.check_capsule(a, b, settings.radius) {
        return rejected;
    }

    // Corners a full-radius check at the base would miss
    let narrow = settings.radius * NARROW_RADIUS_SCALE;
    let (a, b) = capsule_at(foot + direction * (settings.radius + narrow), narrow);
    if world.check_capsule(a, b, narrow) {
        return rejected;
    }

    let offset = step_y - foot.y;
    body.position.y += offset;
    // Drop vertical velocity so the body neither bounces nor sinks
    body.velocity.y = 0.0;
    visual_root.y -= offset;

    StepOutcome {
        stepped: true,
        vertical_offset: offset,
    }
}

/// Direction a step is probed in: travel direction when moving fast enough,
/// otherwise the input direction
pub fn step_direction(config: &ControllerConfig, state: &MovementState, yaw: Quat) -> Option<Vec3> {
    if state.current_speed > config.settings().step_speed_tolerance {
        return state.current_velocity.try_normalize();
    }
    if state.has_input() {
        return world_input(state.input_direction, yaw).try_normalize();
    }
    None
}

/// Runs detection, surface probing and resolution for one character
#[allow(clippy::too_many_arguments)]
pub fn step_up(
    world: &impl CollisionWorld,
    scratch: &mut QueryScratch,
    config: &ControllerConfig,
    state: &MovementState,
    yaw: Quat,
    ground: &RayInfo,
    body: &mut BodyState,
    visual_root: &mut Vec3,
) -> StepOutcome {
    let Some(direction) = step_direction(config, state, yaw) else {
        return StepOutcome::default();
    };
    let foot = config.foot(body.position);

    let candidate = detect_step(world, scratch, config, foot, direction);
    let (candidate, front) = probe_step_surface(world, scratch, config, foot, candidate);

    try_resolve_step(
        world,
        config,
        body,
        visual_root,
        ground,
        candidate,
        &front,
        direction,
    )
}

/// Auto-steps characters over small obstacles (stairs, curbs) while moving
pub fn apply_step_up(
    spatial_query: SpatialQuery,
    colliders: ColliderQuery,
    mut query: Query<(
        Entity,
        &Character,
        &ControllerConfig,
        &MovementState,
        &GroundSample,
        &mut Transform,
        &mut LinearVelocity,
        &mut QueryScratch,
    )>,
    mut roots: Query<&mut Transform, (With<VisualRoot>, Without<Character>)>,
    mut writer: MessageWriter<SteppedUp>,
) {
    for (entity, character, config, state, sample, mut transform, mut velocity, mut scratch) in
        &mut query
    {
        let Ok(mut root) = roots.get_mut(character.visual_root) else {
            continue;
        };
        let world = AvianWorld::new(&spatial_query, &colliders, entity);

        let mut body = BodyState {
            position: transform.translation,
            velocity: velocity.0,
        };
        // Offset from the body; stepping leaves the root's world position alone
        let mut root_offset = root.translation - transform.translation;

        let outcome = step_up(
            &world,
            &mut scratch,
            config,
            state,
            root.rotation,
            sample,
            &mut body,
            &mut root_offset,
        );
        if !outcome.stepped {
            continue;
        }

        transform.translation = body.position;
        velocity.0 = body.velocity;
        root.translation = body.position + root_offset;

        debug!("character {entity} stepped up {:.3}", outcome.vertical_offset);
        writer.write(SteppedUp {
            character: entity,
            height: outcome.vertical_offset,
        });
    }
}
