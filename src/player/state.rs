use bevy::prelude::*;

use crate::physics::RayInfo;

/// Marker for the locally controlled character (also used as input context)
#[derive(Component, Default)]
pub struct Player;

/// A rigid-body character driven by the controller.
///
/// The body entity carries physics; `visual_root` is the rendered transform
/// that trails the body so teleports can be smoothed.
#[derive(Component, Debug, Clone, Copy)]
pub struct Character {
    pub visual_root: Entity,
}

/// The rendered root of a character, interpolated toward its body
#[derive(Component, Debug, Clone, Copy)]
pub struct VisualRoot {
    pub body: Entity,
}

/// Per-character movement state
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct MovementState {
    /// Move input, never longer than 1
    pub input_direction: Vec2,
    /// Jump requested and not yet consumed by a grounded physics tick
    pub queued_jump: bool,
    /// Horizontal body velocity at the start of the physics tick
    pub current_velocity: Vec3,
    pub current_speed: f32,
}

impl MovementState {
    /// Stores move input, normalizing only vectors longer than 1 so analog
    /// sticks keep partial speeds.
    pub fn set_input(&mut self, input: Vec2) {
        self.input_direction = clamp_input(input);
    }

    pub fn has_input(&self) -> bool {
        self.input_direction != Vec2::ZERO
    }
}

/// Normalizes `input` when its length exceeds 1
pub fn clamp_input(input: Vec2) -> Vec2 {
    if input.length_squared() > 1.0 {
        input.normalize_or_zero()
    } else {
        input
    }
}

/// Marker: character is on the ground
#[derive(Component)]
#[component(storage = "SparseSet")]
pub struct Grounded;

/// Latest downward ground sample beneath the character
#[derive(Component, Debug, Clone, Copy, Deref)]
pub struct GroundSample(pub RayInfo);

impl Default for GroundSample {
    fn default() -> Self {
        Self(RayInfo::miss(Vec3::ZERO))
    }
}

/// Force and impulse computed this physics tick, applied after stepping
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct MovementForce {
    pub force: Vec3,
    pub impulse: Vec3,
}
