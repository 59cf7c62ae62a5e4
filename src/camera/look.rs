use bevy::prelude::*;

use crate::player::{LookInput, VisualRoot};

/// Marker for the pitch pivot, a child of a character's visual root
#[derive(Component)]
pub struct CameraPitch;

/// Marker for the rendering camera under the pitch pivot
#[derive(Component, Default)]
pub struct FpsCamera;

/// Camera configuration
#[derive(Component, Clone)]
pub struct CameraConfig {
    /// Radians of rotation per unit of look input
    pub sensitivity: f32,
    /// Maximum pitch angle (looking up)
    pub max_pitch: f32,
    /// Minimum pitch angle (looking down)
    pub min_pitch: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            sensitivity: 0.003,
            max_pitch: 80.0_f32.to_radians(),
            min_pitch: -80.0_f32.to_radians(),
        }
    }
}

/// Current pitch angle in radians
#[derive(Component, Default, Deref, DerefMut)]
pub struct PitchAngle(pub f32);

/// Rotates each visual root by its body's look input (yaw) and tilts the
/// pitch pivot under it.
///
/// The yaw lives on the visual root, so the movement basis and the camera
/// always agree.
pub fn apply_mouse_look(
    bodies: Query<&LookInput>,
    mut roots: Query<(&VisualRoot, &mut Transform), Without<CameraPitch>>,
    mut pivots: Query<
        (&ChildOf, &mut Transform, &mut PitchAngle, &CameraConfig),
        With<CameraPitch>,
    >,
) {
    for (child_of, mut pivot, mut pitch, config) in &mut pivots {
        let Ok((root, mut root_transform)) = roots.get_mut(child_of.parent()) else {
            continue;
        };
        let Ok(look) = bodies.get(root.body) else {
            continue;
        };
        if look.0 == Vec2::ZERO {
            continue;
        }

        root_transform.rotate_y(-look.x * config.sensitivity);

        pitch.0 = (pitch.0 - look.y * config.sensitivity).clamp(config.min_pitch, config.max_pitch);
        pivot.rotation = Quat::from_rotation_x(pitch.0);
    }
}
