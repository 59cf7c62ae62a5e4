use bevy::prelude::*;

use crate::player::{Character, ControllerConfig, VisualRoot};

/// Next visual root position while following `body`.
///
/// Horizontal position snaps to the body. The vertical gap closes by at most
/// `lerp_speed * dt` and never overshoots, so a step teleport reads as a short
/// climb instead of a pop.
pub fn approach_body(root: Vec3, body: Vec3, lerp_speed: f32, dt: f32) -> Vec3 {
    let gap = body.y - root.y;
    let max_move = (lerp_speed * dt).max(0.0);
    if gap.abs() <= max_move {
        return body;
    }

    Vec3::new(body.x, root.y + gap.signum() * max_move, body.z)
}

/// Moves every visual root toward its body
pub fn interpolate_visual_root(
    time: Res<Time>,
    bodies: Query<(&Transform, &ControllerConfig), With<Character>>,
    mut roots: Query<(&VisualRoot, &mut Transform), Without<Character>>,
) {
    let dt = time.delta_secs();

    for (root, mut transform) in &mut roots {
        let Ok((body, config)) = bodies.get(root.body) else {
            continue;
        };
        transform.translation = approach_body(
            transform.translation,
            body.translation,
            config.settings().camera_lerp_speed,
            dt,
        );
    }
}
