use bevy::prelude::*;

use super::{look::*, smoothing::*};

/// Plugin for first-person look and visual root smoothing
pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, (apply_mouse_look, interpolate_visual_root).chain());
    }
}
