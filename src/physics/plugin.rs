use avian3d::prelude::*;
use bevy::prelude::*;

/// Adds Avian3D in meters with a configurable world gravity.
///
/// Characters are plain dynamic bodies, so this gravity is what pulls them
/// down; the controller never applies its own.
pub struct PhysicsPlugin {
    pub gravity: Vec3,
}

impl Default for PhysicsPlugin {
    fn default() -> Self {
        Self {
            gravity: Vec3::NEG_Y * 9.81,
        }
    }
}

impl Plugin for PhysicsPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(PhysicsPlugins::default().with_length_unit(1.0))
            .insert_resource(Gravity(self.gravity));
    }
}
