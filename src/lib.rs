pub mod camera;
pub mod physics;
pub mod player;

pub use camera::CameraPlugin;
pub use physics::PhysicsPlugin;
pub use player::PlayerPlugin;

use bevy::prelude::*;

/// Unified plugin that adds physics, the character controller, and camera systems.
pub struct BevyStepperPlugin;

impl Plugin for BevyStepperPlugin {
    fn build(&self, app: &mut App) {
        if !app.is_plugin_added::<PhysicsPlugin>() {
            app.add_plugins(PhysicsPlugin::default());
        }
        if !app.is_plugin_added::<PlayerPlugin>() {
            app.add_plugins(PlayerPlugin);
        }
        if !app.is_plugin_added::<CameraPlugin>() {
            app.add_plugins(CameraPlugin);
        }
    }
}

pub mod prelude {
    pub use crate::BevyStepperPlugin;
    pub use crate::camera::{CameraConfig, CameraPlugin, FpsCamera};
    pub use crate::physics::{CollisionWorld, GameLayer, PhysicsPlugin};
    pub use crate::player::{
        Character, ControllerConfig, ControllerSettings, GroundContactTracker, GroundTransition,
        GroundTransitionMessage, Grounded, MovementState, Player, PlayerPlugin, SetupError,
        SteppedUp, VisualRoot, spawn_character,
    };
}
