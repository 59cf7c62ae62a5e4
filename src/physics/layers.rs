use avian3d::prelude::*;

/// Collision layers for the physics simulation
#[derive(PhysicsLayer, Default)]
pub enum GameLayer {
    #[default]
    Default,
    /// Characters driven by the controller
    Character,
    /// Static and moving world geometry, the only layer probes query
    World,
}
