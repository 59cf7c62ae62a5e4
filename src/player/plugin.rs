use avian3d::prelude::*;
use bevy::prelude::*;
use bevy_enhanced_input::prelude::*;

use super::config::ControllerConfig;
use super::contacts::*;
use super::input::*;
use super::movement::*;
use super::setup::validate_new_characters;
use super::state::*;
use super::stepup::{SteppedUp, apply_step_up};
use crate::camera::{CameraConfig, CameraPitch, FpsCamera, PitchAngle};
use crate::physics::{GameLayer, QueryScratch};

/// Plugin for the rigid-body character controller
pub struct PlayerPlugin;

impl Plugin for PlayerPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(EnhancedInputPlugin);

        // Register input context for player
        app.add_input_context::<Player>();

        // Input observers
        app.add_observer(handle_move_input);
        app.add_observer(handle_move_end);
        app.add_observer(handle_look_input);
        app.add_observer(handle_jump_start);

        app.add_message::<GroundTransitionMessage>();
        app.add_message::<SteppedUp>();

        app.add_systems(Update, validate_new_characters);

        // Fixed update systems for physics
        app.add_systems(
            FixedUpdate,
            (
                track_ground_contacts,
                sync_slope_tolerance,
                update_grounded_state,
                integrate_movement,
                apply_step_up,
                apply_movement_force,
            )
                .chain(),
        );

        // Clear look input at end of frame
        app.add_systems(Last, clear_look_input);
    }
}

/// Spawns a character body at `position` together with its visual root,
/// camera pivot and camera. Returns the body entity.
pub fn spawn_character(
    commands: &mut Commands,
    config: ControllerConfig,
    position: Vec3,
) -> Entity {
    let settings = *config.settings();
    let body = commands.spawn_empty().id();

    // Visual root carries yaw and trails the body
    let visual_root = commands
        .spawn((
            VisualRoot { body },
            Transform::from_translation(position),
            Visibility::default(),
        ))
        .id();

    let pitch_entity = commands
        .spawn((
            CameraPitch,
            PitchAngle::default(),
            CameraConfig::default(),
            Transform::from_translation(Vec3::new(0.0, settings.height / 2.0 - 0.1, 0.0)),
            Visibility::default(),
        ))
        .id();

    let camera_entity = commands
        .spawn((
            FpsCamera,
            Camera3d::default(),
            Projection::Perspective(PerspectiveProjection {
                fov: 90.0_f32.to_radians(),
                ..default()
            }),
            Transform::default(),
        ))
        .id();

    // Set up hierarchy: visual root -> pitch -> camera
    commands.entity(visual_root).add_child(pitch_entity);
    commands.entity(pitch_entity).add_child(camera_entity);

    let capsule_height = settings.height - settings.radius * 2.0;

    commands
        .entity(body)
        .insert((
            Player,
            Character { visual_root },
            config,
            MovementState::default(),
            GroundSample::default(),
            MovementForce::default(),
            QueryScratch::default(),
            LookInput::default(),
        ))
        .insert((
            GroundContactTracker::new(settings.slope_tolerance, []),
            GroundProbe::default(),
        ))
        .insert((
            // Forces only; gravity and collision response stay with Avian
            RigidBody::Dynamic,
            Collider::capsule(settings.radius, capsule_height),
            CollisionLayers::new(GameLayer::Character, [GameLayer::World]),
            CollisionEventsEnabled,
            LockedAxes::ROTATION_LOCKED,
            Restitution::new(0.0),
        ))
        .insert((Transform::from_translation(position), Visibility::default()))
        .insert(
            // Input bindings
            actions!(Player[
                (
                    Action::<MoveAction>::new(),
                    bindings![
                        (KeyCode::KeyW, SwizzleAxis::YXZ),
                        (KeyCode::KeyS, SwizzleAxis::YXZ, Negate::all()),
                        KeyCode::KeyD,
                        (KeyCode::KeyA, Negate::all()),
                    ],
                ),
                (
                    Action::<LookAction>::new(),
                    bindings![Binding::mouse_motion()],
                ),
                (
                    Action::<JumpAction>::new(),
                    bindings![KeyCode::Space, GamepadButton::South],
                ),
            ]),
        );

    info!("spawned character {body} at {position}");
    body
}
