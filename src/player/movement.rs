use avian3d::prelude::*;
use bevy::prelude::*;

use super::config::{ControllerConfig, GROUND_RAY_LIFT};
use super::contacts::{GroundContactTracker, GroundProbe};
use super::state::*;
use crate::physics::{AvianWorld, ColliderQuery, QueryScratch, sample_ground};

/// World-space move direction from 2D input and the character's yaw.
///
/// `input.y` drives forward, `input.x` drives right. The result keeps the
/// input's magnitude so analog input moves at partial speed.
pub fn world_input(input: Vec2, yaw: Quat) -> Vec3 {
    let forward = yaw * Vec3::NEG_Z;
    let right = yaw * Vec3::X;

    // Flatten to horizontal
    let forward = Vec3::new(forward.x, 0.0, forward.z).normalize_or_zero();
    let right = Vec3::new(right.x, 0.0, right.z).normalize_or_zero();

    forward * input.y + right * input.x
}

/// Proportional velocity controller force.
///
/// Uphill input on a walkable slope follows the slope; everything else
/// (flat ground, downhill, too steep) uses the horizontal input direction.
pub fn movement_force(
    config: &ControllerConfig,
    input: Vec3,
    ground_normal: Vec3,
    velocity: Vec3,
    grounded: bool,
    mass: f32,
) -> Vec3 {
    let magnitude = input.length();
    if magnitude <= f32::EPSILON {
        return Vec3::ZERO;
    }
    let settings = config.settings();

    let normal = ground_normal.normalize_or(Vec3::Y);
    let projected = input - normal * input.dot(normal);
    let walkable = normal.dot(Vec3::Y) >= config.max_slope_cos();

    let direction = if projected.y > 0.0 && walkable {
        projected.normalize_or_zero() * magnitude
    } else {
        input
    };

    // Gravity is left to the physics engine
    let horizontal = Vec3::new(velocity.x, 0.0, velocity.z);
    let target = direction * settings.max_speed;
    let force = (target - horizontal) * settings.acceleration * mass;

    if grounded {
        force
    } else {
        force * settings.air_speed_multiplier
    }
}

/// Consumes a queued jump if the character is grounded.
///
/// Airborne characters keep the request latched for a later tick.
pub fn consume_jump(
    config: &ControllerConfig,
    queued_jump: &mut bool,
    grounded: bool,
    mass: f32,
) -> Vec3 {
    if !*queued_jump || !grounded {
        return Vec3::ZERO;
    }
    *queued_jump = false;
    Vec3::Y * config.settings().jump_force * mass
}

/// Computes this tick's force and jump impulse for one character
pub fn integrate(
    config: &ControllerConfig,
    state: &mut MovementState,
    yaw: Quat,
    ground_normal: Vec3,
    grounded: bool,
    mass: f32,
) -> MovementForce {
    let input = world_input(state.input_direction, yaw);
    MovementForce {
        force: movement_force(
            config,
            input,
            ground_normal,
            state.current_velocity,
            grounded,
            mass,
        ),
        impulse: consume_jump(config, &mut state.queued_jump, grounded, mass),
    }
}

/// Keeps each tracker's slope tolerance in sync with its config
pub fn sync_slope_tolerance(
    mut query: Query<(&ControllerConfig, &mut GroundContactTracker), Changed<ControllerConfig>>,
) {
    for (config, mut tracker) in &mut query {
        tracker.set_slope_tolerance(config.settings().slope_tolerance);
    }
}

/// Updates grounded state from contacts (or the probe sphere) and samples the
/// ground beneath each character
pub fn update_grounded_state(
    mut commands: Commands,
    spatial_query: SpatialQuery,
    colliders: ColliderQuery,
    mut query: Query<(
        Entity,
        &Transform,
        &ControllerConfig,
        &GroundContactTracker,
        &GroundProbe,
        &LinearVelocity,
        &mut MovementState,
        &mut GroundSample,
        &mut QueryScratch,
        Has<Grounded>,
    )>,
) {
    for (
        entity,
        transform,
        config,
        tracker,
        probe,
        velocity,
        mut state,
        mut sample,
        mut scratch,
        was_grounded,
    ) in &mut query
    {
        let world = AvianWorld::new(&spatial_query, &colliders, entity);
        let foot = config.foot(transform.translation);

        let is_grounded = tracker.is_grounded() || probe.check(&world, foot);
        if is_grounded && !was_grounded {
            commands.entity(entity).insert(Grounded);
        } else if !is_grounded && was_grounded {
            commands.entity(entity).remove::<Grounded>();
        }

        sample.0 = sample_ground(
            &world,
            &mut scratch,
            foot,
            GROUND_RAY_LIFT,
            config.ground_ray_length(),
        );

        let horizontal = Vec3::new(velocity.x, 0.0, velocity.z);
        state.current_velocity = horizontal;
        state.current_speed = horizontal.length();
    }
}

/// Runs the movement integrator for every character
pub fn integrate_movement(
    mut query: Query<(
        &Character,
        &ControllerConfig,
        &mut MovementState,
        &GroundSample,
        &ComputedMass,
        &mut MovementForce,
        Has<Grounded>,
    )>,
    roots: Query<&Transform, With<VisualRoot>>,
) {
    for (character, config, mut state, sample, mass, mut output, grounded) in &mut query {
        let yaw = roots
            .get(character.visual_root)
            .map(|root| root.rotation)
            .unwrap_or(Quat::IDENTITY);

        *output = integrate(
            config,
            &mut state,
            yaw,
            sample.normal_or_up(),
            grounded,
            mass.value(),
        );
    }
}

/// Hands the integrated force and jump impulse to the physics engine
pub fn apply_movement_force(mut query: Query<(Forces, &mut MovementForce)>) {
    for (mut forces, mut output) in &mut query {
        if output.force != Vec3::ZERO {
            forces.apply_force(output.force);
        }
        if output.impulse != Vec3::ZERO {
            forces.apply_linear_impulse(output.impulse);
        }
        *output = MovementForce::default();
    }
}


#[cfg(test)]
mod grounding_tests {
    use std::time::Duration;

    use bevy::time::TimeUpdateStrategy;

    use super::*;
    use crate::physics::{GameLayer, PhysicsPlugin};
    use crate::player::contacts::{GroundTransition, GroundTransitionMessage, track_ground_contacts};

    #[derive(Resource, Default)]
    struct Transitions(Vec<GroundTransition>);

    fn record_transitions(
        mut reader: MessageReader<GroundTransitionMessage>,
        mut log: ResMut<Transitions>,
    ) {
        log.0.extend(reader.read().map(|message| message.transition));
    }

    fn physics_app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_plugins(bevy::transform::TransformPlugin);
        // Required by Avian's collider hierarchy plugin
        app.insert_resource(bevy::scene::SceneSpawner::default());
        // Read by Avian's collider systems; normally registered by AssetPlugin
        app.init_resource::<Assets<Mesh>>();
        app.add_message::<AssetEvent<Mesh>>();
        app.add_plugins(PhysicsPlugin::default());
        app.insert_resource(Time::<Fixed>::from_hz(60.0));
        app.insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f64(
            1.0 / 60.0,
        )));
        app.init_resource::<Transitions>();
        app.add_message::<GroundTransitionMessage>();
        app.add_systems(
            FixedUpdate,
            (track_ground_contacts, update_grounded_state, record_transitions).chain(),
        );
        app.finish();
        app.cleanup();
        app
    }

    fn spawn_floor(app: &mut App) -> Entity {
        app.world_mut()
            .spawn((
                Transform::from_xyz(0.0, -0.5, 0.0),
                RigidBody::Static,
                Collider::cuboid(20.0, 1.0, 20.0),
                CollisionLayers::new(GameLayer::World, [GameLayer::Character]),
            ))
            .id()
    }

    fn spawn_body(
        app: &mut App,
        height: f32,
        tracker: GroundContactTracker,
        probe: GroundProbe,
    ) -> Entity {
        let config = ControllerConfig::default();
        let settings = *config.settings();
        app.world_mut()
            .spawn((
                Transform::from_xyz(0.0, height, 0.0),
                RigidBody::Dynamic,
                Collider::capsule(settings.radius, settings.height - settings.radius * 2.0),
                CollisionLayers::new(GameLayer::Character, [GameLayer::World]),
                CollisionEventsEnabled,
                LockedAxes::ROTATION_LOCKED,
                Restitution::new(0.0),
            ))
            .insert((
                config,
                tracker,
                probe,
                MovementState::default(),
                GroundSample::default(),
                QueryScratch::default(),
            ))
            .id()
    }

    fn run_until(app: &mut App, max_updates: usize, done: impl Fn(&World) -> bool) -> bool {
        for _ in 0..max_updates {
            app.update();
            if done(app.world()) {
                return true;
            }
        }
        false
    }

    /// Sits inside the body, where only the body itself could be found
    fn blind_probe() -> GroundProbe {
        GroundProbe {
            radius: 0.05,
            offset: Vec3::Y * 0.9,
        }
    }

    #[test]
    fn landing_and_lifting_off_flip_grounded_once_each() {
        let mut app = physics_app();
        let floor = spawn_floor(&mut app);
        let body = spawn_body(&mut app, 1.2, GroundContactTracker::new(0.5, []), blind_probe());

        let landed = run_until(&mut app, 180, |world| world.get::<Grounded>(body).is_some());
        assert!(landed);
        for _ in 0..10 {
            app.update();
        }

        let tracker = app.world().get::<GroundContactTracker>(body).unwrap();
        assert!(tracker.is_touching(floor));
        assert!(app.world().get::<Grounded>(body).is_some());
        assert_eq!(
            app.world().resource::<Transitions>().0,
            vec![GroundTransition::Entered]
        );

        app.world_mut().entity_mut(body).insert((
            Transform::from_xyz(0.0, 5.0, 0.0),
            LinearVelocity::ZERO,
            GravityScale(0.0),
        ));

        let left = run_until(&mut app, 30, |world| world.get::<Grounded>(body).is_none());
        assert!(left);
        assert_eq!(
            app.world().resource::<Transitions>().0,
            vec![GroundTransition::Entered, GroundTransition::Exited]
        );
    }

    #[test]
    fn shape_probe_alone_grounds_the_character() {
        let mut app = physics_app();
        let floor = spawn_floor(&mut app);
        // Floor contacts never qualify, so only the probe can ground the body
        let body = spawn_body(
            &mut app,
            0.92,
            GroundContactTracker::new(0.5, [floor]),
            GroundProbe::default(),
        );
        app.world_mut().entity_mut(body).insert(GravityScale(0.0));

        let grounded = run_until(&mut app, 30, |world| world.get::<Grounded>(body).is_some());

        assert!(grounded);
        let tracker = app.world().get::<GroundContactTracker>(body).unwrap();
        assert!(!tracker.is_grounded());
        assert!(app.world().resource::<Transitions>().0.is_empty());
    }
}
