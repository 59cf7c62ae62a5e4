use avian3d::prelude::*;
use bevy::{
    prelude::*,
    window::{CursorGrabMode, CursorOptions, PrimaryWindow},
};
use bevy_stepper::prelude::*;

fn main() {
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Step Climbing Controller".into(),
                ..default()
            }),
            ..default()
        }))
        .add_plugins(BevyStepperPlugin)
        .add_systems(Startup, (setup, setup_cursor_grab))
        .add_systems(Update, (toggle_cursor_grab, log_steps))
        .run();
}

fn setup(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    spawn_character(
        &mut commands,
        ControllerConfig::default(),
        Vec3::new(0.0, 1.5, 6.0),
    );

    let ground = materials.add(StandardMaterial {
        base_color: Color::srgb(0.35, 0.55, 0.35),
        perceptual_roughness: 0.9,
        ..default()
    });
    let stone = materials.add(StandardMaterial {
        base_color: Color::srgb(0.45, 0.43, 0.44),
        perceptual_roughness: 0.85,
        ..default()
    });

    commands.spawn((
        Mesh3d(meshes.add(Plane3d::default().mesh().size(100.0, 100.0))),
        MeshMaterial3d(ground),
        Transform::default(),
        RigidBody::Static,
        Collider::half_space(Vec3::Y),
        CollisionLayers::new(GameLayer::World, [GameLayer::Character]),
    ));

    // Staircases with rising riser heights; the last one is taller than the step height
    for (i, riser) in [0.15, 0.3, 0.5, 0.8].into_iter().enumerate() {
        let x = -6.0 + i as f32 * 4.0;
        for stair in 0..5 {
            let top = riser * (stair + 1) as f32;
            spawn_box(
                &mut commands,
                &mut meshes,
                stone.clone(),
                Vec3::new(2.5, top, 0.6),
                Vec3::new(x, top / 2.0, -2.0 - stair as f32 * 0.6),
            );
        }
    }

    // Walkable and steep ramps
    for (i, degrees) in [20.0_f32, 35.0, 55.0].into_iter().enumerate() {
        let angle = degrees.to_radians();
        commands.spawn((
            Mesh3d(meshes.add(Cuboid::new(3.0, 0.2, 8.0))),
            MeshMaterial3d(stone.clone()),
            Transform::from_xyz(12.0 + i as f32 * 4.0, 8.0 * angle.sin() / 2.0, -4.0)
                .with_rotation(Quat::from_rotation_x(angle)),
            RigidBody::Static,
            Collider::cuboid(3.0, 0.2, 8.0),
            CollisionLayers::new(GameLayer::World, [GameLayer::Character]),
        ));
    }

    commands.spawn((
        DirectionalLight {
            illuminance: 8000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_rotation(Quat::from_euler(EulerRot::XYZ, -0.7, 0.5, 0.0)),
    ));
}

fn spawn_box(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    material: Handle<StandardMaterial>,
    size: Vec3,
    position: Vec3,
) {
    commands.spawn((
        Mesh3d(meshes.add(Cuboid::new(size.x, size.y, size.z))),
        MeshMaterial3d(material),
        Transform::from_translation(position),
        RigidBody::Static,
        Collider::cuboid(size.x, size.y, size.z),
        CollisionLayers::new(GameLayer::World, [GameLayer::Character]),
    ));
}

fn log_steps(mut steps: MessageReader<SteppedUp>) {
    for step in steps.read() {
        info!("stepped up {:.2}m", step.height);
    }
}

fn setup_cursor_grab(mut cursor_query: Query<&mut CursorOptions, With<PrimaryWindow>>) {
    if let Ok(mut cursor) = cursor_query.single_mut() {
        cursor.grab_mode = CursorGrabMode::Locked;
        cursor.visible = false;
    }
}

fn toggle_cursor_grab(
    keyboard: Res<ButtonInput<KeyCode>>,
    mouse: Res<ButtonInput<MouseButton>>,
    mut cursor_query: Query<&mut CursorOptions, With<PrimaryWindow>>,
) {
    let Ok(mut cursor) = cursor_query.single_mut() else {
        return;
    };

    if keyboard.just_pressed(KeyCode::Escape) {
        cursor.grab_mode = CursorGrabMode::None;
        cursor.visible = true;
    } else if mouse.just_pressed(MouseButton::Left) && cursor.grab_mode == CursorGrabMode::None {
        cursor.grab_mode = CursorGrabMode::Locked;
        cursor.visible = false;
    }
}
