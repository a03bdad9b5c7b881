use bevy::prelude::*;
use bevy::window::WindowResolution;
use bevy_rapier3d::prelude::*;
use shatterfield::asteroid::{spawn_initial_field, Asteroid, AsteroidBody, AsteroidBehavior};
use shatterfield::asteroid_rendering::AsteroidRenderingPlugin;
use shatterfield::config::{load_fracture_config, FractureConfig};
use shatterfield::graphics::setup_camera;
use shatterfield::impact::{AsteroidDamage, ImpactCause, ImpactRecord};
use shatterfield::simulation::FracturePlugin;

/// Debug laser: Space fires from the view center at the nearest asteroid.
fn debug_laser_system(
    keys: Res<ButtonInput<KeyCode>>,
    q_asteroids: Query<(Entity, &Transform, &AsteroidBody, &AsteroidBehavior), With<Asteroid>>,
    config: Res<FractureConfig>,
    mut damage: MessageWriter<AsteroidDamage>,
) {
    if !keys.just_pressed(KeyCode::Space) {
        return;
    }
    let Some((entity, transform, body, _)) = q_asteroids
        .iter()
        .filter(|(_, _, _, behavior)| !behavior.is_splitting())
        .min_by(|a, b| {
            a.1.translation
                .length_squared()
                .total_cmp(&b.1.translation.length_squared())
        })
    else {
        return;
    };

    let direction = transform.translation.try_normalize().unwrap_or(Vec3::X);
    damage.write(AsteroidDamage {
        asteroid: entity,
        impact: ImpactRecord {
            point: transform.translation - direction * body.diameter * 0.5,
            velocity: direction * config.laser_speed,
            normal: Some(-direction),
            cause: ImpactCause::Laser,
        },
        amount: config.laser_damage,
    });
}

fn main() {
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Shatterfield".into(),
                resolution: WindowResolution::new(1280, 720),
                ..Default::default()
            }),
            ..Default::default()
        }))
        .insert_resource(ClearColor(Color::BLACK))
        // Compiled defaults; load_fracture_config overwrites them from
        // assets/fracture.toml (if present) in the Startup schedule.
        .insert_resource(FractureConfig::default())
        .add_plugins(RapierPhysicsPlugin::<NoUserData>::default())
        .add_plugins((FracturePlugin, AsteroidRenderingPlugin))
        .add_systems(
            Startup,
            (
                // Load config first so every other startup system sees the final values.
                load_fracture_config,
                setup_camera.after(load_fracture_config),
                spawn_initial_field.after(load_fracture_config),
            ),
        )
        // Fire before the damage system reads this frame's messages.
        .add_systems(PreUpdate, debug_laser_system)
        .run();
}
