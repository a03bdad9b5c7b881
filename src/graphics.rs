use bevy::prelude::*;

/// Height of the camera above the XY play plane.
const CAMERA_HEIGHT: f32 = 90.0;

/// Top-down perspective camera over the play plane, plus a key light.
pub fn setup_camera(mut commands: Commands) {
    commands.spawn((
        Camera3d::default(),
        Transform::from_xyz(0.0, 0.0, CAMERA_HEIGHT).looking_at(Vec3::ZERO, Vec3::Y),
    ));
    commands.spawn((
        DirectionalLight {
            illuminance: 8_000.0,
            shadows_enabled: false,
            ..Default::default()
        },
        Transform::from_xyz(30.0, 40.0, 60.0).looking_at(Vec3::ZERO, Vec3::Z),
    ));
    info!("Camera spawned");
}
