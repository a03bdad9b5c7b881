//! Fracture plugin and field housekeeping.

use crate::asteroid::Asteroid;
use crate::config::FractureConfig;
use crate::fracture::reconcile::reconcile_split_results_system;
use crate::fracture::worker::{
    poll_split_tasks_system, splitting_drift_system, SplitCompleted, SplitQueue,
};
use crate::impact::{
    asteroid_collision_system, asteroid_damage_system, AsteroidBrokenDown, AsteroidDamage,
    AsteroidImpacted, AsteroidSplit,
};
use crate::physics::{ease_in_system, zero_gravity_system};
use crate::score::{score_breakdown_system, PlayerScore};
use bevy::prelude::*;
use bevy_rapier3d::prelude::CollisionEvent;

/// Everything between "an asteroid was hit" and "its fragments are live".
///
/// Works without the Rapier plugin: collision events are registered here too,
/// so a headless app can drive the pipeline with [`AsteroidDamage`] alone.
pub struct FracturePlugin;

impl Plugin for FracturePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<FractureConfig>()
            .init_resource::<SplitQueue>()
            .init_resource::<PlayerScore>()
            .add_message::<CollisionEvent>()
            .add_message::<AsteroidDamage>()
            .add_message::<AsteroidImpacted>()
            .add_message::<AsteroidSplit>()
            .add_message::<AsteroidBrokenDown>()
            .add_message::<SplitCompleted>()
            .add_systems(Startup, zero_gravity_system)
            .add_systems(
                Update,
                (
                    culling_system, // FIRST: a culled parent turns its pending split stale
                    asteroid_collision_system,
                    asteroid_damage_system,
                    poll_split_tasks_system,
                    reconcile_split_results_system,
                    score_breakdown_system,
                    splitting_drift_system,
                    ease_in_system,
                )
                    .chain(),
            );
    }
}

/// Remove asteroids that have drifted out of play.
pub fn culling_system(
    mut commands: Commands,
    query: Query<(Entity, &Transform), With<Asteroid>>,
    config: Res<FractureConfig>,
) {
    let cull_sq = config.cull_distance * config.cull_distance;
    for (entity, transform) in query.iter() {
        if transform.translation.length_squared() > cull_sq {
            commands.entity(entity).despawn();
        }
    }
}
