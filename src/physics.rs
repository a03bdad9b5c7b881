//! Thin layer over Rapier for the pieces the fracture pipeline needs.
//!
//! ## Collision groups
//!
//! | Layer       | Group   | Collides with |
//! |-------------|---------|---------------|
//! | Asteroid    | GROUP_1 | GROUP_1, GROUP_2, GROUP_3 |
//! | Player      | GROUP_2 | (owned by the ship) |
//! | Projectile  | GROUP_3 | (owned by the weapons) |
//!
//! A fresh fragment starts with [`easing_groups`], which drops GROUP_1 from
//! its filter so it cannot collide with its sibling in the first frames, and
//! [`ease_in_system`] restores [`asteroid_groups`] once its timer runs out.

use crate::mesh::TriMesh;
use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

pub const ASTEROID_GROUP: Group = Group::GROUP_1;
pub const PLAYER_GROUP: Group = Group::GROUP_2;
pub const PROJECTILE_GROUP: Group = Group::GROUP_3;

/// Full asteroid filter: other asteroids, the player and projectiles.
pub fn asteroid_groups() -> CollisionGroups {
    CollisionGroups::new(ASTEROID_GROUP, ASTEROID_GROUP | PLAYER_GROUP | PROJECTILE_GROUP)
}

/// Filter used during ease-in: still hittable, but passes through asteroids.
pub fn easing_groups() -> CollisionGroups {
    CollisionGroups::new(ASTEROID_GROUP, PLAYER_GROUP | PROJECTILE_GROUP)
}

/// Collision-free window for a newly spawned fragment.
#[derive(Component, Debug, Clone)]
pub struct PhysicsEaseIn {
    pub timer: Timer,
}

impl PhysicsEaseIn {
    pub fn new(secs: f32) -> Self {
        Self {
            timer: Timer::from_seconds(secs, TimerMode::Once),
        }
    }
}

/// Convex hull of the mesh, or a ball of its bounding radius when the hull
/// cannot be built (flat or tiny meshes).
pub fn collider_for_mesh(mesh: &TriMesh) -> Collider {
    Collider::convex_hull(mesh.positions()).unwrap_or_else(|| {
        let radius = (mesh.bounding_diameter() * 0.5).max(0.01);
        warn!(
            "convex hull failed for {} vertices; using ball collider r={radius:.3}",
            mesh.vertex_count()
        );
        Collider::ball(radius)
    })
}

/// Detach an entity from the physics world without removing its components.
pub fn disable_physics(commands: &mut Commands, entity: Entity) {
    commands
        .entity(entity)
        .insert((RigidBodyDisabled, ColliderDisabled));
}

/// (Re)attach a dynamic body built from `mesh`.
pub fn attach_physics(
    commands: &mut Commands,
    entity: Entity,
    mesh: &TriMesh,
    mass: f32,
    groups: CollisionGroups,
) {
    commands
        .entity(entity)
        .remove::<(RigidBodyDisabled, ColliderDisabled)>()
        .insert((RigidBody::Dynamic, groups, ActiveEvents::COLLISION_EVENTS));
    refresh_collider(commands, entity, mesh, mass);
}

/// Replace only the collider and mass, leaving groups and body state alone.
pub fn refresh_collider(commands: &mut Commands, entity: Entity, mesh: &TriMesh, mass: f32) {
    commands
        .entity(entity)
        .insert((collider_for_mesh(mesh), ColliderMassProperties::Mass(mass)));
}

/// Restore full asteroid collisions once a fragment's ease-in expires.
pub fn ease_in_system(
    mut commands: Commands,
    time: Res<Time>,
    mut query: Query<(Entity, &mut PhysicsEaseIn, &mut CollisionGroups)>,
) {
    for (entity, mut ease, mut groups) in query.iter_mut() {
        ease.timer.tick(time.delta());
        if ease.timer.is_finished() {
            *groups = asteroid_groups();
            commands.entity(entity).remove::<PhysicsEaseIn>();
        }
    }
}

/// Space has no down.
pub fn zero_gravity_system(mut config: Query<&mut RapierConfiguration>) {
    for mut cfg in config.iter_mut() {
        cfg.gravity = Vec3::ZERO;
    }
}
