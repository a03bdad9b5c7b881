//! Impacts, damage and the notifications the effects layer listens to.
//!
//! ## Flow
//!
//! 1. Weapons write [`AsteroidDamage`] directly; [`asteroid_collision_system`]
//!    turns fast asteroid-asteroid contacts into a pair of them.
//! 2. [`asteroid_damage_system`] applies the damage.  Survivors of a laser hit
//!    get bitten; asteroids at or below zero health either break down (too
//!    small to split) or have a split dispatched.
//! 3. [`AsteroidImpacted`], [`AsteroidSplit`] and [`AsteroidBrokenDown`] go
//!    out to whoever draws debris.  Nothing here depends on them being read.

use crate::asteroid::{
    Asteroid, AsteroidBehavior, AsteroidBody, AsteroidMesh, Health, MaterialValue, RecentImpact,
};
use crate::config::FractureConfig;
use crate::fracture::biter::bite_asteroid;
use crate::fracture::splitter::impact_direction;
use crate::fracture::task::SplitTask;
use crate::fracture::worker::{dispatch_split, SplitQueue};
use crate::mesh::sampler::SurfaceSampler;
use crate::mesh::TriMesh;
use crate::physics::refresh_collider;
use bevy::prelude::*;
use bevy_rapier3d::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImpactCause {
    Laser,
    AsteroidCollision,
}

/// A single hit, in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpactRecord {
    pub point: Vec3,
    /// Velocity of whatever hit the asteroid, relative to it.
    pub velocity: Vec3,
    /// Outward surface normal at `point`, when known.
    pub normal: Option<Vec3>,
    pub cause: ImpactCause,
}

// ── Messages ──────────────────────────────────────────────────────────────────

/// Request to damage an asteroid.
#[derive(Message, Debug, Clone, Copy)]
pub struct AsteroidDamage {
    pub asteroid: Entity,
    pub impact: ImpactRecord,
    pub amount: f32,
}

/// Damage was applied.
#[derive(Message, Debug, Clone, Copy)]
pub struct AsteroidImpacted {
    pub asteroid: Entity,
    pub impact: ImpactRecord,
    pub health: f32,
}

/// A split result was reconciled: `parent` is gone and `fragments` are live.
/// Fragments that exploded or were discarded are not listed.
#[derive(Message, Debug, Clone)]
pub struct AsteroidSplit {
    pub parent: Entity,
    pub fragments: Vec<Entity>,
    pub impact: Option<ImpactRecord>,
}

/// An asteroid (or a fragment too small to live) was destroyed outright.
#[derive(Message, Debug, Clone)]
pub struct AsteroidBrokenDown {
    pub position: Vec3,
    pub velocity: Vec3,
    /// World-space points on the destroyed surface, for seeding debris.
    pub debris_points: Vec<Vec3>,
    pub material_value: f32,
    pub impact: Option<ImpactRecord>,
}

impl AsteroidBrokenDown {
    /// Breakdown of `mesh` posed by `transform`, with debris points sampled
    /// uniformly over its surface.
    pub fn from_mesh(
        mesh: &TriMesh,
        transform: &Transform,
        velocity: Vec3,
        material_value: f32,
        impact: Option<ImpactRecord>,
        config: &FractureConfig,
        rng: &mut impl Rng,
    ) -> Self {
        let debris_points = SurfaceSampler::new(mesh)
            .map(|sampler| {
                sampler
                    .sample(config.debris_sample_count, rng)
                    .into_iter()
                    .map(|p| transform.transform_point(p))
                    .collect()
            })
            .unwrap_or_default();
        Self {
            position: transform.translation,
            velocity,
            debris_points,
            material_value,
            impact,
        }
    }
}

// ── Systems ───────────────────────────────────────────────────────────────────

/// Turn fast contacts between two drifting asteroids into damage.
///
/// Each side takes `relative speed × collision_damage_factor`.  The contact
/// point is approximated by the midpoint between the two centers.
pub fn asteroid_collision_system(
    mut collision_events: MessageReader<CollisionEvent>,
    q_asteroids: Query<(&Transform, &Velocity, &AsteroidBehavior), With<Asteroid>>,
    config: Res<FractureConfig>,
    mut damage: MessageWriter<AsteroidDamage>,
) {
    for event in collision_events.read() {
        let (e1, e2) = match event {
            CollisionEvent::Started(e1, e2, _) => (*e1, *e2),
            CollisionEvent::Stopped(..) => continue,
        };

        let (Ok((t1, v1, b1)), Ok((t2, v2, b2))) = (q_asteroids.get(e1), q_asteroids.get(e2)) else {
            continue;
        };
        if b1.is_splitting() || b2.is_splitting() {
            continue;
        }

        let speed = (v1.linvel - v2.linvel).length();
        if speed < config.collision_speed_threshold {
            continue;
        }
        let amount = speed * config.collision_damage_factor;
        let (p1, p2) = (t1.translation, t2.translation);
        let point = (p1 + p2) * 0.5;

        for (target, velocity, normal) in [
            (e1, v2.linvel - v1.linvel, (p2 - p1).try_normalize()),
            (e2, v1.linvel - v2.linvel, (p1 - p2).try_normalize()),
        ] {
            damage.write(AsteroidDamage {
                asteroid: target,
                impact: ImpactRecord {
                    point,
                    velocity,
                    normal,
                    cause: ImpactCause::AsteroidCollision,
                },
                amount,
            });
        }
    }
}

/// Apply queued damage.
///
/// Damage to an asteroid that is already splitting is ignored, and an
/// asteroid retired earlier in the same batch is not touched again.
#[allow(clippy::too_many_arguments)]
pub fn asteroid_damage_system(
    mut commands: Commands,
    mut damage_events: MessageReader<AsteroidDamage>,
    mut q_asteroids: Query<
        (
            &Transform,
            &Velocity,
            &mut AsteroidMesh,
            &mut AsteroidBody,
            &mut Health,
            &mut RecentImpact,
            &AsteroidBehavior,
            &mut MaterialValue,
        ),
        With<Asteroid>,
    >,
    mut queue: ResMut<SplitQueue>,
    config: Res<FractureConfig>,
    time: Res<Time>,
    mut impacted: MessageWriter<AsteroidImpacted>,
    mut broken_down: MessageWriter<AsteroidBrokenDown>,
) {
    let mut rng = rand::thread_rng();
    let mut retired: HashSet<Entity> = HashSet::new();

    for event in damage_events.read() {
        let entity = event.asteroid;
        if retired.contains(&entity) {
            continue;
        }
        let Ok((transform, velocity, mut mesh, mut body, mut health, mut recent, behavior, mut material)) =
            q_asteroids.get_mut(entity)
        else {
            continue;
        };
        if behavior.is_splitting() {
            continue;
        }

        recent.0 = Some(event.impact);
        health.0 -= event.amount;
        impacted.write(AsteroidImpacted {
            asteroid: entity,
            impact: event.impact,
            health: health.0,
        });

        if health.0 > 0.0 {
            if event.impact.cause == ImpactCause::Laser && body.volume >= config.bite_min_volume {
                let to_local = transform.rotation.inverse();
                let point = to_local * (event.impact.point - transform.translation);
                let direction = to_local * impact_direction(&event.impact, transform.translation);
                match bite_asteroid(&mesh.0, point, direction, &config, &mut rng) {
                    Ok(bitten) => {
                        *body = AsteroidBody::from_mesh(&bitten);
                        material.0 = body.volume * config.material_per_volume;
                        refresh_collider(&mut commands, entity, &bitten, body.mass(&config));
                        mesh.0 = bitten;
                    }
                    Err(e) => debug!("Bite on {entity} skipped: {e}"),
                }
            }
            continue;
        }

        retired.insert(entity);
        if body.volume < config.explosion_volume_threshold {
            broken_down.write(AsteroidBrokenDown::from_mesh(
                &mesh.0,
                transform,
                velocity.linvel,
                material.0,
                Some(event.impact),
                &config,
                &mut rng,
            ));
            commands.entity(entity).despawn();
        } else {
            let task = SplitTask::new(
                entity,
                transform,
                velocity.angvel,
                body.diameter,
                &mesh.0,
                &event.impact,
                rng.gen(),
            );
            dispatch_split(&mut commands, &mut queue, entity, task, time.elapsed_secs(), &config);
        }
    }
}
