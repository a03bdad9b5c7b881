//! Main-thread half of a split: turning a [`SplitResult`] into live
//! asteroids.
//!
//! [`plan_fragments`] is pure.  It decides pose, velocity, health and outcome
//! for each fragment from the parent's state *now*, so the parent's motion
//! while the task ran is accounted for.  The random spin axis comes from an
//! RNG seeded by the result, which makes reconciling two independent results
//! commute.
//!
//! | Outcome   | When                                   | Effect |
//! |-----------|----------------------------------------|--------|
//! | `Live`    | volume ≥ `explosion_volume_threshold`  | spawned with ease-in; split again at once if health ≤ 0 |
//! | `Explode` | 0 < volume < threshold                 | `AsteroidBrokenDown`, never spawned |
//! | `Discard` | undecodable, empty or zero volume      | dropped, logged at debug |

use super::task::SplitResult;
use super::task::SplitTask;
use super::worker::{dispatch_split, SplitCompleted, SplitQueue};
use crate::asteroid::{
    spawn_asteroid, Asteroid, AsteroidBehavior, AsteroidMesh, AsteroidSpawn, Health, MaterialValue,
    RecentImpact,
};
use crate::config::FractureConfig;
use crate::error::FractureError;
use crate::impact::{AsteroidBrokenDown, AsteroidSplit, ImpactCause, ImpactRecord};
use crate::mesh::TriMesh;
use crate::physics::{easing_groups, PhysicsEaseIn};
use bevy::prelude::*;
use bevy_rapier3d::prelude::Velocity;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;

/// Parent state sampled when the result arrives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParentState {
    pub position: Vec3,
    pub linvel: Vec3,
    /// World frame.
    pub angvel: Vec3,
    pub health: f32,
    pub dispatched_at: f32,
    pub impact: Option<ImpactRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FragmentOutcome {
    Live { health: f32 },
    Explode,
    Discard(FractureError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FragmentPlan {
    /// Slot in the result: 0 is the far fragment, 1 the near one.
    pub index: usize,
    /// Local-space mesh, centred on the fragment's bounding-box center.
    pub mesh: TriMesh,
    pub transform: Transform,
    pub linvel: Vec3,
    pub angvel: Vec3,
    pub volume: f32,
    pub outcome: FragmentOutcome,
}

fn random_unit_vector(rng: &mut impl Rng) -> Vec3 {
    let z: f32 = rng.gen_range(-1.0..=1.0);
    let phi: f32 = rng.gen_range(0.0..TAU);
    let r = (1.0 - z * z).max(0.0).sqrt();
    Vec3::new(r * phi.cos(), r * phi.sin(), z)
}

/// Plan both fragments of `result`.
///
/// Fragment 0 is pushed to `+perp`, fragment 1 to `-perp`, where `perp`
/// lies in the play plane at right angles to the impact direction.
pub fn plan_fragments(
    parent: &ParentState,
    result: &SplitResult,
    now: f32,
    config: &FractureConfig,
) -> Vec<FragmentPlan> {
    let age = (now - parent.dispatched_at).max(0.0);
    let accumulated = Quat::from_scaled_axis(parent.angvel * age);
    let direction = result.impact_direction();
    let perp = direction
        .cross(Vec3::Z)
        .try_normalize()
        .unwrap_or_else(|| direction.any_orthonormal_vector());
    let impact_velocity = parent.impact.map_or(Vec3::ZERO, |i| i.velocity);
    let overkill = parent.health.min(0.0) * config.overkill_carry;
    let mut rng = StdRng::seed_from_u64(result.seed);

    result
        .fragments
        .iter()
        .enumerate()
        .map(|(index, payload)| {
            let side = if index == 0 { 1.0 } else { -1.0 };
            // Z is locked for every body, so the offset is taken in the play plane.
            let offset = (accumulated * payload.offset()).with_z(0.0);
            let transform = Transform::from_translation(parent.position + offset).with_rotation(accumulated);
            let linvel = parent.linvel * config.fragment_parent_velocity_weight
                + perp * (side * config.fragment_repel_weight)
                + impact_velocity * config.fragment_impact_weight;
            // Drawn for every slot so fragment 1's axis does not depend on
            // whether fragment 0 decoded.
            let spin_axis = random_unit_vector(&mut rng);
            let angvel = parent.angvel * config.fragment_parent_spin_weight
                + spin_axis * config.fragment_random_spin
                + direction * (side * config.fragment_outward_spin);

            let mesh = match payload.mesh() {
                Ok(flat) => flat.to_trimesh(),
                Err(e) => {
                    return FragmentPlan {
                        index,
                        mesh: TriMesh::default(),
                        transform,
                        linvel,
                        angvel,
                        volume: 0.0,
                        outcome: FragmentOutcome::Discard(e),
                    }
                }
            };
            let volume = mesh.signed_volume();
            let outcome = if mesh.is_empty() || volume <= 0.0 {
                FragmentOutcome::Discard(FractureError::DegenerateFragment {
                    index,
                    triangles: mesh.triangle_count(),
                    volume,
                })
            } else if volume < config.explosion_volume_threshold {
                FragmentOutcome::Explode
            } else {
                FragmentOutcome::Live {
                    health: volume * config.health_per_volume + overkill,
                }
            };

            FragmentPlan {
                index,
                mesh,
                transform,
                linvel,
                angvel,
                volume,
                outcome,
            }
        })
        .collect()
}

/// Apply finished splits to the world.
///
/// A result whose parent is gone (or no longer splitting) is dropped.  A
/// failed task breaks the parent down so it is not left detached forever.
#[allow(clippy::too_many_arguments)]
pub fn reconcile_split_results_system(
    mut commands: Commands,
    mut completed: MessageReader<SplitCompleted>,
    q_parents: Query<
        (
            &Transform,
            &Velocity,
            &Health,
            &RecentImpact,
            &AsteroidBehavior,
            &AsteroidMesh,
            &MaterialValue,
        ),
        With<Asteroid>,
    >,
    mut queue: ResMut<SplitQueue>,
    config: Res<FractureConfig>,
    time: Res<Time>,
    mut split_events: MessageWriter<AsteroidSplit>,
    mut broken_down: MessageWriter<AsteroidBrokenDown>,
) {
    let now = time.elapsed_secs();
    let mut rng = rand::thread_rng();

    for done in completed.read() {
        let Ok((transform, velocity, health, recent, behavior, mesh, material)) = q_parents.get(done.parent)
        else {
            debug!("Discarding split result for {}: asteroid is gone", done.parent);
            continue;
        };
        let AsteroidBehavior::Splitting { dispatched_at } = *behavior else {
            debug!("Discarding split result for {}: not splitting", done.parent);
            continue;
        };

        let result = match &done.result {
            Ok(result) => result,
            Err(e) => {
                debug!("Split of {} failed ({e}); breaking it down", done.parent);
                broken_down.write(AsteroidBrokenDown::from_mesh(
                    &mesh.0,
                    transform,
                    velocity.linvel,
                    material.0,
                    recent.0,
                    &config,
                    &mut rng,
                ));
                commands.entity(done.parent).despawn();
                continue;
            }
        };

        let parent = ParentState {
            position: transform.translation,
            linvel: velocity.linvel,
            angvel: velocity.angvel,
            health: health.0,
            dispatched_at,
            impact: recent.0,
        };
        let mut fragments = Vec::with_capacity(2);

        for plan in plan_fragments(&parent, result, now, &config) {
            match plan.outcome {
                FragmentOutcome::Live { health } => {
                    let spawn = AsteroidSpawn::new(plan.mesh.clone(), plan.transform)
                        .with_velocity(plan.linvel, plan.angvel)
                        .with_health(health)
                        .with_impact(parent.impact);
                    let entity = spawn_asteroid(&mut commands, spawn, &config);
                    commands
                        .entity(entity)
                        .insert((PhysicsEaseIn::new(config.ease_in_secs), easing_groups()));

                    if health <= 0.0 {
                        let impact = parent.impact.unwrap_or(ImpactRecord {
                            point: plan.transform.translation,
                            velocity: result.impact_direction(),
                            normal: None,
                            cause: ImpactCause::AsteroidCollision,
                        });
                        let task = SplitTask::new(
                            entity,
                            &plan.transform,
                            plan.angvel,
                            plan.mesh.bounding_diameter(),
                            &plan.mesh,
                            &impact,
                            result.seed.wrapping_add(plan.index as u64 + 1),
                        );
                        dispatch_split(&mut commands, &mut queue, entity, task, now, &config);
                    }
                    fragments.push(entity);
                }
                FragmentOutcome::Explode => {
                    broken_down.write(AsteroidBrokenDown::from_mesh(
                        &plan.mesh,
                        &plan.transform,
                        plan.linvel,
                        plan.volume * config.material_per_volume,
                        parent.impact,
                        &config,
                        &mut rng,
                    ));
                }
                FragmentOutcome::Discard(e) => {
                    debug!("Dropping fragment {} of {}: {e}", plan.index, done.parent);
                }
            }
        }

        info!(
            "Split {} into {} live fragment(s)",
            done.parent,
            fragments.len()
        );
        split_events.write(AsteroidSplit {
            parent: done.parent,
            fragments,
            impact: parent.impact,
        });
        commands.entity(done.parent).despawn();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fracture::task::FragmentPayload;
    use crate::mesh::primitives::{box_mesh, icosphere};

    fn result_with(fragments: [FragmentPayload; 2]) -> SplitResult {
        SplitResult {
            asteroid_id: 0,
            fragments,
            impact_direction: [1.0, 0.0, 0.0],
            impact_rotation: 0.0,
            seed: 9,
        }
    }

    fn big_fragment(offset: Vec3) -> FragmentPayload {
        FragmentPayload::from_mesh(offset, &box_mesh(Vec3::splat(2.0)).to_flat_mesh())
    }

    fn parent_at(position: Vec3) -> ParentState {
        ParentState {
            position,
            linvel: Vec3::new(2.0, 0.0, 0.0),
            angvel: Vec3::ZERO,
            health: 0.0,
            dispatched_at: 0.0,
            impact: None,
        }
    }

    #[test]
    fn fragments_inherit_and_separate() {
        let result = result_with([big_fragment(Vec3::X), big_fragment(-Vec3::X)]);
        let config = FractureConfig::default();
        let plans = plan_fragments(&parent_at(Vec3::new(5.0, 5.0, 0.0)), &result, 1.0, &config);

        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].transform.translation, Vec3::new(6.0, 5.0, 0.0));
        assert_eq!(plans[1].transform.translation, Vec3::new(4.0, 5.0, 0.0));
        // Impact along +X: the repel push is along -Y for fragment 0.
        let repel = plans[0].linvel - plans[1].linvel;
        assert!(repel.x.abs() < 1e-6);
        assert!((repel.y + 2.0 * config.fragment_repel_weight).abs() < 1e-6);
        assert!((plans[0].linvel.x - 2.0 * config.fragment_parent_velocity_weight).abs() < 1e-6);
        for plan in &plans {
            assert_eq!(
                plan.outcome,
                FragmentOutcome::Live {
                    health: 64.0 * config.health_per_volume
                }
            );
        }
    }

    #[test]
    fn offsets_follow_the_parent_spin_during_the_task() {
        let result = result_with([big_fragment(Vec3::X), big_fragment(-Vec3::X)]);
        let mut parent = parent_at(Vec3::ZERO);
        parent.angvel = Vec3::Z * std::f32::consts::FRAC_PI_2;
        parent.dispatched_at = 2.0;
        // One second at a quarter turn per second.
        let plans = plan_fragments(&parent, &result, 3.0, &FractureConfig::default());

        assert!(plans[0].transform.translation.distance(Vec3::Y) < 1e-5);
        assert!(plans[1].transform.translation.distance(-Vec3::Y) < 1e-5);
        assert!((plans[0].transform.rotation * Vec3::X).distance(Vec3::Y) < 1e-5);
    }

    #[test]
    fn overkill_carries_into_the_fragments() {
        let result = result_with([big_fragment(Vec3::X), big_fragment(-Vec3::X)]);
        let config = FractureConfig::default();
        let mut parent = parent_at(Vec3::ZERO);
        parent.health = -100.0;
        let plans = plan_fragments(&parent, &result, 0.0, &config);
        let expected = 64.0 * config.health_per_volume - 100.0 * config.overkill_carry;
        assert_eq!(plans[0].outcome, FragmentOutcome::Live { health: expected });
    }

    #[test]
    fn small_fragments_explode_and_empty_ones_are_dropped() {
        let small = FragmentPayload::from_mesh(Vec3::X, &icosphere(0.5, 1).to_flat_mesh());
        let result = result_with([small, FragmentPayload::default()]);
        let plans = plan_fragments(&parent_at(Vec3::ZERO), &result, 0.0, &FractureConfig::default());

        assert_eq!(plans[0].outcome, FragmentOutcome::Explode);
        assert!(matches!(
            plans[1].outcome,
            FragmentOutcome::Discard(FractureError::DegenerateFragment {
                index: 1,
                triangles: 0,
                ..
            })
        ));
    }

    #[test]
    fn inside_out_fragment_is_dropped() {
        let mut flat = box_mesh(Vec3::splat(2.0)).to_flat_mesh();
        for tri in flat.positions.chunks_exact_mut(3) {
            tri.swap(1, 2);
        }
        let result = result_with([big_fragment(Vec3::X), FragmentPayload::from_mesh(Vec3::ZERO, &flat)]);
        let plans = plan_fragments(&parent_at(Vec3::ZERO), &result, 0.0, &FractureConfig::default());
        assert!(matches!(plans[1].outcome, FragmentOutcome::Discard(_)));
    }

    #[test]
    fn planning_is_deterministic() {
        let result = result_with([big_fragment(Vec3::X), big_fragment(-Vec3::X)]);
        let config = FractureConfig::default();
        let parent = parent_at(Vec3::ONE);
        let a = plan_fragments(&parent, &result, 0.5, &config);
        let b = plan_fragments(&parent, &result, 0.5, &config);
        assert_eq!(a, b);
        assert_ne!(a[0].angvel, a[1].angvel);
    }

    #[test]
    fn fragments_stay_in_the_parent_play_plane() {
        let result = result_with([
            big_fragment(Vec3::new(1.0, 0.0, 0.7)),
            big_fragment(Vec3::new(-1.0, 0.0, -0.4)),
        ]);
        let mut parent = parent_at(Vec3::new(3.0, -2.0, 0.0));
        parent.angvel = Vec3::new(0.8, 0.3, 0.5);
        let plans = plan_fragments(&parent, &result, 1.0, &FractureConfig::default());
        for plan in &plans {
            assert_eq!(plan.transform.translation.z, 0.0);
        }
        assert!(plans[0].transform.translation.x > plans[1].transform.translation.x);
    }
}
