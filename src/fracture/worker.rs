//! Off-thread split execution.
//!
//! Split tasks run on Bevy's [`AsyncComputeTaskPool`].  Only the plain-data
//! [`SplitTask`] goes in and only a [`SplitResult`] comes out; the live world
//! is never shared with the pool.  Tasks are never cancelled: a result whose
//! parent has since disappeared is dropped by the reconciler.

use super::splitter::split_asteroid;
use super::task::{SplitResult, SplitTask};
use crate::asteroid::AsteroidBehavior;
use crate::config::FractureConfig;
use crate::error::FractureResult;
use crate::physics::disable_physics;
use bevy::prelude::*;
use bevy::tasks::{block_on, futures_lite::future, AsyncComputeTaskPool, Task};
use bevy_rapier3d::prelude::Velocity;

struct PendingSplit {
    parent: Entity,
    dispatched_at: f32,
    task: Task<FractureResult<SplitResult>>,
}

/// In-flight split tasks.
#[derive(Resource, Default)]
pub struct SplitQueue {
    pending: Vec<PendingSplit>,
}

impl SplitQueue {
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn is_pending(&self, parent: Entity) -> bool {
        self.pending.iter().any(|p| p.parent == parent)
    }
}

/// A split task finished.  `result` is `Err` only for malformed payloads or
/// empty operands.
#[derive(Message, Debug, Clone)]
pub struct SplitCompleted {
    pub parent: Entity,
    pub dispatched_at: f32,
    pub result: FractureResult<SplitResult>,
}

/// Flag `parent` as splitting, detach its physics and start the task.
pub fn dispatch_split(
    commands: &mut Commands,
    queue: &mut SplitQueue,
    parent: Entity,
    task: SplitTask,
    now: f32,
    config: &FractureConfig,
) {
    disable_physics(commands, parent);
    commands
        .entity(parent)
        .insert(AsteroidBehavior::Splitting { dispatched_at: now });

    info!(
        "Dispatching split of {parent} ({} triangles, seed {})",
        task.positions.len() / 9,
        task.seed
    );
    let config = config.clone();
    let handle = AsyncComputeTaskPool::get().spawn(async move { split_asteroid(&task, &config) });
    queue.pending.push(PendingSplit {
        parent,
        dispatched_at: now,
        task: handle,
    });
}

/// Poll every in-flight task once and report the finished ones.
pub fn poll_split_tasks_system(
    mut queue: ResMut<SplitQueue>,
    mut completed: MessageWriter<SplitCompleted>,
) {
    queue.pending.retain_mut(|pending| {
        match block_on(future::poll_once(&mut pending.task)) {
            Some(result) => {
                completed.write(SplitCompleted {
                    parent: pending.parent,
                    dispatched_at: pending.dispatched_at,
                    result,
                });
                false
            }
            None => true,
        }
    });
}

/// Keep splitting asteroids moving on their last velocity while their
/// physics body is detached.
pub fn splitting_drift_system(
    time: Res<Time>,
    mut query: Query<(&mut Transform, &Velocity, &AsteroidBehavior)>,
) {
    let dt = time.delta_secs();
    for (mut transform, velocity, behavior) in query.iter_mut() {
        if !behavior.is_splitting() {
            continue;
        }
        transform.translation += velocity.linvel * dt;
        transform.rotation = (Quat::from_scaled_axis(velocity.angvel * dt) * transform.rotation).normalize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impact::{ImpactCause, ImpactRecord};
    use crate::mesh::primitives::icosphere;
    use std::time::Duration;

    #[derive(Resource, Default)]
    struct Received(Vec<SplitCompleted>);

    fn collect(mut reader: MessageReader<SplitCompleted>, mut received: ResMut<Received>) {
        received.0.extend(reader.read().cloned());
    }

    fn test_app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .init_resource::<SplitQueue>()
            .init_resource::<Received>()
            .add_message::<SplitCompleted>()
            .add_systems(Update, (poll_split_tasks_system, collect).chain());
        app
    }

    #[test]
    fn finished_tasks_become_messages() {
        let mut app = test_app();
        let parent = app.world_mut().spawn_empty().id();
        let mesh = icosphere(2.0, 1);
        let impact = ImpactRecord {
            point: Vec3::new(-2.0, 0.0, 0.0),
            velocity: Vec3::X * 10.0,
            normal: None,
            cause: ImpactCause::Laser,
        };
        let task = SplitTask::new(parent, &Transform::IDENTITY, Vec3::ZERO, 4.0, &mesh, &impact, 1);

        {
            let world = app.world_mut();
            let config = FractureConfig::default();
            world.resource_scope(|world, mut queue: Mut<SplitQueue>| {
                let mut commands = world.commands();
                dispatch_split(&mut commands, &mut queue, parent, task, 0.0, &config);
            });
            world.flush();
        }
        assert!(app.world().resource::<SplitQueue>().is_pending(parent));
        assert!(app.world().get::<AsteroidBehavior>(parent).unwrap().is_splitting());

        for _ in 0..1000 {
            app.update();
            if !app.world().resource::<Received>().0.is_empty() {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }

        let received = &app.world().resource::<Received>().0;
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].parent, parent);
        assert!(received[0].result.is_ok());
        assert!(app.world().resource::<SplitQueue>().is_empty());
    }

    #[test]
    fn splitting_asteroids_drift() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .add_systems(Update, splitting_drift_system);
        let moving = app
            .world_mut()
            .spawn((
                Transform::IDENTITY,
                Velocity::linear(Vec3::X * 100.0),
                AsteroidBehavior::Splitting { dispatched_at: 0.0 },
            ))
            .id();
        let parked = app
            .world_mut()
            .spawn((Transform::IDENTITY, Velocity::linear(Vec3::X * 100.0), AsteroidBehavior::Drifting))
            .id();

        app.update();
        std::thread::sleep(Duration::from_millis(20));
        app.update();

        assert!(app.world().get::<Transform>(moving).unwrap().translation.x > 0.0);
        assert_eq!(app.world().get::<Transform>(parked).unwrap().translation, Vec3::ZERO);
    }
}
