//! Asteroid components and spawn helpers.
//!
//! Every asteroid carries its own local-space [`TriMesh`]; volume, diameter,
//! health, material value, collider and mass are all derived from it at spawn
//! time (and again after a bite reshapes it).
//!
//! Per-asteroid state that used to be free-form is a fixed set of components
//! plus one tagged enum, [`AsteroidBehavior`].

use crate::config::FractureConfig;
use crate::impact::ImpactRecord;
use crate::mesh::primitives::noisy_icosphere;
use crate::mesh::TriMesh;
use crate::physics::{asteroid_groups, attach_physics};
use bevy::prelude::*;
use bevy_rapier3d::prelude::*;
use rand::Rng;

/// Marker component for any asteroid entity.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Asteroid;

/// Quantities derived from the asteroid's mesh.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct AsteroidBody {
    pub diameter: f32,
    pub volume: f32,
}

impl AsteroidBody {
    pub fn from_mesh(mesh: &TriMesh) -> Self {
        Self {
            diameter: mesh.bounding_diameter(),
            volume: mesh.volume(),
        }
    }

    pub fn mass(&self, config: &FractureConfig) -> f32 {
        self.volume * config.asteroid_density
    }
}

/// Local-space geometry.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct AsteroidMesh(pub TriMesh);

/// Remaining hit points.  Non-positive means the asteroid must split or
/// break down.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Health(pub f32);

/// Material credited to the player when this asteroid breaks down.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct MaterialValue(pub f32);

/// Last hit taken, kept for debris biasing and handed down to fragments.
#[derive(Component, Debug, Clone, Copy, PartialEq, Default)]
pub struct RecentImpact(pub Option<ImpactRecord>);

/// What the asteroid is currently doing.
#[derive(Component, Debug, Clone, Copy, PartialEq, Default)]
pub enum AsteroidBehavior {
    /// Normal rigid-body motion and asteroid-asteroid collisions.
    #[default]
    Drifting,
    /// A split task is in flight.  Physics is detached and the asteroid
    /// drifts kinematically until the fragments replace it.
    Splitting {
        /// `Time::elapsed_secs` when the task was dispatched.
        dispatched_at: f32,
    },
}

impl AsteroidBehavior {
    pub fn is_splitting(&self) -> bool {
        matches!(self, AsteroidBehavior::Splitting { .. })
    }
}

/// Everything needed to bring an asteroid into the world.
#[derive(Debug, Clone)]
pub struct AsteroidSpawn {
    pub mesh: TriMesh,
    pub transform: Transform,
    pub velocity: Velocity,
    /// Overrides the volume-derived health (fragments inherit overkill).
    pub health: Option<f32>,
    pub impact: Option<ImpactRecord>,
}

impl AsteroidSpawn {
    pub fn new(mesh: TriMesh, transform: Transform) -> Self {
        Self {
            mesh,
            transform,
            velocity: Velocity::zero(),
            health: None,
            impact: None,
        }
    }

    pub fn with_velocity(mut self, linvel: Vec3, angvel: Vec3) -> Self {
        self.velocity = Velocity { linvel, angvel };
        self
    }

    pub fn with_health(mut self, health: f32) -> Self {
        self.health = Some(health);
        self
    }

    pub fn with_impact(mut self, impact: Option<ImpactRecord>) -> Self {
        self.impact = impact;
        self
    }
}

/// Spawn a live, physically simulated asteroid and return its entity.
pub fn spawn_asteroid(commands: &mut Commands, spawn: AsteroidSpawn, config: &FractureConfig) -> Entity {
    let body = AsteroidBody::from_mesh(&spawn.mesh);
    let health = spawn
        .health
        .unwrap_or(body.volume * config.health_per_volume);
    let mass = body.mass(config);

    let entity = commands
        .spawn((
            (
                spawn.transform,
                Visibility::default(),
                Asteroid,
                body,
                Health(health),
                MaterialValue(body.volume * config.material_per_volume),
                RecentImpact(spawn.impact),
                AsteroidBehavior::Drifting,
            ),
            (
                spawn.velocity,
                Restitution::coefficient(0.3),
                Friction::coefficient(0.6),
                Damping {
                    linear_damping: 0.0,
                    angular_damping: 0.0,
                },
                // The play plane is XY.
                LockedAxes::TRANSLATION_LOCKED_Z,
                Sleeping::disabled(),
            ),
        ))
        .id();
    attach_physics(commands, entity, &spawn.mesh, mass, asteroid_groups());
    commands.entity(entity).insert(AsteroidMesh(spawn.mesh));
    entity
}

/// Spawn the starting field: noisy icospheres scattered over a square of
/// half-width `field_spawn_radius`, leaving the middle clear.
pub fn spawn_asteroid_field(commands: &mut Commands, config: &FractureConfig, rng: &mut impl Rng) -> Vec<Entity> {
    let extent = config.field_spawn_radius;
    let v = config.asteroid_initial_velocity_range;
    let w = config.asteroid_initial_angvel_range;
    let mut spawned = Vec::with_capacity(config.field_initial_count);

    for _ in 0..config.field_initial_count {
        // Rejection-sample a spot outside the clear zone; give up after a few
        // tries rather than spin on a misconfigured field.
        let Some(position) = (0..32)
            .map(|_| Vec3::new(rng.gen_range(-extent..=extent), rng.gen_range(-extent..=extent), 0.0))
            .find(|p| p.length() > config.field_clear_radius)
        else {
            continue;
        };

        let radius = rng.gen_range(config.asteroid_radius_min..=config.asteroid_radius_max);
        let mesh = noisy_icosphere(radius, config.asteroid_detail, config.asteroid_roughness, rng);
        let linvel = Vec3::new(rng.gen_range(-v..=v), rng.gen_range(-v..=v), 0.0);
        let angvel = Vec3::new(rng.gen_range(-w..=w), rng.gen_range(-w..=w), rng.gen_range(-w..=w));

        let spawn = AsteroidSpawn::new(mesh, Transform::from_translation(position))
            .with_velocity(linvel, angvel);
        spawned.push(spawn_asteroid(commands, spawn, config));
    }
    spawned
}

/// Startup system wrapper around [`spawn_asteroid_field`].
pub fn spawn_initial_field(mut commands: Commands, config: Res<FractureConfig>) {
    let mut rng = rand::thread_rng();
    let spawned = spawn_asteroid_field(&mut commands, &config, &mut rng);
    info!("Spawned {} asteroids", spawned.len());
}
