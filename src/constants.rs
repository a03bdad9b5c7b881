//! Centralised fracture, lifecycle and field constants.
//!
//! All tuneable values live here so they can be found, reasoned-about, and
//! modified in one place without source-diving across multiple modules.
//! [`crate::config::FractureConfig`] mirrors every constant and uses them as
//! its defaults, so `assets/fracture.toml` can override any subset at startup.
//!
//! ## Tuning guidance
//!
//! Each constant notes the observable consequence of changing it.  The
//! velocity/spin blend weights are tuned for visual feel, not physical
//! accuracy.

// ── Mesh Repair ───────────────────────────────────────────────────────────────

/// Weld distance used right after a boolean operation to merge the duplicate
/// vertices produced along CSG seams.
///
/// Must stay well below the smallest feature size of the cutter's crack face.
pub const WELD_TOLERANCE_TIGHT: f32 = 1e-4;

/// Distance within which a loose vertex counts as lying on a boundary edge
/// (T-junction repair).
pub const EDGE_SPLIT_TOLERANCE: f32 = 1e-4;

/// Weld distance used after T-junction repair to simplify the fracture surface.
///
/// Larger values produce blockier fracture faces and lose more volume.
pub const WELD_TOLERANCE_COARSE: f32 = 4e-2;

/// Upper bound on edge-split passes.  Each pass splits at most one edge per
/// triangle; real CSG output settles in two or three passes.
pub const EDGE_SPLIT_MAX_PASSES: usize = 16;

/// Extra triangles a fragment may carry beyond its parent's count.  Above
/// that, the fragment is re-welded at doubling tolerances until it fits.
///
/// Keeps split cost from growing generation over generation.  Lower values
/// give blockier fracture faces on complex rocks.
pub const CRACK_TRIANGLE_BUDGET: usize = 256;

// ── Boolean Kernel ────────────────────────────────────────────────────────────

/// Most polygons a single boolean may hold in flight.  Exceeding it fails the
/// operation instead of exhausting memory; a failed split breaks the parent
/// down into debris.
pub const CSG_POLYGON_BUDGET: usize = 100_000;

// ── Cutter ────────────────────────────────────────────────────────────────────

/// Cutter edge length relative to the asteroid's bounding diameter.
///
/// Must be comfortably above 1.0 so the cutter always fully penetrates.
pub const CUTTER_SIZE_FACTOR: f32 = 2.0;

/// Grid subdivisions along each side of the cutter's crack face.
pub const CUTTER_SEGMENTS: u32 = 8;

/// Crack-face noise amplitude as a fraction of the crack-face grid spacing.
///
/// 0.0 gives a perfectly flat cut; above ~0.45 neighbouring crack vertices can
/// cross each other and fold the surface.
pub const CUTTER_ROUGHNESS: f32 = 0.3;

// ── Bite ──────────────────────────────────────────────────────────────────────

/// Radius of the icosahedral bite solid (world units).
pub const BITE_RADIUS: f32 = 0.35;

/// How far the bite solid reaches past the impact point into the asteroid.
pub const BITE_PENETRATION: f32 = 0.12;

/// Asteroids smaller than this are never bitten (a bite would remove most of them).
pub const BITE_MIN_VOLUME: f32 = 6.0;

// ── Fragment Kinematics ───────────────────────────────────────────────────────

/// Share of the parent's linear velocity each fragment inherits.
pub const FRAGMENT_PARENT_VELOCITY_WEIGHT: f32 = 0.95;

/// Speed (u/s) of the repelling push perpendicular to the impact direction.
pub const FRAGMENT_REPEL_WEIGHT: f32 = 0.25;

/// Share of the impact velocity transferred into each fragment.
pub const FRAGMENT_IMPACT_WEIGHT: f32 = 0.04;

/// Share of the parent's world-frame angular velocity each fragment inherits.
pub const FRAGMENT_PARENT_SPIN_WEIGHT: f32 = 0.8;

/// Magnitude (rad/s) of the random-axis spin added for variety.
pub const FRAGMENT_RANDOM_SPIN: f32 = 0.3;

/// Magnitude (rad/s) of the alternating outward spin that turns the halves apart.
pub const FRAGMENT_OUTWARD_SPIN: f32 = 0.5;

/// Fraction of the parent's below-zero health carried into each fragment.
pub const OVERKILL_CARRY: f32 = 0.5;

// ── Lifecycle ─────────────────────────────────────────────────────────────────

/// Fragments below this volume explode into debris instead of living on.
///
/// This is the hard floor that bounds the live asteroid count under repeated splitting.
pub const EXPLOSION_VOLUME_THRESHOLD: f32 = 3.0;

/// Seconds a new fragment ignores asteroid-asteroid collisions.
pub const EASE_IN_SECS: f32 = 0.6;

/// Health granted per unit of volume.
pub const HEALTH_PER_VOLUME: f32 = 0.5;

/// Material (score) granted per unit of volume when an asteroid breaks down.
pub const MATERIAL_PER_VOLUME: f32 = 10.0;

/// Mass per unit of volume handed to the physics engine.
pub const ASTEROID_DENSITY: f32 = 1.0;

// ── Asteroid Field ────────────────────────────────────────────────────────────

/// Number of asteroids spawned at startup.
pub const FIELD_INITIAL_COUNT: usize = 24;

/// Half-extent of the square spawn region in the play plane (world units).
pub const FIELD_SPAWN_RADIUS: f32 = 40.0;

/// Radius around the origin kept free of asteroids at startup.
pub const FIELD_CLEAR_RADIUS: f32 = 8.0;

/// Smallest starting asteroid radius.
pub const ASTEROID_RADIUS_MIN: f32 = 1.5;

/// Largest starting asteroid radius.
pub const ASTEROID_RADIUS_MAX: f32 = 3.5;

/// Icosphere subdivision level for starting asteroids (0 = plain icosahedron).
pub const ASTEROID_DETAIL: u32 = 1;

/// Radial noise applied to starting asteroid vertices, as a fraction of the radius.
pub const ASTEROID_ROUGHNESS: f32 = 0.18;

/// Initial linear speed range (u/s) on each play-plane axis.
pub const ASTEROID_INITIAL_VELOCITY_RANGE: f32 = 1.5;

/// Initial angular speed range (rad/s) on each axis.
pub const ASTEROID_INITIAL_ANGVEL_RANGE: f32 = 0.6;

/// Asteroids farther than this from the origin are removed.
pub const CULL_DISTANCE: f32 = 120.0;

// ── Damage ────────────────────────────────────────────────────────────────────

/// Damage dealt by a single laser hit.
pub const LASER_DAMAGE: f32 = 3.0;

/// Speed of the laser bolt (u/s); recorded as the impact velocity magnitude.
pub const LASER_SPEED: f32 = 60.0;

/// Collision damage per unit of relative speed.
pub const COLLISION_DAMAGE_FACTOR: f32 = 0.5;

/// Relative speeds (u/s) below this never damage colliding asteroids.
pub const COLLISION_SPEED_THRESHOLD: f32 = 2.0;

// ── Effects ───────────────────────────────────────────────────────────────────

/// Surface points sampled per breakdown to seed debris particles.
pub const DEBRIS_SAMPLE_COUNT: usize = 24;
