//! Runtime fracture configuration loaded from `assets/fracture.toml`.
//!
//! [`FractureConfig`] is a Bevy [`Resource`] that mirrors every constant in
//! [`crate::constants`].  At startup, [`load_fracture_config`] reads
//! `assets/fracture.toml` and overwrites the defaults with any values present in
//! the file.  Missing keys fall back to the compile-time defaults, so a minimal
//! TOML can override just the constants you care about.
//!
//! ## Usage in systems
//!
//! Add `config: Res<FractureConfig>` to any system parameter list and read values
//! with `config.weld_tolerance_coarse`, `config.explosion_volume_threshold`, etc.
//!
//! The pure geometry functions take `&FractureConfig` directly, so the same
//! values reach the background split tasks by clone.
//!
//! Keep `src/constants.rs` in sync: it remains the **authoritative default**
//! source used by `FractureConfig::default()`.

use crate::constants::*;
use crate::error::{FractureError, FractureResult};
use bevy::prelude::*;
use serde::Deserialize;

/// Runtime-tunable fracture and gameplay configuration.
///
/// All fields default to the corresponding compile-time constant from
/// `src/constants.rs`.  Override any subset by setting the value in
/// `assets/fracture.toml`.
#[derive(Resource, Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FractureConfig {
    // ── Mesh Repair ───────────────────────────────────────────────────────────
    pub weld_tolerance_tight: f32,
    pub edge_split_tolerance: f32,
    pub weld_tolerance_coarse: f32,
    pub edge_split_max_passes: usize,
    pub crack_triangle_budget: usize,

    // ── Boolean Kernel ────────────────────────────────────────────────────────
    pub csg_polygon_budget: usize,

    // ── Cutter ────────────────────────────────────────────────────────────────
    pub cutter_size_factor: f32,
    pub cutter_segments: u32,
    pub cutter_roughness: f32,

    // ── Bite ──────────────────────────────────────────────────────────────────
    pub bite_radius: f32,
    pub bite_penetration: f32,
    pub bite_min_volume: f32,

    // ── Fragment Kinematics ───────────────────────────────────────────────────
    pub fragment_parent_velocity_weight: f32,
    pub fragment_repel_weight: f32,
    pub fragment_impact_weight: f32,
    pub fragment_parent_spin_weight: f32,
    pub fragment_random_spin: f32,
    pub fragment_outward_spin: f32,
    pub overkill_carry: f32,

    // ── Lifecycle ─────────────────────────────────────────────────────────────
    pub explosion_volume_threshold: f32,
    pub ease_in_secs: f32,
    pub health_per_volume: f32,
    pub material_per_volume: f32,
    pub asteroid_density: f32,

    // ── Asteroid Field ────────────────────────────────────────────────────────
    pub field_initial_count: usize,
    pub field_spawn_radius: f32,
    pub field_clear_radius: f32,
    pub asteroid_radius_min: f32,
    pub asteroid_radius_max: f32,
    pub asteroid_detail: u32,
    pub asteroid_roughness: f32,
    pub asteroid_initial_velocity_range: f32,
    pub asteroid_initial_angvel_range: f32,
    pub cull_distance: f32,

    // ── Damage ────────────────────────────────────────────────────────────────
    pub laser_damage: f32,
    pub laser_speed: f32,
    pub collision_damage_factor: f32,
    pub collision_speed_threshold: f32,

    // ── Effects ───────────────────────────────────────────────────────────────
    pub debris_sample_count: usize,
}

impl Default for FractureConfig {
    fn default() -> Self {
        Self {
            // Mesh Repair
            weld_tolerance_tight: WELD_TOLERANCE_TIGHT,
            edge_split_tolerance: EDGE_SPLIT_TOLERANCE,
            weld_tolerance_coarse: WELD_TOLERANCE_COARSE,
            edge_split_max_passes: EDGE_SPLIT_MAX_PASSES,
            crack_triangle_budget: CRACK_TRIANGLE_BUDGET,
            // Boolean Kernel
            csg_polygon_budget: CSG_POLYGON_BUDGET,
            // Cutter
            cutter_size_factor: CUTTER_SIZE_FACTOR,
            cutter_segments: CUTTER_SEGMENTS,
            cutter_roughness: CUTTER_ROUGHNESS,
            // Bite
            bite_radius: BITE_RADIUS,
            bite_penetration: BITE_PENETRATION,
            bite_min_volume: BITE_MIN_VOLUME,
            // Fragment Kinematics
            fragment_parent_velocity_weight: FRAGMENT_PARENT_VELOCITY_WEIGHT,
            fragment_repel_weight: FRAGMENT_REPEL_WEIGHT,
            fragment_impact_weight: FRAGMENT_IMPACT_WEIGHT,
            fragment_parent_spin_weight: FRAGMENT_PARENT_SPIN_WEIGHT,
            fragment_random_spin: FRAGMENT_RANDOM_SPIN,
            fragment_outward_spin: FRAGMENT_OUTWARD_SPIN,
            overkill_carry: OVERKILL_CARRY,
            // Lifecycle
            explosion_volume_threshold: EXPLOSION_VOLUME_THRESHOLD,
            ease_in_secs: EASE_IN_SECS,
            health_per_volume: HEALTH_PER_VOLUME,
            material_per_volume: MATERIAL_PER_VOLUME,
            asteroid_density: ASTEROID_DENSITY,
            // Asteroid Field
            field_initial_count: FIELD_INITIAL_COUNT,
            field_spawn_radius: FIELD_SPAWN_RADIUS,
            field_clear_radius: FIELD_CLEAR_RADIUS,
            asteroid_radius_min: ASTEROID_RADIUS_MIN,
            asteroid_radius_max: ASTEROID_RADIUS_MAX,
            asteroid_detail: ASTEROID_DETAIL,
            asteroid_roughness: ASTEROID_ROUGHNESS,
            asteroid_initial_velocity_range: ASTEROID_INITIAL_VELOCITY_RANGE,
            asteroid_initial_angvel_range: ASTEROID_INITIAL_ANGVEL_RANGE,
            cull_distance: CULL_DISTANCE,
            // Damage
            laser_damage: LASER_DAMAGE,
            laser_speed: LASER_SPEED,
            collision_damage_factor: COLLISION_DAMAGE_FACTOR,
            collision_speed_threshold: COLLISION_SPEED_THRESHOLD,
            // Effects
            debris_sample_count: DEBRIS_SAMPLE_COUNT,
        }
    }
}

impl FractureConfig {
    /// Check the values that the repair pipeline and lifecycle depend on.
    ///
    /// The tight weld must not exceed the edge-split tolerance, and both must be
    /// strictly below the coarse weld; otherwise the coarse pass would no
    /// longer be the one that simplifies the fracture surface.
    pub fn validate(&self) -> FractureResult<()> {
        positive("weld_tolerance_tight", self.weld_tolerance_tight)?;
        positive("edge_split_tolerance", self.edge_split_tolerance)?;
        positive("weld_tolerance_coarse", self.weld_tolerance_coarse)?;
        positive("cutter_size_factor", self.cutter_size_factor)?;
        positive("bite_radius", self.bite_radius)?;
        positive("explosion_volume_threshold", self.explosion_volume_threshold)?;
        positive("health_per_volume", self.health_per_volume)?;
        positive("asteroid_density", self.asteroid_density)?;
        positive("cull_distance", self.cull_distance)?;

        if self.weld_tolerance_tight > self.edge_split_tolerance {
            return Err(FractureError::UnsafeConstant {
                name: "weld_tolerance_tight",
                value: self.weld_tolerance_tight,
                safe_range: "(0.0, edge_split_tolerance]",
            });
        }
        if self.edge_split_tolerance >= self.weld_tolerance_coarse {
            return Err(FractureError::UnsafeConstant {
                name: "edge_split_tolerance",
                value: self.edge_split_tolerance,
                safe_range: "(0.0, weld_tolerance_coarse)",
            });
        }
        if self.csg_polygon_budget == 0 {
            return Err(FractureError::UnsafeConstant {
                name: "csg_polygon_budget",
                value: 0.0,
                safe_range: "[1, ∞)",
            });
        }
        if self.cutter_size_factor <= 1.0 {
            return Err(FractureError::UnsafeConstant {
                name: "cutter_size_factor",
                value: self.cutter_size_factor,
                safe_range: "(1.0, ∞)",
            });
        }
        if !(0.0..0.5).contains(&self.cutter_roughness) {
            return Err(FractureError::UnsafeConstant {
                name: "cutter_roughness",
                value: self.cutter_roughness,
                safe_range: "[0.0, 0.5)",
            });
        }
        if self.bite_penetration >= self.bite_radius {
            return Err(FractureError::UnsafeConstant {
                name: "bite_penetration",
                value: self.bite_penetration,
                safe_range: "[0.0, bite_radius)",
            });
        }
        Ok(())
    }
}

fn positive(name: &'static str, value: f32) -> FractureResult<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(FractureError::UnsafeConstant {
            name,
            value,
            safe_range: "(0.0, ∞)",
        })
    }
}

/// Startup system: attempt to load `assets/fracture.toml` and overwrite the
/// `FractureConfig` resource with any values present in the file.
///
/// Missing keys retain their compiled defaults.  TOML parse errors and values
/// that fail [`FractureConfig::validate`] are logged but do not abort the game.
/// A missing file is not an error (defaults are already in place from
/// `init_resource`).
pub fn load_fracture_config(mut config: ResMut<FractureConfig>) {
    let path = "assets/fracture.toml";
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str::<FractureConfig>(&contents) {
            Ok(loaded) => match loaded.validate() {
                Ok(()) => {
                    *config = loaded;
                    info!("Loaded fracture config from {path}");
                }
                Err(e) => {
                    warn!("Rejected {path}: {e}; using defaults");
                }
            },
            Err(e) => {
                warn!("Failed to parse {path}: {e}; using defaults");
            }
        },
        Err(_) => {
            info!("No {path} found; using compiled defaults");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(FractureConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let loaded: FractureConfig =
            toml::from_str("weld_tolerance_coarse = 0.05\ncutter_segments = 4\n").unwrap();
        assert_eq!(loaded.weld_tolerance_coarse, 0.05);
        assert_eq!(loaded.cutter_segments, 4);
        assert_eq!(loaded.weld_tolerance_tight, WELD_TOLERANCE_TIGHT);
        assert_eq!(loaded.explosion_volume_threshold, EXPLOSION_VOLUME_THRESHOLD);
    }

    #[test]
    fn inverted_weld_tolerances_are_rejected() {
        let config = FractureConfig {
            weld_tolerance_coarse: 1e-5,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            FractureError::UnsafeConstant {
                name: "edge_split_tolerance",
                ..
            }
        ));
    }

    #[test]
    fn bite_penetration_must_stay_inside_the_bite() {
        let config = FractureConfig {
            bite_penetration: BITE_RADIUS * 2.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_polygon_budget_is_rejected() {
        let config = FractureConfig {
            csg_polygon_budget: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(FractureError::UnsafeConstant { name: "csg_polygon_budget", .. })
        ));
    }
}
