//! Small craters for non-lethal hits.
//!
//! A bite subtracts a randomly rotated icosahedron that overlaps the surface
//! by `bite_penetration` at the impact point.  It runs synchronously on the
//! main thread, so it works in the asteroid's local frame and never recenters:
//! the entity transform stays valid across the bite.

use super::{limit_triangles, repair_boolean_result};
use crate::config::FractureConfig;
use crate::csg::{Brush, CsgOperation, Evaluator};
use crate::error::{FractureError, FractureResult};
use crate::mesh::primitives::icosahedron;
use crate::mesh::TriMesh;
use bevy::math::{EulerRot, Quat, Vec3};
use rand::Rng;
use std::f32::consts::TAU;

/// Subtract a bite from `mesh` at `point`, travelling along `direction`
/// (both in the mesh's local frame).
///
/// Fails with [`FractureError::DegenerateFragment`] if nothing with volume
/// survives the repair; callers keep the original mesh in that case.
pub fn bite_asteroid(
    mesh: &TriMesh,
    point: Vec3,
    direction: Vec3,
    config: &FractureConfig,
    rng: &mut impl Rng,
) -> FractureResult<TriMesh> {
    let direction = direction.try_normalize().unwrap_or(Vec3::X);
    let center = point - direction * (config.bite_radius - config.bite_penetration);
    let spin = Quat::from_euler(
        EulerRot::XYZ,
        rng.gen_range(0.0..TAU),
        rng.gen_range(0.0..TAU),
        rng.gen_range(0.0..TAU),
    );
    let bite = Brush::new(icosahedron(config.bite_radius))
        .with_rotation(spin)
        .with_translation(center);

    let raw = Evaluator::positions_only()
        .with_polygon_budget(config.csg_polygon_budget)
        .evaluate(&Brush::new(mesh.clone()), &bite, CsgOperation::Subtraction)?;
    let bitten = limit_triangles(
        repair_boolean_result(&raw, config),
        mesh.triangle_count() + config.crack_triangle_budget,
        config,
    );

    let volume = bitten.signed_volume();
    if bitten.is_empty() || volume <= 0.0 {
        return Err(FractureError::DegenerateFragment {
            index: 0,
            triangles: bitten.triangle_count(),
            volume,
        });
    }
    Ok(bitten)
}
