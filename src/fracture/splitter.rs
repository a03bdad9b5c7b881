//! Splitting an asteroid in two along a noisy crack.
//!
//! [`split_asteroid`] is a pure function of its [`SplitTask`]: it touches no
//! shared state and is safe to run on any thread.  All geometry is computed in
//! the parent's world orientation with the parent's position at the origin,
//! so each fragment's offset is directly "where it sits relative to the
//! parent" at dispatch time.

use super::cutter::{build_cutter, CutterParams};
use super::{limit_triangles, repair_boolean_result};
use super::task::{FragmentPayload, SplitResult, SplitTask};
use crate::config::FractureConfig;
use crate::csg::{Brush, CsgOperation, Evaluator};
use crate::error::FractureResult;
use crate::impact::ImpactRecord;
use crate::mesh::{FlatMesh, TriMesh};
use bevy::math::{Quat, Vec3};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Unit direction the impact travelled in.
///
/// Falls back to the inverted surface normal, then to "from the impact point
/// towards the center", then to `+X` when nothing usable is available.
pub fn impact_direction(impact: &ImpactRecord, center: Vec3) -> Vec3 {
    impact
        .velocity
        .try_normalize()
        .or_else(|| impact.normal.and_then(|n| (-n).try_normalize()))
        .or_else(|| (center - impact.point).try_normalize())
        .unwrap_or(Vec3::X)
}

/// Angle of `direction` in the XY play plane.
#[inline]
pub fn impact_rotation(direction: Vec3) -> f32 {
    direction.y.atan2(direction.x)
}

/// Repair a boolean result, hold it to `max_triangles` and recenter it on its
/// bounding-box center.  Returns the recentered mesh and the center that was
/// removed.
fn finish_fragment(raw: &FlatMesh, max_triangles: usize, config: &FractureConfig) -> (TriMesh, Vec3) {
    let repaired = limit_triangles(repair_boolean_result(raw, config), max_triangles, config);
    let center = repaired.bounding_center();
    (repaired.translated(-center), center)
}

/// Cut an asteroid into a far fragment (outside the cutter) and a near
/// fragment (inside it).
///
/// The cutter is `cutter_size_factor × diameter` wide.  Its crack face is
/// turned to face along the impact direction and placed half a diameter
/// beyond the impact point, so the cut runs roughly through the middle of
/// the rock.
///
/// Neither fragment has more than the parent's triangles plus
/// `crack_triangle_budget`, so repeated splits do not grow the meshes.
pub fn split_asteroid(task: &SplitTask, config: &FractureConfig) -> FractureResult<SplitResult> {
    let flat = task.mesh()?;
    let parent_position = task.position();
    let impact = task.impact();

    let asteroid = Brush::from_flat(&flat).with_rotation(task.rotation());
    let diameter = if task.diameter > 0.0 {
        task.diameter
    } else {
        asteroid.mesh.bounding_diameter()
    };

    let direction = impact_direction(&impact, parent_position);
    let mut rng = StdRng::seed_from_u64(task.seed);
    let cutter_mesh = build_cutter(
        CutterParams {
            size: config.cutter_size_factor * diameter,
            segments: config.cutter_segments,
            roughness: config.cutter_roughness,
        },
        &mut rng,
    );
    let crack_origin = (impact.point - parent_position) + direction * (diameter * 0.5);
    let cutter = Brush::new(cutter_mesh)
        .with_rotation(Quat::from_rotation_arc(Vec3::Z, direction))
        .with_translation(crack_origin);

    let evaluator = Evaluator::default().with_polygon_budget(config.csg_polygon_budget);
    let far = evaluator.evaluate(&asteroid, &cutter, CsgOperation::Subtraction)?;
    let near = evaluator.evaluate(&asteroid, &cutter, CsgOperation::Intersection)?;

    let max_triangles = flat.triangle_count() + config.crack_triangle_budget;
    let fragments = [far, near].map(|raw| {
        let (mesh, offset) = finish_fragment(&raw, max_triangles, config);
        FragmentPayload::from_mesh(offset, &mesh.to_flat_mesh())
    });

    Ok(SplitResult {
        asteroid_id: task.asteroid_id,
        fragments,
        impact_direction: direction.to_array(),
        impact_rotation: impact_rotation(direction),
        seed: task.seed,
    })
}
