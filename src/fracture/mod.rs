//! Asteroid fracture: splitting, biting and putting the pieces back into the
//! world.
//!
//! ## Flow
//!
//! 1. A lethal hit calls [`worker::dispatch_split`], which detaches the
//!    parent's physics, flags it `Splitting` and moves a [`task::SplitTask`]
//!    onto the async compute pool.
//! 2. [`splitter::split_asteroid`] runs there: cutter, two booleans, repair,
//!    recenter.  It sees only plain data.
//! 3. [`worker::poll_split_tasks_system`] turns finished tasks into
//!    [`worker::SplitCompleted`] messages.
//! 4. [`reconcile::reconcile_split_results_system`] spawns the fragments, or
//!    discards the result if the parent is gone.
//!
//! Non-lethal laser hits take the synchronous [`biter::bite_asteroid`] path
//! instead.

pub mod biter;
pub mod cutter;
pub mod reconcile;
pub mod splitter;
pub mod task;
pub mod worker;

use crate::config::FractureConfig;
use crate::mesh::repair::{
    close_open_loops, remove_collapsed_triangles, remove_duplicate_triangles,
    split_edges_with_limit, weld_vertices,
};
use crate::mesh::{FlatMesh, TriMesh};

/// Clean up raw boolean output.
///
/// Order matters: the tight weld joins seam duplicates so T-junctions become
/// visible as boundary edges, the edge split closes them, and only then may
/// the coarse weld simplify the fracture surface without tearing holes.
/// Any gap the passes could not pair up is capped last, so the result has no
/// open edges.
pub fn repair_boolean_result(raw: &FlatMesh, config: &FractureConfig) -> TriMesh {
    let mesh = weld_vertices(&TriMesh::from_flat(&raw.positions), config.weld_tolerance_tight);
    let mesh = remove_duplicate_triangles(&remove_collapsed_triangles(&mesh));
    let mesh = split_edges_with_limit(&mesh, config.edge_split_tolerance, config.edge_split_max_passes);
    let mesh = weld_vertices(&mesh, config.weld_tolerance_coarse);
    close_open_loops(&remove_duplicate_triangles(&remove_collapsed_triangles(&mesh)))
}

/// Re-weld `mesh` at doubling tolerances until it has at most
/// `max_triangles` triangles.
///
/// Each round collapses every edge shorter than the tolerance, so crack
/// slivers go before the silhouette changes.  A tolerance past the mesh size
/// collapses everything, so the loop always ends.
pub fn limit_triangles(mesh: TriMesh, max_triangles: usize, config: &FractureConfig) -> TriMesh {
    let mut tolerance = config.weld_tolerance_coarse.max(f32::EPSILON);
    let mut mesh = mesh;
    while mesh.triangle_count() > max_triangles && tolerance.is_finite() {
        tolerance *= 2.0;
        let welded = weld_vertices(&mesh, tolerance);
        mesh = close_open_loops(&remove_duplicate_triangles(&remove_collapsed_triangles(&welded)));
    }
    mesh
}
