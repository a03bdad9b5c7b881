//! Topological repair for boolean-operation output.
//!
//! CSG evaluation leaves three kinds of damage behind: duplicated seam
//! vertices, collapsed or duplicated triangles, and T-junctions where a
//! vertex of one triangle lies on the interior of a neighbour's edge.  None
//! of these are errors; the functions here absorb them silently.
//!
//! The T-junction pass must run *before* any coarse weld: welding a vertex
//! that sits on an unsplit edge tears a hole in the surface.  Whatever the
//! earlier passes could not pair up is capped by [`close_open_loops`], which
//! always runs last.

use super::adjacency::{triangle_edges, EdgeAdjacency};
use super::spatial_hash::VertexGrid;
use super::{distance_to_segment, TriMesh};
use crate::constants::EDGE_SPLIT_MAX_PASSES;
use bevy::math::Vec3;
use std::collections::{BTreeMap, HashMap, HashSet};

// ── Welding ───────────────────────────────────────────────────────────────────

/// Merge vertices closer than `tolerance` into the first-seen representative.
///
/// Only vertices referenced by a triangle survive, so the output has no loose
/// vertices.  Triangles whose corners collapse onto fewer than three distinct
/// vertices are dropped.  A `tolerance` of zero merges exactly coincident
/// positions only.
pub fn weld_vertices(mesh: &TriMesh, tolerance: f32) -> TriMesh {
    let positions = mesh.positions();
    let mut referenced = vec![false; positions.len()];
    for &i in mesh.triangles().iter().flatten() {
        referenced[i as usize] = true;
    }

    let mut remap = vec![u32::MAX; positions.len()];
    let mut welded: Vec<Vec3> = Vec::with_capacity(positions.len());

    if tolerance > 0.0 {
        let mut grid = VertexGrid::new(tolerance);
        for (i, &p) in positions.iter().enumerate() {
            if !referenced[i] {
                continue;
            }
            remap[i] = match grid.find_within(&welded, p, tolerance) {
                Some(rep) => rep,
                None => {
                    let idx = welded.len() as u32;
                    welded.push(p);
                    grid.insert(idx, p);
                    idx
                }
            };
        }
    } else {
        // `+ 0.0` folds -0.0 into 0.0 so both hash to the same key.
        let mut exact: HashMap<[u32; 3], u32> = HashMap::new();
        for (i, &p) in positions.iter().enumerate() {
            if !referenced[i] {
                continue;
            }
            let key = (p + Vec3::ZERO).to_array().map(f32::to_bits);
            remap[i] = *exact.entry(key).or_insert_with(|| {
                welded.push(p);
                (welded.len() - 1) as u32
            });
        }
    }

    let triangles = mesh
        .triangles()
        .iter()
        .map(|tri| tri.map(|i| remap[i as usize]))
        .filter(|tri| !is_collapsed(tri))
        .collect();

    TriMesh::new(welded, triangles)
}

// ── Triangle filtering ────────────────────────────────────────────────────────

#[inline]
fn is_collapsed(tri: &[u32; 3]) -> bool {
    tri[0] == tri[1] || tri[1] == tri[2] || tri[2] == tri[0]
}

/// Drop every triangle that repeats a vertex index.  Idempotent.
pub fn remove_collapsed_triangles(mesh: &TriMesh) -> TriMesh {
    TriMesh::new(
        mesh.positions().to_vec(),
        mesh.triangles()
            .iter()
            .copied()
            .filter(|tri| !is_collapsed(tri))
            .collect(),
    )
}

/// Rotate a triangle so its smallest index comes first, keeping the winding.
#[inline]
fn canonical_rotation(tri: [u32; 3]) -> [u32; 3] {
    let [a, b, c] = tri;
    if a <= b && a <= c {
        [a, b, c]
    } else if b <= a && b <= c {
        [b, c, a]
    } else {
        [c, a, b]
    }
}

/// Keep only the first of several triangles with the same three indices in
/// the same winding (any rotation).  Opposite windings are distinct faces.
pub fn remove_duplicate_triangles(mesh: &TriMesh) -> TriMesh {
    let mut seen = HashSet::with_capacity(mesh.triangle_count());
    TriMesh::new(
        mesh.positions().to_vec(),
        mesh.triangles()
            .iter()
            .copied()
            .filter(|tri| seen.insert(canonical_rotation(*tri)))
            .collect(),
    )
}

// ── T-junction repair ─────────────────────────────────────────────────────────

/// True when `p` lies on segment `a`–`b` within `tolerance` but is farther
/// than `tolerance` from both endpoints.
#[inline]
fn lies_inside_edge(p: Vec3, a: Vec3, b: Vec3, tolerance: f32) -> bool {
    p.distance(a) > tolerance
        && p.distance(b) > tolerance
        && distance_to_segment(p, a, b) <= tolerance
}

/// Split boundary edges at the vertices lying on their interiors, using the
/// default pass limit.  See [`split_edges_with_limit`].
pub fn split_edges_at_vertices(mesh: &TriMesh, tolerance: f32) -> TriMesh {
    split_edges_with_limit(mesh, tolerance, EDGE_SPLIT_MAX_PASSES)
}

/// Re-triangulate every triangle whose boundary edge has other vertices lying
/// on its interior, eliminating T-junctions.
///
/// An edge `u → v` is a candidate only while no triangle holds the opposite
/// edge `v → u`; an edge that is already closed from both sides never needs a
/// split, whatever vertices touch it.  Each touching vertex `w` must lie
/// within `tolerance` of the segment and farther than `tolerance` from both
/// endpoints (a vertex near an endpoint is a weld case).  Touching vertices are
/// taken in order of distance from `u`; one within `tolerance` of the previous
/// split point is skipped, which keeps clustered vertices from subdividing
/// forever.  The triangle `(u, v, apex)` becomes the fan
/// `(u, w₁, apex), (w₁, w₂, apex), …, (wₖ, v, apex)` with the original winding.
///
/// Zero-area slivers `(u, v, w)` whose apex lies inside the opposite edge are
/// deleted up front; the triangle across that edge is then split at `w` by the
/// regular pass.
///
/// Vertex positions are never modified; only connectivity changes.
pub fn split_edges_with_limit(mesh: &TriMesh, tolerance: f32, max_passes: usize) -> TriMesh {
    let positions = mesh.positions();
    let mut triangles = remove_slivers(positions, mesh.triangles(), tolerance);

    for _ in 0..max_passes {
        let adjacency = EdgeAdjacency::from_triangles(&triangles);
        let mut next: Vec<[u32; 3]> = Vec::with_capacity(triangles.len() + 8);
        let mut changed = false;

        for &tri in &triangles {
            match find_edge_split(positions, &triangles, &adjacency, tri, tolerance) {
                Some((u, v, apex, touching)) => {
                    let chain: Vec<u32> = std::iter::once(u)
                        .chain(touching)
                        .chain(std::iter::once(v))
                        .collect();
                    next.extend(chain.windows(2).map(|w| [w[0], w[1], apex]));
                    changed = true;
                }
                None => next.push(tri),
            }
        }

        triangles = next;
        if !changed {
            break;
        }
    }

    TriMesh::new(positions.to_vec(), triangles)
}

fn remove_slivers(positions: &[Vec3], triangles: &[[u32; 3]], tolerance: f32) -> Vec<[u32; 3]> {
    triangles
        .iter()
        .copied()
        .filter(|tri| {
            !(0..3).any(|k| {
                let apex = positions[tri[k] as usize];
                let a = positions[tri[(k + 1) % 3] as usize];
                let b = positions[tri[(k + 2) % 3] as usize];
                lies_inside_edge(apex, a, b, tolerance)
            })
        })
        .collect()
}

/// First boundary edge of `tri` (in winding order) with touching vertices.
/// Returns `(u, v, apex, touching vertices ordered from u)`.
fn find_edge_split(
    positions: &[Vec3],
    triangles: &[[u32; 3]],
    adjacency: &EdgeAdjacency,
    tri: [u32; 3],
    tolerance: f32,
) -> Option<(u32, u32, u32, Vec<u32>)> {
    for (slot, (u, v)) in triangle_edges(tri).into_iter().enumerate() {
        if u == v || !adjacency.is_boundary(u, v) {
            continue;
        }
        let apex = tri[(slot + 2) % 3];

        // Vertices already forming a triangle on this edge are never split points.
        let on_edge: HashSet<u32> = adjacency
            .triangles_on_edge(u, v)
            .iter()
            .flat_map(|&t| triangles[t])
            .collect();

        let pu = positions[u as usize];
        let pv = positions[v as usize];
        let (lo, hi) = (
            pu.min(pv) - Vec3::splat(tolerance),
            pu.max(pv) + Vec3::splat(tolerance),
        );
        let axis = pv - pu;

        let mut candidates: Vec<(f32, u32)> = positions
            .iter()
            .enumerate()
            .filter(|(w, p)| {
                !on_edge.contains(&(*w as u32))
                    && p.cmpge(lo).all()
                    && p.cmple(hi).all()
                    && lies_inside_edge(**p, pu, pv, tolerance)
            })
            .map(|(w, p)| ((*p - pu).dot(axis), w as u32))
            .collect();

        if candidates.is_empty() {
            continue;
        }
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut touching: Vec<u32> = Vec::with_capacity(candidates.len());
        let mut last = pu;
        for (_, w) in candidates {
            let p = positions[w as usize];
            if p.distance(last) > tolerance && p.distance(pv) > tolerance {
                touching.push(w);
                last = p;
            }
        }
        if !touching.is_empty() {
            return Some((u, v, apex, touching));
        }
    }
    None
}

/// Undirected edges used by exactly one triangle.  Empty for a closed
/// two-manifold surface.
pub fn open_edges(mesh: &TriMesh) -> Vec<(u32, u32)> {
    EdgeAdjacency::build(mesh).open_edges()
}

// ── Hole closing ──────────────────────────────────────────────────────────────

/// Cap every hole left in the surface with a triangle fan.
///
/// Unmatched directed edges are chained into loops.  Every triangle enters and
/// leaves each of its corners once, so each vertex has as many unmatched edges
/// leaving as entering and a walk from any of them comes back to its start.
/// A loop `a₀ → a₁ → … → aₖ₋₁ → a₀` gets the fan `(a₀, aᵢ₊₁, aᵢ)`, which holds
/// the opposite of every loop edge and pairs its own diagonals.  Afterwards
/// each edge is used as often in one direction as in the other.
///
/// Holes here are seam slivers a few tolerances wide; the fan makes no
/// attempt at a pleasant triangulation.
pub fn close_open_loops(mesh: &TriMesh) -> TriMesh {
    let unmatched = EdgeAdjacency::build(mesh).unmatched_edges();
    if unmatched.is_empty() {
        return mesh.clone();
    }

    let mut outgoing: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
    for (a, b) in unmatched {
        outgoing.entry(a).or_default().push(b);
    }
    // Pop in ascending order of destination.
    outgoing.values_mut().for_each(|ends| ends.reverse());

    let mut triangles = mesh.triangles().to_vec();
    let starts: Vec<u32> = outgoing.keys().copied().collect();
    for start in starts {
        while let Some(first) = outgoing.get_mut(&start).and_then(Vec::pop) {
            let mut cycle = vec![start, first];
            let mut current = first;
            let closed = loop {
                if current == start {
                    break true;
                }
                match outgoing.get_mut(&current).and_then(Vec::pop) {
                    Some(next) => {
                        cycle.push(next);
                        current = next;
                    }
                    None => break false,
                }
            };
            // The walk ends on `start`; drop the repeat.
            cycle.pop();
            if closed && cycle.len() >= 3 {
                let a0 = cycle[0];
                triangles.extend(cycle.windows(2).skip(1).map(|w| [a0, w[1], w[0]]));
            }
        }
    }

    TriMesh::new(mesh.positions().to_vec(), triangles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::primitives::{box_mesh, icosphere};

    /// Triangles normalised to their smallest-index-first rotation, sorted.
    fn normalised(mesh: &TriMesh) -> Vec<[u32; 3]> {
        let mut tris: Vec<_> = mesh.triangles().iter().map(|t| canonical_rotation(*t)).collect();
        tris.sort_unstable();
        tris
    }

    // ── weld_vertices ─────────────────────────────────────────────────────────

    #[test]
    fn weld_merges_seam_duplicates() {
        // Two triangles sharing an edge whose vertices were emitted twice.
        let mesh = TriMesh::new(
            vec![
                Vec3::ZERO,
                Vec3::X,
                Vec3::Y,
                Vec3::new(0.00005, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 1.00005, 0.0),
            ],
            vec![[0, 1, 2], [1, 4, 5], [3, 1, 5]],
        );
        let welded = weld_vertices(&mesh, 1e-4);
        assert_eq!(welded.vertex_count(), 4);
        assert_eq!(welded.triangle_count(), 3);
        assert_eq!(welded.triangles()[2], [0, 1, 2]);
    }

    #[test]
    fn weld_drops_triangles_that_collapse() {
        let mesh = TriMesh::new(
            vec![Vec3::ZERO, Vec3::new(0.01, 0.0, 0.0), Vec3::Y, Vec3::X],
            vec![[0, 1, 2], [0, 3, 2]],
        );
        let welded = weld_vertices(&mesh, 0.05);
        assert_eq!(welded.triangle_count(), 1);
        assert_eq!(welded.vertex_count(), 3);
    }

    #[test]
    fn weld_discards_unreferenced_vertices() {
        let mesh = TriMesh::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::splat(9.0)],
            vec![[0, 1, 2]],
        );
        assert_eq!(weld_vertices(&mesh, 1e-4).vertex_count(), 3);
    }

    #[test]
    fn zero_tolerance_weld_merges_only_exact_copies() {
        let mesh = TriMesh::new(
            vec![
                Vec3::ZERO,
                Vec3::X,
                Vec3::Y,
                Vec3::new(-0.0, 0.0, 0.0),
                Vec3::new(1.0 + 1e-6, 0.0, 0.0),
                Vec3::Z,
            ],
            vec![[0, 1, 2], [3, 4, 5]],
        );
        let welded = weld_vertices(&mesh, 0.0);
        assert_eq!(welded.vertex_count(), 5);
        assert_eq!(welded.triangles()[1][0], 0);
    }

    // ── remove_collapsed_triangles / remove_duplicate_triangles ───────────────

    #[test]
    fn remove_collapsed_is_idempotent() {
        let mesh = TriMesh::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            vec![[0, 1, 2], [0, 0, 1], [2, 1, 2], [1, 1, 1], [2, 0, 1]],
        );
        let once = remove_collapsed_triangles(&mesh);
        let twice = remove_collapsed_triangles(&once);
        assert_eq!(once, twice);
        assert_eq!(once.triangles(), &[[0, 1, 2], [2, 0, 1]]);
    }

    #[test]
    fn duplicates_in_any_rotation_are_removed_but_flips_are_kept() {
        let mesh = TriMesh::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            vec![[0, 1, 2], [1, 2, 0], [2, 0, 1], [0, 2, 1]],
        );
        let deduped = remove_duplicate_triangles(&mesh);
        assert_eq!(deduped.triangles(), &[[0, 1, 2], [0, 2, 1]]);
    }

    // ── split_edges_at_vertices ───────────────────────────────────────────────

    #[test]
    fn vertex_on_open_edge_splits_the_triangle() {
        // Vertex 0 sits exactly on edge (2, 3) of triangle (2, 4, 3).
        let mesh = TriMesh::new(
            vec![
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(2.0, 0.0, 0.0),
                Vec3::new(1.0, -1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 3, 1], [2, 4, 3]],
        );
        let split = split_edges_at_vertices(&mesh, 1e-4);
        assert_eq!(split.triangle_count(), 4);
        assert_eq!(
            normalised(&split),
            vec![[0, 1, 2], [0, 2, 4], [0, 3, 1], [0, 4, 3]]
        );
        assert_eq!(split.positions(), mesh.positions());
    }

    fn edge_with_neighbour_at(x: f32) -> TriMesh {
        // Triangle (0, 1, 2) with edge 0→1 along X; vertex 3 belongs to a
        // second triangle hanging below the edge and touches it near vertex 1.
        TriMesh::new(
            vec![
                Vec3::ZERO,
                Vec3::X,
                Vec3::Y,
                Vec3::new(x, 0.0, 0.0),
                Vec3::new(x, -1.0, 0.0),
                Vec3::new(x - 1.0, -1.0, 0.0),
            ],
            vec![[0, 1, 2], [3, 4, 5]],
        )
    }

    #[test]
    fn vertex_within_tolerance_of_endpoint_does_not_split() {
        let mesh = edge_with_neighbour_at(1.00001);
        let split = split_edges_at_vertices(&mesh, 1e-4);
        assert_eq!(split, mesh);
    }

    #[test]
    fn vertex_just_outside_endpoint_tolerance_splits() {
        let mesh = edge_with_neighbour_at(0.9998);
        let split = split_edges_at_vertices(&mesh, 1e-4);
        assert_eq!(split.triangle_count(), 3);
        assert_eq!(normalised(&split), vec![[0, 3, 2], [1, 2, 3], [3, 4, 5]]);
    }

    #[test]
    fn vertex_touching_a_closed_edge_is_ignored() {
        // Edge 0–1 is shared by two triangles, so a third vertex lying on it
        // (the rim of a hole in another sheet) must not disturb either.
        let mesh = TriMesh::new(
            vec![
                Vec3::ZERO,
                Vec3::X,
                Vec3::Y,
                Vec3::NEG_Y,
                Vec3::new(0.5, 0.0, 0.0),
                Vec3::new(0.5, 0.0, 1.0),
                Vec3::new(0.0, 0.0, 1.0),
            ],
            vec![[0, 1, 2], [1, 0, 3], [4, 5, 6]],
        );
        let split = split_edges_at_vertices(&mesh, 1e-4);
        assert_eq!(split, mesh);
    }

    #[test]
    fn several_touching_vertices_form_an_ordered_fan() {
        let mesh = TriMesh::new(
            vec![
                Vec3::ZERO,
                Vec3::new(3.0, 0.0, 0.0),
                Vec3::new(1.5, 2.0, 0.0),
                Vec3::new(2.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
            ],
            vec![[0, 1, 2]],
        );
        let split = split_edges_at_vertices(&mesh, 1e-4);
        assert_eq!(split.triangles(), &[[0, 4, 2], [4, 3, 2], [3, 1, 2]]);
        for [a, b, c] in split.corners() {
            assert!((b - a).cross(c - a).z > 0.0, "winding flipped");
        }
    }

    #[test]
    fn clustered_touching_vertices_terminate() {
        // Vertices 3 and 4 are within tolerance of each other and of the edge.
        let mesh = TriMesh::new(
            vec![
                Vec3::ZERO,
                Vec3::X,
                Vec3::Y,
                Vec3::new(0.5, 0.0, 0.0),
                Vec3::new(0.50005, 0.00002, 0.0),
            ],
            vec![[0, 1, 2]],
        );
        let split = split_edges_at_vertices(&mesh, 1e-4);
        assert_eq!(split.triangle_count(), 2);
        assert!(split.triangles().iter().all(|t| !is_collapsed(t)));
    }

    #[test]
    fn zero_area_sliver_is_deleted_not_split() {
        // (0, 1, 2) is a sliver: vertex 2 lies inside edge 0–1.  The triangle
        // across that edge gets split at vertex 2 instead.
        let mesh = TriMesh::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::new(0.5, 0.0, 0.0), Vec3::NEG_Y],
            vec![[0, 1, 2], [1, 0, 3]],
        );
        let split = split_edges_at_vertices(&mesh, 1e-4);
        assert_eq!(normalised(&split), vec![[0, 3, 2], [1, 2, 3]]);
    }

    #[test]
    fn closed_meshes_pass_through_unchanged() {
        let sphere = icosphere(1.0, 2);
        assert_eq!(split_edges_at_vertices(&sphere, 1e-4), sphere);
        let cube = box_mesh(Vec3::ONE);
        assert_eq!(split_edges_at_vertices(&cube, 1e-4), cube);
    }

    #[test]
    fn t_junction_repair_closes_a_subdivided_cube_face() {
        // Replace the +Z face of a cube with four quads meeting at the face
        // center: the side faces keep their long edges, so the new midpoints
        // are T-junctions until repaired.
        let h = 0.5;
        let mut positions = box_mesh(Vec3::splat(h)).positions().to_vec();
        let mut triangles: Vec<[u32; 3]> = box_mesh(Vec3::splat(h))
            .triangles()
            .iter()
            .copied()
            .filter(|t| {
                let c = t.iter().map(|&i| positions[i as usize].z).sum::<f32>();
                c < 3.0 * h - 1e-4
            })
            .collect();
        let grid: Vec<u32> = (0..9)
            .map(|k| {
                let (i, j) = (k % 3, k / 3);
                positions.push(Vec3::new(-h + h * i as f32, -h + h * j as f32, h));
                (positions.len() - 1) as u32
            })
            .collect();
        for j in 0..2 {
            for i in 0..2 {
                let a = grid[j * 3 + i];
                let b = grid[j * 3 + i + 1];
                let c = grid[(j + 1) * 3 + i + 1];
                let d = grid[(j + 1) * 3 + i];
                triangles.push([a, b, c]);
                triangles.push([a, c, d]);
            }
        }
        let broken = weld_vertices(&TriMesh::new(positions, triangles), 1e-5);
        assert!(!open_edges(&broken).is_empty());

        let repaired = split_edges_at_vertices(&broken, 1e-4);
        assert!(open_edges(&repaired).is_empty(), "{:?}", open_edges(&repaired));
        assert!((repaired.signed_volume() - 1.0).abs() < 1e-4);
        assert_eq!(repaired.positions(), broken.positions());
    }

    // ── close_open_loops ──────────────────────────────────────────────────────

    fn cube_without(filter: impl Fn(f32) -> bool) -> TriMesh {
        let cube = box_mesh(Vec3::ONE);
        let kept: Vec<[u32; 3]> = cube
            .triangles()
            .iter()
            .copied()
            .filter(|t| !filter(t.iter().map(|&i| cube.positions()[i as usize].z).sum::<f32>()))
            .collect();
        TriMesh::new(cube.positions().to_vec(), kept)
    }

    #[test]
    fn missing_face_is_capped_with_the_right_winding() {
        let open = cube_without(|z| z > 2.999);
        assert_eq!(open.triangle_count(), 10);
        assert_eq!(open_edges(&open).len(), 4);

        let closed = close_open_loops(&open);
        assert!(open_edges(&closed).is_empty());
        assert_eq!(closed.triangle_count(), 12);
        assert!((closed.signed_volume() - 8.0).abs() < 1e-4);
    }

    #[test]
    fn lone_triangle_gets_its_back_face() {
        let mesh = TriMesh::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![[0, 1, 2]]);
        let closed = close_open_loops(&mesh);
        assert_eq!(closed.triangles(), &[[0, 1, 2], [0, 2, 1]]);
        assert!(open_edges(&closed).is_empty());
    }

    #[test]
    fn loops_sharing_a_vertex_are_closed_separately() {
        let mesh = TriMesh::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::NEG_X, Vec3::NEG_Y],
            vec![[0, 1, 2], [0, 3, 4]],
        );
        let closed = close_open_loops(&mesh);
        assert_eq!(closed.triangle_count(), 4);
        assert!(EdgeAdjacency::build(&closed).unmatched_edges().is_empty());
    }

    #[test]
    fn closed_meshes_are_left_alone() {
        let sphere = icosphere(1.0, 2);
        assert_eq!(close_open_loops(&sphere), sphere);
    }
}
