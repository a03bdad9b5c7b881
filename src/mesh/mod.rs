//! Triangle mesh value types and the low-level mesh toolkit.
//!
//! [`TriMesh`] is an indexed triangle list that is never mutated in place:
//! every operation in this module tree takes `&TriMesh` and returns a new
//! value, so a mesh handed to a background split task can never be observed
//! half-repaired by the main thread.
//!
//! | Module        | Purpose                                                   |
//! |---------------|-----------------------------------------------------------|
//! | `repair`      | welding, collapsed-triangle removal, T-junction splitting |
//! | `adjacency`   | vertex/edge adjacency derived from a triangle list        |
//! | `spatial_hash`| hash grid used to find weld candidates                    |
//! | `sampler`     | area-weighted random surface points                       |
//! | `primitives`  | icosahedra, icospheres, boxes                             |

pub mod adjacency;
pub mod primitives;
pub mod repair;
pub mod sampler;
pub mod spatial_hash;

use bevy::math::{Quat, Vec3};

/// Indexed triangle mesh.
///
/// Invariant (maintained by the repair toolkit, not by construction): every
/// triangle references three distinct vertices.  Vertices that no triangle
/// references are allowed and simply ignored by the geometric queries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriMesh {
    positions: Vec<Vec3>,
    triangles: Vec<[u32; 3]>,
}

impl TriMesh {
    pub fn new(positions: Vec<Vec3>, triangles: Vec<[u32; 3]>) -> Self {
        debug_assert!(
            triangles
                .iter()
                .all(|t| t.iter().all(|&i| (i as usize) < positions.len())),
            "triangle index out of range"
        );
        Self {
            positions,
            triangles,
        }
    }

    /// Build a mesh from a de-indexed list where every three consecutive
    /// positions form one triangle.  Trailing positions that do not complete a
    /// triangle are dropped.
    pub fn from_flat(flat: &[Vec3]) -> Self {
        let count = flat.len() / 3;
        let positions = flat[..count * 3].to_vec();
        let triangles = (0..count as u32)
            .map(|t| [t * 3, t * 3 + 1, t * 3 + 2])
            .collect();
        Self {
            positions,
            triangles,
        }
    }

    #[inline]
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    #[inline]
    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// A mesh without triangles encloses nothing, however many vertices it has.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Corner positions of triangle `index`.
    #[inline]
    pub fn triangle(&self, index: usize) -> [Vec3; 3] {
        let [a, b, c] = self.triangles[index];
        [
            self.positions[a as usize],
            self.positions[b as usize],
            self.positions[c as usize],
        ]
    }

    pub fn corners(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        (0..self.triangles.len()).map(move |i| self.triangle(i))
    }

    /// De-index into a flat triangle list (three positions per triangle).
    pub fn to_flat(&self) -> Vec<Vec3> {
        self.corners().flatten().collect()
    }

    /// Signed enclosed volume by the divergence theorem.  Positive for a closed
    /// mesh with counter-clockwise (outward) winding.
    pub fn signed_volume(&self) -> f32 {
        self.corners()
            .map(|[a, b, c]| a.dot(b.cross(c)))
            .sum::<f32>()
            / 6.0
    }

    pub fn volume(&self) -> f32 {
        self.signed_volume().abs()
    }

    pub fn surface_area(&self) -> f32 {
        self.corners().map(|[a, b, c]| triangle_area(a, b, c)).sum()
    }

    /// Axis-aligned bounds of the referenced vertices, `None` for an empty mesh.
    pub fn aabb(&self) -> Option<(Vec3, Vec3)> {
        let mut corners = self.triangles.iter().flatten();
        let first = self.positions[*corners.next()? as usize];
        let (min, max) = corners.fold((first, first), |(min, max), &i| {
            let p = self.positions[i as usize];
            (min.min(p), max.max(p))
        });
        Some((min, max))
    }

    /// Center of the bounding box (origin for an empty mesh).
    pub fn bounding_center(&self) -> Vec3 {
        self.aabb()
            .map(|(min, max)| (min + max) * 0.5)
            .unwrap_or(Vec3::ZERO)
    }

    /// Diameter of the bounding sphere centred on the bounding-box center.
    pub fn bounding_diameter(&self) -> f32 {
        let center = self.bounding_center();
        let radius = self
            .triangles
            .iter()
            .flatten()
            .map(|&i| self.positions[i as usize].distance(center))
            .fold(0.0_f32, f32::max);
        radius * 2.0
    }

    pub fn translated(&self, offset: Vec3) -> TriMesh {
        TriMesh {
            positions: self.positions.iter().map(|p| *p + offset).collect(),
            triangles: self.triangles.clone(),
        }
    }

    /// Rotate about the local origin, then translate.
    pub fn transformed(&self, rotation: Quat, translation: Vec3) -> TriMesh {
        TriMesh {
            positions: self
                .positions
                .iter()
                .map(|p| rotation * *p + translation)
                .collect(),
            triangles: self.triangles.clone(),
        }
    }

    /// Area-weighted smooth vertex normals (unreferenced vertices get zero).
    pub fn vertex_normals(&self) -> Vec<Vec3> {
        let mut normals = vec![Vec3::ZERO; self.positions.len()];
        for tri in &self.triangles {
            let [a, b, c] = tri.map(|i| self.positions[i as usize]);
            // Unnormalised cross product: its length is twice the area.
            let n = (b - a).cross(c - a);
            for &i in tri {
                normals[i as usize] += n;
            }
        }
        normals.iter().map(|n| n.normalize_or_zero()).collect()
    }

    /// De-index and attach per-face normals.
    pub fn to_flat_mesh(&self) -> FlatMesh {
        let positions = self.to_flat();
        let normals = positions
            .chunks_exact(3)
            .flat_map(|t| {
                let n = face_normal(t[0], t[1], t[2]);
                [n, n, n]
            })
            .collect();
        FlatMesh { positions, normals }
    }
}

/// De-indexed triangle list with one normal per corner.
///
/// This is the form that crosses the split-task boundary and feeds rendering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatMesh {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
}

impl FlatMesh {
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Re-index by merging exactly coincident corners, which restores the
    /// connectivity that de-indexing discarded.
    pub fn to_trimesh(&self) -> TriMesh {
        repair::weld_vertices(&TriMesh::from_flat(&self.positions), 0.0)
    }
}

#[inline]
pub fn face_normal(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    (b - a).cross(c - a).normalize_or_zero()
}

#[inline]
pub fn triangle_area(a: Vec3, b: Vec3, c: Vec3) -> f32 {
    (b - a).cross(c - a).length() * 0.5
}

/// Distance from `p` to the closed segment `a`–`b`.
#[inline]
pub fn distance_to_segment(p: Vec3, a: Vec3, b: Vec3) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}
