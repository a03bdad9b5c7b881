//! Boolean evaluation between posed meshes.
//!
//! A [`Brush`] is a mesh plus the rotation and translation that place it in a
//! shared frame.  [`Evaluator::evaluate`] converts both brushes to BSP trees
//! and returns the de-indexed result.  Only positions, and optionally
//! interpolated normals, flow through the operation.
//!
//! Operand triangles that the BSP split apart but the other solid never
//! clipped are emitted whole again, so only triangles actually crossing the
//! other surface come back fragmented.
//!
//! The result is not guaranteed to be manifold: seams are emitted as duplicate
//! vertices and split polygons leave T-junctions.  Callers run the repair
//! toolkit in [`crate::mesh::repair`] on whatever comes out.

pub mod bsp;

use crate::constants::CSG_POLYGON_BUDGET;
use crate::error::{FractureError, FractureResult};
use crate::mesh::{face_normal, FlatMesh, TriMesh};
use bevy::math::{Quat, Vec3};
use bsp::{BspTree, Polygon, Vertex};

/// A mesh operand positioned for a boolean operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Brush {
    pub mesh: TriMesh,
    /// One normal per mesh vertex, in the mesh's local frame.
    pub normals: Vec<Vec3>,
    pub rotation: Quat,
    pub translation: Vec3,
}

impl Brush {
    /// Brush with smooth normals derived from the mesh.
    pub fn new(mesh: TriMesh) -> Self {
        let normals = mesh.vertex_normals();
        Self {
            mesh,
            normals,
            rotation: Quat::IDENTITY,
            translation: Vec3::ZERO,
        }
    }

    /// Brush over a de-indexed triangle list that keeps its corner normals.
    pub fn from_flat(flat: &FlatMesh) -> Self {
        let mesh = TriMesh::from_flat(&flat.positions);
        let mut normals = flat.normals.clone();
        normals.resize(mesh.vertex_count(), Vec3::ZERO);
        Self {
            mesh,
            normals,
            rotation: Quat::IDENTITY,
            translation: Vec3::ZERO,
        }
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_translation(mut self, translation: Vec3) -> Self {
        self.translation = translation;
        self
    }

    /// Triangles in the shared frame, numbered from `first_source`.
    /// Zero-area triangles are skipped.
    fn polygons(&self, with_normals: bool, first_source: u32) -> Vec<Polygon> {
        let posed = self.mesh.transformed(self.rotation, self.translation);
        let normal = |i: u32| {
            if with_normals {
                self.rotation * self.normals[i as usize]
            } else {
                Vec3::ZERO
            }
        };
        posed
            .triangles()
            .iter()
            .filter_map(|tri| {
                Polygon::new(
                    tri.iter()
                        .map(|&i| Vertex::new(posed.positions()[i as usize], normal(i)))
                        .collect(),
                )
            })
            .zip(first_source..)
            .map(|(polygon, source)| polygon.with_source(source))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsgOperation {
    /// Volume of A outside B.
    Subtraction,
    /// Volume shared by A and B.
    Intersection,
}

/// Boolean evaluator.  With `use_normals` off, output normals are flat face
/// normals and vertex normals are never interpolated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluator {
    pub use_normals: bool,
    /// Polygons either tree may hold before the operation gives up.
    pub polygon_budget: usize,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self {
            use_normals: true,
            polygon_budget: CSG_POLYGON_BUDGET,
        }
    }
}

impl Evaluator {
    pub fn positions_only() -> Self {
        Self {
            use_normals: false,
            ..Self::default()
        }
    }

    pub fn with_polygon_budget(mut self, budget: usize) -> Self {
        self.polygon_budget = budget;
        self
    }

    pub fn evaluate(&self, a: &Brush, b: &Brush, operation: CsgOperation) -> FractureResult<FlatMesh> {
        if a.mesh.is_empty() {
            return Err(FractureError::EmptyOperand { operand: "a" });
        }
        if b.mesh.is_empty() {
            return Err(FractureError::EmptyOperand { operand: "b" });
        }

        let polygons_a = a.polygons(self.use_normals, 0);
        let polygons_b = b.polygons(self.use_normals, polygons_a.len() as u32);
        let originals: Vec<Polygon> = polygons_a.iter().chain(&polygons_b).cloned().collect();
        let mut clipped = vec![false; originals.len()];

        let budget = self.polygon_budget;
        let mut a = BspTree::from_polygons(polygons_a, budget)?;
        let mut b = BspTree::from_polygons(polygons_b, budget)?;

        match operation {
            CsgOperation::Subtraction => {
                a.invert();
                a.clip_to(&b, &mut clipped)?;
                b.clip_to(&a, &mut clipped)?;
                b.invert();
                b.clip_to(&a, &mut clipped)?;
                b.invert();
                a.build(b.all_polygons())?;
                a.invert();
            }
            CsgOperation::Intersection => {
                a.invert();
                b.clip_to(&a, &mut clipped)?;
                b.invert();
                a.clip_to(&b, &mut clipped)?;
                b.clip_to(&a, &mut clipped)?;
                a.build(b.all_polygons())?;
                a.invert();
            }
        }

        let polygons = reassemble(a.all_polygons(), &originals, &clipped);
        Ok(self.triangulate(&polygons))
    }

    /// Fan-triangulate convex polygons into a flat triangle list.
    fn triangulate(&self, polygons: &[Polygon]) -> FlatMesh {
        let mut out = FlatMesh::default();
        for polygon in polygons {
            let v = &polygon.vertices;
            for i in 1..v.len() - 1 {
                let corners = [v[0], v[i], v[i + 1]];
                out.positions.extend(corners.iter().map(|c| c.pos));
                if self.use_normals {
                    out.normals
                        .extend(corners.iter().map(|c| c.normal.normalize_or_zero()));
                } else {
                    let n = face_normal(corners[0].pos, corners[1].pos, corners[2].pos);
                    out.normals.extend([n, n, n]);
                }
            }
        }
        out
    }
}

/// Replace the pieces of every operand triangle that lost nothing to
/// clipping with the triangle itself, oriented like its pieces.
fn reassemble(pieces: Vec<Polygon>, originals: &[Polygon], clipped: &[bool]) -> Vec<Polygon> {
    let mut emitted = vec![false; originals.len()];
    let mut out = Vec::with_capacity(pieces.len());
    for piece in pieces {
        let source = piece.source as usize;
        if clipped.get(source).copied().unwrap_or(true) {
            out.push(piece);
            continue;
        }
        if std::mem::replace(&mut emitted[source], true) {
            continue;
        }
        let mut whole = originals[source].clone();
        if whole.plane.normal.dot(piece.plane.normal) < 0.0 {
            whole.flip();
        }
        out.push(whole);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::primitives::{box_mesh, icosphere};

    fn unit_box() -> Brush {
        Brush::new(box_mesh(Vec3::ONE))
    }

    /// Slab covering x ∈ [0, 2] and overhanging the unit box on every other side.
    fn right_slab() -> Brush {
        Brush::new(box_mesh(Vec3::new(1.0, 2.0, 2.0))).with_translation(Vec3::X)
    }

    fn volume(flat: &FlatMesh) -> f32 {
        TriMesh::from_flat(&flat.positions).signed_volume()
    }

    #[test]
    fn subtraction_keeps_the_far_half() {
        let out = Evaluator::default()
            .evaluate(&unit_box(), &right_slab(), CsgOperation::Subtraction)
            .unwrap();
        assert!((volume(&out) - 4.0).abs() < 1e-3, "volume {}", volume(&out));
        assert!(out.positions.iter().all(|p| p.x <= 1e-4));
    }

    #[test]
    fn intersection_keeps_the_near_half() {
        let out = Evaluator::default()
            .evaluate(&unit_box(), &right_slab(), CsgOperation::Intersection)
            .unwrap();
        assert!((volume(&out) - 4.0).abs() < 1e-3, "volume {}", volume(&out));
        assert!(out.positions.iter().all(|p| p.x >= -1e-4));
    }

    #[test]
    fn halves_partition_a_sphere() {
        let sphere = Brush::new(icosphere(1.0, 2));
        let cutter = Brush::new(box_mesh(Vec3::splat(2.0)))
            .with_rotation(Quat::from_rotation_z(0.4))
            .with_translation(Vec3::new(1.7, 0.2, 0.0));
        let eval = Evaluator::positions_only();
        let far = eval.evaluate(&sphere, &cutter, CsgOperation::Subtraction).unwrap();
        let near = eval.evaluate(&sphere, &cutter, CsgOperation::Intersection).unwrap();

        let whole = sphere.mesh.signed_volume();
        let (vf, vn) = (volume(&far), volume(&near));
        assert!(vf > 0.0 && vn > 0.0);
        assert!(vf < whole && vn < whole);
        assert!((vf + vn - whole).abs() < 1e-3 * whole, "{vf} + {vn} vs {whole}");
    }

    #[test]
    fn untouched_triangles_come_back_whole() {
        let sphere = Brush::new(icosphere(1.0, 2));
        // The cutter's side planes cross the whole sphere, but only the +X
        // cap is actually inside it.
        let cutter = Brush::new(box_mesh(Vec3::splat(0.5))).with_translation(Vec3::X * 1.2);
        let out = Evaluator::positions_only()
            .evaluate(&sphere, &cutter, CsgOperation::Subtraction)
            .unwrap();

        let far_side = |tri: &[Vec3]| tri.iter().all(|p| p.x < 0.3);
        let before = sphere.mesh.corners().filter(|t| far_side(t)).count();
        let after = out.positions.chunks_exact(3).filter(|t| far_side(t)).count();
        assert!(before > 100);
        assert_eq!(after, before);
    }

    #[test]
    fn exhausted_budget_is_an_error() {
        let sphere = Brush::new(icosphere(1.0, 2));
        let err = Evaluator::default()
            .with_polygon_budget(50)
            .evaluate(&sphere, &right_slab(), CsgOperation::Intersection)
            .unwrap_err();
        assert!(matches!(err, FractureError::CsgBudgetExceeded { budget: 50, .. }));
    }

    #[test]
    fn disjoint_operands() {
        let far_away = Brush::new(box_mesh(Vec3::ONE)).with_translation(Vec3::splat(10.0));
        let eval = Evaluator::default();
        let kept = eval.evaluate(&unit_box(), &far_away, CsgOperation::Subtraction).unwrap();
        assert!((volume(&kept) - 8.0).abs() < 1e-4);
        let none = eval.evaluate(&unit_box(), &far_away, CsgOperation::Intersection).unwrap();
        assert_eq!(none.triangle_count(), 0);
    }

    #[test]
    fn normals_are_unit_length_when_propagated() {
        let out = Evaluator::default()
            .evaluate(&Brush::new(icosphere(1.0, 1)), &right_slab(), CsgOperation::Subtraction)
            .unwrap();
        assert_eq!(out.normals.len(), out.positions.len());
        assert!(out.normals.iter().all(|n| (n.length() - 1.0).abs() < 1e-3));
    }

    #[test]
    fn flat_brush_keeps_supplied_normals() {
        let flat = box_mesh(Vec3::ONE).to_flat_mesh();
        let brush = Brush::from_flat(&flat).with_rotation(Quat::from_rotation_z(0.3));
        assert_eq!(brush.normals, flat.normals);
        let far_away = Brush::new(box_mesh(Vec3::ONE)).with_translation(Vec3::splat(10.0));
        let out = Evaluator::default()
            .evaluate(&brush, &far_away, CsgOperation::Subtraction)
            .unwrap();
        // Untouched faces come back with their flat normals, rotated.
        for (p, n) in out.positions.chunks_exact(3).zip(out.normals.chunks_exact(3)) {
            let face = face_normal(p[0], p[1], p[2]);
            assert!(n.iter().all(|n| n.distance(face) < 1e-4));
        }
    }

    #[test]
    fn empty_operand_is_rejected() {
        let err = Evaluator::default()
            .evaluate(&unit_box(), &Brush::new(TriMesh::default()), CsgOperation::Subtraction)
            .unwrap_err();
        assert_eq!(err, FractureError::EmptyOperand { operand: "b" });
    }
}
