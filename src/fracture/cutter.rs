//! The cutter solid used to fracture an asteroid.
//!
//! A box whose top face is replaced by a subdivided, jittered grid: the
//! "crack" face.  Subtracting the cutter from an asteroid (or intersecting
//! the two) leaves an irregular fracture surface instead of a flat slice.
//!
//! Local frame: the box spans `x, y ∈ [-s/2, s/2]` and `z ∈ [-s, 0]`; the crack
//! face lies at `z = 0` and faces `+Z`.  Posing the cutter therefore means
//! rotating `+Z` onto the impact direction and placing the origin where the
//! crack should run.

use crate::mesh::TriMesh;
use bevy::math::Vec3;
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutterParams {
    /// Edge length `s` of the box.
    pub size: f32,
    /// Grid cells per side of the crack face.
    pub segments: u32,
    /// Jitter of interior crack vertices as a fraction of the cell spacing.
    pub roughness: f32,
}

/// Build a closed, outward-wound cutter.
///
/// Only interior crack vertices are jittered; rim vertices stay on the box
/// edges so the side faces meet the crack face without gaps.  Normals are
/// not stored: [`TriMesh::vertex_normals`] derives them from the jittered
/// positions whenever the cutter is used as a brush.
pub fn build_cutter(params: CutterParams, rng: &mut impl Rng) -> TriMesh {
    let n = params.segments.max(1);
    let s = params.size;
    let half = s * 0.5;
    let spacing = s / n as f32;
    let row = n + 1;
    let top = |i: u32, j: u32| j * row + i;

    // Crack face grid at z = 0, unperturbed for now.
    let mut rest: Vec<Vec3> = (0..row)
        .flat_map(|j| {
            (0..row).map(move |i| Vec3::new(-half + i as f32 * spacing, -half + j as f32 * spacing, 0.0))
        })
        .collect();
    // Bottom corners b0..b3, counter-clockwise seen from +Z.
    let b0 = rest.len() as u32;
    rest.extend([
        Vec3::new(-half, -half, -s),
        Vec3::new(half, -half, -s),
        Vec3::new(half, half, -s),
        Vec3::new(-half, half, -s),
    ]);
    let [b1, b2, b3] = [b0 + 1, b0 + 2, b0 + 3];

    let mut triangles: Vec<[u32; 3]> = Vec::with_capacity((2 * n * n + 4 * (n + 1) + 2) as usize);
    let mut push_facing = |tri: [u32; 3], outward: Vec3, positions: &[Vec3]| {
        let [a, b, c] = tri.map(|i| positions[i as usize]);
        if (b - a).cross(c - a).dot(outward) >= 0.0 {
            triangles.push(tri);
        } else {
            triangles.push([tri[0], tri[2], tri[1]]);
        }
    };

    for j in 0..n {
        for i in 0..n {
            let (a, b, c, d) = (top(i, j), top(i + 1, j), top(i + 1, j + 1), top(i, j + 1));
            push_facing([a, b, c], Vec3::Z, &rest);
            push_facing([a, c, d], Vec3::Z, &rest);
        }
    }

    push_facing([b0, b2, b1], Vec3::NEG_Z, &rest);
    push_facing([b0, b3, b2], Vec3::NEG_Z, &rest);

    // Each side: rim vertices along the top edge, fanned from its first
    // bottom corner, closed by the second.
    let sides: [(Vec<u32>, u32, u32, Vec3); 4] = [
        ((0..row).map(|i| top(i, 0)).collect(), b0, b1, Vec3::NEG_Y),
        ((0..row).map(|j| top(n, j)).collect(), b1, b2, Vec3::X),
        ((0..row).map(|i| top(i, n)).collect(), b3, b2, Vec3::Y),
        ((0..row).map(|j| top(0, j)).collect(), b0, b3, Vec3::NEG_X),
    ];
    for (rim, start, end, outward) in &sides {
        for pair in rim.windows(2) {
            push_facing([*start, pair[0], pair[1]], *outward, &rest);
        }
        if let Some(&last) = rim.last() {
            push_facing([*start, last, *end], *outward, &rest);
        }
    }

    // Jitter interior crack vertices only.
    let jitter = params.roughness * spacing;
    let mut positions = rest;
    if jitter > 0.0 {
        for j in 1..n {
            for i in 1..n {
                let offset = Vec3::new(
                    rng.gen_range(-1.0..=1.0),
                    rng.gen_range(-1.0..=1.0),
                    rng.gen_range(-1.0..=1.0),
                );
                positions[top(i, j) as usize] += offset * jitter;
            }
        }
    }

    TriMesh::new(positions, triangles)
}
