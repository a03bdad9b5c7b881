//! Closed primitive meshes: icosahedra, icospheres and boxes.
//!
//! All builders return outward-wound, fully shared (watertight) meshes
//! centred on the origin.

use super::adjacency::edge_key;
use super::TriMesh;
use bevy::math::Vec3;
use rand::Rng;
use std::collections::HashMap;

/// Regular icosahedron with its vertices on a sphere of `radius`.
pub fn icosahedron(radius: f32) -> TriMesh {
    let t = (1.0 + 5.0_f32.sqrt()) * 0.5;
    let positions = [
        [-1.0, t, 0.0],
        [1.0, t, 0.0],
        [-1.0, -t, 0.0],
        [1.0, -t, 0.0],
        [0.0, -1.0, t],
        [0.0, 1.0, t],
        [0.0, -1.0, -t],
        [0.0, 1.0, -t],
        [t, 0.0, -1.0],
        [t, 0.0, 1.0],
        [-t, 0.0, -1.0],
        [-t, 0.0, 1.0],
    ]
    .into_iter()
    .map(|p| Vec3::from_array(p).normalize() * radius)
    .collect();

    let triangles = vec![
        [0, 11, 5],
        [0, 5, 1],
        [0, 1, 7],
        [0, 7, 10],
        [0, 10, 11],
        [1, 5, 9],
        [5, 11, 4],
        [11, 10, 2],
        [10, 7, 6],
        [7, 1, 8],
        [3, 9, 4],
        [3, 4, 2],
        [3, 2, 6],
        [3, 6, 8],
        [3, 8, 9],
        [4, 9, 5],
        [2, 4, 11],
        [6, 2, 10],
        [8, 6, 7],
        [9, 8, 1],
    ];

    TriMesh::new(positions, triangles)
}

/// Icosahedron subdivided `detail` times, every vertex pushed back out to
/// the sphere.  Each level quadruples the triangle count.
pub fn icosphere(radius: f32, detail: u32) -> TriMesh {
    let base = icosahedron(radius);
    let mut positions = base.positions().to_vec();
    let mut triangles = base.triangles().to_vec();

    for _ in 0..detail {
        let mut midpoints: HashMap<(u32, u32), u32> = HashMap::new();
        let mut midpoint = |a: u32, b: u32, positions: &mut Vec<Vec3>| -> u32 {
            *midpoints.entry(edge_key(a, b)).or_insert_with(|| {
                let mid = (positions[a as usize] + positions[b as usize]) * 0.5;
                positions.push(mid.normalize() * radius);
                (positions.len() - 1) as u32
            })
        };

        let mut next = Vec::with_capacity(triangles.len() * 4);
        for [a, b, c] in triangles {
            let ab = midpoint(a, b, &mut positions);
            let bc = midpoint(b, c, &mut positions);
            let ca = midpoint(c, a, &mut positions);
            next.extend([[a, ab, ca], [b, bc, ab], [c, ca, bc], [ab, bc, ca]]);
        }
        triangles = next;
    }

    TriMesh::new(positions, triangles)
}

/// Icosphere with every vertex pushed in or out radially by up to
/// `roughness × radius`.  Radial displacement keeps the solid star-shaped,
/// so winding and watertightness survive.
pub fn noisy_icosphere(radius: f32, detail: u32, roughness: f32, rng: &mut impl Rng) -> TriMesh {
    let sphere = icosphere(radius, detail);
    let roughness = roughness.clamp(0.0, 0.9);
    let positions = sphere
        .positions()
        .iter()
        .map(|p| {
            let scale = if roughness > 0.0 {
                1.0 + rng.gen_range(-roughness..=roughness)
            } else {
                1.0
            };
            *p * scale
        })
        .collect();
    TriMesh::new(positions, sphere.triangles().to_vec())
}

/// Axis-aligned box spanning `-half_extents..=half_extents`.
///
/// Vertex `i` takes the positive extent on X, Y, Z for bits 0, 1, 2 of `i`.
pub fn box_mesh(half_extents: Vec3) -> TriMesh {
    let positions = (0..8)
        .map(|i| {
            let sign = |bit: u32| if i & (1 << bit) != 0 { 1.0 } else { -1.0 };
            Vec3::new(sign(0), sign(1), sign(2)) * half_extents
        })
        .collect();
    let triangles = vec![
        // -Z
        [0, 2, 1],
        [1, 2, 3],
        // +Z
        [4, 5, 7],
        [4, 7, 6],
        // -Y
        [0, 1, 5],
        [0, 5, 4],
        // +Y
        [2, 6, 7],
        [2, 7, 3],
        // -X
        [0, 4, 6],
        [0, 6, 2],
        // +X
        [1, 3, 7],
        [1, 7, 5],
    ];
    TriMesh::new(positions, triangles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::repair::open_edges;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::f32::consts::PI;

    fn assert_outward(mesh: &TriMesh) {
        for [a, b, c] in mesh.corners() {
            let n = (b - a).cross(c - a);
            assert!(n.dot(a + b + c) > 0.0, "inward face at {a:?}");
        }
    }

    #[test]
    fn icosahedron_is_closed_and_outward() {
        let ico = icosahedron(2.0);
        assert_eq!(ico.vertex_count(), 12);
        assert_eq!(ico.triangle_count(), 20);
        assert!(open_edges(&ico).is_empty());
        assert_outward(&ico);
        assert!(ico.positions().iter().all(|p| (p.length() - 2.0).abs() < 1e-5));
    }

    #[test]
    fn icosphere_shares_midpoints() {
        let sphere = icosphere(1.0, 2);
        // V = 10·4^d + 2, F = 20·4^d
        assert_eq!(sphere.vertex_count(), 162);
        assert_eq!(sphere.triangle_count(), 320);
        assert!(open_edges(&sphere).is_empty());
        assert_outward(&sphere);
    }

    #[test]
    fn icosphere_volume_approaches_the_ball() {
        let ball = 4.0 / 3.0 * PI;
        let coarse = icosphere(1.0, 1).volume();
        let fine = icosphere(1.0, 3).volume();
        assert!(coarse < fine && fine < ball);
        assert!((ball - fine) / ball < 0.02);
    }

    #[test]
    fn noisy_icosphere_stays_closed_and_bounded() {
        let mut rng = StdRng::seed_from_u64(7);
        let rock = noisy_icosphere(2.0, 1, 0.2, &mut rng);
        assert!(open_edges(&rock).is_empty());
        assert!(rock.signed_volume() > 0.0);
        for p in rock.positions() {
            let r = p.length();
            assert!((1.6 - 1e-4..=2.4 + 1e-4).contains(&r), "radius {r}");
        }
    }

    #[test]
    fn box_has_expected_extent() {
        let b = box_mesh(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(b.aabb(), Some((Vec3::new(-1.0, -2.0, -3.0), Vec3::new(1.0, 2.0, 3.0))));
        assert!((b.signed_volume() - 48.0).abs() < 1e-4);
        assert!(open_edges(&b).is_empty());
        assert_outward(&b);
    }
}
