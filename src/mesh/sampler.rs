//! Area-weighted random points on a mesh surface.
//!
//! Used to seed debris and impact particles: a sampled point lands on a
//! triangle with probability proportional to that triangle's area, and is
//! uniformly distributed inside it.

use super::{triangle_area, TriMesh};
use bevy::math::Vec3;
use rand::Rng;

#[derive(Debug, Clone)]
pub struct SurfaceSampler {
    corners: Vec<[Vec3; 3]>,
    /// Running total of triangle areas; `cumulative[i]` covers triangles `0..=i`.
    cumulative: Vec<f32>,
}

impl SurfaceSampler {
    /// Precompute triangle areas.  `None` when the mesh has no area to sample.
    pub fn new(mesh: &TriMesh) -> Option<Self> {
        let corners: Vec<[Vec3; 3]> = mesh.corners().collect();
        let cumulative: Vec<f32> = corners
            .iter()
            .scan(0.0_f32, |total, [a, b, c]| {
                *total += triangle_area(*a, *b, *c);
                Some(*total)
            })
            .collect();

        match cumulative.last() {
            Some(&total) if total > 0.0 => Some(Self { corners, cumulative }),
            _ => None,
        }
    }

    pub fn total_area(&self) -> f32 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    /// Index of the triangle a fresh draw lands on.
    fn pick_triangle(&self, rng: &mut impl Rng) -> usize {
        let target = rng.gen_range(0.0..self.total_area());
        self.cumulative
            .partition_point(|&c| c <= target)
            .min(self.corners.len() - 1)
    }

    /// One independent surface point in the mesh's local frame.
    pub fn random_point(&self, rng: &mut impl Rng) -> Vec3 {
        let [a, b, c] = self.corners[self.pick_triangle(rng)];
        let mut u: f32 = rng.gen();
        let mut v: f32 = rng.gen();
        // Fold the unit square onto the triangle.
        if u + v > 1.0 {
            u = 1.0 - u;
            v = 1.0 - v;
        }
        a + (b - a) * u + (c - a) * v
    }

    pub fn sample(&self, count: usize, rng: &mut impl Rng) -> Vec<Vec3> {
        (0..count).map(|_| self.random_point(rng)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::primitives::box_mesh;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Two triangles in the XY plane: one of area 0.5, one of area 4.5.
    fn lopsided() -> TriMesh {
        TriMesh::new(
            vec![
                Vec3::ZERO,
                Vec3::X,
                Vec3::Y,
                Vec3::new(10.0, 0.0, 0.0),
                Vec3::new(13.0, 0.0, 0.0),
                Vec3::new(10.0, 3.0, 0.0),
            ],
            vec![[0, 1, 2], [3, 4, 5]],
        )
    }

    #[test]
    fn draws_follow_triangle_area() {
        let sampler = SurfaceSampler::new(&lopsided()).unwrap();
        assert!((sampler.total_area() - 5.0).abs() < 1e-5);

        let mut rng = StdRng::seed_from_u64(42);
        let n = 20_000;
        let small = sampler
            .sample(n, &mut rng)
            .iter()
            .filter(|p| p.x < 5.0)
            .count();
        let fraction = small as f32 / n as f32;
        assert!((fraction - 0.1).abs() < 0.015, "fraction {fraction}");
    }

    #[test]
    fn points_stay_inside_their_triangle() {
        let sampler = SurfaceSampler::new(&lopsided()).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        for p in sampler.sample(2_000, &mut rng) {
            assert_eq!(p.z, 0.0);
            if p.x < 5.0 {
                assert!(p.x >= 0.0 && p.y >= 0.0 && p.x + p.y <= 1.0 + 1e-5);
            } else {
                let (x, y) = (p.x - 10.0, p.y);
                assert!(x >= -1e-5 && y >= -1e-5 && x + y <= 3.0 + 1e-4);
            }
        }
    }

    #[test]
    fn points_lie_on_the_box_surface() {
        let sampler = SurfaceSampler::new(&box_mesh(Vec3::ONE)).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        for p in sampler.sample(500, &mut rng) {
            let on_face = p.abs().max_element();
            assert!((on_face - 1.0).abs() < 1e-5, "{p:?} is off the surface");
        }
    }

    #[test]
    fn zero_area_mesh_has_no_sampler() {
        // Every corner on one line.
        let flat = TriMesh::new(vec![Vec3::ZERO, Vec3::X, Vec3::X * 2.0], vec![[0, 1, 2]]);
        assert!(SurfaceSampler::new(&flat).is_none());
        assert!(SurfaceSampler::new(&TriMesh::default()).is_none());
    }

    #[test]
    fn same_seed_same_points() {
        let sampler = SurfaceSampler::new(&box_mesh(Vec3::ONE)).unwrap();
        let a = sampler.sample(8, &mut StdRng::seed_from_u64(5));
        let b = sampler.sample(8, &mut StdRng::seed_from_u64(5));
        assert_eq!(a, b);
    }
}
