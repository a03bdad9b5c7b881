//! Edge adjacency derived from a triangle list.
//!
//! The graph is ephemeral: build it from a mesh, query it, throw it away.  Any
//! change to the triangle list invalidates it.

use super::TriMesh;
use std::collections::HashMap;

/// Undirected edge key with the smaller index first.
#[inline]
pub fn edge_key(a: u32, b: u32) -> (u32, u32) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Directed edges of a triangle in winding order.
#[inline]
pub fn triangle_edges(tri: [u32; 3]) -> [(u32, u32); 3] {
    [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])]
}

#[derive(Debug, Clone, Default)]
pub struct EdgeAdjacency {
    edge_triangles: HashMap<(u32, u32), Vec<usize>>,
    /// Uses of each directed edge.
    directed: HashMap<(u32, u32), usize>,
}

impl EdgeAdjacency {
    pub fn build(mesh: &TriMesh) -> Self {
        Self::from_triangles(mesh.triangles())
    }

    /// Build from a bare triangle list.  Edges of collapsed triangles that
    /// join a vertex to itself are skipped.
    pub fn from_triangles(triangles: &[[u32; 3]]) -> Self {
        let mut edge_triangles: HashMap<(u32, u32), Vec<usize>> = HashMap::new();
        let mut directed: HashMap<(u32, u32), usize> = HashMap::with_capacity(triangles.len() * 3);

        for (t, tri) in triangles.iter().enumerate() {
            for (a, b) in triangle_edges(*tri) {
                if a == b {
                    continue;
                }
                edge_triangles.entry(edge_key(a, b)).or_default().push(t);
                *directed.entry((a, b)).or_default() += 1;
            }
        }

        Self {
            edge_triangles,
            directed,
        }
    }

    /// Indices of every triangle using the undirected edge `a`–`b`.
    pub fn triangles_on_edge(&self, a: u32, b: u32) -> &[usize] {
        self.edge_triangles
            .get(&edge_key(a, b))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn uses(&self, a: u32, b: u32) -> usize {
        self.directed.get(&(a, b)).copied().unwrap_or(0)
    }

    /// True when the directed edge `a → b` has no opposite `b → a` in any
    /// triangle, i.e. nothing closes the surface across it.
    pub fn is_boundary(&self, a: u32, b: u32) -> bool {
        self.uses(a, b) > 0 && self.uses(b, a) == 0
    }

    /// Undirected edges used by exactly one triangle, ascending.
    pub fn open_edges(&self) -> Vec<(u32, u32)> {
        let mut open: Vec<_> = self
            .edge_triangles
            .iter()
            .filter(|(_, tris)| tris.len() == 1)
            .map(|(edge, _)| *edge)
            .collect();
        open.sort_unstable();
        open
    }

    /// Directed edges left over once every use of `a → b` has been matched
    /// with a use of `b → a`.  An edge used twice one way and once the other
    /// appears once.  Sorted, so callers walk them deterministically.
    ///
    /// Empty exactly when the surface is closed.
    pub fn unmatched_edges(&self) -> Vec<(u32, u32)> {
        let mut unmatched = Vec::new();
        for (&(a, b), &count) in &self.directed {
            let excess = count.saturating_sub(self.uses(b, a));
            unmatched.extend(std::iter::repeat((a, b)).take(excess));
        }
        unmatched.sort_unstable();
        unmatched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::math::Vec3;

    fn quad() -> TriMesh {
        TriMesh::new(
            vec![
                Vec3::ZERO,
                Vec3::X,
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::Y,
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
    }

    #[test]
    fn diagonal_is_shared_and_closed() {
        let adj = EdgeAdjacency::build(&quad());
        assert_eq!(adj.triangles_on_edge(2, 0), &[0, 1]);
        assert!(!adj.is_boundary(2, 0));
        assert!(!adj.is_boundary(0, 2));
    }

    #[test]
    fn outer_edges_are_boundary() {
        let adj = EdgeAdjacency::build(&quad());
        assert!(adj.is_boundary(0, 1));
        assert!(adj.is_boundary(3, 0));
        // Only the stored direction counts.
        assert!(!adj.is_boundary(1, 0));
        assert_eq!(adj.open_edges(), vec![(0, 1), (0, 3), (1, 2), (2, 3)]);
    }

    #[test]
    fn unmatched_edges_trace_the_rim() {
        let adj = EdgeAdjacency::build(&quad());
        assert_eq!(adj.unmatched_edges(), vec![(0, 1), (1, 2), (2, 3), (3, 0)]);
    }

    #[test]
    fn overused_edge_leaves_one_unmatched_use() {
        // Edge 0→1 appears in two triangles, 1→0 in one.
        let adj = EdgeAdjacency::from_triangles(&[[0, 1, 2], [0, 1, 3], [1, 0, 4]]);
        assert!(!adj.is_boundary(0, 1));
        assert!(adj.open_edges().iter().all(|&e| e != (0, 1)));
        let unmatched = adj.unmatched_edges();
        assert_eq!(unmatched.iter().filter(|&&e| e == (0, 1)).count(), 1);
        assert!(!unmatched.contains(&(1, 0)));
    }
}
