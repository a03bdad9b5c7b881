//! BSP-tree boolean kernel.
//!
//! Each operand is held as a binary space partition whose splitting planes are
//! taken from its own polygons.  Clipping one tree against another removes
//! every polygon fragment lying inside (or outside) the other solid; the
//! boolean operations in [`super`] are sequences of clip/invert/build steps
//! over two such trees.
//!
//! Nodes live in a flat arena and every traversal runs off an explicit work
//! list, so a deep tree costs heap, never thread stack.  The split worker runs
//! on pool threads with small stacks.
//!
//! Polygons are convex and keep the plane of the face they were cut from, so
//! repeated splitting never accumulates normal drift.  Each one also keeps the
//! index of the operand triangle it came from; the evaluator uses that to
//! reassemble triangles that were split but never clipped.

use crate::error::{FractureError, FractureResult};
use bevy::math::Vec3;

/// Thickness of a plane for point classification.
pub const PLANE_EPSILON: f32 = 1e-5;

const COPLANAR: u8 = 0;
const FRONT: u8 = 1;
const BACK: u8 = 2;
const SPANNING: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub pos: Vec3,
    pub normal: Vec3,
}

impl Vertex {
    pub fn new(pos: Vec3, normal: Vec3) -> Self {
        Self { pos, normal }
    }

    fn interpolate(&self, other: &Vertex, t: f32) -> Vertex {
        Vertex {
            pos: self.pos.lerp(other.pos, t),
            normal: self.normal.lerp(other.normal, t),
        }
    }

    fn flip(&mut self) {
        self.normal = -self.normal;
    }
}

/// Oriented plane `normal · p = w`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub w: f32,
}

impl Plane {
    /// Plane through three points, `None` when they are collinear.
    pub fn from_points(a: Vec3, b: Vec3, c: Vec3) -> Option<Plane> {
        let normal = (b - a).cross(c - a).try_normalize()?;
        Some(Plane {
            normal,
            w: normal.dot(a),
        })
    }

    pub fn flip(&mut self) {
        self.normal = -self.normal;
        self.w = -self.w;
    }

    #[inline]
    fn classify(&self, point: Vec3) -> u8 {
        let distance = self.normal.dot(point) - self.w;
        if distance < -PLANE_EPSILON {
            BACK
        } else if distance > PLANE_EPSILON {
            FRONT
        } else {
            COPLANAR
        }
    }

    /// Classify `polygon` against this plane, cutting it in two when it spans.
    fn split(&self, polygon: Polygon) -> Split {
        let types: Vec<u8> = polygon
            .vertices
            .iter()
            .map(|v| self.classify(v.pos))
            .collect();
        let polygon_type = types.iter().fold(COPLANAR, |acc, t| acc | t);

        match polygon_type {
            COPLANAR if self.normal.dot(polygon.plane.normal) > 0.0 => Split::CoplanarFront(polygon),
            COPLANAR => Split::CoplanarBack(polygon),
            FRONT => Split::Front(polygon),
            BACK => Split::Back(polygon),
            _ => {
                let n = polygon.vertices.len();
                let mut front = Vec::with_capacity(n + 1);
                let mut back = Vec::with_capacity(n + 1);
                for i in 0..n {
                    let j = (i + 1) % n;
                    let (ti, tj) = (types[i], types[j]);
                    let (vi, vj) = (&polygon.vertices[i], &polygon.vertices[j]);
                    if ti != BACK {
                        front.push(*vi);
                    }
                    if ti != FRONT {
                        back.push(*vi);
                    }
                    if (ti | tj) == SPANNING {
                        let t = (self.w - self.normal.dot(vi.pos))
                            / self.normal.dot(vj.pos - vi.pos);
                        let v = vi.interpolate(vj, t);
                        front.push(v);
                        back.push(v);
                    }
                }
                let (plane, source) = (polygon.plane, polygon.source);
                Split::Spanning {
                    front: (front.len() >= 3).then(|| Polygon::piece(front, plane, source)),
                    back: (back.len() >= 3).then(|| Polygon::piece(back, plane, source)),
                }
            }
        }
    }
}

enum Split {
    CoplanarFront(Polygon),
    CoplanarBack(Polygon),
    Front(Polygon),
    Back(Polygon),
    Spanning {
        front: Option<Polygon>,
        back: Option<Polygon>,
    },
}

impl Split {
    /// Net change in polygon count caused by this split.
    fn growth(&self) -> isize {
        match self {
            Split::Spanning { front, back } => {
                front.is_some() as isize + back.is_some() as isize - 1
            }
            _ => 0,
        }
    }
}

/// Convex planar polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub vertices: Vec<Vertex>,
    pub plane: Plane,
    /// Index of the operand triangle this polygon was cut from.
    pub source: u32,
}

impl Polygon {
    /// Polygon with its plane taken from the first three vertices.  Returns
    /// `None` for fewer than three vertices or a zero-area leading corner.
    pub fn new(vertices: Vec<Vertex>) -> Option<Polygon> {
        if vertices.len() < 3 {
            return None;
        }
        let plane = Plane::from_points(vertices[0].pos, vertices[1].pos, vertices[2].pos)?;
        Some(Polygon {
            vertices,
            plane,
            source: 0,
        })
    }

    pub fn with_source(mut self, source: u32) -> Polygon {
        self.source = source;
        self
    }

    fn piece(vertices: Vec<Vertex>, plane: Plane, source: u32) -> Polygon {
        Polygon {
            vertices,
            plane,
            source,
        }
    }

    pub fn flip(&mut self) {
        self.vertices.reverse();
        self.vertices.iter_mut().for_each(Vertex::flip);
        self.plane.flip();
    }
}

/// One arena slot.  Only the root may be without a plane, and only while the
/// tree is empty.
#[derive(Debug, Clone, Default)]
struct Node {
    plane: Option<Plane>,
    front: Option<usize>,
    back: Option<usize>,
    polygons: Vec<Polygon>,
}

/// Solid represented as a BSP tree.  Node 0 is the root.
#[derive(Debug, Clone)]
pub struct BspTree {
    nodes: Vec<Node>,
    budget: usize,
}

impl BspTree {
    /// Empty tree that refuses to grow past `budget` polygons.
    pub fn new(budget: usize) -> Self {
        Self {
            nodes: vec![Node::default()],
            budget,
        }
    }

    pub fn from_polygons(polygons: Vec<Polygon>, budget: usize) -> FractureResult<Self> {
        let mut tree = Self::new(budget);
        tree.build(polygons)?;
        Ok(tree)
    }

    pub fn polygon_count(&self) -> usize {
        self.nodes.iter().map(|n| n.polygons.len()).sum()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Swap solid and empty space.
    pub fn invert(&mut self) {
        for node in &mut self.nodes {
            node.polygons.iter_mut().for_each(Polygon::flip);
            if let Some(plane) = &mut node.plane {
                plane.flip();
            }
            std::mem::swap(&mut node.front, &mut node.back);
        }
    }

    /// Remove the parts of `polygons` that lie inside this tree's solid.
    ///
    /// Every source whose piece is removed gets flagged in `clipped`; sources
    /// outside its range are not tracked.
    pub fn clip_polygons(
        &self,
        polygons: Vec<Polygon>,
        clipped: &mut [bool],
    ) -> FractureResult<Vec<Polygon>> {
        let mut live = polygons.len();
        let mut kept = Vec::with_capacity(polygons.len());
        let mut work = vec![(0usize, polygons)];

        while let Some((index, polygons)) = work.pop() {
            let node = &self.nodes[index];
            let Some(plane) = node.plane else {
                kept.extend(polygons);
                continue;
            };

            let mut front = Vec::new();
            let mut back = Vec::new();
            for polygon in polygons {
                let split = plane.split(polygon);
                live = live.saturating_add_signed(split.growth());
                match split {
                    Split::CoplanarFront(p) | Split::Front(p) => front.push(p),
                    Split::CoplanarBack(p) | Split::Back(p) => back.push(p),
                    Split::Spanning { front: f, back: b } => {
                        front.extend(f);
                        back.extend(b);
                    }
                }
            }
            self.check_budget(live)?;

            match node.front {
                Some(child) if !front.is_empty() => work.push((child, front)),
                _ => kept.extend(front),
            }
            match node.back {
                Some(child) if !back.is_empty() => work.push((child, back)),
                Some(_) => {}
                None => {
                    live = live.saturating_sub(back.len());
                    for polygon in back {
                        if let Some(flag) = clipped.get_mut(polygon.source as usize) {
                            *flag = true;
                        }
                    }
                }
            }
        }
        Ok(kept)
    }

    /// Remove every polygon of this tree lying inside `other`.
    pub fn clip_to(&mut self, other: &BspTree, clipped: &mut [bool]) -> FractureResult<()> {
        for node in &mut self.nodes {
            let polygons = std::mem::take(&mut node.polygons);
            node.polygons = other.clip_polygons(polygons, clipped)?;
        }
        Ok(())
    }

    pub fn all_polygons(&self) -> Vec<Polygon> {
        self.nodes
            .iter()
            .flat_map(|n| n.polygons.iter().cloned())
            .collect()
    }

    /// Insert polygons into the tree, splitting them where they cross
    /// existing planes.
    ///
    /// A node without a plane takes it from the first polygon that reaches it
    /// and stores that polygon unconditionally.  Re-classifying a sliver
    /// against its own plane can put it in front of itself, and it would then
    /// descend forever.
    pub fn build(&mut self, polygons: Vec<Polygon>) -> FractureResult<()> {
        let mut live = self.polygon_count() + polygons.len();
        self.check_budget(live)?;
        let mut work = vec![(0usize, polygons)];

        while let Some((index, polygons)) = work.pop() {
            let mut rest = polygons.into_iter();
            let node = &mut self.nodes[index];
            let plane = match node.plane {
                Some(plane) => plane,
                None => {
                    let Some(first) = rest.next() else {
                        continue;
                    };
                    let plane = first.plane;
                    node.plane = Some(plane);
                    node.polygons.push(first);
                    plane
                }
            };

            let mut front = Vec::new();
            let mut back = Vec::new();
            for polygon in rest {
                let split = plane.split(polygon);
                live = live.saturating_add_signed(split.growth());
                match split {
                    Split::CoplanarFront(p) | Split::CoplanarBack(p) => node.polygons.push(p),
                    Split::Front(p) => front.push(p),
                    Split::Back(p) => back.push(p),
                    Split::Spanning { front: f, back: b } => {
                        front.extend(f);
                        back.extend(b);
                    }
                }
            }
            self.check_budget(live)?;

            if !front.is_empty() {
                let child = self.child(index, true);
                work.push((child, front));
            }
            if !back.is_empty() {
                let child = self.child(index, false);
                work.push((child, back));
            }
        }
        Ok(())
    }

    fn child(&mut self, index: usize, front: bool) -> usize {
        let existing = if front {
            self.nodes[index].front
        } else {
            self.nodes[index].back
        };
        if let Some(child) = existing {
            return child;
        }
        let child = self.nodes.len();
        self.nodes.push(Node::default());
        if front {
            self.nodes[index].front = Some(child);
        } else {
            self.nodes[index].back = Some(child);
        }
        child
    }

    fn check_budget(&self, live: usize) -> FractureResult<()> {
        if live > self.budget {
            Err(FractureError::CsgBudgetExceeded {
                polygons: live,
                budget: self.budget,
            })
        } else {
            Ok(())
        }
    }
}
