//! Binary space partitioning CSG over triangle soups.
//!
//! Nodes live in an arena and every traversal runs on an explicit worklist,
//! so deep trees cannot overflow the stack.

use crate::math::{Point3, Vector3};

/// Distance within which a point is considered on a splitting plane.
const PLANE_EPSILON: f64 = 1e-5;

const COPLANAR: u8 = 0;
const FRONT: u8 = 1;
const BACK: u8 = 2;
const SPANNING: u8 = 3;

#[derive(Debug, Clone, Copy)]
struct SplitPlane {
    normal: Vector3,
    w: f64,
}

impl SplitPlane {
    fn through(a: &Point3, b: &Point3, c: &Point3) -> Option<Self> {
        let n = (b - a).cross(&(c - a));
        let len = n.norm();
        if len <= f64::EPSILON {
            return None;
        }
        let normal = n / len;
        Some(Self {
            normal,
            w: normal.dot(&a.coords),
        })
    }

    fn flipped(self) -> Self {
        Self {
            normal: -self.normal,
            w: -self.w,
        }
    }
}

/// A convex planar polygon.
#[derive(Debug, Clone)]
pub struct Polygon {
    vertices: Vec<Point3>,
    plane: SplitPlane,
}

impl Polygon {
    /// Builds a polygon from a triangle; `None` if the triangle is degenerate.
    #[must_use]
    pub fn from_triangle(tri: [Point3; 3]) -> Option<Self> {
        let plane = SplitPlane::through(&tri[0], &tri[1], &tri[2])?;
        Some(Self {
            vertices: tri.to_vec(),
            plane,
        })
    }

    /// Fan-triangulates the polygon.
    pub fn triangles(&self) -> impl Iterator<Item = [Point3; 3]> + '_ {
        (1..self.vertices.len().saturating_sub(1))
            .map(move |i| [self.vertices[0], self.vertices[i], self.vertices[i + 1]])
    }

    fn flip(&mut self) {
        self.vertices.reverse();
        self.plane = self.plane.flipped();
    }
}

/// Output buckets of [`split_polygon`].
#[derive(Default)]
struct Split {
    coplanar_front: Vec<Polygon>,
    coplanar_back: Vec<Polygon>,
    front: Vec<Polygon>,
    back: Vec<Polygon>,
}

fn split_polygon(plane: &SplitPlane, polygon: Polygon, out: &mut Split) {
    let mut kind = COPLANAR;
    let types: Vec<u8> = polygon
        .vertices
        .iter()
        .map(|v| {
            let t = plane.normal.dot(&v.coords) - plane.w;
            let ty = if t < -PLANE_EPSILON {
                BACK
            } else if t > PLANE_EPSILON {
                FRONT
            } else {
                COPLANAR
            };
            kind |= ty;
            ty
        })
        .collect();

    match kind {
        COPLANAR => {
            if plane.normal.dot(&polygon.plane.normal) > 0.0 {
                out.coplanar_front.push(polygon);
            } else {
                out.coplanar_back.push(polygon);
            }
        }
        FRONT => out.front.push(polygon),
        BACK => out.back.push(polygon),
        _ => {
            let n = polygon.vertices.len();
            let mut f = Vec::with_capacity(n + 1);
            let mut b = Vec::with_capacity(n + 1);
            for i in 0..n {
                let j = (i + 1) % n;
                let (ti, tj) = (types[i], types[j]);
                let (vi, vj) = (polygon.vertices[i], polygon.vertices[j]);
                if ti != BACK {
                    f.push(vi);
                }
                if ti != FRONT {
                    b.push(vi);
                }
                if (ti | tj) == SPANNING {
                    let t = (plane.w - plane.normal.dot(&vi.coords))
                        / plane.normal.dot(&(vj - vi));
                    let v = vi + (vj - vi) * t;
                    f.push(v);
                    b.push(v);
                }
            }
            if f.len() >= 3 {
                out.front.push(Polygon {
                    vertices: f,
                    plane: polygon.plane,
                });
            }
            if b.len() >= 3 {
                out.back.push(Polygon {
                    vertices: b,
                    plane: polygon.plane,
                });
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Node {
    plane: Option<SplitPlane>,
    front: Option<usize>,
    back: Option<usize>,
    polygons: Vec<Polygon>,
}

/// A BSP tree over a closed polygon set.
#[derive(Debug, Clone)]
pub struct BspTree {
    nodes: Vec<Node>,
}

impl BspTree {
    /// Builds a tree from polygons.
    #[must_use]
    pub fn new(polygons: Vec<Polygon>) -> Self {
        let mut tree = Self {
            nodes: vec![Node::default()],
        };
        tree.build(polygons);
        tree
    }

    /// Inserts polygons into the tree.
    pub fn build(&mut self, polygons: Vec<Polygon>) {
        let mut work = vec![(0usize, polygons)];
        while let Some((id, polygons)) = work.pop() {
            let Some(first) = polygons.first() else {
                continue;
            };
            let plane = *self.nodes[id].plane.get_or_insert(first.plane);
            let mut split = Split::default();
            for polygon in polygons {
                split_polygon(&plane, polygon, &mut split);
            }
            let node = &mut self.nodes[id];
            node.polygons.append(&mut split.coplanar_front);
            node.polygons.append(&mut split.coplanar_back);
            if !split.front.is_empty() {
                let child = self.child(id, true);
                work.push((child, split.front));
            }
            if !split.back.is_empty() {
                let child = self.child(id, false);
                work.push((child, split.back));
            }
        }
    }

    fn child(&mut self, id: usize, front: bool) -> usize {
        let existing = if front {
            self.nodes[id].front
        } else {
            self.nodes[id].back
        };
        if let Some(child) = existing {
            return child;
        }
        let child = self.nodes.len();
        self.nodes.push(Node::default());
        if front {
            self.nodes[id].front = Some(child);
        } else {
            self.nodes[id].back = Some(child);
        }
        child
    }

    /// Converts solid space to empty space and empty space to solid space.
    pub fn invert(&mut self) {
        for node in &mut self.nodes {
            for polygon in &mut node.polygons {
                polygon.flip();
            }
            node.plane = node.plane.map(SplitPlane::flipped);
            std::mem::swap(&mut node.front, &mut node.back);
        }
    }

    /// Removes the parts of `polygons` that lie inside this tree's solid.
    #[must_use]
    pub fn clip_polygons(&self, polygons: Vec<Polygon>) -> Vec<Polygon> {
        let mut kept = Vec::new();
        let mut work = vec![(0usize, polygons)];
        while let Some((id, polygons)) = work.pop() {
            let node = &self.nodes[id];
            let Some(plane) = node.plane else {
                kept.extend(polygons);
                continue;
            };
            let mut split = Split::default();
            for polygon in polygons {
                split_polygon(&plane, polygon, &mut split);
            }
            let mut front = split.front;
            front.append(&mut split.coplanar_front);
            let mut back = split.back;
            back.append(&mut split.coplanar_back);
            match node.front {
                Some(child) => work.push((child, front)),
                None => kept.extend(front),
            }
            if let Some(child) = node.back {
                work.push((child, back));
            }
        }
        kept
    }

    /// Removes the parts of this tree's polygons inside `other`.
    pub fn clip_to(&mut self, other: &Self) {
        for node in &mut self.nodes {
            let polygons = std::mem::take(&mut node.polygons);
            node.polygons = other.clip_polygons(polygons);
        }
    }

    /// All polygons held by the tree.
    #[must_use]
    pub fn all_polygons(&self) -> Vec<Polygon> {
        self.nodes
            .iter()
            .flat_map(|n| n.polygons.iter().cloned())
            .collect()
    }
}

/// `a ∪ b`.
#[must_use]
pub fn union(a: Vec<Polygon>, b: Vec<Polygon>) -> Vec<Polygon> {
    let mut a = BspTree::new(a);
    let mut b = BspTree::new(b);
    a.clip_to(&b);
    b.clip_to(&a);
    b.invert();
    b.clip_to(&a);
    b.invert();
    a.build(b.all_polygons());
    a.all_polygons()
}

/// `a − b`.
#[must_use]
pub fn subtract(a: Vec<Polygon>, b: Vec<Polygon>) -> Vec<Polygon> {
    let mut a = BspTree::new(a);
    let mut b = BspTree::new(b);
    a.invert();
    a.clip_to(&b);
    b.clip_to(&a);
    b.invert();
    b.clip_to(&a);
    b.invert();
    a.build(b.all_polygons());
    a.invert();
    a.all_polygons()
}

/// `a ∩ b`.
#[must_use]
pub fn intersect(a: Vec<Polygon>, b: Vec<Polygon>) -> Vec<Polygon> {
    let mut a = BspTree::new(a);
    let mut b = BspTree::new(b);
    a.invert();
    b.clip_to(&a);
    b.invert();
    a.clip_to(&b);
    b.clip_to(&a);
    a.build(b.all_polygons());
    a.invert();
    a.all_polygons()
}
