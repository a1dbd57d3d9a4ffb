//! Triangle classification and splitting against a built tree

use crate::bsp::leaf::LeafSide;
use crate::bsp::tree::CsgBspTree;
use crate::errors::CsgBspError;
use crate::float_types::Real;
use crate::intersect::{line_vs_triangle_sides, triangle_vs_triangle};
use nalgebra::Point3;

/// How a split vertex was constructed: linear interpolation between two
/// earlier vertices of the same [`TriangleSplit`], at parameter `alpha`
/// (`pos = start + (end - start) * alpha`).
///
/// Any per-vertex attribute (normal, UV, color) can be rebuilt by applying
/// the same interpolation after the fact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeSource {
    pub start: usize,
    pub end: usize,
    pub alpha: Real,
}

/// A vertex of the clipping output. The three input vertices have no
/// source; every vertex introduced by a split records one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitVertex {
    pub pos: Point3<Real>,
    pub source: Option<EdgeSource>,
}

impl SplitVertex {
    const fn original(pos: Point3<Real>) -> Self {
        SplitVertex { pos, source: None }
    }

    /// Recompute this vertex's position from its recorded source pair.
    /// Original vertices return their stored position.
    pub fn reinterpolate(&self, vertices: &[SplitVertex]) -> Point3<Real> {
        match self.source {
            None => self.pos,
            Some(src) => {
                let start = vertices[src.start].pos;
                let end = vertices[src.end].pos;
                start + (end - start) * src.alpha
            },
        }
    }
}

/// Which side of the source volume a fragment fell on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentSide {
    Front,
    Back,
    /// Undecided during the work-list phase; the verification pass replaces
    /// this tag, so finished results never carry it.
    OnPlane,
}

impl From<LeafSide> for FragmentSide {
    fn from(side: LeafSide) -> Self {
        match side {
            LeafSide::Front => FragmentSide::Front,
            LeafSide::Back => FragmentSide::Back,
        }
    }
}

/// One output triangle of a clipping call; `vertices` index into the
/// [`TriangleSplit::vertices`] list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fragment {
    pub side: FragmentSide,
    pub vertices: [usize; 3],
}

/// Result of clipping one triangle against the tree. Owned entirely by the
/// caller; holds no reference back into the tree.
#[derive(Debug, Clone)]
pub struct TriangleSplit {
    /// Input vertices first (indices 0..3), then every interpolated vertex
    /// in creation order.
    pub vertices: Vec<SplitVertex>,
    pub fragments: Vec<Fragment>,
    /// Sub-triangles discarded because a split produced an edge shorter
    /// than the tolerance.
    pub degenerate_dropped: usize,
    /// Fragments whose verification samples disagreed and were
    /// conservatively tagged [`FragmentSide::Back`].
    pub ambiguous: usize,
}

impl TriangleSplit {
    /// `false` when the input survived as exactly one fragment.
    pub fn was_split(&self) -> bool {
        self.fragments.len() != 1
    }
}

/// A triangle (by vertex indices) with the stack of leaves it still has to
/// be tested against; the stack top is the current leaf.
#[derive(Debug, Clone)]
struct ClipItem {
    leaves: Vec<usize>,
    verts: [usize; 3],
    /// Set when the triangle crossed a plane without touching coplanar
    /// geometry; its side is then left to the verification pass.
    needs_point_test: bool,
}

impl CsgBspTree {
    /// Classify `p0 p1 p2` against the built tree, splitting it wherever it
    /// crosses coplanar source geometry, so that every output fragment lies
    /// entirely on one side of every plane it met.
    ///
    /// The tree is not mutated; concurrent calls are safe once construction
    /// is finished. Fails only when the tree is empty.
    pub fn test_triangle(
        &self,
        p0: Point3<Real>,
        p1: Point3<Real>,
        p2: Point3<Real>,
    ) -> Result<TriangleSplit, CsgBspError> {
        if self.leaves.is_empty() {
            return Err(CsgBspError::EmptyTree);
        }
        let eps = self.tolerance();

        let mut out = TriangleSplit {
            vertices: vec![
                SplitVertex::original(p0),
                SplitVertex::original(p1),
                SplitVertex::original(p2),
            ],
            fragments: Vec::new(),
            degenerate_dropped: 0,
            ambiguous: 0,
        };
        let mut work: Vec<ClipItem> = Vec::with_capacity(20);
        work.push(ClipItem {
            leaves: vec![0],
            verts: [0, 1, 2],
            needs_point_test: false,
        });

        while let Some(mut item) = work.pop() {
            let leaf_idx = *item.leaves.last().expect("clip items keep at least one leaf");
            let v = [
                out.vertices[item.verts[0]].pos,
                out.vertices[item.verts[1]].pos,
                out.vertices[item.verts[2]].pos,
            ];
            let sides = [
                self.test_point(leaf_idx, &v[0]),
                self.test_point(leaf_idx, &v[1]),
                self.test_point(leaf_idx, &v[2]),
            ];
            let has_front = sides.contains(&Some(LeafSide::Front));
            let has_back = sides.contains(&Some(LeafSide::Back));

            if has_front && has_back {
                // The plane is crossed; only a crossing of actual coplanar
                // geometry forces a split.
                let crossing = self.leaves[leaf_idx]
                    .triangles
                    .iter()
                    .find_map(|t| triangle_vs_triangle(&v, &t.vertices, eps));

                let split = match crossing {
                    Some(segment) => self
                        .split_clip_item(&item, leaf_idx, &v, &sides, segment, &mut out, &mut work),
                    None => false,
                };
                if !split {
                    let (front_child, back_child, terminal) = {
                        let leaf = &self.leaves[leaf_idx];
                        (leaf.child(LeafSide::Front), leaf.child(LeafSide::Back), leaf.is_terminal())
                    };
                    if terminal && item.leaves.len() == 1 {
                        // Crosses the plane but no geometry and no subtrees:
                        // ambiguous, defer to the verification pass.
                        out.fragments.push(Fragment {
                            side: FragmentSide::OnPlane,
                            vertices: item.verts,
                        });
                    } else {
                        // Must be verified against both subtrees.
                        item.leaves.pop();
                        if let Some(front) = front_child {
                            item.leaves.push(front);
                        }
                        if let Some(back) = back_child {
                            item.leaves.push(back);
                        }
                        item.needs_point_test = true;
                        work.push(item);
                    }
                }
            } else if has_front || has_back {
                let side = if has_front { LeafSide::Front } else { LeafSide::Back };
                match self.leaves[leaf_idx].child(side) {
                    Some(child) => {
                        *item.leaves.last_mut().expect("non-empty stack") = child;
                        work.push(item);
                    },
                    None => {
                        if item.leaves.len() > 1 {
                            // other queued leaves still to test
                            item.leaves.pop();
                            work.push(item);
                        } else {
                            let tag = if item.needs_point_test {
                                FragmentSide::OnPlane
                            } else {
                                side.into()
                            };
                            out.fragments.push(Fragment { side: tag, vertices: item.verts });
                        }
                    },
                }
            } else {
                // Every vertex on the plane: the triangle belongs here.
                out.fragments.push(Fragment {
                    side: FragmentSide::OnPlane,
                    vertices: item.verts,
                });
            }
        }

        self.verify_fragments(&mut out);
        Ok(out)
    }

    /// Split the current item along the intersection segment and queue the
    /// three sub-triangles, each inheriting the parent's leaf stack.
    /// Returns `false` when no usable edge crossings exist, in which case
    /// the caller falls back to plane-only handling.
    #[allow(clippy::too_many_arguments)]
    fn split_clip_item(
        &self,
        item: &ClipItem,
        leaf_idx: usize,
        v: &[Point3<Real>; 3],
        sides: &[Option<LeafSide>; 3],
        segment: (Point3<Real>, Point3<Real>),
        out: &mut TriangleSplit,
        work: &mut Vec<ClipItem>,
    ) -> bool {
        let eps = self.tolerance();
        let Some(hits) = line_vs_triangle_sides(v, &segment.0, &segment.1, eps) else {
            return false;
        };

        let t = item.verts;
        let mut uncrossed_edge = 0usize;
        let mut new_idx = [0usize; 2];
        for (k, (point, edge)) in hits.into_iter().enumerate() {
            if uncrossed_edge == edge {
                uncrossed_edge += 1;
            }
            // Snap to a corner of this sub-triangle when the crossing lands
            // on it; lowest vertex index wins, keeping ties deterministic.
            if let Some(l) = (0..3).find(|&l| (v[l] - point).norm() < eps) {
                new_idx[k] = t[l];
                continue;
            }
            let start = t[edge];
            let end = t[(edge + 1) % 3];
            let edge_len = (out.vertices[end].pos - out.vertices[start].pos).norm();
            let alpha = (point - out.vertices[start].pos).norm() / edge_len;
            new_idx[k] = out.vertices.len();
            out.vertices.push(SplitVertex {
                pos: point,
                source: Some(EdgeSource { start, end, alpha }),
            });
        }

        // `uncrossed_edge` is now the edge the segment's line missed; the
        // vertex opposite it is alone on its side.
        let isolated = (uncrossed_edge + 2) % 3;
        let (c0, c1) = if uncrossed_edge == 1 {
            (new_idx[1], new_idx[0])
        } else {
            (new_idx[0], new_idx[1])
        };
        let sub_tris: [[usize; 3]; 3] = [
            [t[isolated], c1, c0],
            [t[uncrossed_edge], t[(uncrossed_edge + 1) % 3], c0],
            [t[uncrossed_edge], c0, c1],
        ];
        let sub_sides: [Option<LeafSide>; 3] = [
            sides[isolated],
            sides[uncrossed_edge].or(sides[(uncrossed_edge + 1) % 3]),
            sides[uncrossed_edge],
        ];

        for (verts, side) in sub_tris.into_iter().zip(sub_sides) {
            let degenerate = (0..3).any(|l| {
                (out.vertices[verts[l]].pos - out.vertices[verts[(l + 1) % 3]].pos).norm() < eps
            });
            if degenerate {
                out.degenerate_dropped += 1;
                continue;
            }
            let Some(side) = side else {
                // no decisive side for this piece; the verification pass
                // settles it
                out.fragments.push(Fragment { side: FragmentSide::OnPlane, vertices: verts });
                continue;
            };
            let child = self.leaves[leaf_idx].child(side);
            if child.is_none() && item.leaves.len() == 1 {
                out.fragments.push(Fragment { side: side.into(), vertices: verts });
            } else {
                let mut leaves = item.leaves.clone();
                match child {
                    Some(c) => *leaves.last_mut().expect("non-empty stack") = c,
                    None => {
                        leaves.pop();
                    },
                }
                work.push(ClipItem { leaves, verts, needs_point_test: false });
            }
        }
        true
    }

    /// Re-test every fragment's three vertices plus its centroid by walking
    /// the tree from the root, and tag the fragment with the side the
    /// samples agree on. Disagreeing samples fall back to the conservative
    /// `Back` tag and are counted in [`TriangleSplit::ambiguous`];
    /// fragments whose samples all end on-plane default to `Front`.
    fn verify_fragments(&self, out: &mut TriangleSplit) {
        for fragment in out.fragments.iter_mut() {
            let vs = [
                out.vertices[fragment.vertices[0]].pos,
                out.vertices[fragment.vertices[1]].pos,
                out.vertices[fragment.vertices[2]].pos,
            ];
            let centroid = Point3::from((vs[0].coords + vs[1].coords + vs[2].coords) / 3.0);
            let samples = [vs[0], vs[1], vs[2], centroid];

            let settled = samples.map(|p| self.settle_point(&p));
            let has_front = settled.contains(&Some(LeafSide::Front));
            let has_back = settled.contains(&Some(LeafSide::Back));

            fragment.side = if has_front && has_back {
                out.ambiguous += 1;
                FragmentSide::Back
            } else if has_back {
                FragmentSide::Back
            } else {
                // agreeing front samples, or all four exactly on-plane
                FragmentSide::Front
            };
        }
    }

    /// Clip a batch of triangles. The tree is read-only here, so with the
    /// `parallel` feature the batch runs on rayon's thread pool.
    #[cfg(feature = "parallel")]
    pub fn test_triangles(
        &self,
        triangles: &[[Point3<Real>; 3]],
    ) -> Result<Vec<TriangleSplit>, CsgBspError> {
        use rayon::prelude::*;
        triangles
            .par_iter()
            .map(|t| self.test_triangle(t[0], t[1], t[2]))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    pub fn test_triangles(
        &self,
        triangles: &[[Point3<Real>; 3]],
    ) -> Result<Vec<TriangleSplit>, CsgBspError> {
        triangles
            .iter()
            .map(|t| self.test_triangle(t[0], t[1], t[2]))
            .collect()
    }
}
