//! Incremental triangle insertion (tree construction)

use crate::bsp::leaf::{LeafSide, LeafTriangle};
use crate::bsp::tree::CsgBspTree;
use crate::float_types::Real;
use crate::intersect::{segment_plane_intersection, triangle_normal};
use nalgebra::Point3;

/// Child leaves to create once the current triangle is fully subdivided.
/// Creation is batched so leaf handles never shift mid-split.
type DeferredLeaves = Vec<(LeafSide, usize)>;

/// Work-list of sub-triangles still looking for their leaf.
type Pending = Vec<(usize, [Point3<Real>; 3])>;

impl CsgBspTree {
    /// Insert one source triangle, splitting it against every plane it
    /// straddles so that each leaf's triangle list only holds triangles
    /// coplanar with that leaf.
    ///
    /// The first triangle inserted into an empty tree becomes the root
    /// plane (`origin = p0`, normal from the triangle's winding).
    /// Insertions must be serialized per tree.
    pub fn add_triangle(
        &mut self,
        id: usize,
        p0: Point3<Real>,
        p1: Point3<Real>,
        p2: Point3<Real>,
    ) {
        if self.leaves.is_empty() {
            let normal = triangle_normal(&p0, &p1, &p2);
            if let Ok(root) = self.add_leaf(None, p0, normal, None) {
                self.leaves[root].triangles.push(LeafTriangle::new(id, [p0, p1, p2]));
            }
            return;
        }

        let mut pending: Pending = Vec::with_capacity(20);
        let mut deferred: DeferredLeaves = Vec::new();
        pending.push((0, [p0, p1, p2]));

        while let Some((leaf_idx, v)) = pending.pop() {
            let sides = [
                self.test_point(leaf_idx, &v[0]),
                self.test_point(leaf_idx, &v[1]),
                self.test_point(leaf_idx, &v[2]),
            ];
            let fronts = sides.iter().filter(|s| **s == Some(LeafSide::Front)).count();
            let backs = sides.iter().filter(|s| **s == Some(LeafSide::Back)).count();

            if fronts > 0 && backs > 0 {
                // Straddles the plane: subdivide and route the pieces.
                self.split_straddling(leaf_idx, &v, &sides, &mut pending, &mut deferred);
            } else if fronts > 0 || backs > 0 {
                // Entirely on one side: descend, creating the child lazily.
                let side = if fronts > 0 { LeafSide::Front } else { LeafSide::Back };
                match self.leaves[leaf_idx].child(side) {
                    Some(child) => pending.push((child, v)),
                    None => deferred.push((side, leaf_idx)),
                }
            } else {
                // Coplanar with this leaf: register the original triangle.
                let leaf = &mut self.leaves[leaf_idx];
                if !leaf.triangles.iter().any(|t| t.id == id) {
                    leaf.triangles.push(LeafTriangle::new(id, [p0, p1, p2]));
                }
            }
        }

        // Create the batched child leaves. The new plane is the *input*
        // triangle's plane positioned at `p0`, and the original triangle is
        // registered on the new leaf. An entry whose slot was filled by an
        // earlier entry of the same batch is a no-op; the triangle already
        // registered there.
        let normal = triangle_normal(&p0, &p1, &p2);
        for (side, parent) in deferred {
            if self.leaves[parent].child(side).is_none() {
                if let Ok(handle) = self.add_leaf(Some(side), p0, normal, Some(parent)) {
                    self.leaves[handle].triangles.push(LeafTriangle::new(id, [p0, p1, p2]));
                }
            }
        }
    }

    /// Split a triangle straddling the plane of `leaf_idx` into
    /// sub-triangles and queue each on its own side.
    fn split_straddling(
        &mut self,
        leaf_idx: usize,
        v: &[Point3<Real>; 3],
        sides: &[Option<LeafSide>; 3],
        pending: &mut Pending,
        deferred: &mut DeferredLeaves,
    ) {
        let eps = self.tolerance();
        let (origin, normal) = {
            let leaf = &self.leaves[leaf_idx];
            (leaf.origin, leaf.normal)
        };

        // Strict crossings per edge; the edge that does not cross is
        // opposite the isolated vertex.
        let mut crossings: Vec<Point3<Real>> = Vec::with_capacity(2);
        let mut uncrossed_edge = 0;
        for i in 0..3 {
            match segment_plane_intersection(&v[i], &v[(i + 1) % 3], &origin, &normal, eps) {
                Some(p) => crossings.push(p),
                None => uncrossed_edge = i,
            }
        }

        match crossings.len() {
            2 => {
                let isolated = (uncrossed_edge + 2) % 3;
                let Some(iso_side) = sides[isolated] else {
                    self.degenerate_dropped += 1;
                    return;
                };
                let (c0, c1) = if uncrossed_edge == 1 {
                    (crossings[1], crossings[0])
                } else {
                    (crossings[0], crossings[1])
                };

                // One triangle on the isolated vertex's side, a fan of two
                // on the other.
                let single = [v[isolated], c1, c0];
                let quad_a = [v[uncrossed_edge], v[(uncrossed_edge + 1) % 3], c0];
                let quad_b = [v[uncrossed_edge], c0, c1];

                if !self.drop_if_degenerate(&single, eps) {
                    match self.leaves[leaf_idx].child(iso_side) {
                        // Re-test at this leaf; the one-side branch descends.
                        Some(_) => pending.push((leaf_idx, single)),
                        None => deferred.push((iso_side, leaf_idx)),
                    }
                }
                let far_side = iso_side.opposite();
                for quad_tri in [quad_a, quad_b] {
                    if self.drop_if_degenerate(&quad_tri, eps) {
                        continue;
                    }
                    match self.leaves[leaf_idx].child(far_side) {
                        Some(child) => pending.push((child, quad_tri)),
                        None => deferred.push((far_side, leaf_idx)),
                    }
                }
            },
            1 => {
                // One vertex sits on the plane: the triangle splits into two
                // through that vertex and the single edge crossing.
                let Some(on_idx) = (0..3).find(|&i| sides[i].is_none()) else {
                    return;
                };
                let crossing = crossings[0];
                for i in [(on_idx + 1) % 3, (on_idx + 2) % 3] {
                    let Some(side) = sides[i] else { continue };
                    let sub = [v[on_idx], v[i], crossing];
                    if self.drop_if_degenerate(&sub, eps) {
                        continue;
                    }
                    match self.leaves[leaf_idx].child(side) {
                        Some(child) => pending.push((child, sub)),
                        None => deferred.push((side, leaf_idx)),
                    }
                }
            },
            _ => {},
        }
    }

    /// Count and drop sub-triangles with an edge shorter than the
    /// tolerance; re-queuing them can loop forever on repeated micro-splits.
    fn drop_if_degenerate(&mut self, tri: &[Point3<Real>; 3], eps: Real) -> bool {
        for i in 0..3 {
            if (tri[i] - tri[(i + 1) % 3]).norm() < eps {
                self.degenerate_dropped += 1;
                return true;
            }
        }
        false
    }
}
