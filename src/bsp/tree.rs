//! Arena-backed BSP tree storage

use crate::bsp::leaf::{Leaf, LeafSide};
use crate::errors::CsgBspError;
use crate::float_types::{Real, tolerance};
use crate::intersect::classify_point;
use nalgebra::{Point3, Vector3};

/// A binary space partition tree over the triangles of one source mesh.
///
/// Leaves are stored in a grow-only arena and addressed by stable `usize`
/// handles, so no handle is ever invalidated by later insertions. The root
/// is always handle `0` once the first triangle has been inserted.
///
/// Build the tree by calling [`add_triangle`](Self::add_triangle) once per
/// source triangle (insertions must be serialized), then classify another
/// mesh's triangles with [`test_triangle`](crate::bsp::CsgBspTree::test_triangle),
/// which only reads the tree.
#[derive(Debug, Clone)]
pub struct CsgBspTree {
    pub(crate) leaves: Vec<Leaf>,
    tolerance: Real,
    pub(crate) degenerate_dropped: usize,
}

impl Default for CsgBspTree {
    fn default() -> Self {
        Self::new()
    }
}

impl CsgBspTree {
    /// Empty tree using the process-wide tolerance
    /// ([`crate::float_types::tolerance`]).
    pub fn new() -> Self {
        Self::with_tolerance(tolerance())
    }

    /// Empty tree with an explicit classification tolerance, threaded
    /// through every geometric predicate this tree evaluates.
    pub fn with_tolerance(tolerance: Real) -> Self {
        CsgBspTree {
            leaves: Vec::new(),
            tolerance: tolerance.max(Real::EPSILON),
            degenerate_dropped: 0,
        }
    }

    pub const fn tolerance(&self) -> Real {
        self.tolerance
    }

    /// Number of leaves; never decreases.
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn leaf(&self, idx: usize) -> Option<&Leaf> {
        self.leaves.get(idx)
    }

    /// Root leaf handle, once any triangle has been inserted.
    pub fn root(&self) -> Option<usize> {
        if self.leaves.is_empty() { None } else { Some(0) }
    }

    /// Sub-triangles discarded during insertion because a split produced an
    /// edge shorter than the tolerance. Silent drops can erode coverage;
    /// this counter is the debugging hook for them.
    pub const fn degenerate_dropped(&self) -> usize {
        self.degenerate_dropped
    }

    /// Append a leaf as the `side` child of `parent`, or as the root when
    /// the tree is empty and both `side` and `parent` are `None`.
    ///
    /// Each parent slot is filled at most once; a second request for the
    /// same slot fails with [`CsgBspError::SlotOccupied`]. Leaves are never
    /// removed, so the returned handle stays valid for the tree's lifetime.
    pub fn add_leaf(
        &mut self,
        side: Option<LeafSide>,
        origin: Point3<Real>,
        normal: Vector3<Real>,
        parent: Option<usize>,
    ) -> Result<usize, CsgBspError> {
        match (parent, side) {
            (None, None) => {
                if !self.leaves.is_empty() {
                    return Err(CsgBspError::RootExists);
                }
                self.leaves.push(Leaf::new(origin, normal, None));
                Ok(0)
            },
            (Some(parent_idx), Some(side)) => {
                if parent_idx >= self.leaves.len() {
                    return Err(CsgBspError::InvalidLeaf(parent_idx));
                }
                if self.leaves[parent_idx].children[side.index()].is_some() {
                    return Err(CsgBspError::SlotOccupied { parent: parent_idx, side });
                }
                let handle = self.leaves.len();
                self.leaves[parent_idx].children[side.index()] = Some(handle);
                self.leaves.push(Leaf::new(origin, normal, Some(parent_idx)));
                Ok(handle)
            },
            _ => Err(CsgBspError::MissingParent),
        }
    }

    /// Classify `point` against the plane of leaf `leaf_idx`.
    ///
    /// `None` means on-plane (within tolerance); an out-of-range handle
    /// also classifies as on-plane rather than failing.
    pub fn test_point(&self, leaf_idx: usize, point: &Point3<Real>) -> Option<LeafSide> {
        let leaf = self.leaves.get(leaf_idx)?;
        classify_point(point, &leaf.origin, &leaf.normal, self.tolerance)
    }

    /// Walk from the root along whichever child matches `point`'s side at
    /// each leaf, until the point classifies on-plane or the matching child
    /// slot is empty. Returns the last decisive side, `None` when the walk
    /// ended on a plane.
    pub(crate) fn settle_point(&self, point: &Point3<Real>) -> Option<LeafSide> {
        let mut leaf_idx = 0;
        loop {
            match self.test_point(leaf_idx, point) {
                None => return None,
                Some(side) => match self.leaves[leaf_idx].child(side) {
                    Some(child) => leaf_idx = child,
                    None => return Some(side),
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(x: Real, y: Real, z: Real) -> Point3<Real> {
        Point3::new(x, y, z)
    }

    #[test]
    fn add_leaf_preconditions() {
        let mut tree = CsgBspTree::with_tolerance(1e-6);

        // non-root leaf into an empty tree
        assert_eq!(
            tree.add_leaf(Some(LeafSide::Front), pt(0.0, 0.0, 0.0), Vector3::z(), None),
            Err(CsgBspError::MissingParent)
        );

        let root = tree
            .add_leaf(None, pt(0.0, 0.0, 0.0), Vector3::z(), None)
            .unwrap();
        assert_eq!(root, 0);
        assert_eq!(
            tree.add_leaf(None, pt(1.0, 0.0, 0.0), Vector3::z(), None),
            Err(CsgBspError::RootExists)
        );

        let front = tree
            .add_leaf(Some(LeafSide::Front), pt(0.0, 0.0, 1.0), Vector3::z(), Some(root))
            .unwrap();
        assert_eq!(tree.leaf(root).unwrap().child(LeafSide::Front), Some(front));

        // slot can only be filled once
        assert_eq!(
            tree.add_leaf(Some(LeafSide::Front), pt(0.0, 0.0, 2.0), Vector3::z(), Some(root)),
            Err(CsgBspError::SlotOccupied { parent: root, side: LeafSide::Front })
        );
        // parent must exist
        assert_eq!(
            tree.add_leaf(Some(LeafSide::Back), pt(0.0, 0.0, 2.0), Vector3::z(), Some(99)),
            Err(CsgBspError::InvalidLeaf(99))
        );
    }

    #[test]
    fn test_point_classification() {
        let mut tree = CsgBspTree::with_tolerance(1e-6);
        tree.add_leaf(None, pt(0.0, 0.0, 0.0), Vector3::z(), None).unwrap();

        assert_eq!(tree.test_point(0, &pt(0.4, 0.2, 1.0)), Some(LeafSide::Front));
        assert_eq!(tree.test_point(0, &pt(0.4, 0.2, -1.0)), Some(LeafSide::Back));
        assert_eq!(tree.test_point(0, &pt(0.4, 0.2, 0.0)), None);
        // out-of-range handles classify on-plane instead of panicking
        assert_eq!(tree.test_point(7, &pt(0.4, 0.2, 1.0)), None);
    }
}
