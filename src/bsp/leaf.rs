//! BSP tree leaf data structure

use crate::float_types::Real;
use nalgebra::{Point3, Vector3};

/// Which side of a leaf's splitting plane, in the direction of its normal.
///
/// Doubles as the child-slot selector: a leaf has at most one child per
/// side. Point classification is `Option<LeafSide>`, with `None` meaning
/// on-plane (within tolerance).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeafSide {
    Front = 0,
    Back = 1,
}

impl LeafSide {
    /// Child-slot index of this side.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The other side of the plane.
    pub const fn opposite(self) -> Self {
        match self {
            LeafSide::Front => LeafSide::Back,
            LeafSide::Back => LeafSide::Front,
        }
    }
}

/// A source triangle registered on a leaf because it is coplanar with the
/// leaf's plane. Leaves always hold the *original* triangle, never a split
/// fragment, so the same id is registered at most once per leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafTriangle {
    pub id: usize,
    pub vertices: [Point3<Real>; 3],
}

impl LeafTriangle {
    pub const fn new(id: usize, vertices: [Point3<Real>; 3]) -> Self {
        LeafTriangle { id, vertices }
    }
}

/// One node of the BSP tree: a splitting plane through `origin` with
/// `normal`, child links per side, and the triangles lying on the plane.
///
/// Leaves live in the tree's arena and are addressed by stable `usize`
/// handles; `parent` is bookkeeping only, traversal always starts at the
/// root.
#[derive(Debug, Clone)]
pub struct Leaf {
    pub origin: Point3<Real>,
    pub normal: Vector3<Real>,
    /// Front/back child handles, indexed by [`LeafSide::index`].
    /// Each slot is set at most once; children are never replaced.
    pub children: [Option<usize>; 2],
    pub parent: Option<usize>,
    pub triangles: Vec<LeafTriangle>,
}

impl Leaf {
    pub const fn new(origin: Point3<Real>, normal: Vector3<Real>, parent: Option<usize>) -> Self {
        Leaf {
            origin,
            normal,
            children: [None, None],
            parent,
            triangles: Vec::new(),
        }
    }

    /// Child handle on `side`, if that slot has been filled.
    pub const fn child(&self, side: LeafSide) -> Option<usize> {
        self.children[side.index()]
    }

    /// A leaf with no children terminates every walk that reaches it.
    pub const fn is_terminal(&self) -> bool {
        self.children[0].is_none() && self.children[1].is_none()
    }
}
