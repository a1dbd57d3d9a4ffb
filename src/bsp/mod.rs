//! Binary Space Partitioning (BSP) engine for CSG mesh booleans.
//!
//! [`CsgBspTree`] is built once per source mesh by inserting every source
//! triangle ([`CsgBspTree::add_triangle`]); a second mesh's triangles are
//! then classified and split against the finished tree
//! ([`CsgBspTree::test_triangle`]), yielding the inside/outside fragments
//! that union, intersection and subtraction are assembled from.

pub mod clip;
pub mod insert;
pub mod leaf;
pub mod tree;

pub use clip::{EdgeSource, Fragment, FragmentSide, SplitVertex, TriangleSplit};
pub use leaf::{Leaf, LeafSide, LeafTriangle};
pub use tree::CsgBspTree;
