//! Tree construction and clipping errors

use crate::bsp::LeafSide;

/// All the ways a tree operation can be refused.
///
/// The original sentinel-style API returned `-1` for every one of these;
/// they are kept as distinct variants so callers can tell a caller bug
/// (bad parent, occupied slot) from an empty tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CsgBspError {
    /// The tree holds no leaves, so there is nothing to test against.
    #[error("the tree is empty, nothing to test against")]
    EmptyTree,
    /// A leaf index does not address a live leaf.
    #[error("leaf index {0} is out of bounds")]
    InvalidLeaf(usize),
    /// A root leaf already exists; the tree only ever has one.
    #[error("the tree already has a root leaf")]
    RootExists,
    /// A non-root leaf was requested without a parent or without a side.
    #[error("a non-root leaf requires both a parent and a side")]
    MissingParent,
    /// The requested child slot of the parent leaf is already occupied.
    /// Children are appended at most once and never replaced.
    #[error("the {side:?} child of leaf {parent} already exists")]
    SlotOccupied { parent: usize, side: LeafSide },
}
