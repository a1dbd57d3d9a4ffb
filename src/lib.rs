//! A **CSG BSP mesh boolean engine**: builds a binary space partition tree
//! from one mesh's triangles, then clips another mesh's triangles against
//! it, classifying and subdividing them into inside/outside fragments —
//! the core primitive behind constructive-solid-geometry mesh operations
//! (union, intersection, subtraction).
//!
//! ```
//! use csgbsp::{CsgBspTree, FragmentSide};
//! use nalgebra::Point3;
//!
//! let mut tree = CsgBspTree::new();
//! tree.add_triangle(
//!     0,
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! );
//!
//! // A triangle straddling the tree's only plane gets split.
//! let split = tree
//!     .test_triangle(
//!         Point3::new(0.2, 0.2, -1.0),
//!         Point3::new(0.2, 0.2, 1.0),
//!         Point3::new(0.8, 0.1, 0.0),
//!     )
//!     .unwrap();
//! assert!(split.was_split());
//! assert!(split.fragments.iter().any(|f| f.side == FragmentSide::Front));
//! assert!(split.fragments.iter().any(|f| f.side == FragmentSide::Back));
//! ```
//!
//! # Features
//! #### Default
//! - **f64**: use f64 as Real
//!
//! #### Optional
//! - **f32**: use f32 as Real, this conflicts with f64
//! - **parallel**: use rayon to clip triangle batches concurrently
//!   (the tree is read-only during clipping)

#![forbid(unsafe_code)]
#![deny(unused)]
#![warn(clippy::missing_const_for_fn, clippy::approx_constant, clippy::all)]

pub mod bsp;
pub mod errors;
pub mod float_types;
pub mod intersect;

#[cfg(any(all(feature = "f64", feature = "f32"), not(any(feature = "f64", feature = "f32"))))]
compile_error!("Either 'f64' or 'f32' feature must be specified, but not both");

pub use bsp::{
    CsgBspTree, EdgeSource, Fragment, FragmentSide, Leaf, LeafSide, LeafTriangle, SplitVertex,
    TriangleSplit,
};
pub use errors::CsgBspError;
