//! Marching cubes: topology-preserving triangle extraction from one cell.
//!
//! The driver classifies the eight corner samples into one of 15 equivalence
//! classes, resolves face and interior ambiguities with the algebraic sign
//! tests in [`ambiguity`], and materialises the selected triangle strip
//! through the clamped edge interpolator. Triangles are emitted with their
//! normals pointing into the flow volume.
//!
//! The case decomposition follows Lewiner, Lopes, Vieira and Tavares,
//! "Efficient implementation of marching cubes cases with topological
//! guarantees" (2003); the tables in [`tables`] are that decomposition
//! verbatim.

mod ambiguity;
mod cell;
pub mod tables;

pub use ambiguity::CubeValues;
pub use cell::{tessellate_cell, MAX_CELL_TRIS};

#[cfg(any(feature = "std", feature = "alloc"))]
pub use cell::tessellate_cell_vec;
