//! # isurf_core
//!
//! Pure algorithms for reconstructing implicit surfaces from regular blocks
//! of 8-bit corner-point samples.
//!
//! This crate holds the math that turns one grid cell's corner values into
//! triangles (3D) or line segments (2D) at a caller-supplied threshold. It
//! carries no storage, no I/O and no communication; those live in the
//! `isurf_io` and `isurf_run` crates.
//!
//! ## Features
//!
//! - **no_std compatible**: works without the standard library; the `alloc`
//!   feature enables the allocating tessellation wrappers
//! - **Topology preserving**: face and interior ambiguities are resolved with
//!   algebraic sign tests on the bilinear / trilinear interpolants, following
//!   Lewiner, Lopes, Vieira and Tavares, "Efficient implementation of
//!   marching cubes cases with topological guarantees" (2003)
//! - **Constant tables**: the full case decomposition is embedded as static
//!   data; nothing is rebuilt at runtime
//!
//! ## Modules
//!
//! - [`types`]: the `Point3` vertex type
//! - [`interpolate`]: clamped linear inversion along a cell edge
//! - [`marching_cubes`]: the 3D tessellator, its lookup tables and the
//!   ambiguity tests
//! - [`marching_squares`]: the 2D tessellator
//! - [`error`]: error types carrying the offending cell's corner values

#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]

// Conditional std/alloc support
#[cfg(feature = "std")]
extern crate std;

#[cfg(all(feature = "alloc", not(feature = "std")))]
extern crate alloc;

// Internal alloc prelude for conditional compilation
#[cfg(feature = "std")]
mod alloc_prelude {
    pub use std::vec::Vec;
}

#[cfg(all(feature = "alloc", not(feature = "std")))]
mod alloc_prelude {
    pub use alloc::vec::Vec;
}

pub mod error;
pub mod interpolate;
pub mod marching_cubes;
pub mod marching_squares;
pub mod types;

pub use error::CoreError;
pub use interpolate::interpolate;
pub use marching_cubes::{tessellate_cell, CubeValues, MAX_CELL_TRIS};
pub use marching_squares::{tessellate_square, MAX_CELL_LINES};
pub use types::Point3;

#[cfg(any(feature = "std", feature = "alloc"))]
pub use marching_cubes::tessellate_cell_vec;
