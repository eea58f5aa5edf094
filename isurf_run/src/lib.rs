//! # isurf_run
//!
//! The distributed implicit-surface reconstruction pipeline.
//!
//! Every rank owns a disjoint set of cells in a uniform block. The pipeline
//! is bulk-synchronous:
//!
//! 1. **scatter** — the coordinator streams the corner-point file in chunks,
//!    each chunk is broadcast, and every rank stores the samples its cells
//!    touch (enforcing the zero-boundary invariant)
//! 2. **extract** — marching cubes (or squares in 2D) runs per cell and
//!    appends primitives to the surface store
//! 3. **normals** — primitive normals are filled in
//! 4. **reconcile** — triangle pairs that marching cubes left on shared cell
//!    faces are kept, moved or deleted so each face ends up with either no
//!    triangles or one inward-facing pair, using irregular point-to-point
//!    messages for remote neighbours
//!
//! The transport is the [`comm::Comm`] trait: a broadcast, a barrier, a sum
//! reduction and an irregular exchange. [`comm::SerialComm`] covers single
//! process runs and [`comm::ThreadComm`] runs multi-rank jobs in one process
//! for testing.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ablate;
pub mod comm;
pub mod config;
pub mod error;
pub mod extract;
pub mod grid;
pub mod page;
pub mod reconcile;
pub mod run;
pub mod scatter;
pub mod surf;

pub use ablate::CornerSink;
pub use comm::{Comm, SerialComm, ThreadComm};
pub use config::IsurfConfig;
pub use error::{Result, RunError};
pub use grid::{BlockExtent, Cell, CellType, GridBlock};
pub use page::{IndexPages, Span};
pub use run::{read_isurf, RunStats};
pub use surf::{SurfStore, Tri};
