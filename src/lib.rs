//! Boolean operations (*union*, *intersection*, *difference*, *xor*) and slicing of indexed
//! polygon meshes, computed on the exact intersection curve of the two operands rather than
//! by BSP splitting.
//!
//! The engine intersects every candidate face pair found through per-mesh R-trees, cuts each
//! face along the intersection curve, groups the resulting face loops into patches bounded by
//! that curve, classifies each patch as inside, outside or on the other mesh, and keeps,
//! flips or drops it according to the requested operation.
//!
//! # Features
//! #### Default
//! - **f64**: use f64 as Real
//!
//! #### Optional
//! - **f32**: use f32 as Real, this conflicts with f64
//! - **parallel**: use rayon to rebuild faces in parallel
//!
//! ```
//! use polycsg::mesh::Mesh;
//! use polycsg::traits::CsgOps;
//!
//! let a = Mesh::<()>::cube(2.0, None);
//! let b = Mesh::<()>::cube(2.0, None).translate(1.0, 1.0, 1.0);
//! let union = a.union(&b).unwrap();
//! assert!(union.is_manifold());
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::missing_const_for_fn, clippy::approx_constant, clippy::all)]

pub mod config;
pub mod csg;
pub mod errors;
pub mod float_types;
pub mod mesh;
pub mod traits;

#[cfg(any(
    all(feature = "f64", feature = "f32"),
    not(any(feature = "f64", feature = "f32"))
))]
compile_error!("Either 'f64' or 'f32' feature must be specified, but not both");

pub use config::{BooleanOp, ClassifierKind, CsgConfig};
pub use csg::{Csg, CsgOutput, CsgStats, FaceClass, Hooks};
pub use errors::{CsgError, ValidationError};
pub use mesh::Mesh;
