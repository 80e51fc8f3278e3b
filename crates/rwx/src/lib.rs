#![warn(missing_docs)]

//! RWX model conversion.
//!
//! Resolves a parsed RWX clump tree into renderable geometry and encodes it
//! as a Three.js JSON model or a glTF 2.0 document. Resolution applies the
//! per-clump transform stack and the inherited composite material, checks
//! triangle indices and flattens the tree where the encoder needs it.
//!
//! # Example
//!
//! ```no_run
//! use rwx::export::{export_gltf, export_three, GltfOptions, ThreeJsOptions};
//! use rwx::read_rwx;
//!
//! let model = read_rwx("tree.rwx").unwrap();
//!
//! export_three(&model, &ThreeJsOptions::default())
//!     .unwrap()
//!     .export("tree.json", false)
//!     .unwrap();
//!
//! export_gltf(&model, &GltfOptions::default())
//!     .unwrap()
//!     .export("tree.glb")
//!     .unwrap();
//! ```

mod error;
pub mod export;
mod material;
mod resolve;

pub use error::{Result, RwxError};
pub use material::CompositeMaterial;
pub use resolve::{
    resolve, FlatFace, ResolvedClump, ResolvedScene, ResolvedTriangle, ResolvedVertex, Resolver,
    TransformMode,
};

pub use rwx_ir::{Child, ChildKind, Clump, MaterialOp, Transform, Triangle, Vertex};
pub use rwx_reader::{
    read_rwx, read_rwx_from_buffer, read_rwx_from_reader, read_rwx_with_settings, ReadError,
    ReaderSettings,
};
