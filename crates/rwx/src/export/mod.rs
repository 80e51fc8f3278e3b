//! Output encoders.
//!
//! - [`three`]: Three.js JSON model (format 3) built from a flattened scene
//! - [`gltf`]: glTF 2.0 document with one packed buffer, as `.gltf` or `.glb`

pub mod gltf;
pub mod three;

pub use self::gltf::{export_gltf, BufferRegion, GltfDocument, GltfOptions, IndexWidth, PbrMaterial};
pub use self::three::{export_three, ThreeJsMaterial, ThreeJsModel, ThreeJsOptions, FACE_TYPE};
