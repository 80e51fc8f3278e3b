//! Scene graph for RWX models.
//!
//! This crate defines the tree produced by the RWX reader. It is purely
//! declarative: transforms are recorded, not applied, and vertex and
//! triangle indices stay local to their owning [`Clump`]. Resolution into
//! flat buffers is handled separately.

use serde::{Deserialize, Serialize};

/// A vertex as declared in the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
    /// Texture coordinate from a trailing `uv u v` clause.
    pub uv: Option<[f64; 2]>,
    /// Number of transforms declared in the clump before this vertex.
    pub transform: usize,
}

/// A transform statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Transform {
    /// Reset to the clump's base matrix.
    Identity,
    /// Translation.
    Translate {
        /// X offset.
        x: f64,
        /// Y offset.
        y: f64,
        /// Z offset.
        z: f64,
    },
    /// Non-uniform scale.
    Scale {
        /// X factor.
        x: f64,
        /// Y factor.
        y: f64,
        /// Z factor.
        z: f64,
    },
    /// Rotation about an axis through the origin.
    Rotate {
        /// Axis X component.
        x: f64,
        /// Axis Y component.
        y: f64,
        /// Axis Z component.
        z: f64,
        /// Angle in degrees.
        angle: f64,
    },
    /// Explicit 4x4 matrix, 16 values row by row.
    Matrix {
        /// Matrix values.
        values: [f64; 16],
    },
}

/// An incremental material statement.
///
/// Each op overlays onto the running composite material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MaterialOp {
    /// Sets ambient, diffuse and specular together.
    Surface {
        /// Ambient coefficient.
        ambient: f64,
        /// Diffuse coefficient.
        diffuse: f64,
        /// Specular coefficient.
        specular: f64,
    },
    /// Base colour.
    Color {
        /// Red.
        r: f64,
        /// Green.
        g: f64,
        /// Blue.
        b: f64,
    },
    /// Ambient coefficient.
    Ambient {
        /// Value.
        value: f64,
    },
    /// Diffuse coefficient.
    Diffuse {
        /// Value.
        value: f64,
    },
    /// Specular coefficient.
    Specular {
        /// Value.
        value: f64,
    },
    /// Opacity, 1.0 being fully opaque.
    Opacity {
        /// Value.
        value: f64,
    },
    /// Texture name, `None` for `texture null`.
    Texture {
        /// Texture name as written.
        name: Option<String>,
    },
}

/// A triangle with 1-based indices into its clump's vertices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Triangle {
    /// Vertex indices, 1-based and local to the owning clump.
    pub indices: [u32; 3],
    /// Number of material ops applied in the clump when declared.
    pub material: usize,
    /// Optional tag, 0 when absent.
    pub tag: i64,
}

/// Which block a child group was opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChildKind {
    /// `clumpbegin` … `clumpend`.
    Clump,
    /// `transformbegin` … `transformend`.
    TransformGroup,
    /// `jointtransformbegin` … `jointtransformend`.
    JointTransformGroup,
}

/// A nested group inside a clump.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Child {
    /// Opening block kind.
    pub kind: ChildKind,
    /// Number of transforms declared in the parent when the block opened.
    pub transform: usize,
    /// Number of material ops applied in the parent when the block opened.
    pub materials: usize,
    /// The nested group.
    pub clump: Clump,
}

/// A group node: local geometry, materials, transforms and child groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Clump {
    /// Transforms in declaration order.
    pub transforms: Vec<Transform>,
    /// Material ops in declaration order.
    pub materials: Vec<MaterialOp>,
    /// Vertices in declaration order.
    pub vertices: Vec<Vertex>,
    /// Triangles in declaration order.
    pub triangles: Vec<Triangle>,
    /// Child groups in declaration order.
    pub children: Vec<Child>,
    /// Clump tag, 0 when absent.
    pub tag: i64,
}

impl Clump {
    /// Create an empty clump.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of clumps in this subtree, including `self`.
    pub fn clump_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(|c| c.clump.clump_count())
            .sum::<usize>()
    }

    /// Number of vertices in this subtree.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
            + self
                .children
                .iter()
                .map(|c| c.clump.vertex_count())
                .sum::<usize>()
    }

    /// Number of triangles in this subtree.
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
            + self
                .children
                .iter()
                .map(|c| c.clump.triangle_count())
                .sum::<usize>()
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
