//! Geometry resolution: transform stacks, inherited materials, flattening.
//!
//! Each clump keeps a stack of composed matrices, one entry per transform
//! statement plus the clump's base matrix at the bottom. A vertex is placed
//! with the entry that was on top when it was declared, so vertices of one
//! clump can use different transform states. `identity` pushes the clump's
//! base matrix back on top.
//!
//! Materials thread through a clump in op order. A child starts from a copy
//! of the parent's composite at the point the child opened; nothing the
//! child applies flows back to the parent or to later siblings.

use std::collections::HashMap;

use rwx_ir::{Clump, Transform as TransformOp};
use rwx_math::{Point3, Transform};

use crate::error::{Result, RwxError};
use crate::material::CompositeMaterial;

/// How transforms end up in the resolved tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformMode {
    /// Bake every transform into vertex positions. Children start from the
    /// parent's stack entry at their recorded depth.
    Baked,
    /// Lift the clump's last explicit matrix into
    /// [`ResolvedClump::matrix`] and bake the other kinds. Children start
    /// from the parent's stack entry at their recorded depth, built without
    /// the matrices, which reach them through the node hierarchy instead.
    NodeLocal,
}

/// A vertex with its final position.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedVertex {
    /// Position after transformation.
    pub position: [f64; 3],
    /// Texture coordinate as declared.
    pub uv: Option<[f64; 2]>,
}

/// A triangle with validated, 0-based, clump-local indices.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTriangle {
    /// 0-based indices into [`ResolvedClump::vertices`].
    pub indices: [u32; 3],
    /// Index into [`ResolvedClump::materials`].
    pub material: usize,
    /// Triangle tag.
    pub tag: i64,
}

/// A clump after resolution. The tree shape matches the source.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedClump {
    /// Clump tag.
    pub tag: i64,
    /// Node-level matrix (row-major values), only in
    /// [`TransformMode::NodeLocal`].
    pub matrix: Option<[f64; 16]>,
    /// Vertices in declaration order.
    pub vertices: Vec<ResolvedVertex>,
    /// Triangles in declaration order.
    pub triangles: Vec<ResolvedTriangle>,
    /// Composite material after each prefix of the clump's material ops.
    pub materials: Vec<CompositeMaterial>,
    /// Resolved children.
    pub children: Vec<ResolvedClump>,
}

/// Walks a [`Clump`] tree and resolves its geometry.
#[derive(Debug, Clone)]
pub struct Resolver {
    mode: TransformMode,
    base: Transform,
}

impl Resolver {
    /// Create a resolver starting from the identity matrix.
    pub fn new(mode: TransformMode) -> Self {
        Self {
            mode,
            base: Transform::identity(),
        }
    }

    /// Use `base` as the root clump's base matrix.
    pub fn with_base(mut self, base: Transform) -> Self {
        self.base = base;
        self
    }

    /// Resolve the tree rooted at `clump`.
    pub fn resolve(&self, clump: &Clump) -> Result<ResolvedClump> {
        self.resolve_clump(clump, &self.base, &CompositeMaterial::default())
    }

    fn resolve_clump(
        &self,
        clump: &Clump,
        base: &Transform,
        inherited: &CompositeMaterial,
    ) -> Result<ResolvedClump> {
        let stack = self.transform_stack(clump, base)?;

        let mut vertices = Vec::with_capacity(clump.vertices.len());
        for vertex in &clump.vertices {
            let transform = stack_entry(&stack, vertex.transform)?;
            let p = transform.apply_point(&Point3::new(vertex.x, vertex.y, vertex.z));
            vertices.push(ResolvedVertex {
                position: [p.x, p.y, p.z],
                uv: vertex.uv,
            });
        }

        let materials = CompositeMaterial::states(inherited, &clump.materials);
        let vertex_count = clump.vertices.len();
        let mut triangles = Vec::with_capacity(clump.triangles.len());
        for triangle in &clump.triangles {
            let mut indices = [0u32; 3];
            for (slot, &index) in indices.iter_mut().zip(&triangle.indices) {
                if index == 0 || index as usize > vertex_count {
                    return Err(RwxError::UnresolvedVertexIndex {
                        index,
                        vertex_count,
                    });
                }
                *slot = index - 1;
            }
            triangles.push(ResolvedTriangle {
                indices,
                material: triangle.material.min(materials.len() - 1),
                tag: triangle.tag,
            });
        }

        let mut children = Vec::with_capacity(clump.children.len());
        for child in &clump.children {
            let child_base = stack_entry(&stack, child.transform)?.clone();
            let child_material = &materials[child.materials.min(materials.len() - 1)];
            children.push(self.resolve_clump(&child.clump, &child_base, child_material)?);
        }

        let matrix = match self.mode {
            TransformMode::Baked => None,
            TransformMode::NodeLocal => clump.transforms.iter().rev().find_map(|t| match t {
                TransformOp::Matrix { values } => Some(*values),
                _ => None,
            }),
        };

        Ok(ResolvedClump {
            tag: clump.tag,
            matrix,
            vertices,
            triangles,
            materials,
            children,
        })
    }

    /// Stack of composed matrices; entry `k` is the state after `k`
    /// transforms.
    fn transform_stack(&self, clump: &Clump, base: &Transform) -> Result<Vec<Transform>> {
        let mut stack = Vec::with_capacity(clump.transforms.len() + 1);
        stack.push(base.clone());
        for op in &clump.transforms {
            let top = &stack[stack.len() - 1];
            let next = match op {
                TransformOp::Identity => base.clone(),
                TransformOp::Translate { x, y, z } => Transform::translation(*x, *y, *z).then(top),
                TransformOp::Scale { x, y, z } => Transform::scale(*x, *y, *z).then(top),
                TransformOp::Rotate { x, y, z, angle } => {
                    Transform::rotation_about_axis(*x, *y, *z, *angle)
                        .ok_or_else(|| {
                            RwxError::InvalidTransform(format!(
                                "rotation axis ({x}, {y}, {z}) has zero length"
                            ))
                        })?
                        .then(top)
                }
                TransformOp::Matrix { values } => match self.mode {
                    TransformMode::Baked => Transform::from_row_major(values).then(top),
                    TransformMode::NodeLocal => top.clone(),
                },
            };
            stack.push(next);
        }
        Ok(stack)
    }
}

fn stack_entry(stack: &[Transform], depth: usize) -> Result<&Transform> {
    stack.get(depth).ok_or_else(|| {
        RwxError::InvalidTransform(format!(
            "transform depth {depth} exceeds the {} declared transforms",
            stack.len() - 1
        ))
    })
}

/// A face in the flattened scene.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatFace {
    /// 0-based indices into [`ResolvedScene::vertices`].
    pub indices: [u32; 3],
    /// Index into [`ResolvedScene::materials`].
    pub material: usize,
    /// Triangle tag.
    pub tag: i64,
}

/// All clumps merged into global vertex, face and material lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedScene {
    /// Every vertex, clump by clump in depth-first order.
    pub vertices: Vec<ResolvedVertex>,
    /// Every face with global indices.
    pub faces: Vec<FlatFace>,
    /// Materials referenced by faces, in first-use order per clump.
    pub materials: Vec<CompositeMaterial>,
}

impl ResolvedScene {
    /// Flatten a resolved tree.
    pub fn flatten(root: &ResolvedClump) -> Self {
        let mut scene = Self::default();
        scene.append(root);
        scene
    }

    fn append(&mut self, clump: &ResolvedClump) {
        let offset = self.vertices.len() as u32;
        self.vertices.extend(clump.vertices.iter().cloned());

        let mut mapping: HashMap<usize, usize> = HashMap::new();
        for triangle in &clump.triangles {
            let material = match mapping.get(&triangle.material) {
                Some(&index) => index,
                None => {
                    let index = self.materials.len();
                    self.materials.push(clump.materials[triangle.material].clone());
                    mapping.insert(triangle.material, index);
                    index
                }
            };
            self.faces.push(FlatFace {
                indices: triangle.indices.map(|i| i + offset),
                material,
                tag: triangle.tag,
            });
        }

        for child in &clump.children {
            self.append(child);
        }
    }
}

/// Resolve `clump` with every transform baked and flatten the result.
pub fn resolve(clump: &Clump) -> Result<ResolvedScene> {
    let tree = Resolver::new(TransformMode::Baked).resolve(clump)?;
    let scene = ResolvedScene::flatten(&tree);
    log::debug!(
        "resolved {} vertices, {} faces, {} materials",
        scene.vertices.len(),
        scene.faces.len(),
        scene.materials.len()
    );
    Ok(scene)
}
