//! glTF 2.0 export.
//!
//! One node per clump, one packed buffer for the whole model. Each clump
//! with triangles gets a mesh whose primitives group its triangles by
//! material. Positions are baked per clump; an explicit `transform` matrix
//! on a clump becomes the node's own matrix.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use ::gltf::binary::{Glb, Header};
use ::gltf::json as schema;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rwx_ir::Clump;
use schema::accessor::{ComponentType, GenericComponentType, Type};
use schema::buffer::Target;
use schema::material::{AlphaMode, PbrBaseColorFactor, PbrMetallicRoughness, StrengthFactor};
use schema::mesh::{Mode, Semantic};
use schema::validation::{Checked::Valid, USize64};
use serde_json::json;

use crate::error::Result;
use crate::material::CompositeMaterial;
use crate::resolve::{ResolvedClump, Resolver, TransformMode};

/// Encoder options.
#[derive(Debug, Clone)]
pub struct GltfOptions {
    /// Value of `asset.generator`.
    pub generator: Option<String>,
}

impl Default for GltfOptions {
    fn default() -> Self {
        Self {
            generator: Some(format!("rwx {}", env!("CARGO_PKG_VERSION"))),
        }
    }
}

/// Integer width chosen for one index group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexWidth {
    /// 1-byte indices.
    U8,
    /// 2-byte indices.
    U16,
    /// 4-byte indices.
    U32,
}

impl IndexWidth {
    /// Narrowest width for a group whose largest 0-based index is `max`.
    pub fn for_max(max: u32) -> Self {
        if max < 255 {
            IndexWidth::U8
        } else if max < 65535 {
            IndexWidth::U16
        } else {
            IndexWidth::U32
        }
    }

    /// glTF `componentType`.
    pub fn component_type(self) -> ComponentType {
        match self {
            IndexWidth::U8 => ComponentType::U8,
            IndexWidth::U16 => ComponentType::U16,
            IndexWidth::U32 => ComponentType::U32,
        }
    }

    fn encode(self, indices: &[u32]) -> Vec<u8> {
        match self {
            IndexWidth::U8 => indices.iter().map(|&i| i as u8).collect(),
            IndexWidth::U16 => indices
                .iter()
                .flat_map(|&i| (i as u16).to_le_bytes())
                .collect(),
            IndexWidth::U32 => indices.iter().flat_map(|&i| i.to_le_bytes()).collect(),
        }
    }
}

/// Where an append landed in the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferRegion {
    /// Offset of the first byte.
    pub byte_offset: usize,
    /// Length without padding.
    pub byte_length: usize,
}

/// Metallic-roughness material derived from a composite material.
///
/// Two materials are the same glTF material when all fields are equal.
#[derive(Debug, Clone, PartialEq)]
pub struct PbrMaterial {
    /// RGBA base colour.
    pub base_color: [f64; 4],
    /// Metallic factor, from the diffuse coefficient.
    pub metallic: f64,
    /// Roughness factor, from the specular coefficient.
    pub roughness: f64,
    /// Texture name.
    pub texture: Option<String>,
}

impl PbrMaterial {
    /// Convert with 0.5 grey, opaque, metallic 1 and roughness 0 for unset
    /// fields. Factors are clamped to `[0, 1]`.
    pub fn from_composite(material: &CompositeMaterial) -> Self {
        let [r, g, b] = material.color.unwrap_or([0.5; 3]);
        let alpha = material.opacity.unwrap_or(1.0);
        Self {
            base_color: [r, g, b, alpha].map(|c| c.clamp(0.0, 1.0)),
            metallic: material.diffuse.unwrap_or(1.0).clamp(0.0, 1.0),
            roughness: material.specular.unwrap_or(0.0).clamp(0.0, 1.0),
            texture: material.texture.clone(),
        }
    }

    fn to_schema(&self) -> schema::Material {
        let alpha_mode = if self.base_color[3] < 1.0 {
            AlphaMode::Blend
        } else {
            AlphaMode::Opaque
        };
        schema::Material {
            name: self.texture.clone(),
            alpha_mode: Valid(alpha_mode),
            pbr_metallic_roughness: PbrMetallicRoughness {
                base_color_factor: PbrBaseColorFactor(self.base_color.map(|c| c as f32)),
                metallic_factor: StrengthFactor(self.metallic as f32),
                roughness_factor: StrengthFactor(self.roughness as f32),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

/// A complete glTF document with its binary buffer.
#[derive(Debug, Clone)]
pub struct GltfDocument {
    root: schema::Root,
    blob: Vec<u8>,
}

impl GltfDocument {
    /// Build a document from a tree resolved in
    /// [`TransformMode::NodeLocal`].
    pub fn from_resolved(tree: &ResolvedClump, options: &GltfOptions) -> Self {
        let mut builder = Builder::default();
        let node = builder.add_clump(tree);
        let Builder {
            mut root, buffer, ..
        } = builder;

        root.asset.generator = options.generator.clone();
        let scene = root.push(schema::Scene {
            extensions: Default::default(),
            extras: Default::default(),
            name: None,
            nodes: vec![node],
        });
        root.scene = Some(scene);
        if !buffer.is_empty() {
            root.push(schema::Buffer {
                byte_length: USize64::from(buffer.len()),
                name: None,
                uri: None,
                extensions: Default::default(),
                extras: Default::default(),
            });
        }

        Self { root, blob: buffer }
    }

    /// The packed binary buffer.
    pub fn blob(&self) -> &[u8] {
        &self.blob
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.root.nodes.len()
    }

    /// Number of distinct materials.
    pub fn material_count(&self) -> usize {
        self.root.materials.len()
    }

    /// `.gltf` JSON with the buffer embedded as a base64 data URI.
    pub fn to_gltf_json(&self) -> Result<Vec<u8>> {
        let mut root = self.root.clone();
        if let Some(buffer) = root.buffers.first_mut() {
            buffer.uri = Some(format!(
                "data:application/octet-stream;base64,{}",
                STANDARD.encode(&self.blob)
            ));
        }
        Ok(schema::serialize::to_vec_pretty(&root)?)
    }

    /// Binary `.glb` container.
    pub fn to_glb(&self) -> Result<Vec<u8>> {
        let json = schema::serialize::to_vec(&self.root)?;
        let glb = Glb {
            header: Header {
                magic: *b"glTF",
                version: 2,
                // recomputed by `to_vec`
                length: 0,
            },
            json: Cow::Owned(json),
            bin: (!self.blob.is_empty()).then(|| Cow::Borrowed(self.blob.as_slice())),
        };
        Ok(glb.to_vec()?)
    }

    /// Write to `path`: `.glb` extension gives the binary container,
    /// anything else JSON with an embedded buffer.
    pub fn export(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let binary = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("glb"));
        let bytes = if binary {
            self.to_glb()?
        } else {
            self.to_gltf_json()?
        };
        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(&bytes)?;
        writer.flush()?;
        Ok(())
    }
}

#[derive(Default)]
struct Builder {
    root: schema::Root,
    material_keys: Vec<PbrMaterial>,
    buffer: Vec<u8>,
}

impl Builder {
    /// Append bytes and pad the buffer to the next 4-byte boundary.
    fn append(&mut self, data: &[u8]) -> BufferRegion {
        let region = BufferRegion {
            byte_offset: self.buffer.len(),
            byte_length: data.len(),
        };
        self.buffer.extend_from_slice(data);
        while self.buffer.len() % 4 != 0 {
            self.buffer.push(0);
        }
        region
    }

    fn add_view(&mut self, data: &[u8], target: Target) -> schema::Index<schema::buffer::View> {
        let region = self.append(data);
        self.root.push(schema::buffer::View {
            buffer: schema::Index::new(0),
            byte_length: USize64::from(region.byte_length),
            byte_offset: Some(USize64::from(region.byte_offset)),
            byte_stride: None,
            name: None,
            target: Some(Valid(target)),
            extensions: Default::default(),
            extras: Default::default(),
        })
    }

    fn add_accessor(
        &mut self,
        view: schema::Index<schema::buffer::View>,
        count: usize,
        component_type: ComponentType,
        type_: Type,
        bounds: (schema::Value, schema::Value),
    ) -> schema::Index<schema::Accessor> {
        let (min, max) = bounds;
        self.root.push(schema::Accessor {
            buffer_view: Some(view),
            byte_offset: None,
            count: USize64::from(count),
            component_type: Valid(GenericComponentType(component_type)),
            extensions: Default::default(),
            extras: Default::default(),
            type_: Valid(type_),
            min: Some(min),
            max: Some(max),
            name: None,
            normalized: false,
            sparse: None,
        })
    }

    fn add_material(&mut self, material: &CompositeMaterial) -> schema::Index<schema::Material> {
        let key = PbrMaterial::from_composite(material);
        if let Some(index) = self.material_keys.iter().position(|m| *m == key) {
            return schema::Index::new(index as u32);
        }
        let index = self.root.push(key.to_schema());
        self.material_keys.push(key);
        index
    }

    fn add_positions(&mut self, clump: &ResolvedClump) -> schema::Index<schema::Accessor> {
        let mut min = [f32::INFINITY; 3];
        let mut max = [f32::NEG_INFINITY; 3];
        let mut data = Vec::with_capacity(clump.vertices.len() * 12);
        for vertex in &clump.vertices {
            for axis in 0..3 {
                let value = vertex.position[axis] as f32;
                min[axis] = min[axis].min(value);
                max[axis] = max[axis].max(value);
                data.extend_from_slice(&value.to_le_bytes());
            }
        }
        let view = self.add_view(&data, Target::ArrayBuffer);
        self.add_accessor(
            view,
            clump.vertices.len(),
            ComponentType::F32,
            Type::Vec3,
            (json!(min), json!(max)),
        )
    }

    fn add_indices(&mut self, indices: &[u32]) -> schema::Index<schema::Accessor> {
        let min = indices.iter().copied().min().unwrap_or(0);
        let max = indices.iter().copied().max().unwrap_or(0);
        let width = IndexWidth::for_max(max);
        let view = self.add_view(&width.encode(indices), Target::ElementArrayBuffer);
        self.add_accessor(
            view,
            indices.len(),
            width.component_type(),
            Type::Scalar,
            (json!([min]), json!([max])),
        )
    }

    fn add_mesh(&mut self, clump: &ResolvedClump) -> schema::Index<schema::Mesh> {
        let positions = self.add_positions(clump);

        // Groups keep the order in which their material first appears.
        let mut groups: Vec<(usize, Vec<u32>)> = Vec::new();
        for triangle in &clump.triangles {
            match groups.iter_mut().find(|(m, _)| *m == triangle.material) {
                Some((_, indices)) => indices.extend_from_slice(&triangle.indices),
                None => groups.push((triangle.material, triangle.indices.to_vec())),
            }
        }

        let mut primitives = Vec::with_capacity(groups.len());
        for (material, indices) in groups {
            let accessor = self.add_indices(&indices);
            let material = self.add_material(&clump.materials[material]);
            primitives.push(schema::mesh::Primitive {
                attributes: BTreeMap::from([(Valid(Semantic::Positions), positions)]),
                extensions: Default::default(),
                extras: Default::default(),
                indices: Some(accessor),
                material: Some(material),
                mode: Valid(Mode::Triangles),
                targets: None,
            });
        }
        self.root.push(schema::Mesh {
            extensions: Default::default(),
            extras: Default::default(),
            name: None,
            primitives,
            weights: None,
        })
    }

    fn add_clump(&mut self, clump: &ResolvedClump) -> schema::Index<schema::Node> {
        let index = self.root.push(schema::Node::default());

        let mesh = if clump.triangles.is_empty() {
            None
        } else {
            Some(self.add_mesh(clump))
        };
        let children: Vec<_> = clump
            .children
            .iter()
            .map(|child| self.add_clump(child))
            .collect();

        self.root.nodes[index.value()] = schema::Node {
            mesh,
            matrix: clump.matrix.map(|m| m.map(|v| v as f32)),
            children: (!children.is_empty()).then_some(children),
            ..Default::default()
        };
        index
    }
}

/// Resolve `clump` node-locally and build a glTF document.
pub fn export_gltf(clump: &Clump, options: &GltfOptions) -> Result<GltfDocument> {
    let tree = Resolver::new(TransformMode::NodeLocal).resolve(clump)?;
    let document = GltfDocument::from_resolved(&tree, options);
    log::debug!(
        "glTF document: {} nodes, {} materials, {} buffer bytes",
        document.node_count(),
        document.material_count(),
        document.blob.len()
    );
    Ok(document)
}
