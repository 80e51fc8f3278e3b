//! Three.js JSON model export.
//!
//! All clumps are baked into one vertex list. Each face is written as eight
//! integers: the face type, the three vertex indices, the material index and
//! the three vertex indices again for the per-vertex UV slots.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use rwx_ir::Clump;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::material::CompositeMaterial;
use crate::resolve::{resolve, ResolvedScene};

/// Face type bits: has material, has per-vertex UVs.
pub const FACE_TYPE: u32 = 10;

/// Encoder options.
#[derive(Debug, Clone)]
pub struct ThreeJsOptions {
    /// Write without whitespace instead of indenting by four spaces.
    pub compact: bool,
    /// Appended to texture names to form `mapDiffuse`.
    pub texture_suffix: String,
}

impl Default for ThreeJsOptions {
    fn default() -> Self {
        Self {
            compact: false,
            texture_suffix: ".png".to_string(),
        }
    }
}

/// A material entry of the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreeJsMaterial {
    /// Colour scaled by the ambient coefficient.
    pub color_ambient: [f64; 3],
    /// Colour scaled by the diffuse coefficient.
    pub color_diffuse: [f64; 3],
    /// Specular coefficient on every channel.
    pub color_specular: [f64; 3],
    /// Texture file name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_diffuse: Option<String>,
}

impl ThreeJsMaterial {
    /// Convert a composite material. Unset fields read as black, 0.
    pub fn from_composite(material: &CompositeMaterial, texture_suffix: &str) -> Self {
        let color = material.color.unwrap_or([0.0; 3]);
        let ambient = material.ambient.unwrap_or(0.0);
        let diffuse = material.diffuse.unwrap_or(0.0);
        let specular = material.specular.unwrap_or(0.0);
        Self {
            color_ambient: color.map(|c| c * ambient),
            color_diffuse: color.map(|c| c * diffuse),
            color_specular: [specular; 3],
            map_diffuse: material
                .texture
                .as_ref()
                .map(|name| format!("{name}{texture_suffix}")),
        }
    }
}

/// A Three.js JSON model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreeJsModel {
    /// Flat `x, y, z` triplets.
    pub vertices: Vec<f64>,
    /// One UV layer of flat `u, v` pairs, `v` flipped.
    pub uvs: Vec<Vec<f64>>,
    /// Always empty.
    pub normals: Vec<f64>,
    /// Eight integers per face.
    pub faces: Vec<u32>,
    /// Materials referenced by faces.
    pub materials: Vec<ThreeJsMaterial>,
}

impl ThreeJsModel {
    /// Build a model from a flattened scene.
    pub fn from_scene(scene: &ResolvedScene, options: &ThreeJsOptions) -> Self {
        let mut vertices = Vec::with_capacity(scene.vertices.len() * 3);
        let mut uvs = Vec::with_capacity(scene.vertices.len() * 2);
        for vertex in &scene.vertices {
            vertices.extend_from_slice(&vertex.position);
            match vertex.uv {
                Some([u, v]) => uvs.extend_from_slice(&[u, 1.0 - v]),
                None => uvs.extend_from_slice(&[0.0, 0.0]),
            }
        }

        let mut faces = Vec::with_capacity(scene.faces.len() * 8);
        for face in &scene.faces {
            let [a, b, c] = face.indices;
            faces.extend_from_slice(&[FACE_TYPE, a, b, c, face.material as u32, a, b, c]);
        }

        let materials = scene
            .materials
            .iter()
            .map(|m| ThreeJsMaterial::from_composite(m, &options.texture_suffix))
            .collect();

        Self {
            vertices,
            uvs: vec![uvs],
            normals: Vec::new(),
            faces,
            materials,
        }
    }

    /// Number of faces.
    pub fn face_count(&self) -> usize {
        self.faces.len() / 8
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self, compact: bool) -> Result<String> {
        let mut out = Vec::new();
        self.write(&mut out, compact)?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    /// Deserialize from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write JSON to `writer`.
    pub fn write<W: Write>(&self, writer: W, compact: bool) -> Result<()> {
        if compact {
            serde_json::to_writer(writer, self)?;
        } else {
            let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
            let mut serializer = serde_json::Serializer::with_formatter(writer, formatter);
            self.serialize(&mut serializer)?;
        }
        Ok(())
    }

    /// Write JSON to a file. The file is only created once encoding has
    /// succeeded.
    pub fn export(&self, path: impl AsRef<Path>, compact: bool) -> Result<()> {
        let mut bytes = Vec::new();
        self.write(&mut bytes, compact)?;
        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(&bytes)?;
        writer.flush()?;
        Ok(())
    }
}

/// Resolve `clump` with baked transforms and build a Three.js model.
pub fn export_three(clump: &Clump, options: &ThreeJsOptions) -> Result<ThreeJsModel> {
    let scene = resolve(clump)?;
    Ok(ThreeJsModel::from_scene(&scene, options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rwx_reader::read_rwx_from_buffer;

    fn convert(body: &str) -> ThreeJsModel {
        let clump = read_rwx_from_buffer(format!("modelbegin\n{body}\nmodelend\n").as_bytes())
            .unwrap();
        export_three(&clump, &ThreeJsOptions::default()).unwrap()
    }

    #[test]
    fn test_faces_repeat_indices() {
        let model = convert(
            "clumpbegin\nvertex 0 0 0\nvertex 1 0 0\nvertex 1 1 0\nvertex 0 1 0\n\
             quad 1 2 3 4\nclumpend\n",
        );
        assert_eq!(model.face_count(), 2);
        assert_eq!(
            model.faces,
            vec![10, 0, 1, 2, 0, 0, 1, 2, 10, 2, 3, 0, 0, 2, 3, 0]
        );
        assert_eq!(model.vertices.len(), 12);
        assert!(model.normals.is_empty());
    }

    #[test]
    fn test_uvs_flip_v() {
        let model = convert("vertex 0 0 0 uv 0.25 0.75\nvertex 1 0 0\n");
        assert_eq!(model.uvs, vec![vec![0.25, 0.25, 0.0, 0.0]]);
    }

    #[test]
    fn test_material_channels() {
        let model = convert(
            "color 1 0.5 0\nsurface 0.5 0.8 0.3\ntexture wood\n\
             vertex 0 0 0\nvertex 1 0 0\nvertex 0 1 0\ntriangle 1 2 3\n",
        );
        assert_eq!(model.materials.len(), 1);
        let material = &model.materials[0];
        assert_eq!(material.color_ambient, [0.5, 0.25, 0.0]);
        assert_eq!(material.color_diffuse, [0.8, 0.4, 0.0]);
        assert_eq!(material.color_specular, [0.3, 0.3, 0.3]);
        assert_eq!(material.map_diffuse.as_deref(), Some("wood.png"));
    }

    #[test]
    fn test_unset_material_is_black() {
        let model = convert("vertex 0 0 0\nvertex 1 0 0\nvertex 0 1 0\ntriangle 1 2 3\n");
        let material = &model.materials[0];
        assert_eq!(material.color_ambient, [0.0; 3]);
        assert_eq!(material.map_diffuse, None);
    }

    #[test]
    fn test_json_keys() {
        let model = convert(
            "texture stone\nvertex 0 0 0\nvertex 1 0 0\nvertex 0 1 0\ntriangle 1 2 3\n",
        );
        let value: serde_json::Value =
            serde_json::from_str(&model.to_json(true).unwrap()).unwrap();
        for key in ["vertices", "uvs", "normals", "faces", "materials"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        let material = &value["materials"][0];
        assert_eq!(material["mapDiffuse"], "stone.png");
        assert!(material.get("colorAmbient").is_some());
    }

    #[test]
    fn test_null_texture_omits_map() {
        let model = convert(
            "texture stone\ntexture null\nvertex 0 0 0\nvertex 1 0 0\nvertex 0 1 0\n\
             triangle 1 2 3\n",
        );
        let json = model.to_json(true).unwrap();
        assert!(!json.contains("mapDiffuse"));
    }

    #[test]
    fn test_pretty_indent_and_roundtrip() {
        let model = convert("vertex 0 0 0\nvertex 1 0 0\nvertex 0 1 0\ntriangle 1 2 3\n");
        let pretty = model.to_json(false).unwrap();
        assert!(pretty.contains("\n    \"vertices\""));
        assert_eq!(ThreeJsModel::from_json(&pretty).unwrap(), model);
        assert!(!model.to_json(true).unwrap().contains('\n'));
    }

    #[test]
    fn test_export_writes_file() {
        let model = convert("vertex 0 0 0\nvertex 1 0 0\nvertex 0 1 0\ntriangle 1 2 3\n");
        let path = std::env::temp_dir().join(format!("rwx-three-{}.json", std::process::id()));
        model.export(&path, true).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(written, model.to_json(true).unwrap());
    }
}
