//! Recursive-descent builder: turns the word stream into a [`Clump`] tree.
//!
//! Statements are dispatched on their first word over the closed
//! [`Keyword`] set. Anything outside that set, or an end keyword that does
//! not close the current block, is an [`ReadError::UnexpectedToken`].

use std::io::BufRead;

use rwx_ir::{Child, ChildKind, Clump, MaterialOp, Transform, Triangle, Vertex};

use crate::error::{LimitKind, ReadError, Result};
use crate::proto::{Token, TokenStream};
use crate::settings::ReaderSettings;

/// Statement keywords understood by the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    /// `modelbegin`.
    ModelBegin,
    /// `modelend`.
    ModelEnd,
    /// `clumpbegin`.
    ClumpBegin,
    /// `clumpend`.
    ClumpEnd,
    /// `transformbegin`.
    TransformBegin,
    /// `transformend`.
    TransformEnd,
    /// `jointtransformbegin`.
    JointTransformBegin,
    /// `jointtransformend`.
    JointTransformEnd,
    /// `protobegin`.
    ProtoBegin,
    /// `protoend`.
    ProtoEnd,
    /// `protoinstance`.
    ProtoInstance,
    /// `vertex`, `vertexext`.
    Vertex,
    /// `triangle`, `triangleext`.
    Triangle,
    /// `quad`, `quadext`.
    Quad,
    /// `polygon`, `polygonext`.
    Polygon,
    /// `surface`.
    Surface,
    /// `color`.
    Color,
    /// `ambient`.
    Ambient,
    /// `diffuse`.
    Diffuse,
    /// `specular`.
    Specular,
    /// `opacity`.
    Opacity,
    /// `texture`.
    Texture,
    /// `tag`.
    Tag,
    /// `rotate`, `rotatejoint`.
    Rotate,
    /// `scale`, `scalejoint`.
    Scale,
    /// `translate`, `translatejoint`.
    Translate,
    /// `transform`, `transformjoint`.
    Transform,
    /// `identity`, `identityjoint`.
    Identity,
}

impl Keyword {
    /// Look up a keyword, ignoring case.
    pub fn from_word(word: &str) -> Option<Self> {
        let keyword = match word.to_ascii_lowercase().as_str() {
            "modelbegin" => Keyword::ModelBegin,
            "modelend" => Keyword::ModelEnd,
            "clumpbegin" => Keyword::ClumpBegin,
            "clumpend" => Keyword::ClumpEnd,
            "transformbegin" => Keyword::TransformBegin,
            "transformend" => Keyword::TransformEnd,
            "jointtransformbegin" => Keyword::JointTransformBegin,
            "jointtransformend" => Keyword::JointTransformEnd,
            "protobegin" => Keyword::ProtoBegin,
            "protoend" => Keyword::ProtoEnd,
            "protoinstance" => Keyword::ProtoInstance,
            "vertex" | "vertexext" => Keyword::Vertex,
            "triangle" | "triangleext" => Keyword::Triangle,
            "quad" | "quadext" => Keyword::Quad,
            "polygon" | "polygonext" => Keyword::Polygon,
            "surface" => Keyword::Surface,
            "color" => Keyword::Color,
            "ambient" => Keyword::Ambient,
            "diffuse" => Keyword::Diffuse,
            "specular" => Keyword::Specular,
            "opacity" => Keyword::Opacity,
            "texture" => Keyword::Texture,
            "tag" => Keyword::Tag,
            "rotate" | "rotatejoint" => Keyword::Rotate,
            "scale" | "scalejoint" => Keyword::Scale,
            "translate" | "translatejoint" => Keyword::Translate,
            "transform" | "transformjoint" => Keyword::Transform,
            "identity" | "identityjoint" => Keyword::Identity,
            _ => return None,
        };
        Some(keyword)
    }

    /// Canonical spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::ModelBegin => "modelbegin",
            Keyword::ModelEnd => "modelend",
            Keyword::ClumpBegin => "clumpbegin",
            Keyword::ClumpEnd => "clumpend",
            Keyword::TransformBegin => "transformbegin",
            Keyword::TransformEnd => "transformend",
            Keyword::JointTransformBegin => "jointtransformbegin",
            Keyword::JointTransformEnd => "jointtransformend",
            Keyword::ProtoBegin => "protobegin",
            Keyword::ProtoEnd => "protoend",
            Keyword::ProtoInstance => "protoinstance",
            Keyword::Vertex => "vertex",
            Keyword::Triangle => "triangle",
            Keyword::Quad => "quad",
            Keyword::Polygon => "polygon",
            Keyword::Surface => "surface",
            Keyword::Color => "color",
            Keyword::Ambient => "ambient",
            Keyword::Diffuse => "diffuse",
            Keyword::Specular => "specular",
            Keyword::Opacity => "opacity",
            Keyword::Texture => "texture",
            Keyword::Tag => "tag",
            Keyword::Rotate => "rotate",
            Keyword::Scale => "scale",
            Keyword::Translate => "translate",
            Keyword::Transform => "transform",
            Keyword::Identity => "identity",
        }
    }
}

/// Parser for one RWX model.
pub struct Parser<'s, R> {
    stream: TokenStream<'s, R>,
    max_depth: usize,
    depth: usize,
}

impl<'s, R: BufRead> Parser<'s, R> {
    /// Parse a complete `modelbegin … modelend` document.
    pub fn parse(input: R, settings: &'s ReaderSettings) -> Result<Clump> {
        settings.validate().map_err(ReadError::InvalidSettings)?;
        let mut parser = Parser {
            stream: TokenStream::new(input, settings),
            max_depth: settings.max_group_depth,
            depth: 0,
        };
        parser.parse_model()
    }

    fn parse_model(&mut self) -> Result<Clump> {
        let first = self.stream.expect(Keyword::ModelBegin.as_str())?;
        if Keyword::from_word(first.word()) != Some(Keyword::ModelBegin) {
            return Err(first.unexpected());
        }
        let model = self.parse_group(Keyword::ModelEnd)?;

        if let Some(extra) = self.stream.peek()? {
            log::warn!(
                "ignoring content after modelend, starting at line {}",
                extra.line_number()
            );
        }
        log::debug!(
            "read model: {} clumps, {} vertices, {} triangles, {} protos",
            model.clump_count(),
            model.vertex_count(),
            model.triangle_count(),
            self.stream.protos().len()
        );
        Ok(model)
    }

    /// Read statements into a new clump until `end`.
    fn parse_group(&mut self, end: Keyword) -> Result<Clump> {
        let mut clump = Clump::new();
        loop {
            let token = self.stream.expect(end.as_str())?;
            let keyword = Keyword::from_word(token.word()).ok_or_else(|| token.unexpected())?;
            if keyword == end {
                return Ok(clump);
            }

            match keyword {
                Keyword::Vertex => {
                    let vertex = self.parse_vertex(&token, clump.transforms.len())?;
                    clump.vertices.push(vertex);
                }
                Keyword::Triangle => {
                    let indices = self.indices::<3>()?;
                    let tag = self.trailing_tag(&token)?;
                    clump.triangles.push(Triangle {
                        indices,
                        material: clump.materials.len(),
                        tag,
                    });
                }
                Keyword::Quad => {
                    let [i0, i1, i2, i3] = self.indices::<4>()?;
                    let tag = self.trailing_tag(&token)?;
                    let material = clump.materials.len();
                    for indices in [[i0, i1, i2], [i2, i3, i0]] {
                        clump.triangles.push(Triangle {
                            indices,
                            material,
                            tag,
                        });
                    }
                }
                Keyword::Polygon => self.parse_polygon(&token, &mut clump)?,
                Keyword::Surface => {
                    let [ambient, diffuse, specular] = self.floats::<3>()?;
                    clump.materials.push(MaterialOp::Surface {
                        ambient,
                        diffuse,
                        specular,
                    });
                }
                Keyword::Color => {
                    let [r, g, b] = self.floats::<3>()?;
                    clump.materials.push(MaterialOp::Color { r, g, b });
                }
                Keyword::Ambient => {
                    let value = self.float()?;
                    clump.materials.push(MaterialOp::Ambient { value });
                }
                Keyword::Diffuse => {
                    let value = self.float()?;
                    clump.materials.push(MaterialOp::Diffuse { value });
                }
                Keyword::Specular => {
                    let value = self.float()?;
                    clump.materials.push(MaterialOp::Specular { value });
                }
                Keyword::Opacity => {
                    let value = self.float()?;
                    clump.materials.push(MaterialOp::Opacity { value });
                }
                Keyword::Texture => {
                    let name = self.parse_texture(&token)?;
                    clump.materials.push(MaterialOp::Texture { name });
                }
                Keyword::Tag => {
                    clump.tag = self.stream.number("tag value")?;
                }
                Keyword::Rotate => {
                    let [x, y, z, angle] = self.floats::<4>()?;
                    clump.transforms.push(Transform::Rotate { x, y, z, angle });
                }
                Keyword::Scale => {
                    let [x, y, z] = self.floats::<3>()?;
                    clump.transforms.push(Transform::Scale { x, y, z });
                }
                Keyword::Translate => {
                    let [x, y, z] = self.floats::<3>()?;
                    clump.transforms.push(Transform::Translate { x, y, z });
                }
                Keyword::Transform => {
                    let values = self.floats::<16>()?;
                    clump.transforms.push(Transform::Matrix { values });
                }
                Keyword::Identity => clump.transforms.push(Transform::Identity),
                Keyword::ProtoBegin => self.stream.define_proto()?,
                Keyword::ProtoInstance => {
                    let name = self.stream.expect("proto name")?;
                    self.stream.instantiate(&name)?;
                }
                Keyword::ClumpBegin => {
                    self.parse_child(&token, ChildKind::Clump, Keyword::ClumpEnd, &mut clump)?
                }
                Keyword::TransformBegin => self.parse_child(
                    &token,
                    ChildKind::TransformGroup,
                    Keyword::TransformEnd,
                    &mut clump,
                )?,
                Keyword::JointTransformBegin => self.parse_child(
                    &token,
                    ChildKind::JointTransformGroup,
                    Keyword::JointTransformEnd,
                    &mut clump,
                )?,
                Keyword::ModelBegin
                | Keyword::ModelEnd
                | Keyword::ClumpEnd
                | Keyword::TransformEnd
                | Keyword::JointTransformEnd
                | Keyword::ProtoEnd => return Err(token.unexpected()),
            }
        }
    }

    fn parse_child(
        &mut self,
        token: &Token,
        kind: ChildKind,
        end: Keyword,
        parent: &mut Clump,
    ) -> Result<()> {
        if self.depth >= self.max_depth {
            return Err(ReadError::RecursionLimitExceeded {
                line: token.line_number(),
                kind: LimitKind::Group,
                limit: self.max_depth,
            });
        }
        let transform = parent.transforms.len();
        let materials = parent.materials.len();

        self.depth += 1;
        let clump = self.parse_group(end)?;
        self.depth -= 1;

        parent.children.push(Child {
            kind,
            transform,
            materials,
            clump,
        });
        Ok(())
    }

    /// `vertex x y z [uv u v] [other words…]`
    fn parse_vertex(&mut self, token: &Token, transform: usize) -> Result<Vertex> {
        let [x, y, z] = self.floats::<3>()?;
        let mut uv = None;
        while let Some(extra) = self.stream.next_on_line(token)? {
            if extra.is("uv") {
                let [u, v] = self.floats::<2>()?;
                uv = Some([u, v]);
            }
        }
        Ok(Vertex {
            x,
            y,
            z,
            uv,
            transform,
        })
    }

    /// `polygon n i1 … in [tag t]`, fan-triangulated around `i1`.
    fn parse_polygon(&mut self, token: &Token, clump: &mut Clump) -> Result<()> {
        let count: usize = self.stream.number("polygon vertex count")?;
        // count comes from input, so the vector grows as indices arrive
        let mut indices: Vec<u32> = Vec::new();
        for _ in 0..count {
            indices.push(self.stream.number("polygon index")?);
        }
        let tag = self.trailing_tag(token)?;

        if count < 3 {
            log::warn!(
                "polygon with {count} indices at line {} produces no triangles",
                token.line_number()
            );
            return Ok(());
        }
        let material = clump.materials.len();
        for i in 1..count - 1 {
            clump.triangles.push(Triangle {
                indices: [indices[0], indices[i], indices[i + 1]],
                material,
                tag,
            });
        }
        Ok(())
    }

    /// `texture name [options…]`; `texture null` clears the texture.
    fn parse_texture(&mut self, token: &Token) -> Result<Option<String>> {
        let name = self.stream.expect("texture name")?;
        while let Some(option) = self.stream.next_on_line(token)? {
            log::debug!(
                "ignoring texture option '{}' at line {}",
                option.word(),
                option.line_number()
            );
        }
        if name.is("null") {
            Ok(None)
        } else {
            Ok(Some(name.word().to_string()))
        }
    }

    fn trailing_tag(&mut self, token: &Token) -> Result<i64> {
        match self.stream.next_on_line_if(token, |t| t.is("tag"))? {
            Some(_) => self.stream.number("tag value"),
            None => Ok(0),
        }
    }

    fn float(&mut self) -> Result<f64> {
        self.stream.float("number")
    }

    fn floats<const N: usize>(&mut self) -> Result<[f64; N]> {
        let mut out = [0.0; N];
        for value in &mut out {
            *value = self.stream.float("number")?;
        }
        Ok(out)
    }

    fn indices<const N: usize>(&mut self) -> Result<[u32; N]> {
        let mut out = [0; N];
        for value in &mut out {
            *value = self.stream.number("vertex index")?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Result<Clump> {
        let settings = ReaderSettings::default();
        Parser::parse(input.as_bytes(), &settings)
    }

    fn model(body: &str) -> Clump {
        parse(&format!("modelbegin\n{body}\nmodelend\n")).unwrap()
    }

    fn indices(clump: &Clump) -> Vec<[u32; 3]> {
        clump.triangles.iter().map(|t| t.indices).collect()
    }

    #[test]
    fn test_keyword_aliases() {
        assert_eq!(Keyword::from_word("QuadExt"), Some(Keyword::Quad));
        assert_eq!(Keyword::from_word("identityjoint"), Some(Keyword::Identity));
        assert_eq!(Keyword::from_word("lightsampling"), None);
        assert_eq!(Keyword::Quad.as_str(), "quad");
    }

    #[test]
    fn test_vertex_with_uv_and_extras() {
        let clump = model("vertex 1 2 3 uv 0.25 0.75 prelit 1 1 1\nVertexExt 4 5 6.\n");
        assert_eq!(clump.vertices.len(), 2);
        assert_eq!(clump.vertices[0].uv, Some([0.25, 0.75]));
        assert_eq!(clump.vertices[1].x, 4.0);
        assert_eq!(clump.vertices[1].z, 6.0);
        assert_eq!(clump.vertices[1].uv, None);
    }

    #[test]
    fn test_vertex_records_transform_depth() {
        let clump = model("vertex 0 0 0\ntranslate 1 0 0\nvertex 0 0 0\nidentity\nvertex 0 0 0\n");
        let depths: Vec<usize> = clump.vertices.iter().map(|v| v.transform).collect();
        assert_eq!(depths, vec![0, 1, 2]);
    }

    #[test]
    fn test_triangle_tag() {
        let clump = model("triangle 1 2 3\ntriangleext 3 2 1 tag 7\ntag 9\n");
        assert_eq!(clump.triangles[0].tag, 0);
        assert_eq!(clump.triangles[1].tag, 7);
        assert_eq!(clump.tag, 9);
    }

    #[test]
    fn test_quad_splits_in_two() {
        let clump = model("quadext 1 2 3 4 tag 5\n");
        assert_eq!(indices(&clump), vec![[1, 2, 3], [3, 4, 1]]);
        assert!(clump.triangles.iter().all(|t| t.tag == 5));
    }

    #[test]
    fn test_polygon_fan() {
        let clump = model("polygon 5 1 2 3 4 5\n");
        assert_eq!(indices(&clump), vec![[1, 2, 3], [1, 3, 4], [1, 4, 5]]);
    }

    #[test]
    fn test_degenerate_polygon() {
        let clump = model("polygon 2 1 2\n");
        assert!(clump.triangles.is_empty());
    }

    #[test]
    fn test_polygonext_tag_applies_to_every_triangle() {
        let clump = model("polygonext 4 1 2 3 4 tag 6\n");
        assert_eq!(indices(&clump), vec![[1, 2, 3], [1, 3, 4]]);
        assert!(clump.triangles.iter().all(|t| t.tag == 6));
    }

    #[test]
    fn test_polygon_huge_count_runs_out_of_indices() {
        let input = "modelbegin\npolygon 18446744073709551615 1 2 3\nmodelend\n";
        match parse(input) {
            Err(ReadError::NumericFormat { line, word }) => {
                assert_eq!(line, 1);
                assert_ne!(word, "1");
            }
            other => panic!("expected NumericFormat, got {other:?}"),
        }
    }

    #[test]
    fn test_non_finite_coordinates_are_rejected() {
        for input in [
            "modelbegin\nvertex 1e400 0 0\nmodelend\n",
            "modelbegin\nvertex nan 0 0\nmodelend\n",
            "modelbegin\ntranslate 0 -inf 0\nmodelend\n",
        ] {
            assert!(
                matches!(parse(input), Err(ReadError::NumericFormat { line: 1, .. })),
                "{input}"
            );
        }
    }

    #[test]
    fn test_material_index_counts_ops() {
        let clump = model(
            "triangle 1 2 3\ncolor 1 0 0\nsurface 0.1 0.2 0.3\ntriangle 1 2 3\n\
             opacity 0.5\ntexture brick mask brickm\ntriangle 1 2 3\ntexture NULL\n",
        );
        let materials: Vec<usize> = clump.triangles.iter().map(|t| t.material).collect();
        assert_eq!(materials, vec![0, 2, 4]);
        assert_eq!(
            clump.materials[3],
            MaterialOp::Texture {
                name: Some("brick".into())
            }
        );
        assert_eq!(clump.materials[4], MaterialOp::Texture { name: None });
    }

    #[test]
    fn test_transforms() {
        let clump = model(
            "rotate 0 1 0 90\nScaleJoint 1 2 3\ntranslate 4 5 6\nidentityjoint\n\
             transform 1 0 0 0 0 1 0 0 0 0 1 0 0 0 0 1\n",
        );
        assert_eq!(clump.transforms.len(), 5);
        assert_eq!(
            clump.transforms[0],
            Transform::Rotate {
                x: 0.0,
                y: 1.0,
                z: 0.0,
                angle: 90.0
            }
        );
        assert_eq!(clump.transforms[3], Transform::Identity);
        assert!(matches!(clump.transforms[4], Transform::Matrix { .. }));
    }

    #[test]
    fn test_statement_spans_lines() {
        let clump = model("transform 1 0 0 0\n0 1 0 0\n0 0 1 0\n0 0 0 1\n");
        assert_eq!(clump.transforms.len(), 1);
    }

    #[test]
    fn test_children() {
        let clump = model(
            "color 1 1 1\ntranslate 1 0 0\nclumpbegin\nvertex 0 0 0\nclumpend\n\
             transformbegin\ntransformend\njointtransformbegin\njointtransformend\n",
        );
        assert_eq!(clump.children.len(), 3);
        assert_eq!(clump.children[0].kind, ChildKind::Clump);
        assert_eq!(clump.children[0].transform, 1);
        assert_eq!(clump.children[0].materials, 1);
        assert_eq!(clump.children[0].clump.vertices.len(), 1);
        assert_eq!(clump.children[1].kind, ChildKind::TransformGroup);
        assert_eq!(clump.children[2].kind, ChildKind::JointTransformGroup);
    }

    #[test]
    fn test_proto_instances() {
        let clump = model(
            "protobegin post\nclumpbegin\nvertex 0 0 0\nvertex 1 0 0\nvertex 0 1 0\n\
             triangle 1 2 3\nclumpend\nprotoend\nprotoinstance post\nprotoinstance POST\n",
        );
        assert_eq!(clump.children.len(), 2);
        assert_eq!(clump.children[0].clump, clump.children[1].clump);
    }

    #[test]
    fn test_proto_defining_proto() {
        let clump = model(
            "protobegin outer\nprotobegin inner\nvertex 1 2 3\nprotoend\n\
             protoinstance inner\nprotoend\nprotoinstance outer\nprotoinstance inner\n",
        );
        assert_eq!(clump.vertices.len(), 2);
    }

    #[test]
    fn test_proto_recursion_limit() {
        let settings = ReaderSettings {
            max_proto_depth: 8,
            ..ReaderSettings::default()
        };
        let input = "modelbegin\nprotobegin loop\nprotoinstance loop\nprotoend\nprotoinstance loop\nmodelend\n";
        let result = Parser::parse(input.as_bytes(), &settings);
        assert!(matches!(
            result,
            Err(ReadError::RecursionLimitExceeded {
                kind: LimitKind::Proto,
                limit: 8,
                ..
            })
        ));
    }

    #[test]
    fn test_mutual_proto_recursion_limit() {
        let settings = ReaderSettings {
            max_proto_depth: 8,
            ..ReaderSettings::default()
        };
        let input = "modelbegin\nprotobegin a\nprotoinstance b\nprotoend\n\
                     protobegin b\nprotoinstance a\nprotoend\nprotoinstance a\nmodelend\n";
        let result = Parser::parse(input.as_bytes(), &settings);
        assert!(matches!(
            result,
            Err(ReadError::RecursionLimitExceeded {
                kind: LimitKind::Proto,
                limit: 8,
                ..
            })
        ));
    }

    #[test]
    fn test_group_depth_limit() {
        let settings = ReaderSettings {
            max_group_depth: 2,
            ..ReaderSettings::default()
        };
        let input = "modelbegin\nclumpbegin\nclumpbegin\nclumpbegin\nclumpend\nclumpend\nclumpend\nmodelend\n";
        match Parser::parse(input.as_bytes(), &settings) {
            Err(ReadError::RecursionLimitExceeded { line, kind, .. }) => {
                assert_eq!(line, 3);
                assert_eq!(kind, LimitKind::Group);
            }
            other => panic!("expected group limit, got {other:?}"),
        }
    }

    #[test]
    fn test_unexpected_token_line_number() {
        let input = "modelbegin\n# comment\nclumpbegin\nvertex 0 0 0\nfrobnicate 1 2\nclumpend\nmodelend\n";
        match parse(input) {
            Err(ReadError::UnexpectedToken { line, word, text }) => {
                assert_eq!(line, 4);
                assert_eq!(word, "frobnicate");
                assert_eq!(text, "frobnicate 1 2");
            }
            other => panic!("expected UnexpectedToken, got {other:?}"),
        }
    }

    #[test]
    fn test_mismatched_end() {
        let input = "modelbegin\nclumpbegin\ntransformend\nmodelend\n";
        assert!(matches!(
            parse(input),
            Err(ReadError::UnexpectedToken { line: 2, .. })
        ));
    }

    #[test]
    fn test_missing_end() {
        let input = "modelbegin\nclumpbegin\nvertex 0 0 0\n";
        match parse(input) {
            Err(ReadError::UnexpectedEndOfInput { expected }) => assert_eq!(expected, "clumpend"),
            other => panic!("expected UnexpectedEndOfInput, got {other:?}"),
        }
    }

    #[test]
    fn test_must_start_with_modelbegin() {
        assert!(matches!(
            parse("clumpbegin\nclumpend\n"),
            Err(ReadError::UnexpectedToken { line: 0, .. })
        ));
    }

    #[test]
    fn test_scale_without_operands_is_an_error() {
        let input = "modelbegin\nscale\nvertex 0 0 0\nmodelend\n";
        match parse(input) {
            Err(ReadError::NumericFormat { line, word }) => {
                assert_eq!(line, 2);
                assert_eq!(word, "vertex");
            }
            other => panic!("expected NumericFormat, got {other:?}"),
        }
    }

    #[test]
    fn test_skipped_lines_are_invisible() {
        let clump = model("LightSampling Vertex\nAddHint Fast\nvertex 0 0 0\n");
        assert_eq!(clump.vertices.len(), 1);
    }

    #[test]
    fn test_invalid_settings() {
        let settings = ReaderSettings {
            max_group_depth: 0,
            ..ReaderSettings::default()
        };
        let result = Parser::parse("modelbegin\nmodelend\n".as_bytes(), &settings);
        assert!(matches!(result, Err(ReadError::InvalidSettings(_))));
    }
}
