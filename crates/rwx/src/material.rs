//! Composite material state built from incremental material ops.

use rwx_ir::MaterialOp;

/// The material accumulated by applying ops in order.
///
/// Fields stay `None` until an op sets them; encoders pick their own
/// defaults for unset fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompositeMaterial {
    /// Base colour.
    pub color: Option<[f64; 3]>,
    /// Ambient coefficient.
    pub ambient: Option<f64>,
    /// Diffuse coefficient.
    pub diffuse: Option<f64>,
    /// Specular coefficient.
    pub specular: Option<f64>,
    /// Opacity, 1.0 being opaque.
    pub opacity: Option<f64>,
    /// Texture name.
    pub texture: Option<String>,
}

impl CompositeMaterial {
    /// Overlay `op` onto this material.
    pub fn apply(&mut self, op: &MaterialOp) {
        match op {
            MaterialOp::Surface {
                ambient,
                diffuse,
                specular,
            } => {
                self.ambient = Some(*ambient);
                self.diffuse = Some(*diffuse);
                self.specular = Some(*specular);
            }
            MaterialOp::Color { r, g, b } => self.color = Some([*r, *g, *b]),
            MaterialOp::Ambient { value } => self.ambient = Some(*value),
            MaterialOp::Diffuse { value } => self.diffuse = Some(*value),
            MaterialOp::Specular { value } => self.specular = Some(*value),
            MaterialOp::Opacity { value } => self.opacity = Some(*value),
            MaterialOp::Texture { name } => self.texture = name.clone(),
        }
    }

    /// Every intermediate state of `base` while applying `ops`.
    ///
    /// Entry `k` is the material after the first `k` ops, so the result has
    /// `ops.len() + 1` entries and entry 0 equals `base`.
    pub fn states(base: &CompositeMaterial, ops: &[MaterialOp]) -> Vec<CompositeMaterial> {
        let mut states = Vec::with_capacity(ops.len() + 1);
        let mut current = base.clone();
        states.push(current.clone());
        for op in ops {
            current.apply(op);
            states.push(current.clone());
        }
        states
    }
}
