//! Reader configuration.

use serde::{Deserialize, Serialize};

/// Keywords whose lines carry no geometry and are dropped by the scanner.
pub const DEFAULT_SKIP_KEYWORDS: &[&str] = &[
    "texturemodes",
    "addtexturemode",
    "removetexturemode",
    "texturemode",
    "addmaterialmode",
    "removematerialmode",
    "materialmode",
    "materialmodes",
    "lightsampling",
    "geometrysampling",
    "addhint",
    "hints",
];

/// Settings controlling a single parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderSettings {
    /// Lines whose first word (case-insensitive) is listed here are skipped.
    pub skip_keywords: Vec<String>,
    /// Maximum number of proto replays active at once.
    pub max_proto_depth: usize,
    /// Maximum nesting of clump and transform groups.
    pub max_group_depth: usize,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            skip_keywords: DEFAULT_SKIP_KEYWORDS
                .iter()
                .map(|k| k.to_string())
                .collect(),
            max_proto_depth: 64,
            max_group_depth: 256,
        }
    }
}

impl ReaderSettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_proto_depth == 0 {
            return Err("max_proto_depth must be positive".into());
        }
        if self.max_group_depth == 0 {
            return Err("max_group_depth must be positive".into());
        }
        Ok(())
    }

    /// Whether lines starting with `keyword` are dropped.
    pub fn is_skipped(&self, keyword: &str) -> bool {
        self.skip_keywords
            .iter()
            .any(|k| k.eq_ignore_ascii_case(keyword))
    }
}
