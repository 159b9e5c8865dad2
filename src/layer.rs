use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::glyph::Glyph;

/// The name the default (foreground) layer is created under.
pub const DEFAULT_LAYER_NAME: &str = "public.default";

/// A drawing surface holding one outline per glyph name.
///
/// The curve convention (quadratic or cubic) is fixed per layer when the
/// font-level `Layer` record is read and governs how `c` segments on that
/// layer are interpreted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    pub name: SmolStr,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub quadratic: bool,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub glyphs: IndexMap<SmolStr, Glyph>,
}

impl Layer {
    pub fn new(name: impl Into<SmolStr>, quadratic: bool) -> Self {
        Layer {
            name: name.into(),
            quadratic,
            glyphs: IndexMap::new(),
        }
    }

    pub fn is_default(&self) -> bool {
        self.name == DEFAULT_LAYER_NAME
    }

    pub fn glyph(&self, name: &str) -> Option<&Glyph> {
        self.glyphs.get(name)
    }

    pub fn glyph_mut(&mut self, name: &str) -> Option<&mut Glyph> {
        self.glyphs.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.glyphs.contains_key(name)
    }

    /// Fetch a glyph's outline surface, creating the glyph if this layer has
    /// not seen it yet
    pub fn ensure_glyph(&mut self, name: &SmolStr) -> &mut Glyph {
        self.glyphs
            .entry(name.clone())
            .or_insert_with(|| Glyph::new(name.clone()))
    }
}
