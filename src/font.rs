use indexmap::IndexMap;
use kurbo::Shape as KurboShape;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::{
    error::SfdError,
    glyph::Glyph,
    info::FontInfo,
    layer::{Layer, DEFAULT_LAYER_NAME},
};

/// The destination font model.
///
/// Glyph outlines live on layers; font-wide metadata lives in [`FontInfo`].
/// The glyph order starts out as insertion order and is reassigned once,
/// after parsing, from the declaration-order ranks in the source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Font {
    pub info: FontInfo,
    pub layers: Vec<Layer>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub glyph_order: Vec<SmolStr>,
    #[serde(
        default,
        skip_serializing_if = "IndexMap::is_empty",
        serialize_with = "crate::serde_helpers::kerning_to_list",
        deserialize_with = "crate::serde_helpers::kerning_from_list"
    )]
    pub kerning: IndexMap<(SmolStr, SmolStr), i32>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub groups: IndexMap<SmolStr, Vec<SmolStr>>,
    /// The feature program accumulated by the generator, in AFDKO syntax
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub features: String,
}

impl Default for Font {
    fn default() -> Self {
        Self::new()
    }
}

impl Font {
    pub fn new() -> Self {
        Font {
            info: FontInfo::default(),
            layers: vec![Layer::new(DEFAULT_LAYER_NAME, false)],
            glyph_order: vec![],
            kerning: IndexMap::new(),
            groups: IndexMap::new(),
            features: String::new(),
        }
    }

    pub fn default_layer(&self) -> Option<&Layer> {
        self.layers.iter().find(|l| l.is_default())
    }

    pub fn default_layer_mut(&mut self) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.is_default())
    }

    /// Add a named layer and return its position
    pub fn new_layer(&mut self, name: impl Into<SmolStr>, quadratic: bool) -> usize {
        self.layers.push(Layer::new(name, quadratic));
        self.layers.len() - 1
    }

    /// Create a glyph on the default layer, appending it to the glyph order
    /// on first sight
    pub fn new_glyph(&mut self, name: impl Into<SmolStr>) -> &mut Glyph {
        let name: SmolStr = name.into();
        let ix = self
            .layers
            .iter()
            .position(|l| l.is_default())
            .unwrap_or_else(|| {
                self.layers.insert(0, Layer::new(DEFAULT_LAYER_NAME, false));
                0
            });
        if !self.layers[ix].contains(&name) {
            self.glyph_order.push(name.clone());
        }
        self.layers[ix]
            .glyphs
            .insert(name.clone(), Glyph::new(name.clone()));
        #[allow(clippy::unwrap_used)] // just inserted
        self.layers[ix].glyphs.get_mut(&name).unwrap()
    }

    /// A glyph on the default layer
    pub fn glyph(&self, name: &str) -> Option<&Glyph> {
        self.default_layer().and_then(|l| l.glyph(name))
    }

    pub fn glyph_mut(&mut self, name: &str) -> Option<&mut Glyph> {
        self.default_layer_mut().and_then(|l| l.glyph_mut(name))
    }

    /// Replace the glyph order wholesale. The new order must account for
    /// exactly the glyphs already present.
    pub fn set_glyph_order(&mut self, order: Vec<SmolStr>) -> Result<(), SfdError> {
        if order.len() != self.glyph_order.len() {
            return Err(SfdError::GlyphOrderMismatch {
                parsed: self.glyph_order.len(),
                ranked: order.len(),
            });
        }
        self.glyph_order = order;
        Ok(())
    }

    pub fn set_kern(&mut self, first: SmolStr, second: SmolStr, value: i32) {
        self.kerning.insert((first, second), value);
    }

    /// Append text to the feature program, inserting the leading newline
    /// before the first content
    pub fn append_features(&mut self, text: &str) {
        if self.features.is_empty() {
            self.features.push('\n');
        }
        self.features.push_str(text);
    }

    /// The union of every default-layer outline's curve-aware bounding box,
    /// with component references decomposed through their transforms
    pub fn bounds(&self) -> Result<Option<kurbo::Rect>, SfdError> {
        fn union(acc: Option<kurbo::Rect>, rect: kurbo::Rect) -> Option<kurbo::Rect> {
            Some(match acc {
                Some(a) => a.union(rect),
                None => rect,
            })
        }

        let Some(layer) = self.default_layer() else {
            return Ok(None);
        };
        let mut bbox: Option<kurbo::Rect> = None;
        for glyph in layer.glyphs.values() {
            for contour in &glyph.contours {
                if contour.nodes.len() < 2 {
                    continue;
                }
                bbox = union(bbox, contour.to_kurbo()?.bounding_box());
            }
            let mut stack: Vec<(SmolStr, kurbo::Affine)> = glyph
                .components
                .iter()
                .map(|c| (c.reference.clone(), c.transform))
                .collect();
            while let Some((reference, transform)) = stack.pop() {
                let Some(referenced) = layer.glyph(&reference) else {
                    log::warn!("Glyph {} refers to missing glyph {}", glyph.name, reference);
                    continue;
                };
                for contour in &referenced.contours {
                    if contour.nodes.len() < 2 {
                        continue;
                    }
                    bbox = union(bbox, (transform * contour.to_kurbo()?).bounding_box());
                }
                for nested in &referenced.components {
                    stack.push((nested.reference.clone(), transform * nested.transform));
                }
            }
        }
        Ok(bbox)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::shape::{Node, NodeType};

    fn box_glyph(font: &mut Font, name: &str, size: f64) {
        let glyph = font.new_glyph(name);
        glyph.contours.push(crate::shape::Contour {
            nodes: vec![
                Node {
                    x: 0.0,
                    y: 0.0,
                    nodetype: NodeType::Line,
                    smooth: false,
                },
                Node {
                    x: size,
                    y: 0.0,
                    nodetype: NodeType::Line,
                    smooth: false,
                },
                Node {
                    x: size,
                    y: size,
                    nodetype: NodeType::Line,
                    smooth: false,
                },
                Node {
                    x: 0.0,
                    y: size,
                    nodetype: NodeType::Line,
                    smooth: false,
                },
            ],
            closed: true,
        });
    }

    #[test]
    fn test_bounds_with_components() {
        let mut font = Font::new();
        box_glyph(&mut font, "box", 100.0);
        let composite = font.new_glyph("composite");
        composite.add_component("box", kurbo::Affine::new([1.0, 0.0, 0.0, 1.0, 400.0, 650.0]));
        let bbox = font.bounds().unwrap().unwrap();
        assert_eq!(bbox.min_x(), 0.0);
        assert_eq!(bbox.max_x(), 500.0);
        assert_eq!(bbox.max_y(), 750.0);
    }

    #[test]
    fn test_glyph_order_replacement() {
        let mut font = Font::new();
        font.new_glyph("A");
        font.new_glyph("B");
        assert!(font
            .set_glyph_order(vec!["B".into(), "A".into(), "C".into()])
            .is_err());
        font.set_glyph_order(vec!["B".into(), "A".into()]).unwrap();
        assert_eq!(font.glyph_order, vec!["B", "A"]);
    }

    #[test]
    fn test_append_features_leading_newline() {
        let mut font = Font::new();
        font.append_features("# GSUB \n");
        font.append_features("# GPOS \n");
        assert!(font.features.starts_with("\n# GSUB"));
        assert!(font.features.contains("\n# GPOS"));
    }
}
