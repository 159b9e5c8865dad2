use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::{
    anchor::Anchor,
    common::Color,
    shape::{Component, Contour, PointPen},
};

/// The FontForge glyph classification, as carried by a `GlyphClass` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GlyphClass {
    Automatic,
    NoClass,
    Base,
    BaseLigature,
    Mark,
    Component,
}

impl GlyphClass {
    pub(crate) fn from_index(ix: usize) -> Option<Self> {
        [
            GlyphClass::Automatic,
            GlyphClass::NoClass,
            GlyphClass::Base,
            GlyphClass::BaseLigature,
            GlyphClass::Mark,
            GlyphClass::Component,
        ]
        .get(ix)
        .copied()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Glyph {
    pub name: SmolStr,
    #[serde(default)]
    pub width: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub codepoints: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mark_color: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glyph_class: Option<GlyphClass>,
    /// True when FontForge was asked to unlink references and remove
    /// overlaps when generating from this glyph
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlink_overlap_on_save: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub anchors: Vec<Anchor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contours: Vec<Contour>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Component>,
}

impl Glyph {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Glyph {
            name: name.into(),
            width: 0.0,
            height: None,
            codepoints: vec![],
            note: None,
            mark_color: None,
            glyph_class: None,
            unlink_overlap_on_save: None,
            anchors: vec![],
            contours: vec![],
            components: vec![],
        }
    }

    /// A point-pen drawing onto this glyph's outline
    pub fn point_pen(&mut self) -> PointPen<'_> {
        PointPen::new(&mut self.contours)
    }

    pub fn add_component(&mut self, reference: impl Into<SmolStr>, transform: kurbo::Affine) {
        self.components.push(Component {
            reference: reference.into(),
            transform,
        });
    }
}
