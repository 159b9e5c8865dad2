#![deny(clippy::unwrap_used, clippy::expect_used)]

mod anchor;
mod common;
mod error;
mod font;
mod glyph;
mod guide;
mod info;
mod layer;
mod parser;
mod serde_helpers;
mod shape;

pub use crate::{
    anchor::{Anchor, AnchorKind},
    common::Color,
    error::SfdError,
    font::Font,
    glyph::{Glyph, GlyphClass},
    guide::Guideline,
    info::{FontInfo, GaspRecord, NameRecord, OffsetMetric},
    layer::{Layer, DEFAULT_LAYER_NAME},
    parser::{load, load_with_options, SfdOptions},
    shape::{Component, Contour, Node, NodeType, PointPen},
};
