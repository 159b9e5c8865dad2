use std::io;
use std::path::PathBuf;
use thiserror::Error;

use smol_str::SmolStr;

#[derive(Debug, Error)]
pub enum SfdError {
    #[error("{path:?} is not an SFD file")]
    NotSfd { path: PathBuf },

    #[error("{path:?} is not an SFD directory (no font.props)")]
    NotSfdDirectory { path: PathBuf },

    #[error("Unsupported SplineFontDB version {version}")]
    UnsupportedVersion { version: String },

    #[error("Section opened at line {start} has no closing {end} marker")]
    UnterminatedSection { end: &'static str, start: usize },

    #[error("Malformed {key} record: {text}")]
    MalformedRecord { key: String, text: String },

    #[error("{section} section declares {declared} entries but holds {found}")]
    SectionCountMismatch {
        section: &'static str,
        declared: usize,
        found: usize,
    },

    #[error("More than one AnchorClass2 record in font")]
    DuplicateAnchorClasses,

    #[error("Glyph {0} has more than one Kerns2 record")]
    DuplicateKerns(SmolStr),

    #[error("Glyph {0} has no Encoding record")]
    MissingEncoding(SmolStr),

    #[error("Glyph {glyph} refers to glyph index {index} but only {count} glyphs were parsed")]
    BadGlyphIndex {
        glyph: SmolStr,
        index: usize,
        count: usize,
    },

    #[error("Glyph order mismatch: {parsed} glyphs parsed but {ranked} ranked")]
    GlyphOrderMismatch { parsed: usize, ranked: usize },

    #[error("Unknown lookup kind 0x{0:x}")]
    UnknownLookupKind(u32),

    #[error("Glyph {glyph} carries a variation selector ({selector:#x}); set ignore_variation_selectors to drop it")]
    VariationSelector { glyph: SmolStr, selector: u32 },

    #[error("Ill-constructed contour")]
    BadContour,

    #[error("IO Error: {0}")]
    IO(#[from] io::Error),
}
