//! The SFD parsing driver.
//!
//! A single pass over the record stream fills the font model and a set of
//! deferred cross-reference tables (component references, kerning by glyph
//! index, kerning classes, anchor points, substitution and positioning rule
//! fragments). A fixed series of resolution passes then turns indices into
//! names, reconciles kerning classes with kerning groups, resolves offset
//! metrics against the font bounding box, and generates the feature program.

mod kerning;
mod layout;
mod splines;
mod utf7;
mod utils;

use std::fs;
use std::path::PathBuf;
use std::sync::LazyLock;

use indexmap::IndexMap;
use kurbo::Affine;
use regex::Regex;
use smol_str::SmolStr;

use crate::anchor::{Anchor, AnchorKind};
use crate::common::Color;
use crate::error::SfdError;
use crate::font::Font;
use crate::glyph::GlyphClass;
use crate::guide::Guideline;
use crate::info::{GaspRecord, NameRecord, OffsetMetric};

use self::kerning::KernClass;
use self::layout::{
    FeatureRecord, FeatureWriter, GTable, GlyphAnchors, LookupInfo, LookupKind, PosSubRule,
    PosSubRules,
};

static QUOTED_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)] // Safe because the regex is valid
    Regex::new(r#"(".*?")"#).unwrap()
});
static LAYER_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)] // Safe because the regex is valid
    Regex::new(r#"^(\d+)\s+(\d+)\s+(".*?")"#).unwrap()
});
static KERNS_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)] // Safe because the regex is valid
    Regex::new(r#"(-?\d*\.?\d+)\s+(-?\d*\.?\d+)\s+(".*?")"#).unwrap()
});
static ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)] // Safe because the regex is valid
    Regex::new(r#"^(".*?")\s+(-?\d*\.?\d+)\s+(-?\d*\.?\d+)\s+(\S+)\s+(\d)"#).unwrap()
});
static DEVICETABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)] // Safe because the regex is valid
    Regex::new(r"\s?\{.*?\}\s?").unwrap()
});
static LOOKUP_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)] // Safe because the regex is valid
    Regex::new(r#"^(\d+)\s+(\d+)\s+(\d+)\s+(".*?")\s+\{(.*?)\}\s+\[(.*?)\]"#).unwrap()
});
static FEATURE_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)] // Safe because the regex is valid
    Regex::new(r"'([^']{1,4})'\s+\(([^)]*)\)").unwrap()
});
static LANGSYS_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)] // Safe because the regex is valid
    Regex::new(r"'([^']{1,4})'\s*<([^>]*)>").unwrap()
});
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)] // Safe because the regex is valid
    Regex::new(r"'([^']{1,4})'").unwrap()
});
static SUBPOS_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)] // Safe because the regex is valid
    Regex::new(r#"^(".*?")\s+(.*)"#).unwrap()
});
static FEATURE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Expected format: '<feature tag>' <language code> "<feature name>"
    #[allow(clippy::unwrap_used)] // Safe because the regex is valid
    Regex::new(r#"'(?P<tag>.{4})'\s+(?P<lang>\d+)\s+"(?P<name>.+)""#).unwrap()
});

/// Parsing switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct SfdOptions {
    /// Drop `AltUni2` variation-selector mappings instead of failing on them
    pub ignore_variation_selectors: bool,
    /// Attach anchor points directly to glyphs under UFO-style names instead
    /// of collecting them for the feature program
    pub preserve_ufo_anchors: bool,
}

/// Parse an SFD file or SFDir directory into a [`Font`].
pub fn load(path: impl Into<PathBuf>) -> Result<Font, SfdError> {
    load_with_options(path, SfdOptions::default())
}

/// [`load`], with explicit [`SfdOptions`].
pub fn load_with_options(path: impl Into<PathBuf>, options: SfdOptions) -> Result<Font, SfdError> {
    let mut parser = SfdParser::new(path.into(), options);
    parser.parse()?;
    Ok(parser.font)
}

/// Collect lines from `start` up to (but not including) the first line that
/// begins with the `end` marker; the cursor returned points past the marker.
/// The optional `first` seeds the section with the value that appeared on the
/// same line as the start marker.
fn section(
    data: &[String],
    start: usize,
    end: &'static str,
    first: Option<&str>,
) -> Result<(Vec<String>, usize), SfdError> {
    let mut out: Vec<String> = Vec::new();
    if let Some(value) = first {
        out.push(value.to_string());
    }
    let mut i = start;
    while i < data.len() {
        if data[i].starts_with(end) {
            return Ok((out, i + 1));
        }
        out.push(data[i].clone());
        i += 1;
    }
    Err(SfdError::UnterminatedSection { end, start })
}

fn malformed(key: &str, text: &str) -> SfdError {
    SfdError::MalformedRecord {
        key: key.to_string(),
        text: text.to_string(),
    }
}

fn parse_int(key: &str, text: &str) -> Result<i32, SfdError> {
    text.trim().parse().map_err(|_| malformed(key, text))
}

fn parse_float(key: &str, text: &str) -> Result<f64, SfdError> {
    text.trim().parse().map_err(|_| malformed(key, text))
}

fn parse_usize(key: &str, text: &str) -> Result<usize, SfdError> {
    text.trim().parse().map_err(|_| malformed(key, text))
}

macro_rules! int_record {
    ($self:ident, $field:ident, $key:expr, $value:expr) => {
        $self.font.info.$field = Some(parse_int($key, $value)?)
    };
}

const LAYER_KEYWORDS: [&str; 3] = ["Back", "Fore", "Layer"];

#[derive(Debug, Clone)]
struct LayerDef {
    quadratic: bool,
    name: String,
}

/// A parser for the FontForge SFD/SFDir text format.
struct SfdParser {
    path: PathBuf,
    options: SfdOptions,
    font: Font,
    // SFD layer slot -> definition, filled by font-level `Layer` records
    layer_defs: Vec<Option<LayerDef>>,
    // SFD layer slot -> (position in font.layers, quadratic)
    layer_map: Vec<Option<(usize, bool)>>,
    // (font.layers position, glyph name, raw Refer value)
    glyph_refs: Vec<(usize, SmolStr, String)>,
    // glyph name -> [(second glyph index, value)]
    glyph_kerns: IndexMap<SmolStr, Vec<(usize, i32)>>,
    glyph_anchors: GlyphAnchors,
    glyph_pos_sub: PosSubRules,
    // subtable -> anchor class names
    anchor_classes: IndexMap<SmolStr, Vec<SmolStr>>,
    kern_classes: IndexMap<SmolStr, KernClass>,
    gsub_lookups: GTable,
    gpos_lookups: GTable,
    // feature tag -> [(language id, localized name)]
    feature_names: IndexMap<SmolStr, Vec<(u32, String)>>,
    ligature_carets: IndexMap<SmolStr, Vec<i32>>,
    // metrics whose stored value is an offset, resolved after parsing
    offset_metrics: Vec<OffsetMetric>,
}

impl SfdParser {
    fn new(path: PathBuf, options: SfdOptions) -> Self {
        SfdParser {
            path,
            options,
            font: Font::new(),
            layer_defs: Vec::new(),
            layer_map: Vec::new(),
            glyph_refs: Vec::new(),
            glyph_kerns: IndexMap::new(),
            glyph_anchors: GlyphAnchors::new(),
            glyph_pos_sub: PosSubRules::new(),
            anchor_classes: IndexMap::new(),
            kern_classes: IndexMap::new(),
            gsub_lookups: GTable::default(),
            gpos_lookups: GTable::default(),
            feature_names: IndexMap::new(),
            ligature_carets: IndexMap::new(),
            offset_metrics: Vec::new(),
        }
    }

    /// Read the SFD file, or the SFDir `font.props`, into trimmed lines.
    fn read_data(&self) -> Result<Vec<String>, SfdError> {
        let target = if self.path.is_dir() {
            let props = self.path.join("font.props");
            if !props.is_file() {
                return Err(SfdError::NotSfdDirectory {
                    path: self.path.clone(),
                });
            }
            props
        } else {
            self.path.clone()
        };
        let content = fs::read_to_string(target)?;
        Ok(content.lines().map(|l| l.trim().to_string()).collect())
    }

    /// Concatenate every `*.glyph` file of an SFDir, in filename order.
    fn read_glyph_files(&self) -> Result<Vec<String>, SfdError> {
        let mut paths: Vec<PathBuf> = fs::read_dir(&self.path)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "glyph"))
            .collect();
        paths.sort();
        let mut data = Vec::new();
        for path in paths {
            let content = fs::read_to_string(path)?;
            data.extend(content.lines().map(|l| l.trim().to_string()));
        }
        Ok(data)
    }

    fn parse(&mut self) -> Result<(), SfdError> {
        let data = self.read_data()?;
        let is_dir = self.path.is_dir();

        let mut header_checked = false;
        let mut char_data: Option<Vec<String>> = None;

        let mut i = 0usize;
        while i < data.len() {
            let line = &data[i];
            i += 1;
            if line.is_empty() {
                continue;
            }

            let (key, value) = match line.split_once(':') {
                Some((k, v)) => (k.trim(), Some(v.trim())),
                None => (line.as_str(), None),
            };
            let v = value.unwrap_or("");

            // The first populated line has to carry the format signature.
            if !header_checked {
                header_checked = true;
                if key != "SplineFontDB" {
                    return Err(SfdError::NotSfd {
                        path: self.path.clone(),
                    });
                }
                if v.parse::<f64>().ok() != Some(3.0) {
                    return Err(SfdError::UnsupportedVersion {
                        version: v.to_string(),
                    });
                }
                continue;
            }

            match key {
                "FontName" => self.font.info.postscript_font_name = value.map(str::to_string),
                "FullName" => self.font.info.postscript_full_name = value.map(str::to_string),
                "FamilyName" => self.font.info.family_name = value.map(str::to_string),
                "Weight" => self.font.info.postscript_weight_name = value.map(str::to_string),
                "Copyright" => self.font.info.copyright = Some(utils::unescape(v)),
                "Comments" => self.font.info.note = value.map(str::to_string),
                "UComments" => {
                    let mut note = utf7::decode_utf7(v);
                    if let Some(old) = self.font.info.note.take() {
                        note.push('\n');
                        note.push_str(&old);
                    }
                    self.font.info.note = Some(note);
                }
                "FontLog" => {
                    let mut note = self.font.info.note.take().unwrap_or_default();
                    if !note.is_empty() {
                        note.push('\n');
                    }
                    note.push_str("Font log:\n");
                    note.push_str(&utf7::decode_utf7(v));
                    self.font.info.note = Some(note);
                }
                "Version" => {
                    let (major, minor) = utils::parse_version(v);
                    self.font.info.version_major = major;
                    self.font.info.version_minor = minor;
                }
                "ItalicAngle" => {
                    let angle = parse_float(key, v)?;
                    self.font.info.italic_angle = Some(angle);
                    self.font.info.postscript_slant_angle = Some(angle);
                }
                "UnderlinePosition" => {
                    self.font.info.postscript_underline_position = Some(parse_float(key, v)?)
                }
                "UnderlineWidth" => {
                    self.font.info.postscript_underline_thickness = Some(parse_float(key, v)?)
                }
                "Ascent" => int_record!(self, ascender, key, v),
                "Descent" => self.font.info.descender = Some(-parse_int(key, v)?),
                "LayerCount" => self.layer_defs = vec![None; parse_usize(key, v)?],
                "Layer" => self.parse_layer_def(v)?,
                "CreationTime" => {
                    let seconds: i64 = v.trim().parse().map_err(|_| malformed(key, v))?;
                    let stamp = chrono::DateTime::from_timestamp(seconds, 0)
                        .ok_or_else(|| malformed(key, v))?;
                    self.font.info.open_type_head_created =
                        Some(stamp.format("%Y/%m/%d %H:%M:%S").to_string());
                }
                "FSType" => {
                    let bits = parse_int(key, v)?;
                    let set = (0u8..16).filter(|bit| bits & (1 << bit) != 0).collect();
                    self.font.info.open_type_os2_type = Some(set);
                }
                "TTFWeight" | "PfmWeight" => int_record!(self, open_type_os2_weight_class, key, v),
                "TTFWidth" => int_record!(self, open_type_os2_width_class, key, v),
                "Panose" => {
                    let panose = v
                        .split_whitespace()
                        .map(|n| parse_int(key, n))
                        .collect::<Result<Vec<i32>, SfdError>>()?;
                    self.font.info.open_type_os2_panose = Some(panose);
                }
                "LineGap" => int_record!(self, open_type_hhea_line_gap, key, v),
                "VLineGap" => int_record!(self, open_type_vhea_vert_typo_line_gap, key, v),
                "HheadAscent" => int_record!(self, open_type_hhea_ascender, key, v),
                "HheadDescent" => int_record!(self, open_type_hhea_descender, key, v),
                "OS2TypoLinegap" => int_record!(self, open_type_os2_typo_line_gap, key, v),
                "OS2Vendor" => {
                    self.font.info.open_type_os2_vendor_id =
                        Some(v.trim_matches('\'').to_string())
                }
                "OS2FamilyClass" => {
                    let packed = parse_int(key, v)?;
                    self.font.info.open_type_os2_family_class =
                        Some((packed >> 8, packed & 0xff));
                }
                "OS2_WeightWidthSlopeOnly" => {
                    if parse_int(key, v)? != 0 {
                        self.font
                            .info
                            .open_type_os2_selection
                            .get_or_insert_with(Vec::new)
                            .push(8);
                    }
                }
                "OS2_UseTypoMetrics" => {
                    if parse_int(key, v)? != 0 {
                        self.font
                            .info
                            .open_type_os2_selection
                            .get_or_insert_with(Vec::new)
                            .push(7);
                    }
                }
                "OS2TypoAscent" => int_record!(self, open_type_os2_typo_ascender, key, v),
                "OS2TypoDescent" => int_record!(self, open_type_os2_typo_descender, key, v),
                "OS2WinAscent" => int_record!(self, open_type_os2_win_ascent, key, v),
                "OS2WinDescent" => int_record!(self, open_type_os2_win_descent, key, v),
                "HheadAOffset" | "HheadDOffset" | "OS2TypoAOffset" | "OS2TypoDOffset"
                | "OS2WinAOffset" | "OS2WinDOffset" => {
                    if parse_int(key, v)? != 0 {
                        self.offset_metrics.push(match key {
                            "HheadAOffset" => OffsetMetric::HheaAscender,
                            "HheadDOffset" => OffsetMetric::HheaDescender,
                            "OS2TypoAOffset" => OffsetMetric::TypoAscender,
                            "OS2TypoDOffset" => OffsetMetric::TypoDescender,
                            "OS2WinAOffset" => OffsetMetric::WinAscent,
                            _ => OffsetMetric::WinDescent,
                        });
                    }
                }
                "OS2SubXSize" => int_record!(self, open_type_os2_subscript_x_size, key, v),
                "OS2SubYSize" => int_record!(self, open_type_os2_subscript_y_size, key, v),
                "OS2SubXOff" => int_record!(self, open_type_os2_subscript_x_offset, key, v),
                "OS2SubYOff" => int_record!(self, open_type_os2_subscript_y_offset, key, v),
                "OS2SupXSize" => int_record!(self, open_type_os2_superscript_x_size, key, v),
                "OS2SupYSize" => int_record!(self, open_type_os2_superscript_y_size, key, v),
                "OS2SupXOff" => int_record!(self, open_type_os2_superscript_x_offset, key, v),
                "OS2SupYOff" => int_record!(self, open_type_os2_superscript_y_offset, key, v),
                "OS2StrikeYSize" => int_record!(self, open_type_os2_strikeout_size, key, v),
                "OS2StrikeYPos" => int_record!(self, open_type_os2_strikeout_position, key, v),
                "OS2CapHeight" => int_record!(self, cap_height, key, v),
                "OS2XHeight" => int_record!(self, x_height, key, v),
                "UniqueID" => int_record!(self, postscript_unique_id, key, v),
                "LangName" => self.parse_names(v)?,
                "GaspTable" => self.parse_gasp(v)?,
                "OtfFeatName" => self.parse_feature_name(v),
                "BeginPrivate" => {
                    let (private, next) = section(&data, i, "EndPrivate", value)?;
                    i = next;
                    self.parse_private(&private)?;
                }
                "BeginChars" => {
                    let (chars, next) = section(&data, i, "EndChars", None)?;
                    i = next;
                    if is_dir {
                        return Err(malformed(key, line));
                    }
                    char_data = Some(chars);
                }
                "Grid" => {
                    let (grid, next) = section(&data, i, "EndSplineSet", None)?;
                    i = next;
                    self.parse_grid(grid)?;
                }
                "KernClass2" => i = self.parse_kern_class(&data, i, v)?,
                "Lookup" => self.parse_lookup(v)?,
                "AnchorClass2" => self.parse_anchor_class(v)?,
                "ShortTable" => {
                    let (_, next) = section(&data, i, "EndShort", None)?;
                    i = next;
                }
                "TtTable" => {
                    let (_, next) = section(&data, i, "EndTTInstrs", None)?;
                    i = next;
                }
                "ContextPos2" | "ContextSub2" | "ChainPos2" | "ChainSub2" | "ReverseChain2" => {
                    let (_, next) = section(&data, i, "EndFPST", None)?;
                    i = next;
                }
                "EndSplineFont" => break,
                "DefaultBaseFilename" | "sfntRevision" | "WidthSeparation" | "DisplayLayer"
                | "DisplaySize" | "AntiAlias" | "FitToEm" | "WinInfo" | "Encoding"
                | "ModificationTime" | "PfmFamily" | "OS2Version" | "OS2CodePages"
                | "OS2UnicodeRanges" | "XUID" | "UnicodeInterp" | "NameList" | "DEI"
                | "GlyphOrder" | "Compacted" => {}
                _ => log::debug!("Skipping unhandled record {key}"),
            }
        }

        if !header_checked {
            return Err(SfdError::NotSfd {
                path: self.path.clone(),
            });
        }

        self.finalize_layers();

        let char_data = if is_dir {
            Some(self.read_glyph_files()?)
        } else {
            char_data
        };
        if let Some(char_data) = char_data {
            self.parse_chars(&char_data)?;
        }

        // References and explicit kerning use glyph indices, which are only
        // meaningful once the final glyph order is known.
        self.process_references()?;
        self.process_kerns()?;

        // Kerning classes are reconciled together so overlapping group
        // membership across subtables can be detected.
        let mut tables: Vec<&KernClass> = Vec::new();
        for info in self.gpos_lookups.0.values() {
            for subtable in &info.subtables {
                if let Some(class) = self.kern_classes.get(subtable) {
                    tables.push(class);
                }
            }
        }
        kerning::process_kern_classes(&mut self.font, &tables);

        self.fix_offset_metrics()?;

        let mut writer = FeatureWriter::new(
            self.font.glyph_order.clone(),
            &self.glyph_pos_sub,
            &self.anchor_classes,
            &self.glyph_anchors,
            &self.feature_names,
            &self.ligature_carets,
        );
        let gsub = writer.write_table(&self.gsub_lookups, false);
        let gpos = writer.write_table(&self.gpos_lookups, true);
        let gdef = writer.write_gdef(&self.font);
        if let Some(gsub) = gsub {
            self.font.append_features(&gsub);
        }
        if let Some(gpos) = gpos {
            self.font.append_features(&gpos);
        }
        self.font.append_features(&gdef);

        // There is no explicit UPEM record; it is the sum of the ascender
        // and (negated) descender.
        let ascender = self.font.info.ascender.unwrap_or(0);
        let descender = self.font.info.descender.unwrap_or(0);
        self.font.info.units_per_em = Some(ascender - descender);

        if self.font.info.style_name.is_none() {
            let info = &self.font.info;
            let mut style = "Regular".to_string();
            if let Some(tail) = info
                .postscript_font_name
                .as_deref()
                .and_then(|n| n.split_once('-').map(|(_, tail)| tail))
            {
                style = tail.to_string();
            } else if let Some(weight) = info.postscript_weight_name.as_deref() {
                if !weight.is_empty() {
                    style = weight.to_string();
                }
            }
            self.font.info.style_name = Some(style);
        }

        Ok(())
    }

    fn parse_layer_def(&mut self, value: &str) -> Result<(), SfdError> {
        let caps = LAYER_RE
            .captures(value)
            .ok_or_else(|| malformed("Layer", value))?;
        let idx: usize = caps[1].parse().map_err(|_| malformed("Layer", value))?;
        let quadratic = caps[2].parse::<i32>().map_err(|_| malformed("Layer", value))? != 0;
        let name = utf7::decode_utf7(&caps[3]);
        if idx >= self.layer_defs.len() {
            return Err(malformed("Layer", value));
        }
        self.layer_defs[idx] = Some(LayerDef { quadratic, name });
        Ok(())
    }

    /// Turn the collected layer records into model layers. Slot 1 is the
    /// default (foreground) layer; FontForge layer names are not unique, so
    /// clashing names from slot 2 up get an `_<index>` suffix.
    fn finalize_layers(&mut self) {
        self.layer_map = vec![None; self.layer_defs.len()];
        for idx in 0..self.layer_defs.len() {
            let Some(def) = self.layer_defs[idx].clone() else {
                continue;
            };
            if idx == 1 {
                if let Some(pos) = self.font.layers.iter().position(|l| l.is_default()) {
                    self.font.layers[pos].quadratic = def.quadratic;
                    self.layer_map[idx] = Some((pos, def.quadratic));
                }
                continue;
            }
            let mut name = def.name.clone();
            if idx >= 2 {
                let repeats = self.layer_defs[idx..]
                    .iter()
                    .flatten()
                    .filter(|d| d.name == def.name)
                    .count();
                if repeats != 1 {
                    name = format!("{}_{}", name, idx);
                }
            }
            let pos = self.font.new_layer(name, def.quadratic);
            self.layer_map[idx] = Some((pos, def.quadratic));
        }
    }

    /// Positional name-table record: language id, then one quoted string per
    /// name id. US English strings land on typed info fields where one
    /// exists; everything else becomes a Windows-platform name record.
    fn parse_names(&mut self, value: &str) -> Result<(), SfdError> {
        let Some((lang, rest)) = value.split_once(' ') else {
            return Ok(());
        };
        let lang: u16 = lang.parse().map_err(|_| malformed("LangName", value))?;
        for (name_id, caps) in QUOTED_RE.captures_iter(rest).enumerate() {
            let name = utf7::decode_utf7(&caps[1]);
            if name.is_empty() {
                continue;
            }
            if lang == 1033 && self.set_english_name(name_id, &name) {
                continue;
            }
            self.font.info.open_type_name_records.push(NameRecord {
                name_id: name_id as u16,
                platform_id: 3,
                encoding_id: 1,
                language_id: lang,
                string: name,
            });
        }
        Ok(())
    }

    fn set_english_name(&mut self, name_id: usize, name: &str) -> bool {
        let info = &mut self.font.info;
        let slot = match name_id {
            0 => &mut info.copyright,
            1 => &mut info.family_name,
            2 => &mut info.style_name,
            3 => &mut info.open_type_name_unique_id,
            5 => &mut info.open_type_name_version,
            6 => &mut info.postscript_font_name,
            7 => &mut info.trademark,
            8 => &mut info.open_type_name_manufacturer,
            9 => &mut info.open_type_name_designer,
            10 => &mut info.open_type_name_description,
            11 => &mut info.open_type_name_manufacturer_url,
            12 => &mut info.open_type_name_designer_url,
            13 => &mut info.open_type_name_license,
            14 => &mut info.open_type_name_license_url,
            16 => &mut info.open_type_name_preferred_family_name,
            17 => &mut info.open_type_name_preferred_subfamily_name,
            18 => &mut info.open_type_name_compatible_full_name,
            19 => &mut info.open_type_name_sample_text,
            21 => &mut info.open_type_name_wws_family_name,
            22 => &mut info.open_type_name_wws_subfamily_name,
            _ => return false,
        };
        *slot = Some(name.to_string());
        true
    }

    fn parse_gasp(&mut self, value: &str) -> Result<(), SfdError> {
        let mut parts: Vec<&str> = value.split_whitespace().collect();
        if parts.len() < 2 {
            return Err(malformed("GaspTable", value));
        }
        let num: usize = parts
            .remove(0)
            .parse()
            .map_err(|_| malformed("GaspTable", value))?;
        // The table version trails the ranges; nothing reads it.
        let _version: i32 = match parts.pop() {
            Some(tail) => tail.parse().map_err(|_| malformed("GaspTable", value))?,
            None => return Err(malformed("GaspTable", value)),
        };
        if parts.len() != num * 2 {
            return Err(SfdError::SectionCountMismatch {
                section: "GaspTable",
                declared: num * 2,
                found: parts.len(),
            });
        }
        let mut records = Vec::new();
        for pair in parts.chunks_exact(2) {
            let ppem: u32 = pair[0].parse().map_err(|_| malformed("GaspTable", value))?;
            let flags: u32 = pair[1].parse().map_err(|_| malformed("GaspTable", value))?;
            let behavior: Vec<u8> = (0u8..4).filter(|bit| flags & (1u32 << bit) != 0).collect();
            records.push(GaspRecord {
                range_max_ppem: ppem,
                range_gasp_behavior: behavior,
            });
        }
        if !records.is_empty() {
            self.font.info.open_type_gasp_range_records = records;
        }
        Ok(())
    }

    fn parse_feature_name(&mut self, value: &str) {
        let Some(caps) = FEATURE_NAME_RE.captures(value) else {
            log::warn!("Skipping ill-formed OtfFeatName record: {value}");
            return;
        };
        let lang = caps["lang"].parse().unwrap_or(0);
        self.feature_names
            .entry(SmolStr::new(&caps["tag"]))
            .or_default()
            .push((lang, caps["name"].to_string()));
    }

    /// The length-prefixed PostScript private dictionary. Each entry is
    /// `<key> <value length> <value>`; bracketed values are number lists.
    /// StdHW/StdVW do not map to fields of their own and are instead
    /// promoted to the front of the matching stem-snap list.
    fn parse_private(&mut self, data: &[String]) -> Result<(), SfdError> {
        let Some((count_line, entries)) = data.split_first() else {
            return Err(malformed("BeginPrivate", ""));
        };
        let declared: usize = count_line
            .trim()
            .parse()
            .map_err(|_| malformed("BeginPrivate", count_line))?;
        if entries.len() != declared {
            return Err(SfdError::SectionCountMismatch {
                section: "BeginPrivate",
                declared,
                found: entries.len(),
            });
        }

        let mut std_hw: Option<f64> = None;
        let mut std_vw: Option<f64> = None;
        for line in entries {
            let mut parts = line.splitn(3, ' ');
            let (Some(key), Some(len), Some(value)) = (parts.next(), parts.next(), parts.next())
            else {
                return Err(malformed("BeginPrivate", line));
            };
            let declared_len: usize = len.parse().map_err(|_| malformed(key, line))?;
            if value.len() != declared_len {
                return Err(malformed(key, line));
            }

            let list = |key: &str| -> Result<Vec<f64>, SfdError> {
                let inner = value
                    .strip_prefix('[')
                    .and_then(|rest| rest.strip_suffix(']'))
                    .ok_or_else(|| malformed(key, line))?;
                inner
                    .split_whitespace()
                    .map(|n| n.parse::<f64>().map_err(|_| malformed(key, line)))
                    .collect()
            };
            let scalar = |key: &str| -> Result<f64, SfdError> {
                value.parse().map_err(|_| malformed(key, line))
            };
            // StdHW/StdVW are written as one-element lists but a bare number
            // is accepted too.
            let first = |key: &str| -> Result<f64, SfdError> {
                if value.starts_with('[') {
                    list(key)?
                        .first()
                        .copied()
                        .ok_or_else(|| malformed(key, line))
                } else {
                    scalar(key)
                }
            };

            match key {
                "BlueValues" => self.font.info.postscript_blue_values = list(key)?,
                "OtherBlues" => self.font.info.postscript_other_blues = list(key)?,
                "FamilyBlues" => self.font.info.postscript_family_blues = list(key)?,
                "FamilyOtherBlues" => self.font.info.postscript_family_other_blues = list(key)?,
                "StemSnapH" => self.font.info.postscript_stem_snap_h = list(key)?,
                "StemSnapV" => self.font.info.postscript_stem_snap_v = list(key)?,
                "BlueFuzz" => self.font.info.postscript_blue_fuzz = Some(scalar(key)?),
                "BlueShift" => self.font.info.postscript_blue_shift = Some(scalar(key)?),
                "BlueScale" => self.font.info.postscript_blue_scale = Some(scalar(key)?),
                "ForceBold" => {
                    self.font.info.postscript_force_bold = Some(match value {
                        "true" => true,
                        "false" => false,
                        _ => return Err(malformed(key, line)),
                    })
                }
                "StdHW" => std_hw = Some(first(key)?),
                "StdVW" => std_vw = Some(first(key)?),
                _ => log::debug!("Skipping private dictionary key {key}"),
            }
        }

        if let Some(value) = std_hw {
            if value != 0.0 {
                self.font.info.promote_stem_snap(false, value);
            }
        }
        if let Some(value) = std_vw {
            if value != 0.0 {
                self.font.info.promote_stem_snap(true, value);
            }
        }
        Ok(())
    }

    /// The `Grid` section holds guidelines drawn as spline contours. Only
    /// two-segment move+line contours are straight lines; everything else is
    /// skipped.
    fn parse_grid(&mut self, data: Vec<String>) -> Result<(), SfdError> {
        let contours = splines::parse_spline_set(&data)?;
        for contour in contours {
            let splines::RawContour { segments, name } = contour;
            if segments.len() != 2 {
                continue;
            }
            let mut p0: Option<(f64, f64)> = None;
            for segment in &segments {
                match segment.kind {
                    'm' => p0 = segment.points.first().copied(),
                    'l' => {
                        let (Some(p0), Some(p1)) = (p0, segment.points.first().copied()) else {
                            continue;
                        };
                        let guide = if p0.0 == p1.0 {
                            Guideline::vertical(p0.0, name.clone())
                        } else if p0.1 == p1.1 {
                            Guideline::horizontal(p0.1, name.clone())
                        } else {
                            let mut angle = (p1.0 - p0.0).atan2(p1.1 - p0.1).to_degrees();
                            if angle < 0.0 {
                                angle += 360.0;
                            }
                            Guideline::angled(p0.0, p0.1, angle, name.clone())
                        };
                        self.font.info.guidelines.push(guide);
                    }
                    _ => p0 = segment.points.first().copied(),
                }
            }
        }
        Ok(())
    }

    /// `KernClass2: <n1> <n2> "<subtable>"` followed by n1-1 and n2-1 member
    /// lines and a flat matrix line. Index 0 on each side is the implicit
    /// empty class. Returns the cursor past the matrix line.
    fn parse_kern_class(
        &mut self,
        data: &[String],
        start: usize,
        value: &str,
    ) -> Result<usize, SfdError> {
        let caps = KERNS_RE
            .captures(value)
            .ok_or_else(|| malformed("KernClass2", value))?;
        let n1: usize = caps[1].parse().map_err(|_| malformed("KernClass2", value))?;
        let n2: usize = caps[2].parse().map_err(|_| malformed("KernClass2", value))?;
        let name = SmolStr::from(utf7::decode_utf7(&caps[3]));

        let first_count = n1.saturating_sub(1);
        let second_count = n2.saturating_sub(1);
        if start + first_count + second_count >= data.len() {
            return Err(SfdError::SectionCountMismatch {
                section: "KernClass2",
                declared: first_count + second_count + 1,
                found: data.len().saturating_sub(start),
            });
        }

        // Drop each member line's leading count token.
        let read_side = |lines: &[String]| -> Vec<Option<Vec<SmolStr>>> {
            let mut side: Vec<Option<Vec<SmolStr>>> = vec![None];
            for line in lines {
                side.push(Some(
                    line.split_whitespace().skip(1).map(SmolStr::new).collect(),
                ));
            }
            side
        };

        let mut i = start;
        let first = read_side(&data[i..i + first_count]);
        i += first_count;
        let second = read_side(&data[i..i + second_count]);
        i += second_count;

        let stripped = DEVICETABLE_RE.replace_all(&data[i], " ");
        let kerns = stripped
            .split_whitespace()
            .map(|k| k.parse::<i32>().map_err(|_| malformed("KernClass2", &data[i])))
            .collect::<Result<Vec<i32>, SfdError>>()?;

        self.kern_classes.insert(
            name,
            KernClass {
                first,
                second,
                kerns,
            },
        );
        Ok(i + 1)
    }

    fn parse_lookup(&mut self, value: &str) -> Result<(), SfdError> {
        let caps = LOOKUP_RE
            .captures(value)
            .ok_or_else(|| malformed("Lookup", value))?;
        let kind_number: u32 = caps[1].parse().map_err(|_| malformed("Lookup", value))?;
        let flags: u16 = caps[2].parse().map_err(|_| malformed("Lookup", value))?;
        let kind = LookupKind::from_number(kind_number)?;
        let name = SmolStr::from(utf7::decode_utf7(&caps[4]));
        let subtables: Vec<SmolStr> = QUOTED_RE
            .captures_iter(&caps[5])
            .map(|m| SmolStr::from(utf7::decode_utf7(&m[1])))
            .collect();

        let mut features = Vec::new();
        for feature in FEATURE_RE.captures_iter(&caps[6]) {
            let tag = SmolStr::new(&feature[1]);
            let mut scripts = Vec::new();
            for langsys in LANGSYS_RE.captures_iter(&feature[2]) {
                let script = SmolStr::new(&langsys[1]);
                let langs = TAG_RE
                    .captures_iter(&langsys[2])
                    .map(|m| SmolStr::new(&m[1]))
                    .collect();
                scripts.push((script, langs));
            }
            features.push(FeatureRecord { tag, scripts });
        }

        let info = LookupInfo {
            kind,
            flags,
            features,
            subtables,
        };
        if kind.is_gpos() {
            self.gpos_lookups.0.insert(name, info);
        } else {
            self.gsub_lookups.0.insert(name, info);
        }
        Ok(())
    }

    fn parse_anchor_class(&mut self, value: &str) -> Result<(), SfdError> {
        if !self.anchor_classes.is_empty() {
            return Err(SfdError::DuplicateAnchorClasses);
        }
        let decoded: Vec<String> = QUOTED_RE
            .captures_iter(value)
            .map(|m| utf7::decode_utf7(&m[1]))
            .collect();
        if decoded.len() % 2 != 0 {
            return Err(malformed("AnchorClass2", value));
        }
        for pair in decoded.chunks_exact(2) {
            self.anchor_classes
                .entry(SmolStr::new(&pair[1]))
                .or_default()
                .push(SmolStr::new(&pair[0]));
        }
        Ok(())
    }

    fn parse_chars(&mut self, data: &[String]) -> Result<(), SfdError> {
        let data: Vec<String> = data.iter().filter(|l| !l.is_empty()).cloned().collect();
        let mut ranks: Vec<(SmolStr, i32)> = Vec::new();

        let mut i = 0;
        while i < data.len() {
            let line = &data[i];
            i += 1;
            if line.starts_with("StartChar") {
                let (char_data, next) = section(&data, i, "EndChar", Some(line))?;
                i = next;
                ranks.push(self.parse_char(&char_data)?);
            }
        }

        // Reassign the glyph order to FontForge's declared ranks; reference
        // and kerning resolution depend on it.
        ranks.sort_by_key(|(_, rank)| *rank);
        self.font
            .set_glyph_order(ranks.into_iter().map(|(name, _)| name).collect())
    }

    /// One `StartChar` to `EndChar` block. Returns the glyph name and its
    /// declared encoding rank.
    fn parse_char(&mut self, data: &[String]) -> Result<(SmolStr, i32), SfdError> {
        let Some((start_line, data)) = data.split_first() else {
            return Err(malformed("StartChar", ""));
        };
        let name = start_line
            .split_once(": ")
            .map(|(_, n)| n)
            .ok_or_else(|| malformed("StartChar", start_line))?;
        let name = if name.starts_with('"') {
            SmolStr::from(utf7::decode_utf7(name))
        } else {
            SmolStr::new(name)
        };

        self.font.new_glyph(name.clone());
        let default_pos = self
            .font
            .layers
            .iter()
            .position(|l| l.is_default())
            .unwrap_or(0);
        let default_quadratic = self
            .layer_map
            .get(1)
            .copied()
            .flatten()
            .map(|(_, quadratic)| quadratic)
            .unwrap_or(false);
        // The drawing target; layer keywords move it, everything metadata
        // stays on the default-layer glyph.
        let mut active = (default_pos, default_quadratic);

        let mut codepoints: Vec<u32> = Vec::new();
        let mut rank: Option<i32> = None;

        let mut i = 0;
        while i < data.len() {
            let line = &data[i];
            i += 1;
            let (key, value) = match line.split_once(": ") {
                Some((k, v)) => (k, Some(v)),
                None => (line.as_str(), None),
            };
            let v = value.unwrap_or("");

            match key {
                "Width" => {
                    self.font.layers[default_pos].ensure_glyph(&name).width =
                        parse_int(key, v)? as f64;
                }
                "VWidth" => {
                    self.font.layers[default_pos].ensure_glyph(&name).height =
                        Some(parse_int(key, v)? as f64);
                }
                "Encoding" => {
                    let parts = v
                        .split_whitespace()
                        .map(|n| parse_int(key, n))
                        .collect::<Result<Vec<i32>, SfdError>>()?;
                    let [_, uni, declared_rank] = parts.as_slice() else {
                        return Err(malformed(key, line));
                    };
                    if *uni >= 0 {
                        codepoints.push(*uni as u32);
                    }
                    rank = Some(*declared_rank);
                }
                "AltUni2" => codepoints.extend(utils::parse_altuni(
                    &name,
                    v,
                    self.options.ignore_variation_selectors,
                )?),
                "GlyphClass" => {
                    let class = GlyphClass::from_index(parse_usize(key, v)?)
                        .ok_or_else(|| malformed(key, line))?;
                    self.font.layers[default_pos].ensure_glyph(&name).glyph_class = Some(class);
                }
                "AnchorPoint" => self.parse_anchor_point(&name, default_pos, v, line)?,
                _ if LAYER_KEYWORDS.contains(&key) => {
                    let idx = match value {
                        Some(v) if !v.is_empty() => parse_usize(key, v)?,
                        _ => LAYER_KEYWORDS.iter().position(|k| *k == key).unwrap_or(0),
                    };
                    let (pos, quadratic) = self
                        .layer_map
                        .get(idx)
                        .copied()
                        .flatten()
                        .ok_or_else(|| malformed(key, line))?;
                    let width = self.font.layers[default_pos]
                        .glyph(&name)
                        .map(|g| g.width)
                        .unwrap_or(0.0);
                    let layer = &mut self.font.layers[pos];
                    if !layer.contains(&name) {
                        layer.ensure_glyph(&name).width = width;
                    }
                    active = (pos, quadratic);
                }
                "SplineSet" => {
                    let (splines_data, next) = section(data, i, "EndSplineSet", None)?;
                    i = next;
                    let contours = splines::parse_spline_set(&splines_data)?;
                    let (pos, quadratic) = active;
                    splines::draw_contours(
                        self.font.layers[pos].ensure_glyph(&name),
                        contours,
                        quadratic,
                    )?;
                }
                "Image" => {
                    let (_, next) = section(data, i, "EndImage", None)?;
                    i = next;
                    log::debug!("Dropping image on glyph {name}");
                }
                "Colour" => {
                    let packed =
                        u32::from_str_radix(v.trim(), 16).map_err(|_| malformed(key, line))?;
                    let (pos, _) = active;
                    self.font.layers[pos].ensure_glyph(&name).mark_color =
                        Some(Color::from(packed));
                }
                "Refer" => {
                    // References use glyph indices and are resolved after
                    // every glyph has been parsed.
                    let (pos, _) = active;
                    self.glyph_refs.push((pos, name.clone(), v.to_string()));
                }
                "Kerns2" => self.parse_kerns(&name, v, line)?,
                "Comment" => {
                    self.font.layers[default_pos].ensure_glyph(&name).note =
                        Some(utf7::decode_utf7(v));
                }
                "UnlinkRmOvrlpSave" => {
                    self.font.layers[default_pos]
                        .ensure_glyph(&name)
                        .unlink_overlap_on_save = Some(parse_int(key, v)? != 0);
                }
                "LCarets2" => {
                    let values = v
                        .split_whitespace()
                        .map(|n| parse_int(key, n))
                        .collect::<Result<Vec<i32>, SfdError>>()?;
                    let Some((&num, carets)) = values.split_first() else {
                        return Err(malformed(key, line));
                    };
                    if carets.iter().any(|&c| c != 0) {
                        if carets.len() != num as usize {
                            return Err(SfdError::SectionCountMismatch {
                                section: "LCarets2",
                                declared: num as usize,
                                found: carets.len(),
                            });
                        }
                        self.ligature_carets.insert(name.clone(), carets.to_vec());
                    }
                }
                "Position2" | "PairPos2" | "Ligature2" | "Substitution2" | "AlternateSubs2"
                | "MultipleSubs2" => self.parse_pos_sub(&name, key, v, line)?,
                "HStem" | "VStem" | "DStem2" | "CounterMasks" | "Flags" | "LayerCount" => {}
                _ => log::debug!("Skipping unhandled glyph record {key}"),
            }
        }

        self.font.layers[default_pos].ensure_glyph(&name).codepoints = codepoints;
        let rank = rank.ok_or_else(|| SfdError::MissingEncoding(name.clone()))?;
        Ok((name, rank))
    }

    fn parse_anchor_point(
        &mut self,
        glyph: &SmolStr,
        default_pos: usize,
        value: &str,
        line: &str,
    ) -> Result<(), SfdError> {
        let caps = ANCHOR_RE
            .captures(value)
            .ok_or_else(|| malformed("AnchorPoint", line))?;
        let anchor = utf7::decode_utf7(&caps[1]);
        let x: f64 = caps[2].parse().map_err(|_| malformed("AnchorPoint", line))?;
        let y: f64 = caps[3].parse().map_err(|_| malformed("AnchorPoint", line))?;
        let kind = AnchorKind::parse(&caps[4], line)?;
        let index: u32 = caps[5].parse().map_err(|_| malformed("AnchorPoint", line))?;

        if self.options.preserve_ufo_anchors {
            self.font.layers[default_pos]
                .ensure_glyph(glyph)
                .anchors
                .push(Anchor {
                    x,
                    y,
                    name: utils::ufo_anchor_name(&anchor, kind, index),
                });
        } else {
            self.glyph_anchors
                .entry(glyph.clone())
                .or_default()
                .entry(SmolStr::from(anchor))
                .or_default()
                .insert(kind, (x, y));
        }
        Ok(())
    }

    fn parse_kerns(&mut self, glyph: &SmolStr, value: &str, line: &str) -> Result<(), SfdError> {
        if self.glyph_kerns.contains_key(glyph) {
            return Err(SfdError::DuplicateKerns(glyph.clone()));
        }
        let mut pairs = Vec::new();
        for caps in KERNS_RE.captures_iter(value) {
            let gid: usize = caps[1].parse().map_err(|_| malformed("Kerns2", line))?;
            let kern: i32 = caps[2].parse().map_err(|_| malformed("Kerns2", line))?;
            pairs.push((gid, kern));
        }
        if pairs.is_empty() {
            return Err(malformed("Kerns2", line));
        }
        self.glyph_kerns.insert(glyph.clone(), pairs);
        Ok(())
    }

    fn parse_pos_sub(
        &mut self,
        glyph: &SmolStr,
        key: &str,
        value: &str,
        line: &str,
    ) -> Result<(), SfdError> {
        let caps = SUBPOS_RE
            .captures(value)
            .ok_or_else(|| malformed(key, line))?;
        // Strip the trailing "2" to get the rule kind.
        let kind = &key[..key.len() - 1];
        let subtable = SmolStr::from(utf7::decode_utf7(&caps[1]));
        let tokens: Vec<&str> = caps[2].split_whitespace().collect();

        let after_eq = |token: &str| -> Result<i32, SfdError> {
            token
                .split_once('=')
                .map(|(_, n)| n)
                .ok_or_else(|| malformed(key, line))?
                .parse()
                .map_err(|_| malformed(key, line))
        };

        let rule = match kind {
            "Position" => PosSubRule::Position(
                tokens
                    .iter()
                    .map(|t| after_eq(t))
                    .collect::<Result<Vec<i32>, SfdError>>()?,
            ),
            "PairPos" => {
                let Some((second, values)) = tokens.split_first() else {
                    return Err(malformed(key, line));
                };
                PosSubRule::PairPos {
                    second: SmolStr::new(*second),
                    values: values
                        .iter()
                        .map(|t| after_eq(t))
                        .collect::<Result<Vec<i32>, SfdError>>()?,
                }
            }
            "Substitution" => {
                PosSubRule::Substitution(tokens.iter().map(|t| SmolStr::new(*t)).collect())
            }
            "AlternateSubs" => {
                PosSubRule::AlternateSubs(tokens.iter().map(|t| SmolStr::new(*t)).collect())
            }
            "MultipleSubs" => {
                PosSubRule::MultipleSubs(tokens.iter().map(|t| SmolStr::new(*t)).collect())
            }
            _ => PosSubRule::Ligature(tokens.iter().map(|t| SmolStr::new(*t)).collect()),
        };

        self.glyph_pos_sub
            .entry(glyph.clone())
            .or_default()
            .entry(subtable)
            .or_default()
            .push(rule);
        Ok(())
    }

    fn process_references(&mut self) -> Result<(), SfdError> {
        for (pos, glyph_name, raw) in std::mem::take(&mut self.glyph_refs) {
            let tokens: Vec<&str> = raw.split_whitespace().collect();
            let gid: usize = tokens
                .first()
                .and_then(|t| t.parse().ok())
                .ok_or_else(|| malformed("Refer", &raw))?;
            let reference = self.font.glyph_order.get(gid).cloned().ok_or_else(|| {
                SfdError::BadGlyphIndex {
                    glyph: glyph_name.clone(),
                    index: gid,
                    count: self.font.glyph_order.len(),
                }
            })?;
            if tokens.len() < 9 {
                return Err(malformed("Refer", &raw));
            }
            let mut matrix = [0.0f64; 6];
            for (slot, token) in matrix.iter_mut().zip(&tokens[3..9]) {
                *slot = token.parse().map_err(|_| malformed("Refer", &raw))?;
            }
            self.font.layers[pos]
                .ensure_glyph(&glyph_name)
                .add_component(reference, Affine::new(matrix));
        }
        Ok(())
    }

    fn process_kerns(&mut self) -> Result<(), SfdError> {
        for (first, pairs) in std::mem::take(&mut self.glyph_kerns) {
            for (gid, value) in pairs {
                let second = self.font.glyph_order.get(gid).cloned().ok_or_else(|| {
                    SfdError::BadGlyphIndex {
                        glyph: first.clone(),
                        index: gid,
                        count: self.font.glyph_order.len(),
                    }
                })?;
                self.font.set_kern(first.clone(), second, value);
            }
        }
        Ok(())
    }

    /// Metrics flagged as offsets hold deltas from the ascender/descender or
    /// the font bounding box; replace them with the resolved values.
    fn fix_offset_metrics(&mut self) -> Result<(), SfdError> {
        if self.offset_metrics.is_empty() {
            return Ok(());
        }
        let bounds = self.font.bounds()?;
        let (y_min, y_max) = bounds
            .map(|rect| (rect.min_y().round() as i32, rect.max_y().round() as i32))
            .unwrap_or((0, 0));
        let ascender = self.font.info.ascender.unwrap_or(0);
        let descender = self.font.info.descender.unwrap_or(0);

        for metric in std::mem::take(&mut self.offset_metrics) {
            let stored = self.font.info.offset_metric(metric).unwrap_or(0);
            let value = match metric {
                OffsetMetric::TypoAscender => ascender + stored,
                OffsetMetric::TypoDescender => descender + stored,
                OffsetMetric::WinAscent => y_max + stored,
                OffsetMetric::WinDescent => (-y_min + stored).max(0),
                OffsetMetric::HheaAscender => y_max + stored,
                OffsetMetric::HheaDescender => y_min + stored,
            };
            self.font.info.set_offset_metric(metric, value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::*;

    fn load_str(content: &str) -> Result<Font, SfdError> {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        load(file.path())
    }

    const SMALL_FONT: &str = r#"SplineFontDB: 3.0
FontName: Test-Bold
Ascent: 800
Descent: 200
LayerCount: 2
Layer: 0 0 "Back" 1
Layer: 1 0 "Fore" 0
OS2WinAscent: 50
OS2WinAOffset: 1
BeginChars: 257 2
StartChar: A
Encoding: 65 65 0
Width: 600
Flags: W
Kerns2: 1 -40 "'kern' Horizontal Kerning subtable"
Fore
SplineSet
0 0 m 25
 500 0 l 25
 500 750 l 25
 0 750 l 25
 0 0 l 25
EndSplineSet
EndChar
StartChar: V
Encoding: 86 86 1
Width: 580
EndChar
EndChars
EndSplineFont
"#;

    #[test]
    fn version_other_than_three_is_fatal() {
        let err = load_str("SplineFontDB: 2.0\n").unwrap_err();
        assert!(matches!(
            err,
            SfdError::UnsupportedVersion { version } if version == "2.0"
        ));
    }

    #[test]
    fn missing_signature_is_fatal() {
        let err = load_str("FontName: Test\n").unwrap_err();
        assert!(matches!(err, SfdError::NotSfd { .. }));
    }

    #[test]
    fn blank_lines_before_the_signature_are_tolerated() {
        let font = load_str("\n\nSplineFontDB: 3.0\nAscent: 800\nDescent: 200\n").unwrap();
        assert_eq!(font.info.units_per_em, Some(1000));
    }

    #[test]
    fn kerns_resolve_glyph_indices_to_names() {
        let font = load_str(SMALL_FONT).unwrap();
        assert_eq!(
            font.kerning.get(&(SmolStr::new("A"), SmolStr::new("V"))),
            Some(&-40)
        );
    }

    #[test]
    fn win_ascent_offset_resolves_against_the_bounding_box() {
        let font = load_str(SMALL_FONT).unwrap();
        // yMax 750 from the outline plus the stored offset of 50.
        assert_eq!(font.info.open_type_os2_win_ascent, Some(800));
    }

    #[test]
    fn style_name_falls_back_to_the_postscript_suffix() {
        let font = load_str(SMALL_FONT).unwrap();
        assert_eq!(font.info.style_name.as_deref(), Some("Bold"));
    }

    #[test]
    fn upem_is_ascent_plus_descent() {
        let font = load_str(SMALL_FONT).unwrap();
        assert_eq!(font.info.units_per_em, Some(1000));
        assert_eq!(font.info.descender, Some(-200));
    }

    #[test]
    fn glyph_order_follows_declared_ranks() {
        let sfd = "SplineFontDB: 3.0\n\
                   Ascent: 800\n\
                   Descent: 200\n\
                   BeginChars: 257 2\n\
                   StartChar: B\n\
                   Encoding: 66 66 1\n\
                   Width: 600\n\
                   EndChar\n\
                   StartChar: A\n\
                   Encoding: 65 65 0\n\
                   Width: 600\n\
                   EndChar\n\
                   EndChars\n\
                   EndSplineFont\n";
        let font = load_str(sfd).unwrap();
        assert_eq!(font.glyph_order, vec!["A", "B"]);
        assert_eq!(font.glyph("B").unwrap().codepoints, vec![66]);
    }

    #[test]
    fn duplicate_kerns_records_are_fatal() {
        let sfd = "SplineFontDB: 3.0\n\
                   BeginChars: 257 2\n\
                   StartChar: A\n\
                   Encoding: 65 65 0\n\
                   Kerns2: 1 -40 \"kern\"\n\
                   Kerns2: 1 -50 \"kern\"\n\
                   EndChar\n\
                   StartChar: V\n\
                   Encoding: 86 86 1\n\
                   EndChar\n\
                   EndChars\n";
        let err = load_str(sfd).unwrap_err();
        assert!(matches!(err, SfdError::DuplicateKerns(name) if name == "A"));
    }

    #[test]
    fn glyph_without_encoding_is_fatal() {
        let sfd = "SplineFontDB: 3.0\n\
                   BeginChars: 257 1\n\
                   StartChar: A\n\
                   Width: 600\n\
                   EndChar\n\
                   EndChars\n";
        let err = load_str(sfd).unwrap_err();
        assert!(matches!(err, SfdError::MissingEncoding(name) if name == "A"));
    }

    #[test]
    fn references_become_components_with_transforms() {
        let sfd = "SplineFontDB: 3.0\n\
                   Ascent: 800\n\
                   Descent: 200\n\
                   BeginChars: 257 2\n\
                   StartChar: A\n\
                   Encoding: 65 65 0\n\
                   Width: 600\n\
                   EndChar\n\
                   StartChar: Agrave\n\
                   Encoding: 192 192 1\n\
                   Width: 600\n\
                   Refer: 0 65 N 1 0 0 1 250 180 2\n\
                   EndChar\n\
                   EndChars\n";
        let font = load_str(sfd).unwrap();
        let composite = font.glyph("Agrave").unwrap();
        assert_eq!(composite.components.len(), 1);
        assert_eq!(composite.components[0].reference, "A");
        assert_eq!(
            composite.components[0].transform,
            Affine::new([1.0, 0.0, 0.0, 1.0, 250.0, 180.0])
        );
    }

    #[test]
    fn out_of_range_reference_index_is_fatal() {
        let sfd = "SplineFontDB: 3.0\n\
                   BeginChars: 257 1\n\
                   StartChar: A\n\
                   Encoding: 65 65 0\n\
                   Refer: 7 65 N 1 0 0 1 0 0 2\n\
                   EndChar\n\
                   EndChars\n";
        let err = load_str(sfd).unwrap_err();
        assert!(matches!(
            err,
            SfdError::BadGlyphIndex { index: 7, count: 1, .. }
        ));
    }

    #[test]
    fn unterminated_glyph_section_is_fatal() {
        let sfd = "SplineFontDB: 3.0\n\
                   BeginChars: 257 1\n\
                   StartChar: A\n\
                   Encoding: 65 65 0\n\
                   EndChar\n";
        let err = load_str(sfd).unwrap_err();
        assert!(matches!(
            err,
            SfdError::UnterminatedSection { end: "EndChars", .. }
        ));
    }

    #[test]
    fn unknown_records_are_ignored() {
        let font =
            load_str("SplineFontDB: 3.0\nAscent: 800\nDescent: 200\nFuturisticKey: 12\n").unwrap();
        assert_eq!(font.info.units_per_em, Some(1000));
    }

    #[test]
    fn private_dictionary_promotes_standard_stems() {
        let sfd = "SplineFontDB: 3.0\n\
                   BeginPrivate: 2\n\
                   StemSnapV 7 [80 90]\n\
                   StdVW 4 [90]\n\
                   EndPrivate\n";
        let font = load_str(sfd).unwrap();
        assert_eq!(font.info.postscript_stem_snap_v, vec![90.0, 80.0]);
    }

    #[test]
    fn private_dictionary_length_mismatch_is_fatal() {
        let sfd = "SplineFontDB: 3.0\n\
                   BeginPrivate: 1\n\
                   BlueValues 4 [0 8]\n\
                   EndPrivate\n";
        let err = load_str(sfd).unwrap_err();
        assert!(matches!(err, SfdError::MalformedRecord { key, .. } if key == "BlueValues"));
    }

    #[test]
    fn gasp_table_splits_ranges_and_flag_bits() {
        let font = load_str("SplineFontDB: 3.0\nGaspTable: 2 8 2 65535 3 1\n").unwrap();
        let records = &font.info.open_type_gasp_range_records;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].range_max_ppem, 8);
        assert_eq!(records[0].range_gasp_behavior, vec![1]);
        assert_eq!(records[1].range_max_ppem, 65535);
        assert_eq!(records[1].range_gasp_behavior, vec![0, 1]);
    }

    #[test]
    fn langname_fills_typed_slots_for_us_english() {
        let sfd = "SplineFontDB: 3.0\n\
                   LangName: 1033 \"\" \"Family\" \"Oblique\" \"\" \"\" \"Version 2.1\"\n\
                   LangName: 1041 \"\" \"+MEY-\"\n";
        let font = load_str(sfd).unwrap();
        assert_eq!(font.info.family_name.as_deref(), Some("Family"));
        assert_eq!(font.info.style_name.as_deref(), Some("Oblique"));
        assert_eq!(font.info.open_type_name_version.as_deref(), Some("Version 2.1"));
        let records = &font.info.open_type_name_records;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].language_id, 1041);
        assert_eq!(records[0].name_id, 1);
        assert_eq!(records[0].platform_id, 3);
        assert_eq!(records[0].encoding_id, 1);
    }

    #[test]
    fn note_merging_keeps_comment_history() {
        let sfd = "SplineFontDB: 3.0\n\
                   Comments: old note\n\
                   UComments: \"newer\"\n\
                   FontLog: \"history\"\n";
        let font = load_str(sfd).unwrap();
        assert_eq!(
            font.info.note.as_deref(),
            Some("newer\nold note\nFont log:\nhistory")
        );
    }

    #[test]
    fn grid_contours_become_guidelines() {
        let sfd = "SplineFontDB: 3.0\n\
                   Grid\n\
                   0 500 m 1\n\
                   1000 500 l 1\n\
                   Named: \"x-height\"\n\
                   250 0 m 1\n\
                   250 900 l 1\n\
                   EndSplineSet\n";
        let font = load_str(sfd).unwrap();
        let guides = &font.info.guidelines;
        assert_eq!(guides.len(), 2);
        assert_eq!(guides[0].y, Some(500.0));
        assert_eq!(guides[0].name.as_deref(), Some("x-height"));
        assert_eq!(guides[1].x, Some(250.0));
        assert_eq!(guides[1].y, None);
    }

    #[test]
    fn creation_time_renders_as_utc() {
        let font = load_str("SplineFontDB: 3.0\nCreationTime: 1458134939\n").unwrap();
        assert_eq!(
            font.info.open_type_head_created.as_deref(),
            Some("2016/03/16 13:28:59")
        );
    }

    #[test]
    fn layer_records_switch_curve_conventions() {
        let sfd = "SplineFontDB: 3.0\n\
                   LayerCount: 2\n\
                   Layer: 0 1 \"Back\" 1\n\
                   Layer: 1 1 \"Fore\" 0\n\
                   BeginChars: 257 1\n\
                   StartChar: A\n\
                   Encoding: 65 65 0\n\
                   Width: 600\n\
                   Fore\n\
                   SplineSet\n\
                   0 0 m 0\n\
                   100 100 100 100 200 0 c 0\n\
                   EndSplineSet\n\
                   EndChar\n\
                   EndChars\n";
        let font = load_str(sfd).unwrap();
        assert!(font.default_layer().unwrap().quadratic);
        let glyph = font.glyph("A").unwrap();
        // One on-curve point came from the move, the quadratic segment adds
        // an off-curve and an on-curve point.
        assert_eq!(glyph.contours[0].nodes.len(), 3);
    }

    #[test]
    fn background_drawing_lands_on_the_background_layer() {
        let sfd = "SplineFontDB: 3.0\n\
                   LayerCount: 2\n\
                   Layer: 0 0 \"Back\" 1\n\
                   Layer: 1 0 \"Fore\" 0\n\
                   BeginChars: 257 1\n\
                   StartChar: A\n\
                   Encoding: 65 65 0\n\
                   Width: 600\n\
                   Back\n\
                   SplineSet\n\
                   0 0 m 25\n\
                   100 0 l 25\n\
                   EndSplineSet\n\
                   EndChar\n\
                   EndChars\n";
        let font = load_str(sfd).unwrap();
        assert!(font.glyph("A").unwrap().contours.is_empty());
        let back = font.layers.iter().find(|l| l.name == "Back").unwrap();
        let shadow = back.glyph("A").unwrap();
        assert_eq!(shadow.contours.len(), 1);
        assert_eq!(shadow.width, 600.0);
    }
}
