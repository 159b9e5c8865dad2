use serde::{Deserialize, Serialize};

/// One `gasp` table range: behavior flag bits applying up to a ppem ceiling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GaspRecord {
    pub range_max_ppem: u32,
    pub range_gasp_behavior: Vec<u8>,
}

/// A name-table record for a language other than US English.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameRecord {
    pub name_id: u16,
    pub platform_id: u16,
    pub encoding_id: u16,
    pub language_id: u16,
    pub string: String,
}

/// The vertical metrics which an SFD file may store as offsets from the
/// font's bounding box or ascender/descender rather than as absolute values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OffsetMetric {
    HheaAscender,
    HheaDescender,
    TypoAscender,
    TypoDescender,
    WinAscent,
    WinDescent,
}

/// Font-wide metadata.
///
/// Field naming follows UFO fontinfo conventions; everything is optional
/// because an SFD file may carry any subset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FontInfo {
    pub family_name: Option<String>,
    pub style_name: Option<String>,
    pub copyright: Option<String>,
    pub trademark: Option<String>,
    pub note: Option<String>,
    pub version_major: Option<i32>,
    pub version_minor: Option<i32>,
    pub units_per_em: Option<i32>,
    pub ascender: Option<i32>,
    pub descender: Option<i32>,
    pub cap_height: Option<i32>,
    pub x_height: Option<i32>,
    pub italic_angle: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub guidelines: Vec<crate::guide::Guideline>,

    pub open_type_head_created: Option<String>,
    pub open_type_hhea_ascender: Option<i32>,
    pub open_type_hhea_descender: Option<i32>,
    pub open_type_hhea_line_gap: Option<i32>,
    pub open_type_vhea_vert_typo_line_gap: Option<i32>,

    pub open_type_name_unique_id: Option<String>,
    pub open_type_name_version: Option<String>,
    pub open_type_name_manufacturer: Option<String>,
    pub open_type_name_manufacturer_url: Option<String>,
    pub open_type_name_designer: Option<String>,
    pub open_type_name_designer_url: Option<String>,
    pub open_type_name_description: Option<String>,
    pub open_type_name_license: Option<String>,
    pub open_type_name_license_url: Option<String>,
    pub open_type_name_preferred_family_name: Option<String>,
    pub open_type_name_preferred_subfamily_name: Option<String>,
    pub open_type_name_compatible_full_name: Option<String>,
    pub open_type_name_sample_text: Option<String>,
    pub open_type_name_wws_family_name: Option<String>,
    pub open_type_name_wws_subfamily_name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub open_type_name_records: Vec<NameRecord>,

    pub open_type_os2_weight_class: Option<i32>,
    pub open_type_os2_width_class: Option<i32>,
    pub open_type_os2_vendor_id: Option<String>,
    pub open_type_os2_panose: Option<Vec<i32>>,
    pub open_type_os2_family_class: Option<(i32, i32)>,
    pub open_type_os2_type: Option<Vec<u8>>,
    pub open_type_os2_selection: Option<Vec<u8>>,
    pub open_type_os2_typo_ascender: Option<i32>,
    pub open_type_os2_typo_descender: Option<i32>,
    pub open_type_os2_typo_line_gap: Option<i32>,
    pub open_type_os2_win_ascent: Option<i32>,
    pub open_type_os2_win_descent: Option<i32>,
    pub open_type_os2_subscript_x_size: Option<i32>,
    pub open_type_os2_subscript_y_size: Option<i32>,
    pub open_type_os2_subscript_x_offset: Option<i32>,
    pub open_type_os2_subscript_y_offset: Option<i32>,
    pub open_type_os2_superscript_x_size: Option<i32>,
    pub open_type_os2_superscript_y_size: Option<i32>,
    pub open_type_os2_superscript_x_offset: Option<i32>,
    pub open_type_os2_superscript_y_offset: Option<i32>,
    pub open_type_os2_strikeout_size: Option<i32>,
    pub open_type_os2_strikeout_position: Option<i32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub open_type_gasp_range_records: Vec<GaspRecord>,

    pub postscript_font_name: Option<String>,
    pub postscript_full_name: Option<String>,
    pub postscript_weight_name: Option<String>,
    pub postscript_unique_id: Option<i32>,
    pub postscript_slant_angle: Option<f64>,
    pub postscript_underline_position: Option<f64>,
    pub postscript_underline_thickness: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub postscript_blue_values: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub postscript_other_blues: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub postscript_family_blues: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub postscript_family_other_blues: Vec<f64>,
    pub postscript_blue_fuzz: Option<f64>,
    pub postscript_blue_shift: Option<f64>,
    pub postscript_blue_scale: Option<f64>,
    pub postscript_force_bold: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub postscript_stem_snap_h: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub postscript_stem_snap_v: Vec<f64>,
}

impl FontInfo {
    pub fn offset_metric(&self, metric: OffsetMetric) -> Option<i32> {
        match metric {
            OffsetMetric::HheaAscender => self.open_type_hhea_ascender,
            OffsetMetric::HheaDescender => self.open_type_hhea_descender,
            OffsetMetric::TypoAscender => self.open_type_os2_typo_ascender,
            OffsetMetric::TypoDescender => self.open_type_os2_typo_descender,
            OffsetMetric::WinAscent => self.open_type_os2_win_ascent,
            OffsetMetric::WinDescent => self.open_type_os2_win_descent,
        }
    }

    pub fn set_offset_metric(&mut self, metric: OffsetMetric, value: i32) {
        let slot = match metric {
            OffsetMetric::HheaAscender => &mut self.open_type_hhea_ascender,
            OffsetMetric::HheaDescender => &mut self.open_type_hhea_descender,
            OffsetMetric::TypoAscender => &mut self.open_type_os2_typo_ascender,
            OffsetMetric::TypoDescender => &mut self.open_type_os2_typo_descender,
            OffsetMetric::WinAscent => &mut self.open_type_os2_win_ascent,
            OffsetMetric::WinDescent => &mut self.open_type_os2_win_descent,
        };
        *slot = Some(value);
    }

    /// Prepend a value to a stem-snap list, dropping any pre-existing
    /// duplicate, so the "standard" stem width sorts first
    pub fn promote_stem_snap(&mut self, vertical: bool, value: f64) {
        let list = if vertical {
            &mut self.postscript_stem_snap_v
        } else {
            &mut self.postscript_stem_snap_h
        };
        list.retain(|v| *v != value);
        list.insert(0, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stem_snap_promotion() {
        let mut info = FontInfo {
            postscript_stem_snap_v: vec![80.0, 90.0],
            ..Default::default()
        };
        info.promote_stem_snap(true, 90.0);
        assert_eq!(info.postscript_stem_snap_v, vec![90.0, 80.0]);
        info.promote_stem_snap(false, 68.0);
        assert_eq!(info.postscript_stem_snap_h, vec![68.0]);
    }
}
