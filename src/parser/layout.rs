//! OpenType layout plumbing: lookup records, glyph-level rules, and the
//! feature program writer.
//!
//! FontForge keeps layout data spread across `Lookup` records at the font
//! level and `Position2`/`Ligature2`-style records at the glyph level, tied
//! together by subtable name. The writer below reassembles them into an
//! AFDKO feature program, staying line-for-line compatible with FontForge's
//! own feature dump so the two can be diffed.

use std::collections::{BTreeSet, HashMap};

use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use smol_str::SmolStr;

use crate::anchor::AnchorKind;
use crate::error::SfdError;
use crate::font::Font;
use crate::glyph::GlyphClass;

use super::utils::format_g;

/// Lookup types as FontForge numbers them in `Lookup` records. The high
/// byte selects the table: 0 for GSUB, 1 for GPOS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum LookupKind {
    // GSUB
    GsubSingle = 0x001,
    GsubMultiple = 0x002,
    GsubAlternate = 0x003,
    GsubLigature = 0x004,
    GsubContext = 0x005,
    GsubContextChain = 0x006,
    GsubReverseChain = 0x008,
    // Apple state machines, carried under GSUB
    MorxIndic = 0x0fd,
    MorxContext = 0x0fe,
    MorxInsert = 0x0ff,
    // GPOS
    GposSingle = 0x101,
    GposPair = 0x102,
    GposCursive = 0x103,
    GposMarkToBase = 0x104,
    GposMarkToLigature = 0x105,
    GposMarkToMark = 0x106,
    GposContext = 0x107,
    GposContextChain = 0x108,
    KernStateMachine = 0x1ff,
}

impl LookupKind {
    pub(super) fn from_number(kind: u32) -> Result<Self, SfdError> {
        Ok(match kind {
            0x001 => LookupKind::GsubSingle,
            0x002 => LookupKind::GsubMultiple,
            0x003 => LookupKind::GsubAlternate,
            0x004 => LookupKind::GsubLigature,
            0x005 => LookupKind::GsubContext,
            0x006 => LookupKind::GsubContextChain,
            0x008 => LookupKind::GsubReverseChain,
            0x0fd => LookupKind::MorxIndic,
            0x0fe => LookupKind::MorxContext,
            0x0ff => LookupKind::MorxInsert,
            0x101 => LookupKind::GposSingle,
            0x102 => LookupKind::GposPair,
            0x103 => LookupKind::GposCursive,
            0x104 => LookupKind::GposMarkToBase,
            0x105 => LookupKind::GposMarkToLigature,
            0x106 => LookupKind::GposMarkToMark,
            0x107 => LookupKind::GposContext,
            0x108 => LookupKind::GposContextChain,
            0x1ff => LookupKind::KernStateMachine,
            _ => return Err(SfdError::UnknownLookupKind(kind)),
        })
    }

    pub(super) fn is_gpos(self) -> bool {
        (self as u32) >> 8 == 1
    }

    /// The abbreviation used when synthesizing a lookup name after a
    /// sanitization collision.
    fn short_name(self) -> &'static str {
        match self {
            LookupKind::GsubSingle | LookupKind::GposSingle => "single",
            LookupKind::GsubMultiple => "mult",
            LookupKind::GsubAlternate => "alt",
            LookupKind::GsubLigature => "ligature",
            LookupKind::GsubContext | LookupKind::GposContext => "context",
            LookupKind::GsubContextChain | LookupKind::GposContextChain => "chain",
            LookupKind::GsubReverseChain => "reversecc",
            LookupKind::GposPair => "pair",
            LookupKind::GposCursive => "cursive",
            LookupKind::GposMarkToBase => "mark2base",
            LookupKind::GposMarkToLigature => "mark2liga",
            LookupKind::GposMarkToMark => "mark2mark",
            LookupKind::MorxIndic
            | LookupKind::MorxContext
            | LookupKind::MorxInsert
            | LookupKind::KernStateMachine => "unknown",
        }
    }
}

const LOOKUP_FLAGS: [(u16, &str); 4] = [
    (1, "RightToLeft"),
    (2, "IgnoreBaseGlyphs"),
    (4, "IgnoreLigatures"),
    (8, "IgnoreMarks"),
];

fn flag_names(flags: u16) -> String {
    let names: Vec<&str> = LOOKUP_FLAGS
        .iter()
        .filter(|(bit, _)| flags & bit != 0)
        .map(|(_, name)| *name)
        .collect();
    if names.is_empty() {
        "0".to_string()
    } else {
        names.join(" ")
    }
}

/// One `'tag' (...)` group of a `Lookup` record: a feature tag and the
/// script/language systems it is wired to.
#[derive(Debug, Clone)]
pub(super) struct FeatureRecord {
    pub(super) tag: SmolStr,
    pub(super) scripts: Vec<(SmolStr, Vec<SmolStr>)>,
}

#[derive(Debug, Clone)]
pub(super) struct LookupInfo {
    pub(super) kind: LookupKind,
    pub(super) flags: u16,
    pub(super) features: Vec<FeatureRecord>,
    pub(super) subtables: Vec<SmolStr>,
}

/// The lookups of one layout table, in declaration order.
#[derive(Debug, Clone, Default)]
pub(super) struct GTable(pub(super) IndexMap<SmolStr, LookupInfo>);

/// One glyph-level rule, as parsed from a `Position2`-family record.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum PosSubRule {
    Position(Vec<i32>),
    PairPos { second: SmolStr, values: Vec<i32> },
    Substitution(Vec<SmolStr>),
    AlternateSubs(Vec<SmolStr>),
    MultipleSubs(Vec<SmolStr>),
    Ligature(Vec<SmolStr>),
}

impl PosSubRule {
    fn names(&self) -> Option<&[SmolStr]> {
        match self {
            PosSubRule::Substitution(names)
            | PosSubRule::AlternateSubs(names)
            | PosSubRule::MultipleSubs(names)
            | PosSubRule::Ligature(names) => Some(names),
            _ => None,
        }
    }

    fn position_values(&self) -> Option<&[i32]> {
        match self {
            PosSubRule::Position(values) => Some(values),
            _ => None,
        }
    }

    fn pair(&self) -> Option<(&SmolStr, &[i32])> {
        match self {
            PosSubRule::PairPos { second, values } => Some((second, values)),
            _ => None,
        }
    }

    pub(super) fn is_ligature(&self) -> bool {
        matches!(self, PosSubRule::Ligature(_))
    }
}

pub(super) type PosSubRules = IndexMap<SmolStr, IndexMap<SmolStr, Vec<PosSubRule>>>;
pub(super) type GlyphAnchors = IndexMap<SmolStr, IndexMap<SmolStr, IndexMap<AnchorKind, (f64, f64)>>>;

type AnchorPos = (OrderedFloat<f64>, OrderedFloat<f64>);

fn anchor_pos(anchor: &(f64, f64)) -> AnchorPos {
    (OrderedFloat(anchor.0), OrderedFloat(anchor.1))
}

fn dump_anchor(anchor: Option<(f64, f64)>) -> String {
    match anchor {
        Some((x, y)) => format!("<anchor {} {}>", format_g(x), format_g(y)),
        None => "<anchor NULL>".to_string(),
    }
}

fn backslash_join<'a>(glyphs: impl IntoIterator<Item = &'a SmolStr>) -> String {
    glyphs
        .into_iter()
        .map(SmolStr::as_str)
        .collect::<Vec<_>>()
        .join(" \\")
}

fn join_values(values: &[i32]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Sanitizes an anchor class name into a feature-file class name: spaces
/// become underscores, anything outside ASCII alphanumerics, periods and
/// underscores is dropped.
fn sanitize_class_name(name: &str) -> String {
    let mut out = String::new();
    for ch in name.chars() {
        if ch as u32 >= 127 {
            continue;
        }
        if ch == ' ' {
            out.push('_');
        }
        if ch.is_ascii_alphanumeric() || ch == '.' || ch == '_' {
            out.push(ch);
        }
    }
    out
}

type LangBlock<'a> = (&'a SmolStr, Vec<String>);
type ScriptBlock<'a> = (&'a SmolStr, Vec<LangBlock<'a>>);
type FeatureBlock<'a> = (&'a SmolStr, Vec<ScriptBlock<'a>>);

/// Assembles feature programs from parsed lookups, glyph rules and anchors.
///
/// The sanitized-name memo is shared between the GSUB and GPOS passes, so
/// collision suffixes stay unique across the whole program.
pub(super) struct FeatureWriter<'a> {
    glyph_order: Vec<SmolStr>,
    pos_sub: &'a PosSubRules,
    anchor_classes: &'a IndexMap<SmolStr, Vec<SmolStr>>,
    anchors: &'a GlyphAnchors,
    feature_names: &'a IndexMap<SmolStr, Vec<(u32, String)>>,
    carets: &'a IndexMap<SmolStr, Vec<i32>>,
    sanitized: IndexMap<SmolStr, String>,
}

impl<'a> FeatureWriter<'a> {
    pub(super) fn new(
        glyph_order: Vec<SmolStr>,
        pos_sub: &'a PosSubRules,
        anchor_classes: &'a IndexMap<SmolStr, Vec<SmolStr>>,
        anchors: &'a GlyphAnchors,
        feature_names: &'a IndexMap<SmolStr, Vec<(u32, String)>>,
        carets: &'a IndexMap<SmolStr, Vec<i32>>,
    ) -> Self {
        FeatureWriter {
            glyph_order,
            pos_sub,
            anchor_classes,
            anchors,
            feature_names,
            carets,
            sanitized: IndexMap::new(),
        }
    }

    /// Turns a lookup name into a valid feature-file identifier. Distinct
    /// inputs always map to distinct outputs; a name that collides after
    /// sanitization is replaced by a synthesized one built from the lookup
    /// type and its first feature record.
    fn sanitize_lookup_name(&mut self, name: &SmolStr, info: &LookupInfo, is_gpos: bool) -> String {
        if let Some(done) = self.sanitized.get(name) {
            return done.clone();
        }
        let mut out = String::new();
        for (i, ch) in name.chars().enumerate() {
            if ch as u32 >= 127 {
                continue;
            }
            if ch.is_ascii_alphabetic() || ch == '.' || ch == '_' {
                out.push(ch);
            } else if i != 0 && ch.is_ascii_digit() {
                out.push(ch);
            }
        }
        out.truncate(63);
        if self.sanitized.values().any(|v| v == &out) {
            let short = info.kind.short_name();
            let mut feat = "";
            let mut script = "";
            if let Some(first) = info.features.first() {
                feat = first.tag.as_str();
                for (s, _) in &first.scripts {
                    if s != "DFLT" {
                        script = s.as_str();
                    }
                }
            }
            let prefix = if is_gpos { "pos" } else { "sub" };
            let mut i = 0;
            loop {
                let candidate = format!("{prefix}_{short}_{feat}{script}_{i}");
                if !self.sanitized.values().any(|v| v == &candidate) {
                    out = candidate;
                    break;
                }
                i += 2;
            }
        }
        self.sanitized.insert(name.clone(), out.clone());
        out
    }

    /// A subtable is live when some glyph carries rules for it or it is an
    /// anchor class; lookups with no live subtable are left out entirely.
    fn has_live_subtable(&self, subtables: &[SmolStr]) -> bool {
        subtables.iter().any(|sub| {
            self.pos_sub.values().any(|rules| rules.contains_key(sub))
                || self.anchor_classes.contains_key(sub)
        })
    }

    /// Writes one table's worth of lookup and feature blocks, or `None`
    /// when no lookup survives pruning.
    pub(super) fn write_table(&mut self, table: &GTable, is_gpos: bool) -> Option<String> {
        for (name, info) in &table.0 {
            self.sanitize_lookup_name(name, info, is_gpos);
        }

        let lookups: Vec<(&SmolStr, &LookupInfo)> = table
            .0
            .iter()
            .filter(|(_, info)| self.has_live_subtable(&info.subtables))
            .collect();
        if lookups.is_empty() {
            return None;
        }

        let mut feature_set: Vec<&SmolStr> = Vec::new();
        let mut script_set: BTreeSet<&SmolStr> = BTreeSet::new();
        let mut lang_set: HashMap<&SmolStr, BTreeSet<&SmolStr>> = HashMap::new();
        for (_, info) in &lookups {
            for feature in &info.features {
                if !feature_set.contains(&&feature.tag) {
                    feature_set.push(&feature.tag);
                }
                for (script, languages) in &feature.scripts {
                    script_set.insert(script);
                    lang_set.entry(script).or_default().extend(languages.iter());
                }
            }
        }

        // dflt sorts ahead of every real language tag.
        fn lang_key(lang: &SmolStr) -> &str {
            if lang == "dflt" {
                "0"
            } else {
                lang.as_str()
            }
        }
        let scripts: Vec<(&SmolStr, Vec<&SmolStr>)> = script_set
            .iter()
            .map(|script| {
                let mut languages: Vec<&SmolStr> = lang_set
                    .get(*script)
                    .map(|set| set.iter().copied().collect())
                    .unwrap_or_default();
                languages.sort_by(|a, b| lang_key(a).cmp(lang_key(b)));
                (*script, languages)
            })
            .collect();

        let mut features: Vec<FeatureBlock> = Vec::new();
        for feature in &feature_set {
            let mut scripts_out: Vec<ScriptBlock> = Vec::new();
            for (script, languages) in &scripts {
                let mut langs_out: Vec<LangBlock> = Vec::new();
                for language in languages {
                    let mut lookups_out: Vec<String> = Vec::new();
                    for (name, info) in &lookups {
                        for record in &info.features {
                            if &&record.tag != feature {
                                continue;
                            }
                            for (s, langs) in &record.scripts {
                                if &s != script {
                                    continue;
                                }
                                for lang in langs {
                                    if &lang == language {
                                        lookups_out.push(
                                            self.sanitize_lookup_name(name, info, is_gpos),
                                        );
                                    }
                                }
                            }
                        }
                    }
                    if !lookups_out.is_empty() {
                        langs_out.push((*language, lookups_out));
                    }
                }
                if !langs_out.is_empty() {
                    scripts_out.push((*script, langs_out));
                }
            }
            if !scripts_out.is_empty() {
                features.push((*feature, scripts_out));
            }
        }

        let mut lines: Vec<String> = Vec::new();
        lines.push(format!("# {} ", if is_gpos { "GPOS" } else { "GSUB" }));
        lines.push(String::new());

        for (name, info) in &lookups {
            let lookup_name = self.sanitize_lookup_name(name, info, is_gpos);
            lines.push(String::new());
            lines.push(format!("lookup {lookup_name} {{"));
            lines.push(format!("  lookupflag {};", flag_names(info.flags)));
            for subtable in &info.subtables {
                if self.anchor_classes.contains_key(subtable) {
                    lines.extend(self.write_anchor_class(info.kind, subtable));
                    continue;
                }
                for (glyph, subtables) in self.pos_sub {
                    if let Some(rules) = subtables.get(subtable) {
                        for rule in rules {
                            write_rule(&mut lines, info.kind, glyph, rule);
                        }
                    }
                }
            }
            lines.push(format!("}} {lookup_name};"));
        }

        for (feature, scripts_out) in &features {
            lines.push(String::new());
            lines.push(format!("feature {feature} {{"));
            if let Some(names) = self.feature_names.get(feature.as_str()) {
                lines.push("  featureNames {".to_string());
                for (lang, name) in names {
                    lines.push(format!("    name 3 1 {lang} \"{name}\";"));
                }
                lines.push("  };".to_string());
            }
            for (script, langs_out) in scripts_out {
                lines.push(String::new());
                lines.push(format!(" script {script};"));
                for (language, lookup_names) in langs_out {
                    let exclude = if *language == "dflt" { "" } else { "exclude_dflt" };
                    lines.push(format!("     language {language} {exclude};"));
                    for lookup_name in lookup_names {
                        lines.push(format!("      lookup {lookup_name};"));
                    }
                }
            }
            lines.push(format!("}} {feature};"));
        }

        lines.push(String::new());
        Some(lines.join("\n"))
    }

    /// Emits the mark class definitions and attachment rules for one anchor
    /// class subtable. Glyphs sharing an anchor position are grouped into a
    /// single class, scanning in glyph order.
    fn write_anchor_class(&self, kind: LookupKind, subtable: &SmolStr) -> Vec<String> {
        let mut lines = Vec::new();
        let Some(class_names) = self.anchor_classes.get(subtable) else {
            return lines;
        };

        let mut marks: IndexMap<(AnchorPos, &SmolStr), Vec<&SmolStr>> = IndexMap::new();
        let mut bases: IndexMap<(AnchorPos, &SmolStr), Vec<&SmolStr>> = IndexMap::new();
        for anchor_class in class_names {
            for glyph in &self.glyph_order {
                let Some(anchor) = self
                    .anchors
                    .get(glyph)
                    .and_then(|classes| classes.get(anchor_class))
                else {
                    continue;
                };
                if kind == LookupKind::GposCursive {
                    let entry = anchor.get(&AnchorKind::Entry).copied();
                    let exit = anchor.get(&AnchorKind::Exit).copied();
                    if entry.is_some() || exit.is_some() {
                        lines.push(format!(
                            "    pos cursive \\{} {} {};",
                            glyph,
                            dump_anchor(entry),
                            dump_anchor(exit)
                        ));
                    }
                } else {
                    if let Some(mark) = anchor.get(&AnchorKind::Mark) {
                        marks
                            .entry((anchor_pos(mark), anchor_class))
                            .or_default()
                            .push(glyph);
                    }
                    let base = anchor
                        .get(&AnchorKind::BaseChar)
                        .or_else(|| anchor.get(&AnchorKind::BaseMark));
                    if let Some(base) = base {
                        bases
                            .entry((anchor_pos(base), anchor_class))
                            .or_default()
                            .push(glyph);
                    }
                }
            }
        }

        for ((mark, anchor_class), glyphs) in &marks {
            lines.push(format!(
                "  markClass [\\{} ] {} @{};",
                backslash_join(glyphs.iter().copied()),
                dump_anchor(Some((mark.0.into_inner(), mark.1.into_inner()))),
                sanitize_class_name(anchor_class)
            ));
        }

        if bases.is_empty() {
            return lines;
        }
        let position = match kind {
            LookupKind::GposMarkToBase => "base",
            LookupKind::GposMarkToMark => "mark",
            _ => {
                log::warn!("Dropping base anchors of {subtable:?}: unsupported in a {kind:?} lookup");
                return lines;
            }
        };
        for ((base, anchor_class), glyphs) in &bases {
            lines.push(format!(
                "  pos {} [\\{} ] {} mark @{};",
                position,
                backslash_join(glyphs.iter().copied()),
                dump_anchor(Some((base.0.into_inner(), base.1.into_inner()))),
                sanitize_class_name(anchor_class)
            ));
        }
        lines
    }

    /// Writes the GDEF table: glyph class definitions and ligature carets.
    /// Unclassified glyphs count as simple glyphs unless they are the target
    /// of a ligature substitution; an unclassified `.notdef` is left out.
    pub(super) fn write_gdef(&self, font: &Font) -> String {
        const CLASS_NAMES: [(GlyphClass, &str); 4] = [
            (GlyphClass::Base, "@GDEF_Simple"),
            (GlyphClass::BaseLigature, "@GDEF_Ligature"),
            (GlyphClass::Mark, "@GDEF_Mark"),
            (GlyphClass::Component, "@GDEF_Component"),
        ];

        let mut buckets: IndexMap<GlyphClass, Vec<&SmolStr>> = IndexMap::new();
        for name in &font.glyph_order {
            let glyph_class = font.glyph(name).and_then(|glyph| glyph.glyph_class);
            let glyph_class = match glyph_class {
                Some(class) => class,
                None => {
                    if name == ".notdef" {
                        continue;
                    }
                    let ligature = self.pos_sub.get(name).is_some_and(|subtables| {
                        subtables.values().flatten().any(PosSubRule::is_ligature)
                    });
                    if ligature {
                        GlyphClass::BaseLigature
                    } else {
                        GlyphClass::Base
                    }
                }
            };
            buckets.entry(glyph_class).or_default().push(name);
        }

        let mut lines = vec![
            "#Mark attachment classes (defined in GDEF, used in lookupflags)".to_string(),
            String::new(),
        ];
        for (glyph_class, class_name) in CLASS_NAMES {
            let Some(glyphs) = buckets.get(&glyph_class) else {
                continue;
            };
            let mut line = format!("{class_name} = [");
            let mut n = class_name.len() + 8;
            for glyph in glyphs {
                if n + glyph.len() + 1 > 80 {
                    line.push_str("\n\t");
                    n = 8;
                }
                line.push('\\');
                line.push_str(glyph);
                line.push(' ');
                n += glyph.len() + 1;
            }
            line.push_str("];");
            lines.push(line);
        }

        let names: Vec<&str> = CLASS_NAMES
            .iter()
            .map(|(glyph_class, class_name)| {
                if buckets.contains_key(glyph_class) {
                    *class_name
                } else {
                    ""
                }
            })
            .collect();
        lines.push(String::new());
        lines.push("table GDEF {".to_string());
        lines.push(format!("  GlyphClassDef {};", names.join(", ")));
        lines.push(String::new());
        for (glyph, carets) in self.carets {
            lines.push(format!(
                "  LigatureCaretByPos \\{} {};",
                glyph,
                join_values(carets)
            ));
        }
        lines.push("} GDEF;".to_string());
        lines.push(String::new());
        lines.push(String::new());
        lines.join("\n")
    }
}

/// Emits one glyph rule under a lookup. The rule payload has to agree with
/// the lookup type; FontForge can produce files where they disagree, and
/// those rules are dropped with a warning.
fn write_rule(lines: &mut Vec<String>, kind: LookupKind, glyph: &SmolStr, rule: &PosSubRule) {
    match kind {
        LookupKind::GsubSingle | LookupKind::GsubMultiple => {
            if let Some(names) = rule.names() {
                lines.push(format!("    sub \\{} by \\{} ;", glyph, backslash_join(names)));
                return;
            }
        }
        LookupKind::GsubAlternate => {
            if let Some(names) = rule.names() {
                lines.push(format!(
                    "    sub \\{} from [\\{} ];",
                    glyph,
                    backslash_join(names)
                ));
                return;
            }
        }
        LookupKind::GsubLigature => {
            if let Some(names) = rule.names() {
                lines.push(format!(
                    "    sub \\{}  by \\{};",
                    backslash_join(names),
                    glyph
                ));
                return;
            }
        }
        LookupKind::GposSingle => {
            if let Some(values) = rule.position_values() {
                lines.push(format!("    pos \\{} <{}>;", glyph, join_values(values)));
                return;
            }
        }
        LookupKind::GposPair => {
            if let Some((second, values)) = rule.pair() {
                let split = values.len().min(4);
                lines.push(format!(
                    "    pos \\{} <{}> \\{} <{}>;",
                    glyph,
                    join_values(&values[..split]),
                    second,
                    join_values(&values[split..])
                ));
                return;
            }
        }
        _ => {}
    }
    log::warn!("Dropping rule on {glyph:?}: not expressible in a {kind:?} lookup");
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use pretty_assertions::assert_eq;

    use super::*;

    fn lookup(kind: LookupKind, tag: &str, subtables: &[&str]) -> LookupInfo {
        LookupInfo {
            kind,
            flags: 0,
            features: vec![FeatureRecord {
                tag: SmolStr::new(tag),
                scripts: vec![(
                    SmolStr::new("latn"),
                    vec![SmolStr::new("dflt")],
                )],
            }],
            subtables: subtables.iter().map(|s| SmolStr::new(s)).collect(),
        }
    }

    struct Fixture {
        pos_sub: PosSubRules,
        anchor_classes: IndexMap<SmolStr, Vec<SmolStr>>,
        anchors: GlyphAnchors,
        feature_names: IndexMap<SmolStr, Vec<(u32, String)>>,
        carets: IndexMap<SmolStr, Vec<i32>>,
    }

    impl Fixture {
        fn new() -> Self {
            Fixture {
                pos_sub: IndexMap::new(),
                anchor_classes: IndexMap::new(),
                anchors: IndexMap::new(),
                feature_names: IndexMap::new(),
                carets: IndexMap::new(),
            }
        }

        fn writer(&self, order: &[&str]) -> FeatureWriter<'_> {
            FeatureWriter::new(
                order.iter().map(|g| SmolStr::new(g)).collect(),
                &self.pos_sub,
                &self.anchor_classes,
                &self.anchors,
                &self.feature_names,
                &self.carets,
            )
        }
    }

    fn rule(fixture: &mut Fixture, glyph: &str, subtable: &str, rule: PosSubRule) {
        fixture
            .pos_sub
            .entry(SmolStr::new(glyph))
            .or_default()
            .entry(SmolStr::new(subtable))
            .or_default()
            .push(rule);
    }

    #[test]
    fn sanitization_is_injective() {
        let fixture = Fixture::new();
        let mut writer = fixture.writer(&[]);
        let info = lookup(LookupKind::GsubLigature, "liga", &[]);

        let a = writer.sanitize_lookup_name(&SmolStr::new("liga 1"), &info, false);
        let b = writer.sanitize_lookup_name(&SmolStr::new("liga@1"), &info, false);
        let c = writer.sanitize_lookup_name(&SmolStr::new("liga#1"), &info, false);
        assert_eq!(a, "liga1");
        assert_eq!(b, "sub_ligature_ligalatn_0");
        assert_eq!(c, "sub_ligature_ligalatn_2");

        // Memoized: asking again yields the same name.
        assert_eq!(
            writer.sanitize_lookup_name(&SmolStr::new("liga@1"), &info, false),
            b
        );
    }

    #[test]
    fn sanitization_strips_leading_digits_and_non_ascii() {
        let fixture = Fixture::new();
        let mut writer = fixture.writer(&[]);
        let info = lookup(LookupKind::GsubSingle, "ss01", &[]);
        assert_eq!(
            writer.sanitize_lookup_name(&SmolStr::new("1smcp"), &info, false),
            "smcp"
        );
        assert_eq!(
            writer.sanitize_lookup_name(&SmolStr::new("größe"), &info, false),
            "gre"
        );
        let long = SmolStr::new("a".repeat(80));
        assert_eq!(writer.sanitize_lookup_name(&long, &info, false).len(), 63);
    }

    #[test]
    fn lookup_flags_render_in_bit_order() {
        assert_eq!(flag_names(0), "0");
        assert_eq!(flag_names(10), "IgnoreBaseGlyphs IgnoreMarks");
        assert_eq!(flag_names(1), "RightToLeft");
    }

    #[test]
    fn empty_lookups_write_nothing() {
        let fixture = Fixture::new();
        let mut writer = fixture.writer(&[]);
        let mut table = GTable::default();
        table.0.insert(
            SmolStr::new("orphan"),
            lookup(LookupKind::GsubSingle, "ss01", &["orphan subtable"]),
        );
        assert_eq!(writer.write_table(&table, false), None);
    }

    #[test]
    fn ligature_feature_program() {
        let mut fixture = Fixture::new();
        rule(
            &mut fixture,
            "f_i",
            "'liga' lookup 0 subtable",
            PosSubRule::Ligature(vec![SmolStr::new("f"), SmolStr::new("i")]),
        );
        let mut writer = fixture.writer(&["f", "i", "f_i"]);
        let mut table = GTable::default();
        table.0.insert(
            SmolStr::new("'liga' lookup 0"),
            lookup(
                LookupKind::GsubLigature,
                "liga",
                &["'liga' lookup 0 subtable"],
            ),
        );
        let text = writer.write_table(&table, false).unwrap();
        assert_eq!(
            text,
            "# GSUB \n\
             \n\
             \n\
             lookup ligalookup0 {\n\
             \x20 lookupflag 0;\n\
             \x20   sub \\f \\i  by \\f_i;\n\
             } ligalookup0;\n\
             \n\
             feature liga {\n\
             \n\
             \x20script latn;\n\
             \x20    language dflt ;\n\
             \x20     lookup ligalookup0;\n\
             } liga;\n"
        );
    }

    #[test]
    fn pair_positioning_rule_splits_values() {
        let mut lines = Vec::new();
        write_rule(
            &mut lines,
            LookupKind::GposPair,
            &SmolStr::new("A"),
            &PosSubRule::PairPos {
                second: SmolStr::new("V"),
                values: vec![0, 0, -40, 0],
            },
        );
        assert_eq!(lines, vec!["    pos \\A <0 0 -40 0> \\V <>;"]);
    }

    #[test]
    fn mismatched_rule_is_dropped() {
        let mut lines = Vec::new();
        write_rule(
            &mut lines,
            LookupKind::GsubSingle,
            &SmolStr::new("A"),
            &PosSubRule::Position(vec![1, 2, 3, 4]),
        );
        assert!(lines.is_empty());
    }

    #[test]
    fn anchor_classes_group_by_position() {
        let mut fixture = Fixture::new();
        fixture.anchor_classes.insert(
            SmolStr::new("'mark' top subtable"),
            vec![SmolStr::new("Top")],
        );
        for glyph in ["A", "O"] {
            fixture
                .anchors
                .entry(SmolStr::new(glyph))
                .or_default()
                .entry(SmolStr::new("Top"))
                .or_default()
                .insert(AnchorKind::BaseChar, (250.0, 700.0));
        }
        fixture
            .anchors
            .entry(SmolStr::new("acutecomb"))
            .or_default()
            .entry(SmolStr::new("Top"))
            .or_default()
            .insert(AnchorKind::Mark, (0.0, 550.0));

        let writer = fixture.writer(&["A", "O", "acutecomb"]);
        let lines = writer.write_anchor_class(
            LookupKind::GposMarkToBase,
            &SmolStr::new("'mark' top subtable"),
        );
        assert_eq!(
            lines,
            vec![
                "  markClass [\\acutecomb ] <anchor 0 550> @Top;".to_string(),
                "  pos base [\\A \\O ] <anchor 250 700> mark @Top;".to_string(),
            ]
        );
    }

    #[test]
    fn cursive_anchors_allow_one_sided_attachment() {
        let mut fixture = Fixture::new();
        fixture.anchor_classes.insert(
            SmolStr::new("'curs' subtable"),
            vec![SmolStr::new("horizontal")],
        );
        fixture
            .anchors
            .entry(SmolStr::new("meem.init"))
            .or_default()
            .entry(SmolStr::new("horizontal"))
            .or_default()
            .insert(AnchorKind::Entry, (0.0, 120.0));

        let writer = fixture.writer(&["meem.init"]);
        let lines =
            writer.write_anchor_class(LookupKind::GposCursive, &SmolStr::new("'curs' subtable"));
        assert_eq!(
            lines,
            vec!["    pos cursive \\meem.init <anchor 0 120> <anchor NULL>;".to_string()]
        );
    }

    #[test]
    fn gdef_classes_and_carets() {
        let mut fixture = Fixture::new();
        rule(
            &mut fixture,
            "f_i",
            "liga subtable",
            PosSubRule::Ligature(vec![SmolStr::new("f"), SmolStr::new("i")]),
        );
        fixture
            .carets
            .insert(SmolStr::new("f_i"), vec![487]);

        let mut font = Font::new();
        for name in [".notdef", "f", "i", "f_i", "acutecomb"] {
            font.new_glyph(name);
        }
        if let Some(glyph) = font.glyph_mut("acutecomb") {
            glyph.glyph_class = Some(GlyphClass::Mark);
        }

        let writer = fixture.writer(&[]);
        let text = writer.write_gdef(&font);
        assert_eq!(
            text,
            "#Mark attachment classes (defined in GDEF, used in lookupflags)\n\
             \n\
             @GDEF_Simple = [\\f \\i ];\n\
             @GDEF_Ligature = [\\f_i ];\n\
             @GDEF_Mark = [\\acutecomb ];\n\
             \n\
             table GDEF {\n\
             \x20 GlyphClassDef @GDEF_Simple, @GDEF_Ligature, @GDEF_Mark, ;\n\
             \n\
             \x20 LigatureCaretByPos \\f_i 487;\n\
             } GDEF;\n\
             \n"
        );
    }

    #[test]
    fn gdef_class_lines_wrap_at_eighty_columns() {
        let fixture = Fixture::new();
        let mut font = Font::new();
        let names: Vec<String> = (0..12).map(|i| format!("verylongglyphname{i:02}")).collect();
        for name in &names {
            font.new_glyph(name.as_str());
        }
        let writer = fixture.writer(&[]);
        let text = writer.write_gdef(&font);
        let class_line = text
            .lines()
            .find(|l| l.starts_with("@GDEF_Simple"))
            .unwrap();
        // Wrapped continuations live inside the same logical line.
        assert!(text.contains("\n\t"));
        assert!(class_line.len() <= 88);
    }
}
