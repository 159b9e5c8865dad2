//! Small decoding helpers shared across the SFD reader.

use smol_str::SmolStr;

use crate::anchor::AnchorKind;
use crate::error::SfdError;

/// Splits a TTF-style version string (`Version 1.002;core 1.0.0` and
/// friends) into numeric major and minor parts. Anything that is not two
/// dot-separated runs of digits yields `(None, None)`.
pub(crate) fn parse_version(version: &str) -> (Option<i32>, Option<i32>) {
    let head = match version.split_once(';') {
        Some((head, _)) => head,
        None => version,
    };
    let head = head.strip_prefix("Version ").unwrap_or(head);
    let number = |s: &str| -> Option<i32> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        s.parse().ok()
    };
    if let Some((major, minor)) = head.split_once('.') {
        if !minor.contains('.') {
            if let (Some(major), Some(minor)) = (number(major), number(minor)) {
                return (Some(major), Some(minor));
            }
        }
    }
    (None, None)
}

/// Parses an `AltUni2` record: whitespace-separated `codepoint.selector.fid`
/// hex triples. Plain alternates (selector `ffffffff`) become extra
/// codepoints; entries carrying a real variation selector are skipped or
/// fatal depending on `ignore_uvs`.
pub(crate) fn parse_altuni(
    glyph: &SmolStr,
    value: &str,
    ignore_uvs: bool,
) -> Result<Vec<u32>, SfdError> {
    let malformed = || SfdError::MalformedRecord {
        key: "AltUni2".to_string(),
        text: value.to_string(),
    };
    let mut unicodes = Vec::new();
    for triple in value.split_whitespace() {
        let parts = triple
            .split('.')
            .map(|part| u32::from_str_radix(part, 16))
            .collect::<Result<Vec<u32>, _>>()
            .map_err(|_| malformed())?;
        if parts.len() != 3 {
            return Err(malformed());
        }
        if parts[1] != 0xffff_ffff {
            if !ignore_uvs {
                return Err(SfdError::VariationSelector {
                    glyph: glyph.clone(),
                    selector: parts[1],
                });
            }
            continue;
        }
        unicodes.push(parts[0]);
    }
    Ok(unicodes)
}

/// Mangles an anchor class name the way UFO sources spell attachment
/// semantics: mark anchors gain an underscore prefix, ligature anchors a
/// component index, cursive anchors an entry or exit suffix.
pub(crate) fn ufo_anchor_name(name: &str, kind: AnchorKind, index: u32) -> String {
    match kind {
        AnchorKind::Mark => format!("_{name}"),
        AnchorKind::Ligature => format!("{name}_{index}"),
        AnchorKind::Entry => format!("{name}_entry"),
        AnchorKind::Exit => format!("{name}_exit"),
        AnchorKind::BaseChar | AnchorKind::BaseMark => name.to_string(),
    }
}

/// Decodes the backslash escapes FontForge applies to the `Copyright`
/// record. Unknown escapes are preserved as written.
pub(crate) fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('x') => {
                let mut value = 0;
                let mut digits = 0;
                while digits < 2 {
                    match chars.peek().and_then(|c| c.to_digit(16)) {
                        Some(d) => {
                            value = value * 16 + d;
                            chars.next();
                            digits += 1;
                        }
                        None => break,
                    }
                }
                match char::from_u32(value) {
                    Some(c) if digits > 0 => out.push(c),
                    _ => out.push_str("\\x"),
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Formats a coordinate the way C's `%g` prints the values SFD files hold:
/// integral values drop the decimal point.
pub(crate) fn format_g(value: f64) -> String {
    if value == value.trunc() && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use smol_str::SmolStr;

    use super::*;
    use crate::error::SfdError;

    #[rstest]
    #[case("Version 1.002;core 1.0.0", Some(1), Some(2))]
    #[case("1.0", Some(1), Some(0))]
    #[case("2.013", Some(2), Some(13))]
    #[case("1.0alpha", None, None)]
    #[case("2", None, None)]
    #[case("1.2.3", None, None)]
    fn version_strings(
        #[case] text: &str,
        #[case] major: Option<i32>,
        #[case] minor: Option<i32>,
    ) {
        assert_eq!(parse_version(text), (major, minor));
    }

    #[test]
    fn altuni_plain_alternates() {
        let glyph = SmolStr::new("f_i");
        let unicodes = parse_altuni(&glyph, "0066.ffffffff.0 fb01.ffffffff.0", false);
        assert_eq!(unicodes.unwrap(), vec![0x66, 0xfb01]);
    }

    #[test]
    fn altuni_selector_fatal_unless_ignored() {
        let glyph = SmolStr::new("one.alt");
        let err = parse_altuni(&glyph, "0031.fe00.0", false).unwrap_err();
        assert!(matches!(
            err,
            SfdError::VariationSelector { selector: 0xfe00, .. }
        ));
        assert_eq!(parse_altuni(&glyph, "0031.fe00.0", true).unwrap(), vec![]);
    }

    #[test]
    fn altuni_truncated_triple() {
        let glyph = SmolStr::new("a");
        assert!(matches!(
            parse_altuni(&glyph, "0061.ffffffff.0 0062.ffffffff", false),
            Err(SfdError::MalformedRecord { .. })
        ));
    }

    #[rstest]
    #[case("top", AnchorKind::Mark, 0, "_top")]
    #[case("top", AnchorKind::BaseChar, 0, "top")]
    #[case("top", AnchorKind::BaseMark, 0, "top")]
    #[case("top", AnchorKind::Ligature, 2, "top_2")]
    #[case("curs", AnchorKind::Entry, 0, "curs_entry")]
    #[case("curs", AnchorKind::Exit, 0, "curs_exit")]
    fn anchor_names(
        #[case] name: &str,
        #[case] kind: AnchorKind,
        #[case] index: u32,
        #[case] expected: &str,
    ) {
        assert_eq!(ufo_anchor_name(name, kind, index), expected);
    }

    #[test]
    fn unescape_common_sequences() {
        assert_eq!(unescape("line one\\nline two"), "line one\nline two");
        assert_eq!(unescape("say \\\"hi\\\""), "say \"hi\"");
        assert_eq!(unescape("\\x41\\x42"), "AB");
        assert_eq!(unescape("50\\% off"), "50\\% off");
    }

    #[test]
    fn g_formatting() {
        assert_eq!(format_g(100.0), "100");
        assert_eq!(format_g(-12.5), "-12.5");
        assert_eq!(format_g(0.0), "0");
    }
}
