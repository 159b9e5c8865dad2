//! Decoder for FontForge's "UTF-7" string encoding.
//!
//! SFD files quote every human-readable string and run anything outside
//! printable ASCII through a base64 escape introduced by `+` and closed by
//! `-`, with `+-` standing for a literal plus sign. The base64 payload is a
//! sequence of big-endian UTF-16 code units, not bytes of UTF-8, and the
//! writer does not pad runs to a multiple of four characters. This is close
//! enough to RFC 2152 to share a name and far enough to need its own decoder.

/// Maps base64 alphabet bytes to their six-bit values, 255 for everything else.
const INVERSE_LOOKUP: [u8; 256] = {
    let mut table = [255u8; 256];
    let mut i = 0u8;
    while i < 26 {
        table[(b'A' + i) as usize] = i;
        table[(b'a' + i) as usize] = 26 + i;
        i += 1;
    }
    let mut i = 0u8;
    while i < 10 {
        table[(b'0' + i) as usize] = 52 + i;
        i += 1;
    }
    table[b'+' as usize] = 62;
    table[b'/' as usize] = 63;
    table[b'=' as usize] = 0;
    table
};

/// Decodes an unpadded base64 run into bytes. Trailing groups of two or
/// three characters carry one or two bytes respectively.
fn base64_decode(input: &str) -> Vec<u8> {
    let mut output = Vec::with_capacity(input.len() / 4 * 3 + 2);
    for chunk in input.as_bytes().chunks(4) {
        let mut bits = 0u32;
        let mut bad = false;
        for (i, byte) in chunk.iter().enumerate() {
            let value = INVERSE_LOOKUP[*byte as usize];
            if value == 255 {
                bad = true;
                break;
            }
            bits |= u32::from(value) << (18 - 6 * i);
        }
        if bad {
            continue;
        }
        output.push((bits >> 16) as u8);
        if chunk.len() > 2 {
            output.push((bits >> 8) as u8);
        }
        if chunk.len() > 3 {
            output.push(bits as u8);
        }
    }
    output
}

/// Decodes one SFD string, stripping the surrounding double quotes if
/// present. Invalid UTF-16 in an escape run is replaced rather than
/// rejected, matching FontForge's own tolerance.
pub(crate) fn decode_utf7(input: &str) -> String {
    let input = input.strip_prefix('"').unwrap_or(input);
    let input = input.strip_suffix('"').unwrap_or(input);
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '+' {
            output.push(c);
            continue;
        }
        if chars.peek() == Some(&'-') {
            chars.next();
            output.push('+');
            continue;
        }
        let mut run = String::new();
        for c in chars.by_ref() {
            if c == '-' {
                break;
            }
            run.push(c);
        }
        let bytes = base64_decode(&run);
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        output.push_str(&String::from_utf16_lossy(&units));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::decode_utf7;

    #[test]
    fn plain_ascii_passes_through() {
        assert_eq!(decode_utf7("\"hello world\""), "hello world");
        assert_eq!(decode_utf7("unquoted"), "unquoted");
    }

    #[test]
    fn escape_run_decodes_utf16() {
        assert_eq!(decode_utf7("\"Caf+AOk-\""), "Café");
        assert_eq!(decode_utf7("\"+AGYAaQ-\""), "fi");
    }

    #[test]
    fn plus_minus_is_a_literal_plus() {
        assert_eq!(decode_utf7("\"a+-b\""), "a+b");
        assert_eq!(decode_utf7("\"+-\""), "+");
    }

    #[test]
    fn non_bmp_characters_survive() {
        // U+1F600 as a surrogate pair: d83d de00
        assert_eq!(decode_utf7("\"+2D3eAA-\""), "\u{1f600}");
    }

    #[test]
    fn mixed_text_and_runs() {
        assert_eq!(decode_utf7("\"na+AO8-ve\""), "naïve");
    }
}
