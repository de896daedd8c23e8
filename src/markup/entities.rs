//! HTML entity masking
//!
//! Before markup is tokenized, every real HTML entity in the input is
//! "marked" by prefixing its `&` with a backslash. Marked ampersands are
//! literal text the author typed; unmarked ampersands produced later in the
//! pipeline are free to be encoded. Existing backslashes are doubled first so
//! that `unmark_entities` can always tell a marker from author text.

/// Escape marker placed in front of protected characters.
pub const MARKER: char = '\\';

const MAX_NAME_LEN: usize = 32;
const MAX_HEX_DIGITS: usize = 6; // 0x10FFFF
const MAX_DEC_DIGITS: usize = 7; // 1114111

#[derive(Clone, Copy)]
enum EntityKind {
    Named,
    Decimal,
    Hex,
}

/// Doubles every escape marker, then prefixes every `&` that starts an HTML
/// entity with the marker.
///
/// Not idempotent: calling it twice doubles the markers again.
pub fn mark_entities(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + input.len() / 8);

    for (i, ch) in input.char_indices() {
        match ch {
            MARKER => {
                out.push(MARKER);
                out.push(MARKER);
            }
            '&' if entity_len(&input[i..]).is_some() => {
                out.push(MARKER);
                out.push('&');
            }
            _ => out.push(ch),
        }
    }

    out
}

/// Inverse of [`mark_entities`].
///
/// Each marker is dropped and the character after it is copied literally, so
/// `\\` collapses to `\` and `\&` to `&`. A marker with nothing after it is
/// kept as-is.
pub fn unmark_entities(marked: &str) -> String {
    let mut out = String::with_capacity(marked.len());
    let mut chars = marked.chars();

    while let Some(ch) = chars.next() {
        if ch != MARKER {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some(next) => out.push(next),
            None => out.push(MARKER),
        }
    }

    out
}

/// Length in bytes of the entity at the start of `s`, if `s` starts with one.
///
/// Accepts `&name;`, `&#123;` and `&#x1F;`. Unterminated or overlong
/// sequences are not entities.
pub fn entity_len(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    if bytes.first() != Some(&b'&') {
        return None;
    }

    let kind = match (bytes.get(1), bytes.get(2)) {
        (Some(b'#'), Some(b'x' | b'X')) => EntityKind::Hex,
        (Some(b'#'), _) => EntityKind::Decimal,
        (Some(b), _) if b.is_ascii_alphabetic() => EntityKind::Named,
        _ => return None,
    };
    let (start, max) = match kind {
        EntityKind::Hex => (3, MAX_HEX_DIGITS),
        EntityKind::Decimal => (2, MAX_DEC_DIGITS),
        EntityKind::Named => (1, MAX_NAME_LEN),
    };

    let mut j = start;
    while j < bytes.len() {
        let b = bytes[j];
        if b == b';' {
            return (j > start).then_some(j + 1);
        }
        let ok = match kind {
            EntityKind::Hex => b.is_ascii_hexdigit(),
            EntityKind::Decimal => b.is_ascii_digit(),
            EntityKind::Named => b.is_ascii_alphanumeric(),
        };
        if j - start == max || !ok {
            return None;
        }
        j += 1;
    }

    None
}

/// Replaces angle brackets in marked text with marked entities, so no HTML
/// tag survives tokenization and the generated entities are never re-encoded.
pub fn escape_angle_brackets(marked: &str) -> String {
    let mut out = String::with_capacity(marked.len());
    for ch in marked.chars() {
        match ch {
            '<' => out.push_str("\\&lt;"),
            '>' => out.push_str("\\&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Encodes bare `&`, `<` and `>` in marked text. Marked pairs are copied
/// unchanged so protected entities are not encoded twice.
pub fn encode_text(marked: &str, out: &mut String) {
    encode(marked, out, false);
}

/// Like [`encode_text`], also encoding `"` for use inside a quoted attribute.
pub fn encode_attribute(marked: &str, out: &mut String) {
    encode(marked, out, true);
}

fn encode(marked: &str, out: &mut String, quotes: bool) {
    let mut chars = marked.chars();
    while let Some(ch) = chars.next() {
        match ch {
            MARKER => {
                out.push(MARKER);
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if quotes => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

/// Decodes a small, fixed set of entities for plain-text display.
///
/// Named: `amp lt gt quot apos nbsp`. Numeric entities decode only when they
/// are valid Unicode scalar values. Anything else is left unchanged.
pub fn decode_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        match entity_len(tail).and_then(|len| decode_one(&tail[..len]).map(|ch| (len, ch))) {
            Some((len, ch)) => {
                out.push(ch);
                rest = &tail[len..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);

    out
}

fn decode_one(entity: &str) -> Option<char> {
    let body = &entity[1..entity.len() - 1];
    if let Some(num) = body.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        return char::from_u32(code);
    }
    match body {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_protects_entities_only() {
        assert_eq!(mark_entities("AT&T &amp; co"), "AT&T \\&amp; co");
        assert_eq!(mark_entities("&#39;&#x27;"), "\\&#39;\\&#x27;");
        assert_eq!(mark_entities("a\\b"), "a\\\\b");
        assert_eq!(mark_entities("&;"), "&;");
        assert_eq!(mark_entities("&#;"), "&#;");
    }

    #[test]
    fn test_round_trip() {
        let samples = [
            "",
            "plain",
            "\\",
            "ends with marker\\",
            "\\\\&amp;\\&",
            "[b]&lt;tag&gt;[/b] & friends",
            "&#1114111; &#11141110; &verylongentitynamethatgoesonandonandon;",
            "unicode ✓ &check; \\✓",
        ];
        for s in samples {
            assert_eq!(unmark_entities(&mark_entities(s)), s, "round trip of {s:?}");
        }
    }

    #[test]
    fn test_unmark_lone_trailing_marker() {
        assert_eq!(unmark_entities("abc\\"), "abc\\");
        assert_eq!(unmark_entities("\\\\\\&x"), "\\&x");
    }

    #[test]
    fn test_marking_twice_doubles_markers() {
        let once = mark_entities("\\&amp;");
        let twice = mark_entities(&once);
        assert_ne!(once, twice);
        assert_eq!(unmark_entities(&unmark_entities(&twice)), "\\&amp;");
    }

    #[test]
    fn test_entity_len() {
        assert_eq!(entity_len("&amp;rest"), Some(5));
        assert_eq!(entity_len("&#x1F4A9;"), Some(9));
        assert_eq!(entity_len("&#12;"), Some(5));
        assert_eq!(entity_len("&#xZZ;"), None);
        assert_eq!(entity_len("& amp;"), None);
        assert_eq!(entity_len("&amp"), None);
        assert_eq!(entity_len("&#12345678;"), None);
    }

    #[test]
    fn test_encode_text_skips_marked_entities() {
        let mut out = String::new();
        encode_text(&mark_entities("a & b &lt; <c>"), &mut out);
        assert_eq!(unmark_entities(&out), "a &amp; b &lt; &lt;c&gt;");
    }

    #[test]
    fn test_escape_angle_brackets_is_not_reencoded() {
        let escaped = escape_angle_brackets(&mark_entities("<b>"));
        let mut out = String::new();
        encode_text(&escaped, &mut out);
        assert_eq!(unmark_entities(&out), "&lt;b&gt;");
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("&lt;b&gt; &amp;amp; &#65;&#x42;"), "<b> &amp; AB");
        assert_eq!(decode_entities("&unknown; & &#xD800;"), "&unknown; & &#xD800;");
    }
}
