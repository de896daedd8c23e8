//! Raw HTML tags embedded in markup
//!
//! HTML is not parsed into a tree. Each tag is recognized as a single token
//! and either passed through, filtered against an allow-list, or dropped.
//! Raw-text elements (`script`, `style`, ...) are captured together with
//! their content so dropping them removes the content too.

use super::entities::{decode_entities, encode_attribute, unmark_entities};
use super::tags::{is_safe_url, Attribute};

/// Elements whose content is never markup
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "iframe", "object", "embed", "textarea", "title"];

const VOID_ELEMENTS: &[&str] = &["area", "br", "col", "embed", "hr", "img", "input", "wbr"];

const ALLOWED_ELEMENTS: &[&str] = &[
    "a", "b", "i", "u", "s", "em", "strong", "span", "div", "p", "br", "hr", "img", "ul", "ol", "li",
    "blockquote", "code", "pre", "sub", "sup", "table", "tr", "td", "th",
];

const ALLOWED_ATTRIBUTES: &[&str] = &["href", "src", "alt", "title", "width", "height", "style", "class"];

const URL_ATTRIBUTES: &[&str] = &["href", "src"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HtmlKind {
    Open { self_closing: bool },
    Close,
    Comment,
    /// A raw-text element with its content and closing tag
    RawText,
}

/// One HTML tag token, as it appeared in the (entity-masked) source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlTag {
    pub kind: HtmlKind,
    /// Lowercased element name (empty for comments)
    pub name: String,
    pub attrs: Vec<Attribute>,
    pub source: String,
}

impl HtmlTag {
    pub fn is_void(&self) -> bool {
        VOID_ELEMENTS.contains(&self.name.as_str())
    }
}

fn is_tag_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}

/// Scans an HTML tag starting at `start` (which must be `<`).
///
/// Returns the token and the byte offset just past it, or `None` if the text
/// at `start` is not tag-like, in which case the `<` is ordinary text.
pub fn scan_tag(s: &str, start: usize) -> Option<(HtmlTag, usize)> {
    let bytes = s.as_bytes();
    if bytes.get(start) != Some(&b'<') {
        return None;
    }

    if s[start..].starts_with("<!--") {
        let end = s[start + 4..]
            .find("-->")
            .map_or(s.len(), |rel| start + 4 + rel + 3);
        let tag = HtmlTag {
            kind: HtmlKind::Comment,
            name: String::new(),
            attrs: Vec::new(),
            source: s[start..end].to_string(),
        };
        return Some((tag, end));
    }

    let mut i = start + 1;
    let closing = bytes.get(i) == Some(&b'/');
    if closing {
        i += 1;
    }
    if !bytes.get(i).is_some_and(|b| b.is_ascii_alphabetic()) {
        return None;
    }
    let name_start = i;
    while i < bytes.len() && is_tag_name_char(bytes[i]) {
        i += 1;
    }
    let name = s[name_start..i].to_ascii_lowercase();

    match bytes.get(i) {
        Some(b' ' | b'\t' | b'\n' | b'\r' | b'>' | b'/') => {}
        _ => return None,
    }

    let (attrs, self_closing, end) = scan_attributes(s, i)?;

    if closing {
        let tag = HtmlTag {
            kind: HtmlKind::Close,
            name,
            attrs: Vec::new(),
            source: s[start..end].to_string(),
        };
        return Some((tag, end));
    }

    if RAW_TEXT_ELEMENTS.contains(&name.as_str()) && !self_closing {
        let end = find_raw_text_end(s, end, &name);
        let tag = HtmlTag {
            kind: HtmlKind::RawText,
            name,
            attrs,
            source: s[start..end].to_string(),
        };
        return Some((tag, end));
    }

    let tag = HtmlTag {
        kind: HtmlKind::Open { self_closing },
        name,
        attrs,
        source: s[start..end].to_string(),
    };
    Some((tag, end))
}

/// Parses attributes up to the closing `>`, honoring quotes.
fn scan_attributes(s: &str, mut i: usize) -> Option<(Vec<Attribute>, bool, usize)> {
    let bytes = s.as_bytes();
    let mut attrs = Vec::new();
    let mut self_closing = false;

    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        match bytes.get(i)? {
            b'>' => return Some((attrs, self_closing, i + 1)),
            b'/' => {
                self_closing = true;
                i += 1;
                continue;
            }
            _ => self_closing = false,
        }

        let name_start = i;
        while i < bytes.len() && !matches!(bytes[i], b'=' | b'>' | b'/') && !bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let name = s[name_start..i].to_ascii_lowercase();
        if name.is_empty() {
            // A stray '=' with no name
            i += 1;
            continue;
        }

        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if bytes.get(i) != Some(&b'=') {
            attrs.push(Attribute::new(name, ""));
            continue;
        }
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }

        let value = match bytes.get(i)? {
            quote @ (b'"' | b'\'') => {
                let close = s[i + 1..].find(*quote as char)? + i + 1;
                let value = &s[i + 1..close];
                i = close + 1;
                value
            }
            _ => {
                let value_start = i;
                while i < bytes.len() && bytes[i] != b'>' && !bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
                &s[value_start..i]
            }
        };
        attrs.push(Attribute::new(name, value));
    }
}

fn find_raw_text_end(s: &str, from: usize, name: &str) -> usize {
    let needle = format!("</{name}");
    let found = s.as_bytes()[from..]
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle.as_bytes()));
    match found {
        Some(rel) => {
            let close_start = from + rel;
            s[close_start..].find('>').map_or(s.len(), |gt| close_start + gt + 1)
        }
        // Unterminated raw text swallows the rest of the input
        None => s.len(),
    }
}

/// Decides which HTML tags survive sanitization
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlPolicy {
    /// Pass every tag through untouched
    pub keep_all: bool,
}

impl HtmlPolicy {
    pub fn new(keep_all: bool) -> Self {
        Self { keep_all }
    }

    /// Appends the safe form of `tag` to `out`, or nothing if it is dropped.
    pub fn write(&self, tag: &HtmlTag, out: &mut String) {
        if self.keep_all {
            out.push_str(&tag.source);
            return;
        }

        match tag.kind {
            HtmlKind::Comment | HtmlKind::RawText => {}
            _ if !ALLOWED_ELEMENTS.contains(&tag.name.as_str()) => {}
            HtmlKind::Close => {
                if !tag.is_void() {
                    out.push_str("</");
                    out.push_str(&tag.name);
                    out.push('>');
                }
            }
            HtmlKind::Open { .. } => {
                out.push('<');
                out.push_str(&tag.name);
                for attr in tag.attrs.iter().filter(|a| is_allowed_attribute(a)) {
                    out.push(' ');
                    out.push_str(&attr.name);
                    out.push_str("=\"");
                    encode_attribute(&attr.value, out);
                    out.push('"');
                }
                out.push('>');
            }
        }
    }
}

fn is_allowed_attribute(attr: &Attribute) -> bool {
    let name = attr.name.as_str();
    if !ALLOWED_ATTRIBUTES.contains(&name) {
        return false;
    }
    if URL_ATTRIBUTES.contains(&name) {
        return is_safe_url(&attr.value);
    }
    if name == "style" {
        let decoded = decode_entities(&unmark_entities(&attr.value)).to_ascii_lowercase();
        return !["expression", "javascript:", "url(", "@import", "behavior"]
            .iter()
            .any(|needle| decoded.contains(needle));
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filtered(source: &str) -> String {
        let (tag, end) = scan_tag(source, 0).expect("tag");
        assert_eq!(end, source.len());
        let mut out = String::new();
        HtmlPolicy::default().write(&tag, &mut out);
        out
    }

    #[test]
    fn test_scan_open_tag_with_attributes() {
        let (tag, end) = scan_tag("<a href='x' title=\"y z\" hidden>rest", 0).unwrap();
        assert_eq!(tag.kind, HtmlKind::Open { self_closing: false });
        assert_eq!(tag.name, "a");
        assert_eq!(
            tag.attrs,
            vec![
                Attribute::new("href", "x"),
                Attribute::new("title", "y z"),
                Attribute::new("hidden", ""),
            ]
        );
        assert_eq!(end, 31);
    }

    #[test]
    fn test_not_a_tag() {
        assert!(scan_tag("< b>", 0).is_none());
        assert!(scan_tag("<3 you", 0).is_none());
        assert!(scan_tag("<b", 0).is_none());
        assert!(scan_tag("<https://x>", 0).is_none());
    }

    #[test]
    fn test_raw_text_captures_content() {
        let source = "<script>alert('</b>')</SCRIPT>after";
        let (tag, end) = scan_tag(source, 0).unwrap();
        assert_eq!(tag.kind, HtmlKind::RawText);
        assert_eq!(&source[end..], "after");
    }

    #[test]
    fn test_policy_filters() {
        assert_eq!(filtered("<b onclick=\"steal()\">"), "<b>");
        assert_eq!(filtered("<a href=\"javascript:x\" title=t>"), "<a title=\"t\">");
        assert_eq!(filtered("<img src=\"/a.png\" />"), "<img src=\"/a.png\">");
        assert_eq!(filtered("<br/>"), "<br>");
        assert_eq!(filtered("</br>"), "");
        assert_eq!(filtered("<script>x</script>"), "");
        assert_eq!(filtered("<blink>"), "");
        assert_eq!(filtered("<!-- note -->"), "");
        assert_eq!(filtered("<span style=\"background:url(x)\">"), "<span>");
    }

    #[test]
    fn test_keep_all_passes_source() {
        let (tag, _) = scan_tag("<script>x</script>", 0).unwrap();
        let mut out = String::new();
        HtmlPolicy::new(true).write(&tag, &mut out);
        assert_eq!(out, "<script>x</script>");
    }
}
