//! Registry of recognized bracket tags
//!
//! Every supported tag is one variant of [`BbTag`]. Name lookup, block-ness
//! and attribute rules all come from the single [`TAGS`] table, and rendering
//! matches exhaustively on the enum, so adding a tag is a compile-checked
//! change.

use regex::Regex;
use std::sync::OnceLock;

use super::entities::{decode_entities, unmark_entities};

/// A recognized bracket tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BbTag {
    Bold,
    Italic,
    Underline,
    Strike,
    Color,
    Background,
    Size,
    Font,
    Left,
    Center,
    Right,
    Justify,
    Div,
    Url,
    Alt,
    Img,
    Spoiler,
    Raw,
}

/// How a tag treats its `=value` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueRule {
    /// `[tag=...]` is not accepted
    Forbidden,
    /// `[tag]` and `[tag=...]` are both accepted
    Optional,
    /// `[tag]` alone is not a tag
    Required,
}

/// Static description of a tag
#[derive(Debug, Clone, Copy)]
pub struct TagSpec {
    pub tag: BbTag,
    pub name: &'static str,
    pub block: bool,
    pub value: ValueRule,
    /// Names accepted in `name=value` form
    pub named: &'static [&'static str],
}

pub const TAGS: &[TagSpec] = &[
    TagSpec { tag: BbTag::Bold, name: "b", block: false, value: ValueRule::Forbidden, named: &[] },
    TagSpec { tag: BbTag::Italic, name: "i", block: false, value: ValueRule::Forbidden, named: &[] },
    TagSpec { tag: BbTag::Underline, name: "u", block: false, value: ValueRule::Forbidden, named: &[] },
    TagSpec { tag: BbTag::Strike, name: "s", block: false, value: ValueRule::Forbidden, named: &[] },
    TagSpec { tag: BbTag::Color, name: "color", block: false, value: ValueRule::Required, named: &[] },
    TagSpec { tag: BbTag::Background, name: "background", block: false, value: ValueRule::Required, named: &[] },
    TagSpec { tag: BbTag::Size, name: "size", block: false, value: ValueRule::Required, named: &[] },
    TagSpec { tag: BbTag::Font, name: "font", block: false, value: ValueRule::Required, named: &[] },
    TagSpec { tag: BbTag::Left, name: "left", block: true, value: ValueRule::Forbidden, named: &[] },
    TagSpec { tag: BbTag::Center, name: "center", block: true, value: ValueRule::Forbidden, named: &[] },
    TagSpec { tag: BbTag::Right, name: "right", block: true, value: ValueRule::Forbidden, named: &[] },
    TagSpec { tag: BbTag::Justify, name: "justify", block: true, value: ValueRule::Forbidden, named: &[] },
    TagSpec { tag: BbTag::Div, name: "div", block: true, value: ValueRule::Forbidden, named: &[] },
    TagSpec { tag: BbTag::Url, name: "url", block: false, value: ValueRule::Optional, named: &[] },
    TagSpec { tag: BbTag::Alt, name: "alt", block: false, value: ValueRule::Required, named: &[] },
    TagSpec { tag: BbTag::Img, name: "img", block: false, value: ValueRule::Forbidden, named: &["width", "height"] },
    TagSpec { tag: BbTag::Spoiler, name: "spoiler", block: true, value: ValueRule::Forbidden, named: &["open", "close"] },
    TagSpec { tag: BbTag::Raw, name: "raw", block: false, value: ValueRule::Forbidden, named: &[] },
];

/// One attribute of a tag. The `=value` form has an empty name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    /// Entity-masked value
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Whether this is the `[tag=value]` attribute
    pub fn is_value(&self) -> bool {
        self.name.is_empty()
    }
}

/// The `=value` attribute, if present
pub fn value_of(attrs: &[Attribute]) -> Option<&str> {
    attrs.iter().find(|a| a.is_value()).map(|a| a.value.as_str())
}

/// A named attribute, if present
pub fn named<'a>(attrs: &'a [Attribute], name: &str) -> Option<&'a str> {
    attrs.iter().find(|a| a.name == name).map(|a| a.value.as_str())
}

impl BbTag {
    /// Case-insensitive lookup in the registry
    pub fn from_name(name: &str) -> Option<Self> {
        TAGS.iter()
            .find(|spec| spec.name.eq_ignore_ascii_case(name))
            .map(|spec| spec.tag)
    }

    pub fn spec(self) -> &'static TagSpec {
        // The table has exactly one row per variant, in declaration order.
        &TAGS[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }

    /// Block tags occupy their own layout block and get line-break trimming
    pub fn is_block(self) -> bool {
        self.spec().block
    }

    /// Checks the attribute list of an opening tag
    pub fn accepts(self, attrs: &[Attribute]) -> bool {
        let spec = self.spec();
        let mut has_value = false;

        for attr in attrs {
            if attr.is_value() {
                if spec.value == ValueRule::Forbidden || has_value {
                    return false;
                }
                has_value = true;
            } else if !spec.named.contains(&attr.name.as_str()) {
                return false;
            }
        }

        if spec.value == ValueRule::Required && !has_value {
            return false;
        }

        match self {
            BbTag::Color | BbTag::Background => value_of(attrs).is_some_and(is_valid_color),
            BbTag::Size => value_of(attrs).is_some_and(|v| parse_size(v).is_some()),
            BbTag::Font => value_of(attrs).is_some_and(is_valid_font),
            BbTag::Url => value_of(attrs).map_or(true, is_safe_url),
            BbTag::Alt => value_of(attrs).is_some_and(|v| !v.trim().is_empty()),
            BbTag::Img => ["width", "height"]
                .iter()
                .all(|name| named(attrs, name).map_or(true, |v| parse_dimension(v).is_some())),
            BbTag::Bold
            | BbTag::Italic
            | BbTag::Underline
            | BbTag::Strike
            | BbTag::Left
            | BbTag::Center
            | BbTag::Right
            | BbTag::Justify
            | BbTag::Div
            | BbTag::Spoiler
            | BbTag::Raw => true,
        }
    }

    /// Some tags use their text content as a URL and reject anything else
    pub fn accepts_content(self, attrs: &[Attribute], content: Option<&str>) -> bool {
        match self {
            BbTag::Img => content.is_some_and(is_safe_url),
            BbTag::Url if value_of(attrs).is_none() => content.is_some_and(is_safe_url),
            _ => true,
        }
    }
}

fn color_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:#[0-9a-fA-F]{3}|#[0-9a-fA-F]{6}|[a-zA-Z]{1,24})$").expect("valid color regex")
    })
}

fn font_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z0-9 ,'\-]{1,64}$").expect("valid font regex"))
}

pub fn is_valid_color(value: &str) -> bool {
    color_regex().is_match(value.trim())
}

pub fn is_valid_font(value: &str) -> bool {
    font_regex().is_match(value.trim())
}

/// Font size in pixels, 1 to 200
pub fn parse_size(value: &str) -> Option<u16> {
    value.trim().parse::<u16>().ok().filter(|n| (1..=200).contains(n))
}

/// Image dimension in pixels, 1 to 4096
pub fn parse_dimension(value: &str) -> Option<u16> {
    value.trim().parse::<u16>().ok().filter(|n| (1..=4096).contains(n))
}

/// Accepts http(s), mailto, protocol-relative and relative URLs.
///
/// `value` is entity-masked; it is unmarked and entity-decoded before the
/// scheme check so encoded schemes such as `&#106;avascript:` are caught.
pub fn is_safe_url(value: &str) -> bool {
    let decoded = decode_entities(&unmark_entities(value));
    let cleaned: String = decoded
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect();
    if cleaned.is_empty() {
        return false;
    }

    let lower = cleaned.to_ascii_lowercase();
    match lower.find(':') {
        None => true,
        Some(colon) => {
            // A colon after the first '/', '?' or '#' is not a scheme separator
            if lower[..colon].contains(['/', '?', '#']) {
                return true;
            }
            matches!(&lower[..colon], "http" | "https" | "mailto")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_matches_enum_order() {
        for (index, spec) in TAGS.iter().enumerate() {
            assert_eq!(spec.tag as usize, index, "row for {}", spec.name);
            assert_eq!(BbTag::from_name(spec.name), Some(spec.tag));
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(BbTag::from_name("CENTER"), Some(BbTag::Center));
        assert_eq!(BbTag::from_name("foo"), None);
    }

    #[test]
    fn test_attribute_rules() {
        assert!(BbTag::Bold.accepts(&[]));
        assert!(!BbTag::Bold.accepts(&[Attribute::new("", "x")]));
        assert!(!BbTag::Color.accepts(&[]));
        assert!(BbTag::Color.accepts(&[Attribute::new("", "#ff0000")]));
        assert!(!BbTag::Color.accepts(&[Attribute::new("", "red;position:fixed")]));
        assert!(BbTag::Size.accepts(&[Attribute::new("", "14")]));
        assert!(!BbTag::Size.accepts(&[Attribute::new("", "999")]));
        assert!(BbTag::Img.accepts(&[Attribute::new("width", "640")]));
        assert!(!BbTag::Img.accepts(&[Attribute::new("onload", "x")]));
        assert!(BbTag::Spoiler.accepts(&[Attribute::new("open", "Show"), Attribute::new("close", "Hide")]));
    }

    #[test]
    fn test_safe_urls() {
        assert!(is_safe_url("https://example.com/a?b=1"));
        assert!(is_safe_url("/relative/path"));
        assert!(is_safe_url("//cdn.example.com/x.png"));
        assert!(is_safe_url("page?x=a:b"));
        assert!(!is_safe_url("javascript:alert(1)"));
        assert!(!is_safe_url(" JaVaScRiPt:alert(1)"));
        assert!(!is_safe_url("\\&#106;avascript:alert(1)"));
        assert!(!is_safe_url("data:text/html,hi"));
        assert!(!is_safe_url(""));
    }

    #[test]
    fn test_content_rules() {
        assert!(BbTag::Img.accepts_content(&[], Some("https://x.test/a.png")));
        assert!(!BbTag::Img.accepts_content(&[], None));
        assert!(!BbTag::Url.accepts_content(&[], Some("javascript:void(0)")));
        assert!(BbTag::Url.accepts_content(&[Attribute::new("", "https://x.test")], None));
    }
}
