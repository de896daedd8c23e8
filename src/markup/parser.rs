//! Bracket-tag tokenizer and tree builder
//!
//! The scanner walks entity-masked input once. Plain text accumulates until a
//! `[` or `<` starts something recognizable; recognized tags are handed to a
//! [`TreeBuilder`] that keeps a stack of open tags. Anything that cannot be
//! matched (unknown names, stray closers, tags still open at the end) is put
//! back as the literal text it came from.

use tracing::debug;

use super::html::{self, HtmlTag};
use super::tags::{Attribute, BbTag};
use super::ParseOptions;

/// A node of the parsed tree. Text is still entity-masked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text(String),
    Tag(TagNode),
    Html(HtmlTag),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagNode {
    pub tag: BbTag,
    pub attrs: Vec<Attribute>,
    pub children: Vec<Node>,
}

impl TagNode {
    pub fn name(&self) -> &'static str {
        self.tag.name()
    }

    /// The only child, if it is text
    pub fn text_content(&self) -> Option<&str> {
        single_text(&self.children)
    }
}

/// Parse result: the top-level nodes plus the options that produced them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub nodes: Vec<Node>,
    pub(super) options: ParseOptions,
}

impl Document {
    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

fn single_text(children: &[Node]) -> Option<&str> {
    match children {
        [Node::Text(text)] => Some(text),
        _ => None,
    }
}

fn push_text(children: &mut Vec<Node>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Node::Text(last)) = children.last_mut() {
        last.push_str(text);
    } else {
        children.push(Node::Text(text.to_string()));
    }
}

fn push_node(children: &mut Vec<Node>, node: Node) {
    match node {
        Node::Text(text) => push_text(children, &text),
        other => children.push(other),
    }
}

fn is_line_break(c: char) -> bool {
    c == '\n' || c == '\r'
}

fn strip_one_line_break(text: &str) -> &str {
    text.strip_prefix("\r\n")
        .or_else(|| text.strip_prefix('\n'))
        .unwrap_or(text)
}

/// Removes the line-break runs at both boundaries of a block's children.
fn trim_block_children(children: &mut Vec<Node>) {
    if let Some(Node::Text(first)) = children.first_mut() {
        *first = first.trim_start_matches(is_line_break).to_string();
        if first.is_empty() {
            children.remove(0);
        }
    }
    if let Some(Node::Text(last)) = children.last_mut() {
        last.truncate(last.trim_end_matches(is_line_break).len());
        if last.is_empty() {
            children.pop();
        }
    }
}

struct Frame {
    tag: BbTag,
    attrs: Vec<Attribute>,
    open_source: String,
    children: Vec<Node>,
}

/// Builds the node tree from tokens, unwinding unmatched tags into text.
struct TreeBuilder<'o> {
    options: &'o ParseOptions,
    root: Vec<Node>,
    stack: Vec<Frame>,
    after_block: bool,
}

impl<'o> TreeBuilder<'o> {
    fn new(options: &'o ParseOptions) -> Self {
        Self {
            options,
            root: Vec::new(),
            stack: Vec::new(),
            after_block: false,
        }
    }

    fn children_mut(&mut self) -> &mut Vec<Node> {
        match self.stack.last_mut() {
            Some(frame) => &mut frame.children,
            None => &mut self.root,
        }
    }

    fn text(&mut self, mut text: &str) {
        if std::mem::take(&mut self.after_block) && self.options.trim_block_whitespace {
            text = strip_one_line_break(text);
        }
        push_text(self.children_mut(), text);
    }

    fn literal(&mut self, source: &str) {
        self.after_block = false;
        push_text(self.children_mut(), source);
    }

    /// Pushes an opening tag; returns false when the nesting limit is hit.
    fn open(&mut self, tag: BbTag, attrs: Vec<Attribute>, source: &str) -> bool {
        self.after_block = false;
        if self.stack.len() >= self.options.max_depth {
            debug!(tag = tag.name(), depth = self.stack.len(), "nesting limit reached, tag kept as text");
            return false;
        }
        self.stack.push(Frame {
            tag,
            attrs,
            open_source: source.to_string(),
            children: Vec::new(),
        });
        true
    }

    fn close(&mut self, tag: BbTag, source: &str) {
        let Some(pos) = self.stack.iter().rposition(|frame| frame.tag == tag) else {
            self.literal(source);
            return;
        };

        while self.stack.len() > pos + 1 {
            if let Some(frame) = self.stack.pop() {
                self.unwind(frame);
            }
        }
        let Some(frame) = self.stack.pop() else {
            return;
        };

        if !tag.accepts_content(&frame.attrs, single_text(&frame.children)) {
            self.unwind(frame);
            self.literal(source);
            return;
        }

        if self.options.strip_bb_tags {
            self.after_block = false;
            let parent = self.children_mut();
            for child in frame.children {
                push_node(parent, child);
            }
            return;
        }

        let mut node = TagNode {
            tag,
            attrs: frame.attrs,
            children: frame.children,
        };
        let block = tag.is_block();
        if block && self.options.trim_block_whitespace {
            trim_block_children(&mut node.children);
        }
        self.children_mut().push(Node::Tag(node));
        self.after_block = block;
    }

    /// A `[raw]` block whose content was captured verbatim
    fn raw(&mut self, attrs: Vec<Attribute>, content: &str) {
        self.after_block = false;
        let mut children = Vec::new();
        push_text(&mut children, content);
        self.children_mut().push(Node::Tag(TagNode {
            tag: BbTag::Raw,
            attrs,
            children,
        }));
    }

    fn html(&mut self, tag: HtmlTag) {
        self.after_block = false;
        self.children_mut().push(Node::Html(tag));
    }

    /// Puts an unmatched frame back as its opening text followed by its children.
    fn unwind(&mut self, frame: Frame) {
        debug!(tag = frame.tag.name(), "unclosed tag kept as text");
        let parent = self.children_mut();
        push_text(parent, &frame.open_source);
        for child in frame.children {
            push_node(parent, child);
        }
    }

    fn finish(mut self) -> Vec<Node> {
        while let Some(frame) = self.stack.pop() {
            self.unwind(frame);
        }
        self.root
    }
}

/// Scans `[name ...]` at `start`. Returns the tag, its attributes and the
/// offset after `]`.
fn scan_open(s: &str, start: usize) -> Option<(BbTag, Vec<Attribute>, usize)> {
    let bytes = s.as_bytes();
    let mut i = start + 1;
    while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
        i += 1;
    }
    let tag = BbTag::from_name(&s[start + 1..i])?;
    let mut attrs = Vec::new();

    match bytes.get(i)? {
        b']' => return Some((tag, attrs, i + 1)),
        b'=' => {
            i += 1;
            let (value, next) = scan_value(s, i, true)?;
            attrs.push(Attribute::new("", value));
            i = next;
        }
        b if b.is_ascii_whitespace() => {}
        _ => return None,
    }

    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if *bytes.get(i)? == b']' {
            return Some((tag, attrs, i + 1));
        }
        let name_start = i;
        while i < bytes.len() && (bytes[i].is_ascii_alphabetic() || bytes[i] == b'-') {
            i += 1;
        }
        if i == name_start || bytes.get(i) != Some(&b'=') {
            return None;
        }
        let name = s[name_start..i].to_ascii_lowercase();
        let (value, next) = scan_value(s, i + 1, false)?;
        attrs.push(Attribute::new(name, value));
        i = next;
    }
}

/// Scans an attribute value. Quoted values end at the next `"`; unquoted
/// `=value` attributes run to `]`, unquoted named ones to whitespace or `]`.
fn scan_value(s: &str, start: usize, default: bool) -> Option<(String, usize)> {
    let bytes = s.as_bytes();
    if bytes.get(start) == Some(&b'"') {
        let close = s[start + 1..].find('"')? + start + 1;
        return Some((s[start + 1..close].to_string(), close + 1));
    }

    let mut i = start;
    while i < bytes.len() && bytes[i] != b']' && (default || !bytes[i].is_ascii_whitespace()) {
        i += 1;
    }
    if i >= bytes.len() {
        return None;
    }
    Some((s[start..i].to_string(), i))
}

/// Scans `[/name]` at `start`.
fn scan_close(s: &str, start: usize) -> Option<(BbTag, usize)> {
    let bytes = s.as_bytes();
    if bytes.get(start + 1) != Some(&b'/') {
        return None;
    }
    let mut i = start + 2;
    while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
        i += 1;
    }
    let tag = BbTag::from_name(&s[start + 2..i])?;
    (bytes.get(i) == Some(&b']')).then_some((tag, i + 1))
}

const RAW_CLOSE: &[u8] = b"[/raw]";

/// Finds the `[/raw]` closing a raw block, case-insensitively.
///
/// Remembers the earliest offset from which a search already failed, so
/// unclosed openers never rescan the same tail.
#[derive(Debug, Default)]
struct RawCloseFinder {
    no_close_from: Option<usize>,
}

impl RawCloseFinder {
    /// Returns the start and end of the closer found at or after `from`.
    fn find(&mut self, s: &str, from: usize) -> Option<(usize, usize)> {
        if self.no_close_from.is_some_and(|known| from >= known) {
            return None;
        }
        let found = s.as_bytes()[from..]
            .windows(RAW_CLOSE.len())
            .position(|window| window.eq_ignore_ascii_case(RAW_CLOSE));
        match found {
            Some(rel) => Some((from + rel, from + rel + RAW_CLOSE.len())),
            None => {
                self.no_close_from = Some(from);
                None
            }
        }
    }
}

/// Tokenizes entity-masked input into a [`Document`].
pub fn parse_marked(marked: &str, options: &ParseOptions) -> Document {
    let bytes = marked.as_bytes();
    let mut builder = TreeBuilder::new(options);
    let mut raw_close = RawCloseFinder::default();
    let mut text_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            // Marker pairs are always text
            b'\\' => {
                i = (i + 2).min(bytes.len());
                continue;
            }
            b'[' => {
                if let Some((tag, end)) = scan_close(marked, i) {
                    builder.text(&marked[text_start..i]);
                    builder.close(tag, &marked[i..end]);
                    i = end;
                    text_start = end;
                    continue;
                }
                if let Some((tag, attrs, end)) = scan_open(marked, i) {
                    if tag.accepts(&attrs) {
                        if tag == BbTag::Raw {
                            if let Some((content_end, close_end)) = raw_close.find(marked, end) {
                                // Raw blocks survive stripping so their content stays literal
                                builder.text(&marked[text_start..i]);
                                builder.raw(attrs, &marked[end..content_end]);
                                i = close_end;
                                text_start = close_end;
                                continue;
                            }
                        } else {
                            builder.text(&marked[text_start..i]);
                            if builder.open(tag, attrs, &marked[i..end]) {
                                i = end;
                                text_start = end;
                                continue;
                            }
                            // Over the nesting limit: the bracket text stays in the run
                            text_start = i;
                        }
                    }
                }
                i += 1;
            }
            b'<' => {
                if let Some((tag, end)) = html::scan_tag(marked, i) {
                    builder.text(&marked[text_start..i]);
                    builder.html(tag);
                    i = end;
                    text_start = end;
                    continue;
                }
                i += 1;
            }
            _ => i += 1,
        }
    }
    builder.text(&marked[text_start..]);

    Document {
        nodes: builder.finish(),
        options: options.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::parse;

    fn text(s: &str) -> Node {
        Node::Text(s.to_string())
    }

    fn tag(tag: BbTag, children: Vec<Node>) -> Node {
        Node::Tag(TagNode {
            tag,
            attrs: Vec::new(),
            children,
        })
    }

    #[test]
    fn test_nested_tags() {
        let doc = parse("a[b]b[i]c[/i][/b]d", &ParseOptions::default());
        assert_eq!(
            doc.nodes,
            vec![
                text("a"),
                tag(BbTag::Bold, vec![text("b"), tag(BbTag::Italic, vec![text("c")])]),
                text("d"),
            ]
        );
    }

    #[test]
    fn test_block_whitespace_trimming() {
        let doc = parse("[div]\n\nHello\nWorld\n[/div]\n", &ParseOptions::default());
        assert_eq!(doc.nodes, vec![tag(BbTag::Div, vec![text("Hello\nWorld")])]);
    }

    #[test]
    fn test_only_one_line_break_after_block_is_removed() {
        let doc = parse("[center]x[/center]\r\n\nnext", &ParseOptions::default());
        assert_eq!(doc.nodes, vec![tag(BbTag::Center, vec![text("x")]), text("\nnext")]);
    }

    #[test]
    fn test_inline_tags_are_not_trimmed() {
        let doc = parse("[b]\nx\n[/b]\n", &ParseOptions::default());
        assert_eq!(doc.nodes, vec![tag(BbTag::Bold, vec![text("\nx\n")]), text("\n")]);
    }

    #[test]
    fn test_trimming_can_be_disabled() {
        let options = ParseOptions {
            trim_block_whitespace: false,
            ..ParseOptions::default()
        };
        let doc = parse("[div]\nx\n[/div]\n", &options);
        assert_eq!(doc.nodes, vec![tag(BbTag::Div, vec![text("\nx\n")]), text("\n")]);
    }

    #[test]
    fn test_unknown_and_unclosed_tags_are_literal() {
        let doc = parse("[foo]unclosed", &ParseOptions::default());
        assert_eq!(doc.nodes, vec![text("[foo]unclosed")]);

        let doc = parse("[b]never closed [i]x[/i]", &ParseOptions::default());
        assert_eq!(
            doc.nodes,
            vec![text("[b]never closed "), tag(BbTag::Italic, vec![text("x")])]
        );
    }

    #[test]
    fn test_misnested_close_unwinds_inner_tags() {
        let doc = parse("[b][i]x[/b][/i]", &ParseOptions::default());
        assert_eq!(
            doc.nodes,
            vec![tag(BbTag::Bold, vec![text("[i]x")]), text("[/i]")]
        );
    }

    #[test]
    fn test_attributes() {
        let doc = parse(
            "[color=#f00]r[/color][spoiler open=\"Show me\" close=Hide]s[/spoiler]",
            &ParseOptions::default(),
        );
        let Node::Tag(color) = &doc.nodes[0] else {
            panic!("expected tag");
        };
        assert_eq!(color.attrs, vec![Attribute::new("", "#f00")]);
        let Node::Tag(spoiler) = &doc.nodes[1] else {
            panic!("expected tag");
        };
        assert_eq!(
            spoiler.attrs,
            vec![Attribute::new("open", "Show me"), Attribute::new("close", "Hide")]
        );
    }

    #[test]
    fn test_invalid_attribute_makes_tag_literal() {
        let doc = parse("[color=red;x:y]t[/color]", &ParseOptions::default());
        assert_eq!(doc.nodes, vec![text("[color=red;x:y]t[/color]")]);
    }

    #[test]
    fn test_img_requires_safe_source() {
        let doc = parse("[img]javascript:alert(1)[/img]", &ParseOptions::default());
        assert_eq!(doc.nodes, vec![text("[img]javascript:alert(1)[/img]")]);

        let doc = parse("[img]https://x.test/a.png[/img]", &ParseOptions::default());
        assert_eq!(doc.nodes, vec![tag(BbTag::Img, vec![text("https://x.test/a.png")])]);
    }

    #[test]
    fn test_raw_content_is_not_parsed() {
        let doc = parse("[raw][b]x[/b][/RAW]", &ParseOptions::default());
        assert_eq!(doc.nodes, vec![tag(BbTag::Raw, vec![text("[b]x[/b]")])]);

        let doc = parse("[raw][b]x[/b]", &ParseOptions::default());
        assert_eq!(doc.nodes, vec![text("[raw]"), tag(BbTag::Bold, vec![text("x")])]);

        let doc = parse("[raw]a[/Raw][raw]b", &ParseOptions::default());
        assert_eq!(doc.nodes, vec![tag(BbTag::Raw, vec![text("a")]), text("[raw]b")]);
    }

    #[test]
    fn test_many_unclosed_raw_openers() {
        let input = "[raw]".repeat(40_000);
        let doc = parse(&input, &ParseOptions::default());
        assert_eq!(doc.nodes, vec![text(&input)]);
        assert_eq!(crate::markup::sanitize(&input, &ParseOptions::default()), input);
    }

    #[test]
    fn test_strip_bb_tags_keeps_content() {
        let options = ParseOptions {
            strip_bb_tags: true,
            ..ParseOptions::default()
        };
        let doc = parse("[b]bold [i]both[/i][/b] [foo]", &options);
        assert_eq!(doc.nodes, vec![text("bold both [foo]")]);
    }

    #[test]
    fn test_html_tokens() {
        let doc = parse("<b>x</b>", &ParseOptions::default());
        assert_eq!(doc.nodes.len(), 3);
        assert!(matches!(&doc.nodes[0], Node::Html(tag) if tag.name == "b"));

        let escaped = ParseOptions {
            escape_html: true,
            ..ParseOptions::default()
        };
        let doc = parse("<b>x</b>", &escaped);
        assert_eq!(doc.nodes, vec![text("\\&lt;b\\&gt;x\\&lt;/b\\&gt;")]);
    }

    #[test]
    fn test_nesting_limit() {
        let options = ParseOptions {
            max_depth: 1,
            ..ParseOptions::default()
        };
        let doc = parse("[b][i]x[/i][/b]", &options);
        assert_eq!(doc.nodes, vec![tag(BbTag::Bold, vec![text("[i]x[/i]")])]);
    }

    #[test]
    fn test_entities_stay_masked_in_text() {
        let doc = parse("[b]&amp;[/b]", &ParseOptions::default());
        assert_eq!(doc.nodes, vec![tag(BbTag::Bold, vec![text("\\&amp;")])]);
    }
}
